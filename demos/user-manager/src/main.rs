//! User Manager Demo
//!
//! A console bot keeping a small user directory:
//!
//! - `/add`: asks for name, email and type, shows a summary, saves on "yes"
//! - `/list`: prints the saved users
//! - `/start`: lists the commands
//!
//! Choices and buttons are printed as a numbered list; type the number to
//! pick one.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package user-manager -- --config ./colloquy.toml
//! ```

mod console;
mod users;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colloquy::prelude::*;
use colloquy::runtime::config::load_config_from_file;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::console::ConsoleMessenger;
use crate::users::{AddUser, Directory, ListUsers};

#[derive(Debug, Parser)]
#[command(version, about = "Manage a user directory from the console")]
struct Args {
    /// Configuration file; defaults to colloquy.toml in the current directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat id the console session runs as.
    #[arg(long, default_value = "console")]
    chat: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config_from_file(path)?,
        None => ConfigLoader::new().with_current_dir().load()?,
    };
    config.engine.suggest_commands = true;

    let callbacks = Arc::new(CallbackManager::start(
        &config.callbacks,
        Arc::new(MemoryCallbackStore::new()),
        CancellationToken::new(),
    ));
    let messenger = ConsoleMessenger::new(&args.chat, callbacks);

    let mut app = Application::from_config(config, messenger).with_interceptor(log_actions());

    let directory = Directory::new();
    app.add_command("add", AlwaysInterrupt(AddUser::new(directory.clone())))?;
    app.add_command("list", ListUsers::new(directory))?;

    info!(chat = %args.chat, "type /start to see the commands");
    app.run().await?;

    Ok(())
}
