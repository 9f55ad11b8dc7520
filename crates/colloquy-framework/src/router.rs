//! Command registry.
//!
//! The [`Router`] is filled once during start-up and then frozen into an
//! `Arc<Router>`; after that it is only ever read, so lookups take no lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::command::{ActionChain, Command};
use crate::error::{RouterError, RouterResult};

/// A registered command together with its name and validated chain.
#[derive(Clone)]
pub struct NamedCommand {
    name: Arc<str>,
    command: Arc<dyn Command>,
    chain: Arc<ActionChain>,
}

impl NamedCommand {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        self.command.description()
    }

    pub fn command(&self) -> &Arc<dyn Command> {
        &self.command
    }

    pub fn chain(&self) -> &ActionChain {
        &self.chain
    }
}

impl fmt::Debug for NamedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedCommand")
            .field("name", &self.name)
            .field("steps", &self.chain.len())
            .finish()
    }
}

/// Maps command names to commands.
#[derive(Default)]
pub struct Router {
    commands: HashMap<String, NamedCommand>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command` under `name`.
    ///
    /// Builds the command's action chain right away, so malformed chains are
    /// reported here rather than mid-dialog.
    pub fn add(&mut self, name: impl Into<String>, command: impl Command) -> RouterResult<()> {
        self.add_shared(name, Arc::new(command))
    }

    /// Registers an already shared command.
    pub fn add_shared(
        &mut self,
        name: impl Into<String>,
        command: Arc<dyn Command>,
    ) -> RouterResult<()> {
        let name = name.into();
        if self.commands.contains_key(&name) {
            return Err(RouterError::AlreadyExists(name));
        }

        let chain = command
            .actions()
            .build()
            .map_err(|source| RouterError::InvalidChain {
                command: name.clone(),
                source,
            })?;

        debug!(command = %name, steps = chain.len(), "registered command");

        self.commands.insert(
            name.clone(),
            NamedCommand {
                name: name.into(),
                command,
                chain: Arc::new(chain),
            },
        );
        Ok(())
    }

    /// Looks a command up by name.
    pub fn find(&self, name: &str) -> RouterResult<&NamedCommand> {
        self.commands
            .get(name)
            .ok_or_else(|| RouterError::NotFound(name.to_owned()))
    }

    /// All registered commands, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = &NamedCommand> {
        self.commands.values()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}
