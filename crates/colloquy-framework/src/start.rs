//! The built-in command listing.

use async_trait::async_trait;

use crate::command::{ActionRequest, Actions, Command, InterruptRequest};
use crate::error::CommandError;

/// Answers with one `/<name> - <description>` line per registered command,
/// leaving itself out. Always interruptible.
#[derive(Debug, Clone, Default)]
pub struct StartCommand {
    description: String,
}

impl StartCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

async fn list_commands(req: ActionRequest) -> Result<(), CommandError> {
    let mut lines: Vec<String> = req
        .router()
        .list()
        .filter(|cmd| cmd.name() != req.command_name())
        .map(|cmd| format!("/{} - {}", cmd.name(), cmd.description()))
        .collect();
    lines.sort();

    req.respond_text(lines.join("\n")).await?;
    Ok(())
}

#[async_trait]
impl Command for StartCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn actions(&self) -> Actions {
        Actions::new().then("start", list_commands)
    }

    async fn interrupt(&self, _req: &InterruptRequest) -> Result<bool, CommandError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use colloquy_core::{MemoryStore, TextMessage};

    use super::*;
    use crate::machine::{Machine, Request};
    use crate::router::Router;
    use crate::testing::{RecordingResponder, StaticCommand};

    #[tokio::test]
    async fn test_lists_other_commands() {
        let mut router = Router::new();
        router.add("start", StartCommand::new()).unwrap();
        router.add("add", StaticCommand::new("add user", ["start"])).unwrap();
        router.add("delete", StaticCommand::new("delete user", ["start"])).unwrap();

        let store = Arc::new(MemoryStore::new());
        let machine = Machine::new(Arc::new(router), store.clone());
        let responder = RecordingResponder::new();

        machine
            .handle(Request::new(
                Arc::new(TextMessage::new("1", "chat", "/start")),
                responder.clone(),
            ))
            .await
            .unwrap();

        assert_eq!(
            responder.texts(),
            ["/add - add user\n/delete - delete user"]
        );
        assert!(store.is_empty());
    }
}
