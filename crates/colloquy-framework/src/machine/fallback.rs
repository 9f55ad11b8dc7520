//! Command-not-found fallbacks.

use async_trait::async_trait;
use colloquy_core::{Answer, ResponderError};

use super::Request;
use crate::router::Router;

pub const DEFAULT_NOT_FOUND_TEXT: &str = "Command not found.";

/// Answers a message that names no registered command.
#[async_trait]
pub trait CommandNotFoundFallback: Send + Sync + 'static {
    /// `command` is the name the message asked for; empty when it named none.
    async fn handle(
        &self,
        req: &Request,
        router: &Router,
        command: &str,
    ) -> Result<(), ResponderError>;
}

/// Sends a fixed text.
#[derive(Debug, Clone)]
pub struct StaticFallback {
    text: String,
}

impl StaticFallback {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Default for StaticFallback {
    fn default() -> Self {
        Self::new(DEFAULT_NOT_FOUND_TEXT)
    }
}

#[async_trait]
impl CommandNotFoundFallback for StaticFallback {
    async fn handle(&self, req: &Request, _router: &Router, _command: &str) -> Result<(), ResponderError> {
        req.responder.respond(Answer::text(self.text.clone())).await?;
        Ok(())
    }
}

/// Suggests registered commands whose names are close to the requested one.
///
/// A command is suggested when its Levenshtein distance to the requested
/// name is below the threshold (3 by default).
#[derive(Debug, Clone)]
pub struct SuggestFallback {
    threshold: usize,
}

impl Default for SuggestFallback {
    fn default() -> Self {
        Self { threshold: 3 }
    }
}

impl SuggestFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Builds the answer text for `command`.
    pub fn render(&self, router: &Router, command: &str) -> String {
        let mut similar: Vec<String> = router
            .list()
            .filter(|cmd| strsim::levenshtein(command, cmd.name()) < self.threshold)
            .map(|cmd| format!("/{} - {}", cmd.name(), cmd.description()))
            .collect();
        similar.sort();

        let mut lines = vec![format!("Command \"{command}\" not found.")];
        if !similar.is_empty() {
            lines.push(String::new());
            lines.push("Similar commands:".to_owned());
            lines.extend(similar);
        }
        lines.join("\n")
    }
}

#[async_trait]
impl CommandNotFoundFallback for SuggestFallback {
    async fn handle(&self, req: &Request, router: &Router, command: &str) -> Result<(), ResponderError> {
        let text = self.render(router, command);
        req.responder.respond(Answer::text(text)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticCommand;

    fn router() -> Router {
        let mut router = Router::new();
        router.add("add", StaticCommand::new("add user", ["start"])).unwrap();
        router.add("delete", StaticCommand::new("delete user", ["start"])).unwrap();
        router.add("ads", StaticCommand::new("show ads", ["start"])).unwrap();
        router
    }

    #[test]
    fn test_suggests_close_commands() {
        let text = SuggestFallback::new().render(&router(), "adx");
        assert_eq!(
            text,
            "Command \"adx\" not found.\n\nSimilar commands:\n/add - add user\n/ads - show ads"
        );
    }

    #[test]
    fn test_no_suggestions() {
        let text = SuggestFallback::new().render(&router(), "statistics");
        assert_eq!(text, "Command \"statistics\" not found.");
    }
}
