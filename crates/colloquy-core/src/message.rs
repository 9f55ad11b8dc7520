//! Inbound message contract.
//!
//! Messenger adapters convert platform updates into values implementing
//! [`Message`]. The engine only ever reads from a message: its identifiers,
//! its body, the command it names (if any) and, for button presses and deep
//! links, a pre-resolved [`DialogArgs`] triple.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// Dialog Args
// ============================================================================

/// A pre-resolved `(command, state, data)` triple carried by a message.
///
/// Produced by button presses and deep links; when present it short-circuits
/// dialog determination entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogArgs {
    /// Command that should handle the message.
    pub command_name: String,
    /// Step to resume; empty means the command's first step.
    #[serde(default)]
    pub state_name: String,
    /// Session data to start from.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl DialogArgs {
    /// Creates args pointing at `command_name`, starting from `state_name`.
    pub fn new(command_name: impl Into<String>, state_name: impl Into<String>) -> Self {
        Self {
            command_name: command_name.into(),
            state_name: state_name.into(),
            data: HashMap::new(),
        }
    }

    /// Adds a data entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// The user who sent a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    /// Platform user identifier.
    pub id: String,
    /// Display name, when the platform exposes one.
    pub name: Option<String>,
}

// ============================================================================
// Message Trait
// ============================================================================

/// An inbound chat message.
///
/// # Example
///
/// ```rust,ignore
/// fn describe(msg: &dyn Message) {
///     match msg.command_name() {
///         Some(cmd) => println!("{} asked for /{cmd}", msg.chat_id()),
///         None => println!("{} said {}", msg.chat_id(), msg.body()),
///     }
/// }
/// ```
pub trait Message: Debug + Send + Sync + 'static {
    /// Stable message identifier.
    fn id(&self) -> &str;

    /// Stable identifier of the conversation the message belongs to.
    fn chat_id(&self) -> &str;

    /// Raw message text.
    fn body(&self) -> &str;

    /// The user who sent the message.
    fn sender(&self) -> Option<&Sender> {
        None
    }

    /// The command this message names, without the leading `/`.
    ///
    /// The default implementation parses the body with [`extract_command_name`].
    fn command_name(&self) -> Option<&str> {
        extract_command_name(self.body())
    }

    /// Pre-resolved dialog coordinates, for button presses and deep links.
    fn args(&self) -> Option<&DialogArgs> {
        None
    }
}

/// A shared, type-erased message.
pub type BoxedMessage = Arc<dyn Message>;

/// Extracts a command name from a message body.
///
/// A body starting with `/` yields its first whitespace-delimited token
/// without the slash and without a trailing `@bot` mention.
///
/// ```rust
/// use colloquy_core::extract_command_name;
///
/// assert_eq!(extract_command_name("/add"), Some("add"));
/// assert_eq!(extract_command_name("/add@my_bot now"), Some("add"));
/// assert_eq!(extract_command_name("add"), None);
/// ```
pub fn extract_command_name(body: &str) -> Option<&str> {
    let rest = body.strip_prefix('/')?;
    let token = rest.split(char::is_whitespace).next()?;
    let name = token.split_once('@').map_or(token, |(name, _)| name);

    (!name.is_empty()).then_some(name)
}

// ============================================================================
// TextMessage
// ============================================================================

/// A plain-text [`Message`] implementation.
///
/// Adapters for text-only platforms can use it directly; it is also what the
/// console demo and the engine's tests feed into the machine.
#[derive(Debug, Clone, Default)]
pub struct TextMessage {
    id: String,
    chat_id: String,
    body: String,
    sender: Option<Sender>,
    args: Option<DialogArgs>,
}

impl TextMessage {
    /// Creates a message with the given identifiers and body.
    pub fn new(id: impl Into<String>, chat_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            body: body.into(),
            sender: None,
            args: None,
        }
    }

    /// Attaches the sending user.
    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Attaches pre-resolved dialog coordinates.
    pub fn with_args(mut self, args: DialogArgs) -> Self {
        self.args = Some(args);
        self
    }
}

impl Message for TextMessage {
    fn id(&self) -> &str {
        &self.id
    }

    fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn sender(&self) -> Option<&Sender> {
        self.sender.as_ref()
    }

    fn args(&self) -> Option<&DialogArgs> {
        self.args.as_ref()
    }
}
