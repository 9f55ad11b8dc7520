//! Messenger adapter contract.
//!
//! A messenger turns platform updates into [`BoxedMessage`]s and pushes them
//! into the runtime's ingestion channel; it also hands out a [`Responder`]
//! per chat so answers can be delivered back.
//!
//! [`Responder`]: crate::answer::Responder

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::answer::BoxedResponder;
use crate::error::MessengerError;
use crate::message::BoxedMessage;

/// A chat platform adapter.
///
/// # Example
///
/// ```rust,ignore
/// #[async_trait]
/// impl Messenger for Console {
///     fn name(&self) -> &str {
///         "console"
///     }
///
///     async fn listen(
///         &self,
///         sender: mpsc::Sender<BoxedMessage>,
///         cancel: CancellationToken,
///     ) -> Result<(), MessengerError> {
///         while let Some(msg) = self.next_line(&cancel).await? {
///             sender.send(msg).await.map_err(|_| MessengerError::ChannelClosed)?;
///         }
///         Ok(())
///     }
///
///     fn responder(&self, chat_id: &str) -> BoxedResponder {
///         Arc::new(ConsoleResponder::new(chat_id))
///     }
/// }
/// ```
#[async_trait]
pub trait Messenger: Send + Sync + 'static {
    /// Adapter name, used in logs.
    fn name(&self) -> &str;

    /// Receives messages until `cancel` fires or the platform stream ends.
    async fn listen(
        &self,
        sender: mpsc::Sender<BoxedMessage>,
        cancel: CancellationToken,
    ) -> Result<(), MessengerError>;

    /// Creates a responder bound to `chat_id`.
    fn responder(&self, chat_id: &str) -> BoxedResponder;

    /// Releases platform resources.
    async fn close(&self) -> Result<(), MessengerError> {
        Ok(())
    }
}

/// A shared, type-erased messenger.
pub type BoxedMessenger = Arc<dyn Messenger>;
