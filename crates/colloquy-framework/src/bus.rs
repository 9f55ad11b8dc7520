//! The interceptor bus.
//!
//! Interceptors wrap step execution the way tower layers wrap a service: the
//! first registered interceptor is the outermost one, it sees the request
//! first and the outcome last. Each receives a [`Next`] continuation; calling
//! [`Next::run`] runs the rest of the chain and finally the step itself.
//!
//! ```text
//! request ─▶ [ only_chats ─▶ [ log_actions ─▶ [ step handler ] ] ]
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let bus = InterceptorBus::new()
//!     .with(only_chats(["42"]))
//!     .with(from_fn(|req: ActionRequest, next: Next| async move {
//!         tracing::info!(action = req.action_name(), "before");
//!         next.run(req).await
//!     }));
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::command::{ActionRequest, BoxedActionHandler};
use crate::error::CommandError;

/// Cross-cutting logic around step execution.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, req: ActionRequest, next: Next) -> Result<(), CommandError>;
}

/// The rest of the interceptor chain, ending in the step handler.
pub struct Next {
    chain: Arc<[Arc<dyn Interceptor>]>,
    position: usize,
    handler: BoxedActionHandler,
}

impl Next {
    /// Runs the remaining interceptors and the step.
    pub async fn run(self, req: ActionRequest) -> Result<(), CommandError> {
        match self.chain.get(self.position).cloned() {
            Some(interceptor) => {
                let next = Next {
                    chain: self.chain,
                    position: self.position + 1,
                    handler: self.handler,
                };
                interceptor.intercept(req, next).await
            }
            None => self.handler.call(req).await,
        }
    }
}

/// An ordered list of interceptors.
///
/// Without interceptors, steps run directly.
#[derive(Clone)]
pub struct InterceptorBus {
    chain: Arc<[Arc<dyn Interceptor>]>,
}

impl Default for InterceptorBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptorBus {
    pub fn new() -> Self {
        Self {
            chain: Arc::from(Vec::new()),
        }
    }

    /// Appends an interceptor; it runs inside all previously added ones.
    pub fn with(self, interceptor: impl Interceptor) -> Self {
        self.with_shared(Arc::new(interceptor))
    }

    pub fn with_shared(self, interceptor: Arc<dyn Interceptor>) -> Self {
        let mut chain = self.chain.to_vec();
        chain.push(interceptor);
        Self {
            chain: chain.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Runs `handler` through every interceptor.
    pub async fn handle(
        &self,
        req: ActionRequest,
        handler: BoxedActionHandler,
    ) -> Result<(), CommandError> {
        Next {
            chain: Arc::clone(&self.chain),
            position: 0,
            handler,
        }
        .run(req)
        .await
    }
}

// ============================================================================
// from_fn
// ============================================================================

/// An interceptor backed by a closure. See [`from_fn`].
pub struct FnInterceptor<F> {
    f: F,
}

/// Turns `async fn(ActionRequest, Next) -> Result<(), CommandError>` into an
/// [`Interceptor`].
pub fn from_fn<F, Fut>(f: F) -> FnInterceptor<F>
where
    F: Fn(ActionRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    FnInterceptor { f }
}

#[async_trait]
impl<F, Fut> Interceptor for FnInterceptor<F>
where
    F: Fn(ActionRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    async fn intercept(&self, req: ActionRequest, next: Next) -> Result<(), CommandError> {
        (self.f)(req, next).await
    }
}
