//! Action chains.
//!
//! [`Actions`] is the builder a command returns; the router turns it into an
//! [`ActionChain`] once, at registration. The chain is a plain graph: a map
//! from step name to `{handler, next}` where `next` is the step appended right
//! after it. Branches are sub-chains that default traversal never enters;
//! a handler reaches them with `session().forward(entry_step)`.
//!
//! ```text
//! start ─▶ name ─▶ email ─▶ type ─▶ confirm
//!                                      ┊ forward("edit")
//!                        branch "edit": edit ─▶ edit-save
//! ```

use std::collections::HashMap;
use std::fmt;

use tower::Service;

use super::action::{ActionHandler, ActionRequest, BoxedActionHandler, ServiceHandler};
use crate::error::{ChainError, CommandError};

struct StepDef {
    name: String,
    handler: BoxedActionHandler,
}

fn step<H: ActionHandler>(name: impl Into<String>, handler: H) -> StepDef {
    StepDef {
        name: name.into(),
        handler: std::sync::Arc::new(handler),
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Builds the steps of a command in calling order.
#[derive(Default)]
pub struct Actions {
    steps: Vec<StepDef>,
    branches: Vec<(String, Vec<StepDef>)>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step; it becomes the successor of the previously appended one.
    pub fn then<H: ActionHandler>(mut self, name: impl Into<String>, handler: H) -> Self {
        self.steps.push(step(name, handler));
        self
    }

    /// Appends a step backed by a `tower::Service`.
    pub fn then_service<S>(self, name: impl Into<String>, service: S) -> Self
    where
        S: Service<ActionRequest, Response = (), Error = CommandError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.then(name, ServiceHandler::new(service))
    }

    /// Registers a named branch.
    ///
    /// Its first step is only reachable by forwarding to it; its steps are
    /// linked to each other in order and its last step finishes the dialog.
    /// Branch names are unique and may only match a step name when that step
    /// is the branch's own entry.
    pub fn branch(mut self, name: impl Into<String>, build: impl FnOnce(Branch) -> Branch) -> Self {
        let branch = build(Branch::default());
        self.branches.push((name.into(), branch.steps));
        self
    }

    /// Validates the steps and links them into an [`ActionChain`].
    pub fn build(self) -> Result<ActionChain, ChainError> {
        if self.steps.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut chain = ActionChain {
            actions: Vec::new(),
            index: HashMap::new(),
            branches: HashMap::new(),
        };

        chain.link(self.steps)?;
        for (name, steps) in self.branches {
            let Some(entry) = steps.first().map(|s| s.name.clone()) else {
                return Err(ChainError::EmptyBranch(name));
            };
            if chain.branches.contains_key(&name) {
                return Err(ChainError::DuplicateBranch(name));
            }
            chain.link(steps)?;
            chain.branches.insert(name, entry);
        }

        for (name, entry) in &chain.branches {
            if name != entry && chain.index.contains_key(name) {
                return Err(ChainError::BranchShadowsStep(name.clone()));
            }
        }

        Ok(chain)
    }
}

/// Builds the steps of a named branch.
#[derive(Default)]
pub struct Branch {
    steps: Vec<StepDef>,
}

impl Branch {
    pub fn then<H: ActionHandler>(mut self, name: impl Into<String>, handler: H) -> Self {
        self.steps.push(step(name, handler));
        self
    }

    pub fn then_service<S>(self, name: impl Into<String>, service: S) -> Self
    where
        S: Service<ActionRequest, Response = (), Error = CommandError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.then(name, ServiceHandler::new(service))
    }
}

// ============================================================================
// ActionChain
// ============================================================================

/// One step of a command.
pub struct Action {
    name: String,
    handler: BoxedActionHandler,
    next: Option<String>,
}

impl Action {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the statically wired successor, if any.
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    pub fn handler(&self) -> &BoxedActionHandler {
        &self.handler
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("next", &self.next)
            .finish()
    }
}

/// The validated step graph of a command.
#[derive(Debug)]
pub struct ActionChain {
    // Main chain first, then branches; `actions[0]` is the entry step.
    actions: Vec<Action>,
    index: HashMap<String, usize>,
    branches: HashMap<String, String>,
}

impl ActionChain {
    fn link(&mut self, steps: Vec<StepDef>) -> Result<(), ChainError> {
        let names: Vec<String> = steps.iter().map(|s| s.name.clone()).collect();

        for (i, def) in steps.into_iter().enumerate() {
            if self.index.contains_key(&def.name) {
                return Err(ChainError::DuplicateStep(def.name));
            }
            self.index.insert(def.name.clone(), self.actions.len());
            self.actions.push(Action {
                name: def.name,
                handler: def.handler,
                next: names.get(i + 1).cloned(),
            });
        }

        Ok(())
    }

    /// The entry step of a new dialog.
    pub fn first(&self) -> &Action {
        &self.actions[0]
    }

    /// Looks a step up by name.
    pub fn get(&self, name: &str) -> Option<&Action> {
        self.index.get(name).map(|&i| &self.actions[i])
    }

    /// The statically wired successor of `action`.
    pub fn next_of(&self, action: &Action) -> Option<&Action> {
        action.next().and_then(|name| self.get(name))
    }

    /// The entry step of a named branch.
    pub fn branch_entry(&self, branch: &str) -> Option<&str> {
        self.branches.get(branch).map(String::as_str)
    }

    /// Number of steps, branches included.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bus::InterceptorBus;
    use crate::testing;

    async fn noop(_req: ActionRequest) -> Result<(), CommandError> {
        Ok(())
    }

    #[test]
    fn test_linear_chain() {
        let chain = Actions::new()
            .then("start", noop)
            .then("name", noop)
            .then("email", noop)
            .build()
            .unwrap();

        assert_eq!(chain.first().name(), "start");
        assert_eq!(chain.first().next(), Some("name"));
        assert_eq!(chain.get("name").unwrap().next(), Some("email"));
        assert_eq!(chain.get("email").unwrap().next(), None);
        assert!(chain.get("missing").is_none());
        assert_eq!(chain.next_of(chain.first()).unwrap().name(), "name");
    }

    #[test]
    fn test_branch_is_not_linked_to_main_chain() {
        let chain = Actions::new()
            .then("start", noop)
            .then("confirm", noop)
            .branch("edit", |b| b.then("edit", noop).then("edit-save", noop))
            .build()
            .unwrap();

        assert_eq!(chain.get("confirm").unwrap().next(), None);
        assert_eq!(chain.get("edit").unwrap().next(), Some("edit-save"));
        assert_eq!(chain.get("edit-save").unwrap().next(), None);
        assert_eq!(chain.branch_entry("edit"), Some("edit"));
        assert_eq!(chain.len(), 4);
    }

    #[test]
    fn test_duplicate_step_is_rejected() {
        let err = Actions::new()
            .then("start", noop)
            .then("start", noop)
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::DuplicateStep("start".into()));

        let err = Actions::new()
            .then("start", noop)
            .branch("again", |b| b.then("start", noop))
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::DuplicateStep("start".into()));
    }

    #[test]
    fn test_empty_chains_are_rejected() {
        assert_eq!(Actions::new().build().unwrap_err(), ChainError::Empty);

        let err = Actions::new()
            .then("start", noop)
            .branch("nothing", |b| b)
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::EmptyBranch("nothing".into()));
    }

    #[test]
    fn test_duplicate_branch_is_rejected() {
        let err = Actions::new()
            .then("start", noop)
            .branch("edit", |b| b.then("edit-name", noop))
            .branch("edit", |b| b.then("edit-email", noop))
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::DuplicateBranch("edit".into()));
    }

    #[test]
    fn test_branch_shadowing_step_is_rejected() {
        let err = Actions::new()
            .then("start", noop)
            .then("confirm", noop)
            .branch("confirm", |b| b.then("confirm-again", noop))
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::BranchShadowsStep("confirm".into()));

        let err = Actions::new()
            .then("start", noop)
            .branch("edit", |b| b.then("edit-name", noop))
            .branch("edit-name", |b| b.then("rename", noop))
            .build()
            .unwrap_err();
        assert_eq!(err, ChainError::BranchShadowsStep("edit-name".into()));
    }

    #[test]
    fn test_service_step() {
        let svc = tower::service_fn(|req: ActionRequest| async move {
            if req.message().body() != "text" {
                return Err(CommandError::invalid_argument("unexpected body"));
            }
            req.session().set("seen", "yes");
            Ok::<(), CommandError>(())
        });
        let failing = tower::service_fn(|_req: ActionRequest| async {
            Err::<(), _>(CommandError::internal("down"))
        });
        let chain = Actions::new()
            .then_service("start", svc)
            .then_service("next", failing)
            .build()
            .unwrap();
        let bus = InterceptorBus::new();
        let req = testing::action_request("chat");

        let first = Arc::clone(chain.first().handler());
        tokio_test::assert_ok!(tokio_test::block_on(bus.handle(req.clone(), first)));
        assert_eq!(req.session().get("seen").as_deref(), Some("yes"));

        let next = Arc::clone(chain.next_of(chain.first()).unwrap().handler());
        let err = tokio_test::assert_err!(tokio_test::block_on(bus.handle(req, next)));
        assert!(matches!(err, CommandError::Internal(_)));
    }
}
