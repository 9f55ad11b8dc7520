//! The user directory dialogs.
//!
//! ```text
//! /add:  start ─▶ name ─▶ email ─▶ type ─▶ summary ─▶ confirm
//!                   ▲                        ▲  ┊ button  ┊ "no"
//!                   │                        │  ▼         ┊
//!                   │   forward ── rename-save ◀── rename ┊
//!                   └── transit ── edit-name ◀── edit ◀───┘
//! ```
//!
//! The "Change name" button carries the email and type in its args, so the
//! rename branch only asks for the name.

use std::fmt;
use std::sync::Arc;

use colloquy::prelude::*;
use parking_lot::RwLock;
use tracing::info;

const USER_NAME: &str = "user.name";
const USER_EMAIL: &str = "user.email";
const USER_TYPE: &str = "user.type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
    pub kind: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> ({})", self.name, self.email, self.kind)
    }
}

/// Users saved so far, shared by the commands.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: Arc<RwLock<Vec<User>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, user: User) {
        self.users.write().push(user);
    }

    pub fn users(&self) -> Vec<User> {
        self.users.read().clone()
    }
}

fn user_types() -> Enum {
    Enum::from_pairs([("int", "internal"), ("ext", "external")])
}

fn confirmation() -> Enum {
    Enum::from_list(["yes", "no"])
}

fn read_user(session: &SessionHandle) -> Result<User, CommandError> {
    let field = |key: &str| {
        session
            .get(key)
            .ok_or_else(|| CommandError::internal(format!("missing session field {key}")))
    };

    Ok(User {
        name: field(USER_NAME)?,
        email: field(USER_EMAIL)?,
        kind: field(USER_TYPE)?,
    })
}

// ============================================================================
// /add
// ============================================================================

/// Asks for a name, an email and a type, then saves the user.
///
/// Refuses interruption on its own; register it wrapped in [`AlwaysInterrupt`]
/// to let `/list` cut in.
pub struct AddUser {
    directory: Directory,
}

impl AddUser {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }
}

async fn ask_name(req: ActionRequest) -> Result<(), CommandError> {
    req.respond_text("Enter user name").await?;
    Ok(())
}

async fn name(req: ActionRequest) -> Result<(), CommandError> {
    let name = req.message().body().trim();
    if name.is_empty() {
        return Err(CommandError::validation("Name must not be empty."));
    }

    req.session().set(USER_NAME, name);
    req.respond_text("Enter user email").await?;
    Ok(())
}

async fn email(req: ActionRequest) -> Result<(), CommandError> {
    let email = req.message().body().trim();
    if !email.contains('@') {
        return Err(CommandError::validation("Invalid email, try again."));
    }

    req.session().set(USER_EMAIL, email);
    req.respond(Answer::text("Select user type").with_choice(user_types()))
        .await?;
    Ok(())
}

async fn kind(req: ActionRequest) -> Result<(), CommandError> {
    let value = req.message().body().trim();
    if !user_types().values.iter().any(|item| item.value == value) {
        return Err(CommandError::validation("Unknown user type, pick one of the options."));
    }

    req.session().set(USER_TYPE, value);
    req.session().passthrough();
    Ok(())
}

async fn summary(req: ActionRequest) -> Result<(), CommandError> {
    let user = read_user(req.session())?;
    let rename = DialogArgs::new(req.command_name(), "rename")
        .with_data(USER_EMAIL, user.email.clone())
        .with_data(USER_TYPE, user.kind.clone());

    req.respond(
        Answer::text(format!("Save {user}?"))
            .with_choice(confirmation())
            .with_button(Button::command("Change name", rename)),
    )
    .await?;
    Ok(())
}

async fn confirm(req: ActionRequest, directory: Directory) -> Result<(), CommandError> {
    match req.message().body().trim() {
        "yes" => {
            let user = read_user(req.session())?;
            info!(chat_id = %req.session().chat_id(), user = %user, "user saved");
            directory.save(user);
            req.respond_text("User saved.").await?;
            Ok(())
        }
        "no" => {
            req.session().forward("edit");
            Ok(())
        }
        _ => Err(CommandError::validation("Please answer yes or no.")),
    }
}

async fn start_over(req: ActionRequest) -> Result<(), CommandError> {
    req.respond_text("Starting over.").await?;
    req.session().passthrough();
    Ok(())
}

async fn edit_name(req: ActionRequest) -> Result<(), CommandError> {
    req.respond_text("Enter user name").await?;
    req.session().transit("name");
    Ok(())
}

async fn ask_new_name(req: ActionRequest) -> Result<(), CommandError> {
    req.respond_text("Enter new user name").await?;
    Ok(())
}

async fn rename(req: ActionRequest) -> Result<(), CommandError> {
    let name = req.message().body().trim();
    if name.is_empty() {
        return Err(CommandError::validation("Name must not be empty."));
    }

    req.session().set(USER_NAME, name);
    req.session().forward("summary");
    Ok(())
}

#[async_trait]
impl Command for AddUser {
    fn description(&self) -> &str {
        "add a user"
    }

    fn actions(&self) -> Actions {
        let directory = self.directory.clone();

        Actions::new()
            .then("start", ask_name)
            .then("name", name)
            .then("email", email)
            .then("type", kind)
            .then("summary", summary)
            .then("confirm", move |req: ActionRequest| confirm(req, directory.clone()))
            .branch("edit", |branch| {
                branch.then("edit", start_over).then("edit-name", edit_name)
            })
            .branch("rename", |branch| {
                branch.then("rename", ask_new_name).then("rename-save", rename)
            })
    }
}

// ============================================================================
// /list
// ============================================================================

/// Prints the saved users.
pub struct ListUsers {
    directory: Directory,
}

impl ListUsers {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Command for ListUsers {
    fn description(&self) -> &str {
        "list saved users"
    }

    fn actions(&self) -> Actions {
        let directory = self.directory.clone();

        Actions::new().then("start", move |req: ActionRequest| {
            let users = directory.users();
            async move {
                let text = if users.is_empty() {
                    "No users yet.".to_string()
                } else {
                    users
                        .iter()
                        .enumerate()
                        .map(|(i, user)| format!("{}. {user}", i + 1))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                req.respond_text(text).await?;
                Ok::<(), CommandError>(())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Transcript {
        answers: Mutex<Vec<Answer>>,
    }

    impl Transcript {
        fn texts(&self) -> Vec<String> {
            self.answers.lock().iter().map(|a| a.text.clone()).collect()
        }

        fn last(&self) -> Answer {
            self.answers.lock().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Responder for Transcript {
        async fn respond(&self, answer: Answer) -> Result<Receipt, ResponderError> {
            self.answers.lock().push(answer);
            Ok(Receipt::default())
        }

        async fn respond_media(&self, _media: Media) -> Result<Receipt, ResponderError> {
            Err(ResponderError::UnsupportedMedia("test"))
        }
    }

    struct Bot {
        machine: Machine,
        store: Arc<MemoryStore>,
        directory: Directory,
        transcript: Arc<Transcript>,
    }

    impl Bot {
        fn new() -> Self {
            let directory = Directory::new();
            let mut router = Router::new();
            router.add("add", AlwaysInterrupt(AddUser::new(directory.clone()))).unwrap();
            router.add("list", ListUsers::new(directory.clone())).unwrap();

            let store = Arc::new(MemoryStore::new());
            Self {
                machine: Machine::new(Arc::new(router), store.clone()),
                store,
                directory,
                transcript: Arc::new(Transcript::default()),
            }
        }

        async fn say(&self, body: &str) {
            self.send(TextMessage::new("1", "chat", body)).await;
        }

        async fn send(&self, msg: TextMessage) {
            self.machine
                .handle(Request::new(Arc::new(msg), self.transcript.clone()))
                .await
                .unwrap();
        }

        async fn step(&self) -> Option<String> {
            self.store
                .get("chat")
                .await
                .ok()
                .map(|state| state.name().to_string())
        }

        fn last_answer_has_choice(&self) -> bool {
            self.transcript.last().choice.is_valid()
        }
    }

    #[tokio::test]
    async fn test_add_user_dialog() {
        let bot = Bot::new();

        for body in ["/add", "john", "john@example.com", "ext"] {
            bot.say(body).await;
        }
        assert_eq!(bot.step().await.as_deref(), Some("confirm"));
        assert!(bot.last_answer_has_choice());

        bot.say("yes").await;

        assert_eq!(
            bot.transcript.texts(),
            [
                "Enter user name",
                "Enter user email",
                "Select user type",
                "Save john <john@example.com> (ext)?",
                "User saved.",
            ]
        );
        assert_eq!(
            bot.directory.users(),
            [User {
                name: "john".into(),
                email: "john@example.com".into(),
                kind: "ext".into(),
            }]
        );
        assert!(bot.step().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_email_keeps_step() {
        let bot = Bot::new();

        for body in ["/add", "john", "not-an-email"] {
            bot.say(body).await;
        }

        assert_eq!(bot.transcript.texts().last().map(String::as_str), Some("Invalid email, try again."));
        assert_eq!(bot.step().await.as_deref(), Some("email"));
    }

    #[tokio::test]
    async fn test_declining_starts_over() {
        let bot = Bot::new();

        for body in ["/add", "john", "john@example.com", "int", "no"] {
            bot.say(body).await;
        }

        let texts = bot.transcript.texts();
        assert_eq!(&texts[texts.len() - 2..], ["Starting over.", "Enter user name"]);
        assert_eq!(bot.step().await.as_deref(), Some("name"));

        for body in ["jane", "jane@example.com", "int", "yes"] {
            bot.say(body).await;
        }
        assert_eq!(bot.directory.users()[0].name, "jane");
    }

    #[tokio::test]
    async fn test_change_name_button() {
        let bot = Bot::new();

        for body in ["/add", "john", "john@example.com", "int"] {
            bot.say(body).await;
        }
        let Button::Command { args, .. } = bot.transcript.last().buttons[0].clone();

        bot.send(TextMessage::new("2", "chat", "").with_args(args)).await;
        assert_eq!(bot.transcript.texts().last().map(String::as_str), Some("Enter new user name"));
        let state = bot.store.get("chat").await.unwrap();
        assert_eq!(state.name(), "rename-save");
        assert_eq!(state.get(USER_EMAIL), Some("john@example.com"));
        assert_eq!(state.get(USER_TYPE), Some("int"));

        bot.say("johnny").await;
        assert_eq!(
            bot.transcript.texts().last().map(String::as_str),
            Some("Save johnny <john@example.com> (int)?")
        );
        assert_eq!(bot.step().await.as_deref(), Some("confirm"));

        bot.say("yes").await;
        assert_eq!(
            bot.directory.users(),
            [User {
                name: "johnny".into(),
                email: "john@example.com".into(),
                kind: "int".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_list_interrupts_add() {
        let bot = Bot::new();

        for body in ["/add", "john", "/list"] {
            bot.say(body).await;
        }

        assert_eq!(bot.transcript.texts().last().map(String::as_str), Some("No users yet."));
        assert!(bot.step().await.is_none());
    }

    #[tokio::test]
    async fn test_list_users() {
        let bot = Bot::new();
        bot.say("/list").await;

        bot.directory.save(User {
            name: "john".into(),
            email: "john@example.com".into(),
            kind: "int".into(),
        });
        bot.say("/list").await;

        assert_eq!(
            bot.transcript.texts(),
            ["No users yet.", "1. john <john@example.com> (int)"]
        );
    }
}
