use crudify::{app, AppOptions, AppState, DocumentStore, MemoryStore, Registry};
use crudify_cli::prompt::parse_yes_no;
use crudify_cli::{ApiClient, CliError, Prompter, Session};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Answers prompts from a fixed script. `select` answers match a choice by prefix; an `input`
/// answer of `=` keeps the pre-filled text. Running out of answers reads as Ctrl-D.
struct Scripted {
    answers: VecDeque<&'static str>,
}

impl Scripted {
    fn new(answers: &[&'static str]) -> Self {
        Scripted {
            answers: answers.iter().copied().collect(),
        }
    }

    fn next(&mut self) -> Result<&'static str, CliError> {
        self.answers.pop_front().ok_or(CliError::Interrupted)
    }
}

impl Prompter for Scripted {
    fn input(&mut self, _message: &str, initial: &str) -> Result<String, CliError> {
        let answer = self.next()?;
        Ok(if answer == "=" { initial.to_string() } else { answer.to_string() })
    }

    fn select(&mut self, message: &str, choices: &[String]) -> Result<usize, CliError> {
        let answer = self.next()?;
        Ok(choices
            .iter()
            .position(|c| c.starts_with(answer))
            .unwrap_or_else(|| panic!("{}: no choice starting with '{}' in {:?}", message, answer, choices)))
    }

    fn confirm(&mut self, _message: &str, _default: bool) -> Result<bool, CliError> {
        let answer = self.next()?;
        Ok(parse_yes_no(answer).unwrap_or_else(|| panic!("not a yes/no answer: {}", answer)))
    }
}

async fn serve() -> ApiClient {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let registry = Registry::builtin();
    for descriptor in registry.resources() {
        store.ensure_collection(descriptor).await.unwrap();
    }
    let router = app(AppState::new(store, registry), &AppOptions::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    ApiClient::new(format!("http://{}", addr))
}

async fn run(client: ApiClient, answers: &[&'static str]) -> String {
    let resources = client.schemas().await.unwrap();
    let mut session =
        Session::new(client, resources, Scripted::new(answers), Vec::new()).with_rng(StdRng::seed_from_u64(7));
    session.run().await.unwrap();
    String::from_utf8(session.into_output()).unwrap()
}

#[tokio::test]
async fn full_crud_walkthrough() {
    let client = serve().await;
    let out = run(
        client.clone(),
        &[
            // create by hand, with one bad number first
            "User", "Create", "n", "John Doe", "John@Example.com", "thirty", "30", "1 Main St",
            "securePassword123", "=", "=",
            // create generated
            "User", "Create", "y",
            // filtered list
            "User", "List", "1", "10", "email=john@example.com",
            // update age only
            "User", "Update", "John Doe (", "=", "=", "31", "=", "=", "=", "=",
            // delete
            "User", "Delete", "John Doe (", "y",
            // back out of a pick
            "User", "Get by id", "Go back",
            "Exit",
        ],
    )
    .await;

    assert!(out.contains("age expects a number"), "{}", out);
    assert!(out.contains("User created"));
    assert!(out.contains("\"email\": \"john@example.com\""));
    assert!(out.contains("generated:"));
    assert!(out.contains("page 1 of 1 (1 users in total)"));
    assert!(out.contains("User updated"));
    assert!(out.contains("\"age\": 31"));
    assert!(out.contains("User deleted"));

    let remaining = client.list("users", &[]).await.unwrap();
    assert_eq!(remaining.total_documents, 1);
}

#[tokio::test]
async fn server_messages_are_shown_verbatim() {
    let client = serve().await;
    let out = run(client, &["User", "Create", "n", "", "", "", "", "", "", "", "Exit"]).await;
    assert!(out.contains("error: User validation failed: name is required"), "{}", out);
}

#[tokio::test]
async fn empty_collection_and_interrupt() {
    let client = serve().await;
    // Script ends mid-menu: the session stops cleanly.
    let out = run(client, &["Company", "Delete", "Company"]).await;
    assert!(out.contains("no companies found"), "{}", out);
}
