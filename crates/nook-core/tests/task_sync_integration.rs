//! Task import against a mock task API.

use std::rc::Rc;

use chrono::DateTime;
use nook_core::state::{NewTask, Task};
use nook_core::{App, Event, ManualClock, MemoryStore, SyncError};

fn app() -> App {
    let kv = Rc::new(MemoryStore::new());
    let clock = Rc::new(ManualClock::new(
        DateTime::parse_from_rfc3339("2026-02-16T12:00:00+00:00").unwrap(),
    ));
    App::new(kv, clock)
}

const SECTIONS: &str = r#"[{"id":"s1","name":"Study"},{"id":"s2","name":"Errands"}]"#;

const TASKS: &str = r#"[
    {"id":"6","content":"Finish slides","priority":2,"is_completed":false,"section_id":null},
    {"id":"8","content":"Review PR /work today","priority":4,"is_completed":false},
    {"id":"9","content":"Flashcards","priority":1,"section_id":"s1",
     "due":{"date":"2026-02-18"}},
    {"id":"10","content":"Buy stamps","section_id":"s2"}
]"#;

async fn mock_api(server: &mut mockito::ServerGuard, tasks: &str) -> (mockito::Mock, mockito::Mock) {
    let sections = server
        .mock("GET", "/sections")
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SECTIONS)
        .create_async()
        .await;
    let tasks = server
        .mock("GET", "/tasks")
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(tasks)
        .create_async()
        .await;
    (sections, tasks)
}

#[tokio::test]
async fn test_sync_keeps_completed_local_task_missing_remotely() {
    let mut server = mockito::Server::new_async().await;
    let (sections, tasks) = mock_api(&mut server, TASKS).await;

    let app = app();
    app.set_token("secret").unwrap();
    app.tasks.set_state(|t| {
        let mut seven = Task::new("7", "Finish slides");
        seven.completed = true;
        seven.completed_pomos = 3;
        t.tasks.push(seven);
        t.tasks.push(Task::new("99", "deleted remotely"));
    });

    let event = app.sync_now(&server.url()).await.unwrap();
    sections.assert_async().await;
    tasks.assert_async().await;
    assert!(matches!(event, Event::TasksSynced { fetched: 4, total: 5, .. }));

    app.tasks.with_state(|t| {
        assert!(!t.is_syncing);
        assert!(t.find("99").is_none());

        let seven = t.find("7").unwrap();
        assert!(seven.completed);
        assert_eq!(seven.completed_pomos, 3);
        assert_eq!(t.find("6").unwrap().priority, 2);

        let eight = t.find("8").unwrap();
        assert_eq!(eight.category, "work");
        assert_eq!(eight.text, "Review PR today");

        let nine = t.find("9").unwrap();
        assert_eq!(nine.category, "Study");
        assert_eq!(nine.due_date.as_deref(), Some("2026-02-18"));

        assert_eq!(t.find("10").unwrap().category, "General");
        assert_eq!(t.todoist_sections.get("Study").map(String::as_str), Some("s1"));
    });
}

#[tokio::test]
async fn test_locally_added_task_survives_sync() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_api(&mut server, "[]").await;

    let app = app();
    app.set_token("secret").unwrap();
    let id = app
        .add_task(NewTask {
            text: "offline idea".into(),
            ..NewTask::default()
        })
        .unwrap();

    app.sync_now(&server.url()).await.unwrap();
    app.tasks.with_state(|t| {
        let task = t.find(&id).unwrap();
        assert!(task.is_syncing);
        assert_eq!(t.tasks.len(), 1);
    });
}

#[tokio::test]
async fn test_failed_poll_releases_in_flight_flag() {
    let mut server = mockito::Server::new_async().await;
    let _tasks = server
        .mock("GET", "/tasks")
        .with_status(503)
        .create_async()
        .await;

    let app = app();
    app.set_token("secret").unwrap();
    app.tasks.set_state(|t| t.tasks.push(Task::new("1", "keep me")));

    match app.sync_now(&server.url()).await.unwrap() {
        Event::SyncFailed { message, .. } => assert!(message.contains("503")),
        other => panic!("expected SyncFailed, got {other:?}"),
    }
    app.tasks.with_state(|t| {
        assert!(!t.is_syncing);
        assert_eq!(t.tasks.len(), 1);
    });
}

#[tokio::test]
async fn test_sync_requires_token_and_rejects_overlap() {
    let app = app();
    assert!(matches!(
        app.sync_now("http://127.0.0.1:9").await,
        Err(SyncError::MissingToken)
    ));

    app.set_token("secret").unwrap();
    let _client = app.begin_sync("http://127.0.0.1:9").unwrap();
    assert!(matches!(
        app.begin_sync("http://127.0.0.1:9"),
        Err(SyncError::AlreadyRunning)
    ));
}

#[tokio::test]
async fn test_sections_outage_keeps_last_known_sections() {
    let mut server = mockito::Server::new_async().await;
    let (sections, _tasks) = mock_api(&mut server, TASKS).await;

    let app = app();
    app.set_token("secret").unwrap();
    app.sync_now(&server.url()).await.unwrap();
    sections.remove_async().await;
    let _outage = server
        .mock("GET", "/sections")
        .with_status(500)
        .create_async()
        .await;

    let event = app.sync_now(&server.url()).await.unwrap();
    assert!(matches!(event, Event::TasksSynced { fetched: 4, .. }));
    app.tasks.with_state(|t| {
        assert_eq!(t.todoist_sections.len(), 2);
        assert_eq!(t.todoist_sections.get("Errands").map(String::as_str), Some("s2"));
        assert_eq!(t.find("9").unwrap().category, "Study");
    });
}
