use chrono::Duration;
use mahaguru::session::{
    FileSessionStore, InMemorySessionStore, RefinementSession, SessionStore,
};
use mahaguru::types::{RefinementRound, RefinementSuggestion};
use tempfile::TempDir;

fn open_session() -> RefinementSession {
    RefinementSession::open(&RefinementRound {
        needs_refinement: true,
        suggestions: vec![RefinementSuggestion {
            question_id: "q_1".to_string(),
            text: "Which exam board?".to_string(),
            adds: "syllabus".to_string(),
        }],
        reasoning: "Board not specified".to_string(),
        original_query: "help me prepare for my maths exam".to_string(),
        round: 1,
    })
}

fn exercise_store(store: &dyn SessionStore) {
    let session = open_session();
    store.save(&session).expect("Failed to save session");

    let loaded = store
        .load(session.id)
        .expect("Failed to load session")
        .expect("session should exist");
    assert_eq!(loaded, session);

    let mut stale = open_session();
    stale.updated_at -= Duration::hours(3);
    store.save(&stale).expect("Failed to save session");

    let purged = store
        .purge_expired(Duration::minutes(60))
        .expect("Failed to purge");
    assert_eq!(purged, 1);
    assert!(store.load(stale.id).expect("load works").is_none());
    assert!(store.load(session.id).expect("load works").is_some());

    store.remove(session.id).expect("Failed to remove session");
    assert!(store.load(session.id).expect("load works").is_none());
    store.remove(session.id).expect("removing twice is fine");
}

#[test]
fn test_in_memory_store_lifecycle() {
    let store = InMemorySessionStore::new();
    exercise_store(&store);
    assert!(store.is_empty());
}

#[test]
fn test_file_store_lifecycle() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let store = FileSessionStore::new(dir.path().join("sessions")).expect("store created");
    exercise_store(&store);
}

#[test]
fn test_file_store_leaves_no_temp_files() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let store = FileSessionStore::new(dir.path()).expect("store created");
    let session = open_session();
    store.save(&session).expect("Failed to save session");

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("readable dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, [format!("{}.json", session.id)]);
}
