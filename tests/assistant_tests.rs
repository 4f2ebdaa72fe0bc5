use mahaguru::config::Config;
use mahaguru::llm::GatewayError;
use mahaguru::records::JsonlRecordLog;
use mahaguru::session::{FileSessionStore, SessionPhase};
use mahaguru::types::{ChatMessage, ReplyBody, UserAnswer};
use mahaguru::{AssistantError, QueryClassification, StudyAssistant};
use std::sync::Arc;
use tempfile::TempDir;

use test_utils::{HeldGateway, MockDataBuilder, ScriptedGateway};

const ML_QUERY: &str = "I want to learn machine learning";

fn two_question_round() -> String {
    MockDataBuilder::refinement_json(&[
        "Are you a beginner or do you have prior experience?",
        "Do you prefer videos or reading?",
    ])
}

#[tokio::test]
async fn test_greeting_takes_direct_path() {
    let gateway = ScriptedGateway::replying(&["  Hello! What would you like to learn today?  "]);
    let assistant = MockDataBuilder::assistant(gateway.clone());

    let reply = assistant.handle_message("hi", &[]).await.expect("valid input");

    match reply.body {
        ReplyBody::DirectResponse {
            bot_message,
            source,
            classification,
            refinement_data,
        } => {
            assert_eq!(bot_message, "Hello! What would you like to learn today?");
            assert_eq!(source, "scripted/test");
            assert_eq!(classification, QueryClassification::Simple);
            assert!(refinement_data.is_none());
        }
        ReplyBody::RefinementNeeded { .. } => panic!("greeting must not be refined"),
    }
    assert!(reply.success);
    assert_eq!(gateway.call_count(), 1);
    assert!(gateway.requests()[0].prompt.ends_with("Student: hi\n\nTeacher:"));
}

#[tokio::test]
async fn test_direct_answer_replays_recent_history_only() {
    let gateway = ScriptedGateway::replying(&["Sure."]);
    let assistant = MockDataBuilder::assistant(gateway.clone());
    let history: Vec<ChatMessage> = (1..=7)
        .map(|i| ChatMessage::user(format!("message {i}")))
        .collect();

    assistant
        .direct_answer("and then?", &history)
        .await
        .expect("valid input");

    let prompt = &gateway.requests()[0].prompt;
    assert!(!prompt.contains("message 2\n"));
    assert!(prompt.contains("User: message 3\n"));
    assert!(prompt.contains("User: message 7\n"));
}

#[tokio::test]
async fn test_direct_answer_falls_back_on_failure() {
    let gateway = ScriptedGateway::failing(GatewayError::EmptyResponse);
    let assistant = MockDataBuilder::assistant(gateway);

    let answer = assistant.direct_answer("hi", &[]).await.expect("valid input");

    assert!(answer.fallback);
    assert!(answer.text.starts_with("I apologize"));
}

#[tokio::test]
async fn test_blank_query_is_invalid_input() {
    let gateway = ScriptedGateway::replying(&[]);
    let assistant = MockDataBuilder::assistant(gateway.clone());

    let error = assistant.handle_message("   \n\t", &[]).await.expect_err("blank query");

    assert!(matches!(error, AssistantError::InvalidInput(_)));
    assert!(error.is_client_error());
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn test_overlong_query_is_invalid_input() {
    let mut config = Config::default();
    config.runtime.max_query_chars = 10;
    let assistant = StudyAssistant::new(ScriptedGateway::replying(&[]), &config);

    let error = assistant
        .refine("teach me everything about compilers")
        .await
        .expect_err("too long");

    assert!(matches!(error, AssistantError::InvalidInput(_)));
}

#[tokio::test]
async fn test_clear_complex_query_is_answered_with_round_attached() {
    let gateway = ScriptedGateway::replying(&[
        &MockDataBuilder::refinement_json(&[]),
        "Start with linear regression.",
    ]);
    let assistant = MockDataBuilder::assistant(gateway);

    let reply = assistant.handle_message(ML_QUERY, &[]).await.expect("valid input");

    let ReplyBody::DirectResponse {
        bot_message,
        classification,
        refinement_data,
        ..
    } = reply.body
    else {
        panic!("clear query goes to the direct path");
    };
    assert_eq!(bot_message, "Start with linear regression.");
    assert_eq!(classification, QueryClassification::Complex);
    assert!(refinement_data.is_some_and(|round| !round.needs_refinement));
}

#[tokio::test]
async fn test_full_session_produces_one_package() {
    let gateway = ScriptedGateway::replying(&[
        &two_question_round(),
        &MockDataBuilder::clear_json(),
        &MockDataBuilder::package_json("Beginner machine learning course with videos", 0.85),
    ]);
    let assistant = MockDataBuilder::assistant(gateway.clone());

    let reply = assistant.handle_message(ML_QUERY, &[]).await.expect("valid input");
    let session_id = reply.session_id().expect("refinement opens a session");

    let continued = assistant
        .continue_session(
            session_id,
            vec![
                UserAnswer::new("q_1", "Complete beginner"),
                UserAnswer::new("q_2", "Videos"),
            ],
        )
        .await
        .expect("known session");

    assert!(!continued.needs_refinement);
    let package = continued.final_package.expect("dialogue finished");
    assert_eq!(package.refinement_rounds, 2);
    assert_eq!(
        package.conversation_history[0].question,
        "Are you a beginner or do you have prior experience?"
    );
    assert_eq!(package.conversation_history[1].answer, "Videos");

    let session = assistant.session(session_id).expect("session kept");
    assert_eq!(session.phase, SessionPhase::Done);

    let again = assistant
        .continue_session(session_id, vec![UserAnswer::new("q_1", "Actually advanced")])
        .await
        .expect_err("finished session");
    assert!(matches!(again, AssistantError::SessionClosed(id) if id == session_id));
    assert_eq!(gateway.call_count(), 3);
}

#[tokio::test]
async fn test_unknown_question_id_is_rejected() {
    let gateway = ScriptedGateway::replying(&[&two_question_round()]);
    let assistant = MockDataBuilder::assistant(gateway.clone());
    let reply = assistant.handle_message(ML_QUERY, &[]).await.expect("valid input");
    let session_id = reply.session_id().expect("refinement opens a session");

    let error = assistant
        .continue_session(session_id, vec![UserAnswer::new("q_9", "whatever")])
        .await
        .expect_err("unknown id");

    assert!(matches!(error, AssistantError::UnknownQuestion(ref id) if id == "q_9"));
    assert_eq!(assistant.session(session_id).expect("kept").rounds_completed, 0);
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_blank_only_answers_leave_session_untouched() {
    let gateway = ScriptedGateway::replying(&[&two_question_round()]);
    let assistant = MockDataBuilder::assistant(gateway.clone());
    let reply = assistant.handle_message(ML_QUERY, &[]).await.expect("valid input");
    let session_id = reply.session_id().expect("refinement opens a session");

    let error = assistant
        .continue_session(
            session_id,
            vec![UserAnswer::new("q_1", "   "), UserAnswer::new("q_2", "\t\n")],
        )
        .await
        .expect_err("nothing to record");

    assert!(matches!(error, AssistantError::InvalidInput(_)));
    assert!(error.is_client_error());
    let session = assistant.session(session_id).expect("kept");
    assert_eq!(session.rounds_completed, 0);
    assert!(session.answers.is_empty());
    assert_eq!(session.phase, SessionPhase::AwaitingAnswers);
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_concurrent_continuation_of_one_session_is_busy() {
    let gateway = HeldGateway::replying(&[
        &two_question_round(),
        &MockDataBuilder::clear_json(),
        &MockDataBuilder::package_json("Refined", 0.8),
    ]);
    let assistant = StudyAssistant::new(gateway.clone(), &MockDataBuilder::config());
    let reply = assistant.handle_message(ML_QUERY, &[]).await.expect("valid input");
    let session_id = reply.session_id().expect("refinement opens a session");

    gateway.hold();
    let first = assistant.continue_session(session_id, vec![UserAnswer::new("q_1", "Beginner")]);
    let second = async {
        gateway.entered.notified().await;
        let result = assistant
            .continue_session(session_id, vec![UserAnswer::new("q_2", "Videos")])
            .await;
        gateway.release();
        result
    };
    let (first, second) = tokio::join!(first, second);

    let error = second.expect_err("session already in flight");
    assert!(matches!(error, AssistantError::SessionBusy(id) if id == session_id));
    let package = first
        .expect("first continuation completes")
        .final_package
        .expect("finalized");
    assert_eq!(package.conversation_history.len(), 1);
    assert_eq!(gateway.call_count(), 3);

    let after = assistant
        .continue_session(session_id, vec![UserAnswer::new("q_2", "Videos")])
        .await
        .expect_err("claim released, session finished");
    assert!(matches!(after, AssistantError::SessionClosed(_)));
}

#[tokio::test]
async fn test_missing_session_is_reported() {
    let assistant = MockDataBuilder::assistant(ScriptedGateway::replying(&[]));
    let id = uuid::Uuid::new_v4();

    let error = assistant
        .continue_session(id, vec![UserAnswer::new("q_1", "yes")])
        .await
        .expect_err("no such session");

    assert!(matches!(error, AssistantError::SessionNotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_stateless_continuation_records_package() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let log_path = dir.path().join("records").join("refinements.jsonl");
    let log = Arc::new(JsonlRecordLog::new(&log_path).expect("log created"));
    let gateway = ScriptedGateway::replying(&[
        &MockDataBuilder::clear_json(),
        &MockDataBuilder::package_json("Refined ML request", 0.9),
    ]);
    let assistant = MockDataBuilder::assistant(gateway).with_record_sink(log.clone());

    let reply = assistant
        .continue_refinement(
            ML_QUERY,
            &[
                UserAnswer::new("q_1", "beginner"),
                UserAnswer::new("q_2", "videos"),
            ],
            1,
        )
        .await
        .expect("valid input");

    let package = reply.final_package.expect("finalized");
    assert_eq!(package.refinement_rounds, 2);
    assert_eq!(package.conversation_history.len(), 2);

    let records = log.read_all().expect("readable log");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].refined_query, "Refined ML request");
    assert!(records[0].session_id.is_none());
}

#[tokio::test]
async fn test_stateless_round_count_above_cap_is_clamped() {
    let gateway = ScriptedGateway::replying(&[&MockDataBuilder::package_json("Refined", 0.8)]);
    let assistant = MockDataBuilder::assistant(gateway.clone());
    let max_rounds = MockDataBuilder::config().refinement.max_rounds;

    let reply = assistant
        .continue_refinement("learn rust", &[UserAnswer::new("q_1", "beginner")], 9)
        .await
        .expect("valid input");

    let package = reply.final_package.expect("finalized at the cap");
    assert_eq!(package.refinement_rounds, max_rounds);
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_stateless_continuation_requires_an_answered_round() {
    let gateway = ScriptedGateway::replying(&[&MockDataBuilder::refinement_json(&["Which level?"])]);
    let assistant = MockDataBuilder::assistant(gateway.clone());

    let error = assistant
        .continue_refinement("learn rust", &[UserAnswer::new("q_1", "beginner")], 0)
        .await
        .expect_err("no round answered yet");

    assert!(matches!(error, AssistantError::InvalidInput(_)));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn test_sessions_survive_in_file_store() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let config = MockDataBuilder::config();
    let store = Arc::new(FileSessionStore::new(dir.path()).expect("store created"));

    let first = StudyAssistant::new(ScriptedGateway::replying(&[&two_question_round()]), &config)
        .with_session_store(store.clone());
    let reply = first.handle_message(ML_QUERY, &[]).await.expect("valid input");
    let session_id = reply.session_id().expect("refinement opens a session");
    drop(first);

    let second = StudyAssistant::new(
        ScriptedGateway::replying(&[
            &MockDataBuilder::clear_json(),
            &MockDataBuilder::package_json("Refined", 0.8),
        ]),
        &config,
    )
    .with_session_store(store);
    let continued = second
        .continue_session(session_id, vec![UserAnswer::new("q_2", "Reading")])
        .await
        .expect("session found on disk");

    let package = continued.final_package.expect("finalized");
    assert_eq!(package.conversation_history[0].question, "Do you prefer videos or reading?");
}

#[tokio::test]
async fn test_chat_reply_wire_format() {
    let gateway = ScriptedGateway::replying(&[&two_question_round()]);
    let assistant = MockDataBuilder::assistant(gateway);

    let reply = assistant.handle_message(ML_QUERY, &[]).await.expect("valid input");
    let json = serde_json::to_value(&reply).expect("serializable");

    assert_eq!(json["response_type"], "refinement_needed");
    assert_eq!(json["success"], true);
    assert!(json["timestamp"].is_string());
    assert_eq!(json["refinement_data"]["suggestions"][1]["question_id"], "q_2");
}
