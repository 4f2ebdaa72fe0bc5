use mahaguru::agents::{ContinuationOutcome, PackageFinalizer, RefinementAgent, RefinementContinuation};
use mahaguru::config::RefinementConfig;
use mahaguru::llm::GatewayError;
use mahaguru::types::{ConversationTurn, UserAnswer};

use test_utils::{MockDataBuilder, ScriptedGateway};

fn refiner(gateway: &std::sync::Arc<ScriptedGateway>) -> RefinementAgent {
    RefinementAgent::new(gateway.clone(), RefinementConfig::default())
}

fn continuation(gateway: &std::sync::Arc<ScriptedGateway>) -> RefinementContinuation {
    RefinementContinuation::new(gateway.clone(), RefinementConfig::default())
}

fn two_answers() -> Vec<UserAnswer> {
    vec![
        UserAnswer::new("q_1", "Complete beginner"),
        UserAnswer::new("q_2", "Video tutorials"),
    ]
}

#[tokio::test]
async fn test_refine_numbers_suggestions_for_round_one() {
    let response = MockDataBuilder::fenced(&MockDataBuilder::refinement_json(&[
        "Are you a beginner or do you have prior experience?",
        "Do you prefer videos or reading?",
    ]));
    let gateway = ScriptedGateway::replying(&[&response]);

    let round = refiner(&gateway)
        .refine("I want to learn machine learning")
        .await;

    assert!(round.needs_refinement);
    assert_eq!(round.round, 1);
    assert_eq!(round.original_query, "I want to learn machine learning");
    let ids: Vec<_> = round.suggestions.iter().map(|s| s.question_id.as_str()).collect();
    assert_eq!(ids, ["q_1", "q_2"]);

    let requests = gateway.requests();
    assert_eq!(requests.len(), 1);
    assert!((requests[0].temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(requests[0].max_tokens, 500);
    assert!(requests[0].prompt.contains("I want to learn machine learning"));
}

#[tokio::test]
async fn test_refine_degrades_on_malformed_json() {
    let gateway = ScriptedGateway::replying(&["{\"needs_refinement\": tru"]);

    let round = refiner(&gateway).refine("I want to learn machine learning").await;

    assert!(!round.needs_refinement);
    assert!(round.suggestions.is_empty());
    assert_eq!(round.reasoning, "Unable to parse refinement suggestions");
}

#[tokio::test]
async fn test_refine_accepts_null_reasoning() {
    let gateway = ScriptedGateway::replying(&[
        r#"{"needs_refinement": true, "suggestions": [{"text": "Which level are you at?", "adds": "level"}], "reasoning": null}"#,
    ]);

    let round = refiner(&gateway).refine("I want to learn machine learning").await;

    assert!(round.needs_refinement);
    assert_eq!(round.suggestions[0].question_id, "q_1");
    assert_ne!(round.reasoning, "Unable to parse refinement suggestions");
    assert!(!round.reasoning.is_empty());
}

#[tokio::test]
async fn test_refine_degrades_on_missing_decision_field() {
    let gateway = ScriptedGateway::replying(&["{\"suggestions\": [], \"reasoning\": \"hmm\"}"]);

    let round = refiner(&gateway).refine("teach me chemistry").await;

    assert!(!round.needs_refinement);
    assert_eq!(round.reasoning, "Unable to parse refinement suggestions");
}

#[tokio::test]
async fn test_refine_degrades_on_provider_error() {
    let gateway = ScriptedGateway::failing(GatewayError::ProviderError(
        "rate limited by upstream".to_string(),
    ));

    let round = refiner(&gateway).refine("teach me chemistry").await;

    assert!(!round.needs_refinement);
    assert!(round.suggestions.is_empty());
    assert!(round.reasoning.starts_with("Technical error:"));
    assert!(round.reasoning.contains("rate limited"));
}

#[tokio::test]
async fn test_refine_degrades_on_empty_response() {
    let gateway = ScriptedGateway::failing(GatewayError::EmptyResponse);

    let round = refiner(&gateway).refine("teach me chemistry").await;

    assert!(!round.needs_refinement);
    assert!(!round.reasoning.is_empty());
}

#[tokio::test]
async fn test_continue_finalizes_when_model_is_satisfied() {
    let gateway = ScriptedGateway::replying(&[
        &MockDataBuilder::clear_json(),
        &MockDataBuilder::package_json("Learn machine learning as a beginner through videos", 0.9),
    ]);

    let outcome = continuation(&gateway)
        .continue_refinement("I want to learn machine learning", &two_answers(), &[], 1)
        .await;

    let ContinuationOutcome::Finalized(package) = outcome else {
        panic!("expected a final package");
    };
    assert_eq!(package.refinement_rounds, 2);
    assert_eq!(package.conversation_history.len(), 2);
    assert_eq!(package.conversation_history[0].question, "Question q_1");
    assert_eq!(
        package.refined_query,
        "Learn machine learning as a beginner through videos"
    );
    assert!((package.confidence - 0.9).abs() < 1e-6);
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn test_continue_forces_finalization_at_round_cap() {
    // The model keeps asking; the cap must win
    let gateway = ScriptedGateway::replying(&[
        &MockDataBuilder::refinement_json(&["One more thing?"]),
        &MockDataBuilder::package_json("Refined", 0.8),
    ]);

    let outcome = continuation(&gateway)
        .continue_refinement("learn rust", &two_answers(), &[], 1)
        .await;

    assert!(outcome.is_final());
}

#[tokio::test]
async fn test_continue_at_max_rounds_skips_the_decision_call() {
    let gateway = ScriptedGateway::replying(&[&MockDataBuilder::package_json("Refined", 0.8)]);

    let outcome = continuation(&gateway)
        .continue_refinement("learn rust", &two_answers(), &[], 2)
        .await;

    let ContinuationOutcome::Finalized(package) = outcome else {
        panic!("expected a final package");
    };
    assert_eq!(package.refined_query, "Refined");
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_continue_asks_again_below_cap() {
    let config = RefinementConfig {
        max_rounds: 3,
        ..RefinementConfig::default()
    };
    let gateway = ScriptedGateway::replying(&[&MockDataBuilder::refinement_json(&[
        "Which framework do you prefer?",
    ])]);

    let outcome = RefinementContinuation::new(gateway.clone(), config)
        .continue_refinement("learn machine learning", &two_answers(), &[], 1)
        .await;

    let ContinuationOutcome::MoreQuestions(round) = outcome else {
        panic!("expected another round");
    };
    assert_eq!(round.round, 2);
    assert_eq!(round.suggestions[0].question_id, "followup_2_1");
}

#[tokio::test]
async fn test_continue_failure_still_produces_package() {
    let gateway = ScriptedGateway::new(vec![
        Err(GatewayError::ProviderError("connection reset".to_string())),
        Err(GatewayError::EmptyResponse),
    ]);

    let outcome = continuation(&gateway)
        .continue_refinement("learn machine learning", &two_answers(), &[], 1)
        .await;

    let ContinuationOutcome::Finalized(package) = outcome else {
        panic!("expected a final package");
    };
    assert_eq!(package.refined_query, "learn machine learning");
    assert!(package.requirements.is_empty());
    assert_eq!(package.tags, ["general"]);
    assert!((package.confidence - 0.7).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_finalize_clamps_confidence() {
    let gateway = ScriptedGateway::replying(&[&MockDataBuilder::package_json("Refined", 7.5)]);
    let finalizer = PackageFinalizer::new(gateway.clone(), RefinementConfig::default());
    let turns = vec![ConversationTurn {
        question_id: "q_1".to_string(),
        question: "Level?".to_string(),
        answer: "beginner".to_string(),
    }];

    let package = finalizer.finalize("learn rust", turns, "", 2).await;

    assert!((package.confidence - 1.0).abs() < f32::EPSILON);
    assert_eq!(package.requirements, ["beginner level", "video format"]);
}

#[tokio::test]
async fn test_finalize_fallback_tags_academic_queries() {
    let gateway = ScriptedGateway::replying(&["no json here"]);
    let finalizer = PackageFinalizer::new(gateway.clone(), RefinementConfig::default());
    let before = chrono::Utc::now();

    let package = finalizer
        .finalize("help me study for my physics exam", Vec::new(), "", 1)
        .await;

    assert_eq!(package.refined_query, "help me study for my physics exam");
    assert_eq!(package.tags, ["academic"]);
    assert!((0.0..=1.0).contains(&package.confidence));
    assert!(package.timestamp >= before);
    assert!(!package.reasoning.is_empty());
}
