use mahaguru::classifier::{QueryClassification, QueryClassifier};

#[test]
fn test_learning_intent_dominates_greetings_and_length() {
    let classifier = QueryClassifier::new();
    for query in [
        "hi, teach me calculus",
        "Hello! explain recursion",
        "learn",
        "thanks, how do I prepare for my exam tomorrow and the day after",
    ] {
        assert_eq!(
            classifier.classify(query),
            QueryClassification::Complex,
            "{query} should be complex"
        );
    }
}

#[test]
fn test_greetings_are_simple() {
    let classifier = QueryClassifier::new();
    assert_eq!(classifier.classify("hi"), QueryClassification::Simple);
    assert_eq!(
        classifier.classify("Good morning to you and everyone in the class today"),
        QueryClassification::Simple
    );
}

#[test]
fn test_short_queries_without_intent_are_simple() {
    let classifier = QueryClassifier::new();
    assert_eq!(classifier.classify("what is photosynthesis"), QueryClassification::Simple);
    assert_eq!(classifier.classify("capital of France?"), QueryClassification::Simple);
}

#[test]
fn test_long_queries_without_keywords_fail_open_to_complex() {
    let classifier = QueryClassifier::new();
    assert_eq!(
        classifier.classify("what are the main causes of the French revolution overall"),
        QueryClassification::Complex
    );
}

#[test]
fn test_matching_is_case_insensitive() {
    let classifier = QueryClassifier::new();
    assert_eq!(classifier.classify("TEACH ME RUST"), QueryClassification::Complex);
    assert_eq!(classifier.classify("HELLO"), QueryClassification::Simple);
}

#[test]
fn test_classification_serializes_lowercase() {
    let json = serde_json::to_string(&QueryClassification::Complex).expect("serializable");
    assert_eq!(json, "\"complex\"");
}
