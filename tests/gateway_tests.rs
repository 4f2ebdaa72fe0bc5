use async_trait::async_trait;
use mahaguru::config::Config;
use mahaguru::llm::{
    DevModeGateway, GatewayError, GenerationRequest, LanguageModelGateway, TimeoutGateway,
    build_gateway,
};
use std::sync::Arc;
use std::time::Duration;

struct SlowGateway;

#[async_trait]
impl LanguageModelGateway for SlowGateway {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GatewayError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".to_string())
    }

    fn model_label(&self) -> String {
        "slow".to_string()
    }
}

#[tokio::test]
async fn test_timeout_becomes_provider_error() {
    let gateway = TimeoutGateway::new(Arc::new(SlowGateway), Duration::from_millis(20));

    let result = gateway.generate(&GenerationRequest::new("hello")).await;

    assert!(matches!(result, Err(GatewayError::ProviderError(ref msg)) if msg.contains("timed out")));
    assert_eq!(gateway.model_label(), "slow");
}

#[tokio::test]
async fn test_dev_mode_echoes_prompt_tail() {
    let prompt = format!("{}END", "x".repeat(500));
    let reply = DevModeGateway
        .generate(&GenerationRequest::new(prompt))
        .await
        .expect("dev mode never fails");

    assert!(reply.starts_with("[DEV MODE] Echo: "));
    assert!(reply.ends_with("END"));
    assert_eq!(reply.chars().count(), "[DEV MODE] Echo: ".len() + 120);
}

#[test]
fn test_build_gateway_in_dev_mode_needs_no_key() {
    let mut config = Config::default();
    config.runtime.dev_mode = true;
    let gateway = build_gateway(&config).expect("dev gateway");
    assert_eq!(gateway.model_label(), "dev-mode");
}

#[test]
fn test_request_builder_sets_parameters() {
    let request = GenerationRequest::new("p")
        .with_temperature(0.2)
        .with_max_tokens(42);
    assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    assert_eq!(request.max_tokens, 42);
}
