use dspy_runner::{
    CompletionProvider, CompletionRequest, ConfigError, LM, LMClient, LMConfig, Message,
    ModelConfig, TransportConfig,
};
use rstest::*;

#[rstest]
fn test_lm_config_defaults() {
    let config = LMConfig::default();

    assert_eq!(config.model, "gpt-4o-mini");
    assert_eq!(config.temperature, 0.7);
    assert_eq!(config.max_tokens, 512);
    assert!(config.use_structured);

    let transport = TransportConfig::default();
    assert_eq!(transport.timeout().as_secs(), 600);
    assert_eq!(transport.connect_timeout().as_secs(), 10);
    assert_eq!(transport.max_idle_connections, 0);
}

#[rstest]
fn test_local_backend_from_config() {
    let model = ModelConfig {
        provider: Some("local".to_string()),
        base_url: Some("http://127.0.0.1:8000/v1".to_string()),
        lm: LMConfig::builder().model("qwen2.5-7b".to_string()).build(),
        ..Default::default()
    };

    let lm = LM::from_config(&model).unwrap();

    assert!(matches!(lm.client, LMClient::OpenAI(_)));
    assert_eq!(lm.config.model, "qwen2.5-7b");
}

#[rstest]
fn test_local_backend_without_base_url() {
    let model = ModelConfig {
        provider: Some("local".to_string()),
        ..Default::default()
    };

    assert!(matches!(
        LM::from_config(&model),
        Err(ConfigError::MissingBaseUrl { .. })
    ));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_dummy_client_echoes_last_user_turn() {
    let model = ModelConfig {
        provider: Some("dummy".to_string()),
        ..Default::default()
    };
    let lm = LM::from_config(&model).unwrap();

    let request = CompletionRequest::builder()
        .model(lm.config.model.clone())
        .messages(vec![
            Message::system("You are a helpful assistant."),
            Message::user("Hello, world!"),
        ])
        .temperature(lm.config.temperature)
        .max_tokens(lm.config.max_tokens)
        .build();

    let response = lm.client.complete(request).await.unwrap();

    assert_eq!(response.message.content(), "Hello, world!");
    assert_eq!(response.usage.total_tokens, 0);
}
