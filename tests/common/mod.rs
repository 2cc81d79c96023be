use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quantum_chat::config::ApiConfig;

/// Path the mock completion endpoint listens on
#[allow(dead_code)]
pub const COMPLETIONS_PATH: &str = "/openai/v1/chat/completions";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// API configuration pointing at a mock server
#[allow(dead_code)]
pub fn api_config_for(server: &MockServer) -> ApiConfig {
    ApiConfig {
        endpoint: format!("{}{}", server.uri(), COMPLETIONS_PATH),
        ..ApiConfig::default()
    }
}

/// Body of a successful completion carrying `content`
#[allow(dead_code)]
pub fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// Mount a completion endpoint that always answers `content`
#[allow(dead_code)]
pub async fn mount_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(server)
        .await;
}
