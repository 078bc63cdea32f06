// Common test utilities and fixtures
#![allow(dead_code)]

use filebot_cli::config::Config;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::net::TcpListener;
use warp::http::StatusCode;
use warp::Filter;

static INIT: Once = Once::new();

/// Initialize test environment
pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Config pointing at a mock server, with fast failure settings.
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.api.api_key = Some("test-key".to_string());
    config.api.model = "test-model".to_string();
    config.api.base_url = base_url.to_string();
    config.api.timeout_secs = 1;
    config.api.max_retries = 0;
    config.api.retry_backoff_ms = 0;
    config
}

pub fn touch(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Mock responses for testing
pub mod mock_responses {
    use serde_json::{json, Value};

    pub fn tool_call(name: &str, arguments: Value) -> Value {
        json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": name,
                            "arguments": arguments.to_string()
                        }
                    }]
                }
            }]
        })
    }

    pub fn find_files(extension: &str) -> Value {
        tool_call("find_files", json!({ "file_extension": extension }))
    }

    pub fn organize_files(extension: &str, folder: &str) -> Value {
        tool_call(
            "organize_files",
            json!({ "file_extension": extension, "target_folder_name": folder }),
        )
    }

    pub fn text(content: &str) -> Value {
        json!({
            "choices": [{
                "message": { "role": "assistant", "content": content }
            }]
        })
    }

    pub fn error(message: &str) -> Value {
        json!({
            "error": {
                "message": message,
                "type": "authentication_error"
            }
        })
    }
}

#[derive(Clone, Debug)]
pub enum MockReply {
    Json(Value),
    Status(u16, Value),
    Delayed(Duration, Value),
}

/// Chat-completions server that hands out queued replies in order and records
/// every request body it receives.
pub struct MockModelServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockModelServer {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let replies = Arc::new(Mutex::new(VecDeque::from(replies)));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let chat_completions = warp::path!("v1" / "chat" / "completions")
            .and(warp::post())
            .and(warp::body::json())
            .and_then(move |request: Value| {
                let replies = replies.clone();
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push(request);
                    let next = replies.lock().unwrap().pop_front();
                    let (status, body) = match next {
                        Some(MockReply::Json(body)) => (200, body),
                        Some(MockReply::Status(status, body)) => (status, body),
                        Some(MockReply::Delayed(delay, body)) => {
                            tokio::time::sleep(delay).await;
                            (200, body)
                        }
                        None => (200, mock_responses::text("No more scripted replies.")),
                    };
                    let status = StatusCode::from_u16(status).unwrap();
                    Ok::<_, warp::Rejection>(warp::reply::with_status(
                        warp::reply::json(&body),
                        status,
                    ))
                }
            });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            warp::serve(chat_completions)
                .run_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
                .await;
        });

        Self {
            base_url: format!("http://{}/v1", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn user_messages(request: &Value) -> Vec<String> {
    request["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter(|m| m["role"] == json!("user"))
                .filter_map(|m| m["content"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
