use async_trait::async_trait;
use dossier_common::error::{DossierError, Result};
use dossier_jobs::Generator;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::debug;

/// Generator backed by a document-generation HTTP service.
///
/// The job input is POSTed as JSON and the JSON response body is the result.
pub struct HttpGenerator {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpGenerator {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self::with_client(endpoint, api_key, reqwest::Client::new())
    }

    pub fn with_client(endpoint: String, api_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint,
            api_key: api_key.filter(|key| !key.is_empty()),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, input: Value) -> Result<Value> {
        let mut request = self.client.post(&self.endpoint).json(&input);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|err| {
            DossierError::Generation(format!(
                "failed to reach generator {}: {err}",
                self.endpoint
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(endpoint = %self.endpoint, %status, "generator rejected request");
            return Err(DossierError::Generation(match service_message(&body) {
                Some(message) => format!("generator returned {status}: {message}"),
                None => format!("generator returned {status}"),
            }));
        }

        response.json::<Value>().await.map_err(|err| {
            DossierError::Generation(format!(
                "generator {} returned an unreadable body: {err}",
                self.endpoint
            ))
        })
    }
}

/// Pulls a human-readable message out of an error body such as
/// `{"error": "..."}`, `{"error": {"message": "..."}}` or `{"message": "..."}`.
pub(crate) fn service_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = match &value["error"] {
        Value::String(message) => Some(message.as_str()),
        Value::Object(error) => error.get("message").and_then(Value::as_str),
        _ => None,
    }
    .or_else(|| value["message"].as_str())?;
    Some(message.to_string())
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use dossier_jobs::Generator;
    use serde_json::{Value, json};

    use super::{HttpGenerator, service_message};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/generate")
    }

    #[test]
    fn service_message_shapes() {
        assert_eq!(service_message(r#"{"error":"quota"}"#).as_deref(), Some("quota"));
        assert_eq!(
            service_message(r#"{"error":{"message":"bad model"}}"#).as_deref(),
            Some("bad model")
        );
        assert_eq!(service_message(r#"{"message":"nope"}"#).as_deref(), Some("nope"));
        assert_eq!(service_message("<html>"), None);
    }

    #[tokio::test]
    async fn posts_input_with_bearer_key() {
        let router = Router::new().route(
            "/generate",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({"echo": body, "auth": auth}))
            }),
        );
        let generator = HttpGenerator::new(serve(router).await, Some("secret".to_string()));

        let result = generator.generate(json!({"title": "A"})).await.unwrap();
        assert_eq!(result["echo"], json!({"title": "A"}));
        assert_eq!(result["auth"], "Bearer secret");
    }

    #[tokio::test]
    async fn error_status_becomes_generation_error() {
        let router = Router::new().route(
            "/generate",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"error": {"message": "rate limited"}})),
                )
            }),
        );
        let generator = HttpGenerator::new(serve(router).await, None);

        let err = generator.generate(json!({})).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "generator returned 429 Too Many Requests: rate limited"
        );
    }
}
