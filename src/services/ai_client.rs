// src/services/ai_client.rs

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI proxy is not configured")]
    Disabled,

    #[error("AI proxy request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI proxy answered with status {0}")]
    Status(StatusCode),

    #[error("AI proxy returned an empty answer")]
    EmptyAnswer,
}

impl AiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AiError::Http(e) if e.is_timeout())
    }
}

/// Pulls the answer out of a proxy response body.
///
/// JSON objects are searched for `answer`, `response` then `text`; a JSON
/// string or a non-JSON body is taken as the answer itself.
pub fn extract_answer(body: &str) -> Option<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["answer", "response", "text"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find_map(non_empty),
        Ok(Value::String(s)) => non_empty(&s),
        Ok(_) => None,
        Err(_) => non_empty(body),
    }
}

/// Client of the third-party text-completion proxy (`GET <url>?text=<prompt>`).
#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl AiClient {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub async fn ask(&self, prompt: &str) -> Result<String, AiError> {
        let endpoint = self.endpoint.as_deref().ok_or(AiError::Disabled)?;

        let response = self
            .http
            .get(endpoint)
            .query(&[("text", prompt)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Status(status));
        }

        let body = response.text().await?;
        extract_answer(&body).ok_or(AiError::EmptyAnswer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/proxy", addr)
    }

    #[test]
    fn answers_are_read_from_known_fields() {
        assert_eq!(extract_answer(r#"{"answer":" سلام "}"#).as_deref(), Some("سلام"));
        assert_eq!(extract_answer(r#"{"response":"ok"}"#).as_deref(), Some("ok"));
        assert_eq!(
            extract_answer(r#"{"answer":"","text":"fallback field"}"#).as_deref(),
            Some("fallback field")
        );
        assert_eq!(extract_answer(r#""quoted""#).as_deref(), Some("quoted"));
        assert_eq!(extract_answer("plain text body").as_deref(), Some("plain text body"));
        assert_eq!(extract_answer(r#"{"other":"x"}"#), None);
        assert_eq!(extract_answer("   "), None);
    }

    #[tokio::test]
    async fn prompt_is_sent_as_text_query() {
        let app = Router::new().route(
            "/proxy",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                Json(json!({ "answer": format!("echo: {}", q.get("text").cloned().unwrap_or_default()) }))
            }),
        );
        let url = serve(app).await;
        let client = AiClient::new(Some(url), Duration::from_secs(5)).unwrap();

        let answer = client.ask("گزارش امروز").await.unwrap();
        assert_eq!(answer, "echo: گزارش امروز");
    }

    #[tokio::test]
    async fn slow_proxy_times_out() {
        let app = Router::new().route(
            "/proxy",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "too late"
            }),
        );
        let url = serve(app).await;
        let client = AiClient::new(Some(url), Duration::from_millis(200)).unwrap();

        let err = client.ask("x").await.unwrap_err();
        assert!(err.is_timeout(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn error_status_and_disabled_client_fail() {
        let app = Router::new().route(
            "/proxy",
            get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "down") }),
        );
        let url = serve(app).await;
        let client = AiClient::new(Some(url), Duration::from_secs(5)).unwrap();
        assert!(matches!(client.ask("x").await, Err(AiError::Status(s)) if s.as_u16() == 502));

        let disabled = AiClient::new(None, Duration::from_secs(5)).unwrap();
        assert!(!disabled.is_enabled());
        assert!(matches!(disabled.ask("x").await, Err(AiError::Disabled)));
    }
}
