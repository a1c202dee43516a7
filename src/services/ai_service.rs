use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value as JsonValue;

use crate::error::Result;

/// Runs the primary AI-backed path and substitutes the deterministic
/// fallback on any failure. The substitution is total: callers never see
/// an error from the external service, only a usable result.
pub async fn with_fallback<T, Fut>(operation: &str, primary: Fut, fallback: impl FnOnce() -> T) -> T
where
    Fut: Future<Output = Result<T>>,
{
    match primary.await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(operation, error = ?e, "AI service failed, using local fallback");
            fallback()
        }
    }
}

/// Thin client over a chat-completions endpoint. Prompts declare the JSON
/// shape they expect back; the response body's message content is parsed
/// as JSON and handed to the caller.
#[derive(Clone)]
pub struct AiService {
    client: Client,
    api_key: Option<String>,
    timeout: Duration,
}

impl AiService {
    pub fn new(api_key: Option<String>, client: Client, timeout: Duration) -> Self {
        Self {
            client,
            api_key,
            timeout,
        }
    }

    pub async fn complete_json(&self, system_prompt: &str, user_payload: &JsonValue) -> Result<JsonValue> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(anyhow::anyhow!("No API key configured").into());
        };

        let payload = serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": serde_json::to_string(user_payload)?}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7
        });

        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("AI API error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| anyhow::anyhow!("Invalid AI response format").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_fallback_passes_through_success() {
        let value = with_fallback("test", async { Ok(41) }, || 0).await;
        assert_eq!(value, 41);
    }

    #[tokio::test]
    async fn with_fallback_substitutes_on_error() {
        let value = with_fallback(
            "test",
            async { Err::<i32, _>(anyhow::anyhow!("down").into()) },
            || 7,
        )
        .await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn missing_api_key_errors_without_a_network_call() {
        let svc = AiService::new(None, Client::new(), Duration::from_secs(1));
        let err = svc
            .complete_json("prompt", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No API key"));
    }
}
