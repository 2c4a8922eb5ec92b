//! Reply generation for chat turns
//!
//! The orchestrator treats the responder as a pluggable collaborator that
//! turns a system prompt plus a chronological transcript window into one
//! reply. `GroqResponder` talks to an OpenAI-compatible chat completion
//! endpoint; `MockResponder` answers locally and deterministically.

use async_trait::async_trait;
use std::time::Duration;

use cupid_common::config::ResponderConfig;
use cupid_common::db::models::{ChatMessage, MessageRole};
use cupid_common::errors::{AppError, Result};

#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate one assistant reply. `history` is chronological and ends
    /// with the user's newest turn.
    async fn generate_reply(&self, system_prompt: &str, history: &[ChatMessage]) -> Result<String>;
}

/// Responder backed by an OpenAI-style `/chat/completions` endpoint
pub struct GroqResponder {
    client: reqwest::Client,
    config: ResponderConfig,
}

impl GroqResponder {
    pub fn new(config: ResponderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Responder for GroqResponder {
    async fn generate_reply(&self, system_prompt: &str, history: &[ChatMessage]) -> Result<String> {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": system_prompt,
        })];
        for message in history {
            messages.push(serde_json::json!({
                "role": message.role,
                "content": message.content,
            }));
        }

        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
        });

        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let res = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Responder {
                message: format!("Request failed: {}", e),
            })?;

        if !res.status().is_success() {
            return Err(AppError::Responder {
                message: format!("API error: {}", res.status()),
            });
        }

        let body: serde_json::Value = res.json().await.map_err(|e| AppError::Responder {
            message: format!("Parse error: {}", e),
        })?;

        let reply = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AppError::Responder {
                message: "Invalid response format".to_string(),
            })?;

        Ok(reply.to_string())
    }
}

/// Local deterministic responder, used when no API key is configured
pub struct MockResponder;

#[async_trait]
impl Responder for MockResponder {
    async fn generate_reply(
        &self,
        _system_prompt: &str,
        history: &[ChatMessage],
    ) -> Result<String> {
        let last_user_turn = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User.as_str())
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        Ok(format!("You said: \"{}\". I'm Course Cupid!", last_user_turn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn turn(role: MessageRole, content: &str) -> ChatMessage {
        ChatMessage {
            seq: 0,
            message_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            role: role.as_str().to_string(),
            content: content.to_string(),
            created_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_mock_responder_echoes_latest_user_turn() {
        let history = vec![
            turn(MessageRole::User, "older"),
            turn(MessageRole::Assistant, "reply"),
            turn(MessageRole::User, "hi"),
        ];

        let reply = MockResponder.generate_reply("prompt", &history).await.unwrap();
        assert_eq!(reply, "You said: \"hi\". I'm Course Cupid!");
    }

    #[tokio::test]
    async fn test_mock_responder_handles_empty_history() {
        let reply = MockResponder.generate_reply("prompt", &[]).await.unwrap();
        assert!(!reply.is_empty());
    }
}
