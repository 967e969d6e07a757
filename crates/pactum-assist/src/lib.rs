use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pactum_core::{AssistTurn, ClauseAssist};

const EXPLAIN_PROMPT: &str = "You are a legal assistant. Explain the following contract clause \
     in plain language for a non-lawyer. Keep the explanation short.";
const QUESTION_PROMPT: &str = "You are a legal assistant answering questions about one contract \
     clause. Answer only from the clause text provided.";

// Chat client for an OpenAI-compatible completion endpoint.
#[derive(Clone)]
pub struct HttpAssist {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl HttpAssist {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        HttpAssist {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self.http.post(&url).json(&ChatRequest {
            model: &self.model,
            messages,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .context("assist request failed")?
            .error_for_status()
            .context("assist request rejected")?;
        let body: ChatResponse = response
            .json()
            .await
            .context("assist response was not valid JSON")?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .context("assist response contained no choices")?;
        Ok(choice.message.content)
    }
}

fn question_messages(
    clause_text: &str,
    history: &[AssistTurn],
    question: &str,
) -> Vec<ChatMessage> {
    let mut messages = vec![
        ChatMessage {
            role: "system".to_string(),
            content: QUESTION_PROMPT.to_string(),
        },
        ChatMessage {
            role: "system".to_string(),
            content: format!("Clause text:\n{clause_text}"),
        },
    ];
    messages.extend(history.iter().map(|turn| ChatMessage {
        role: turn.role.clone(),
        content: turn.content.clone(),
    }));
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: question.to_string(),
    });
    messages
}

#[async_trait]
impl ClauseAssist for HttpAssist {
    async fn explain(&self, clause_text: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage {
                role: "system".to_string(),
                content: EXPLAIN_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: clause_text.to_string(),
            },
        ])
        .await
    }

    async fn answer_question(
        &self,
        clause_text: &str,
        history: &[AssistTurn],
        question: &str,
    ) -> Result<String> {
        self.chat(question_messages(clause_text, history, question))
            .await
    }
}

// Stands in when no assist backend is configured; every call fails with a
// clear upstream error instead of a connection error to nowhere.
pub struct UnconfiguredAssist;

#[async_trait]
impl ClauseAssist for UnconfiguredAssist {
    async fn explain(&self, _clause_text: &str) -> Result<String> {
        anyhow::bail!("no assist backend is configured; set ASSIST_URL")
    }

    async fn answer_question(
        &self,
        _clause_text: &str,
        _history: &[AssistTurn],
        _question: &str,
    ) -> Result<String> {
        anyhow::bail!("no assist backend is configured; set ASSIST_URL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_messages_thread_history_between_prompts() {
        let history = vec![AssistTurn::user("why?"), AssistTurn::assistant("because.")];
        let messages = question_messages("Clause body.", &history, "and then?");

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("Clause body."));
        assert_eq!(messages[2].content, "why?");
        assert_eq!(messages[3].role, "assistant");
        assert_eq!(messages[4].content, "and then?");
    }

    #[test]
    fn base_url_accepts_a_trailing_slash() {
        let assist = HttpAssist::new("http://assist.local/v1/", "test-model", None);
        assert_eq!(assist.base_url, "http://assist.local/v1");
    }
}
