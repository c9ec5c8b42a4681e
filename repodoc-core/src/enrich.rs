use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AiConfig;
use crate::contract::Enricher;
use crate::error::EnrichError;
use crate::model::Enrichment;

pub const SYMBOL_FALLBACK: &str = "Unable to generate AI description at this time.";

pub fn class_fallback(name: &str) -> String {
    format!("Utility class: {name}")
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// [`Enricher`] backed by an OpenAI-compatible `chat/completions` endpoint (LM Studio,
/// Ollama, vLLM and similar). Every failure degrades to a fixed fallback text.
#[derive(Debug, Clone)]
pub struct LlmEnricher {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl LlmEnricher {
    pub fn new(config: &AiConfig) -> Result<Self, EnrichError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete(
        &self,
        prompt: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, EnrichError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(EnrichError::EmptyResponse)
    }
}

fn class_prompt(name: &str, method_signatures: &[String]) -> String {
    format!(
        "Summarize this Java class in one sentence in English:\n\n\
         Class: {name}\n\
         Methods:\n\
         - {}\n\n\
         Provide only the summary, no additional text.",
        method_signatures.join("\n  - ")
    )
}

fn symbol_prompt(symbol: &str, context: &str) -> String {
    format!(
        "Analyze the following Java code and provide a technical description in English:\n\n\
         Code:\n{symbol}\n\n\
         Context:\n{context}\n\n\
         Provide a concise, technical description of what this code does, its purpose, \
         and any important details."
    )
}

#[async_trait]
impl Enricher for LlmEnricher {
    async fn summarize_class(&self, name: &str, method_signatures: &[String]) -> Enrichment {
        match self.complete(class_prompt(name, method_signatures), 0.5, 150).await {
            Ok(text) => Enrichment::Generated(text),
            Err(e) => {
                tracing::warn!(error = %e, class = name, "Class summary failed, using fallback");
                Enrichment::Fallback(class_fallback(name))
            }
        }
    }

    async fn describe_symbol(&self, symbol: &str, context: &str) -> Enrichment {
        match self.complete(symbol_prompt(symbol, context), 0.7, 500).await {
            Ok(text) => Enrichment::Generated(text),
            Err(e) => {
                tracing::warn!(error = %e, symbol, "Symbol description failed, using fallback");
                Enrichment::Fallback(SYMBOL_FALLBACK.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                let response = format!(
                    "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/v1")
    }

    /// Drains headers and the `content-length` body so the client sees a clean close.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut data = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = socket.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            data.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (key, value) = line.split_once(':')?;
                        key.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn enricher(base_url: String) -> LlmEnricher {
        LlmEnricher::new(&AiConfig {
            enabled: true,
            base_url,
            model: "test-model".into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_has_no_double_slash() {
        let e = enricher("http://localhost:1234/v1/".into());
        assert_eq!(e.endpoint(), "http://localhost:1234/v1/chat/completions");
    }

    #[tokio::test]
    async fn generated_text_on_success() {
        let base = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"  Manages users.\n"}}]}"#,
        )
        .await;
        let result = enricher(base)
            .summarize_class("UserService", &["addUser(User): void".into()])
            .await;
        assert_eq!(result, Enrichment::Generated("Manages users.".into()));
    }

    #[tokio::test]
    async fn fallback_on_server_error() {
        let base = serve_once("HTTP/1.1 500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let result = enricher(base).describe_symbol("A.b", "Class: A").await;
        assert_eq!(result, Enrichment::Fallback(SYMBOL_FALLBACK.into()));
    }

    #[tokio::test]
    async fn fallback_on_empty_choices() {
        let base = serve_once("HTTP/1.1 200 OK", r#"{"choices":[]}"#).await;
        let result = enricher(base).summarize_class("Repo", &[]).await;
        assert_eq!(result, Enrichment::Fallback("Utility class: Repo".into()));
    }

    #[tokio::test]
    async fn fallback_when_unreachable() {
        // nothing listens on the discard port
        let result = enricher("http://127.0.0.1:9/v1".into())
            .summarize_class("Offline", &[])
            .await;
        assert!(!result.is_generated());
        assert_eq!(result.text(), "Utility class: Offline");
    }

    #[test]
    fn class_prompt_lists_signatures() {
        let prompt = class_prompt("A", &["x(): int".into(), "y(String): void".into()]);
        assert!(prompt.contains("Class: A"));
        assert!(prompt.contains("- x(): int\n  - y(String): void"));
    }
}
