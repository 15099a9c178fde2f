use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};

use crate::cache;
use crate::config::Config;
use crate::doer::Backend;
use crate::{build_chat_request, build_completion_request, DoerError};

const API_KEY_VAR: &str = "OPENAI_API_KEY";
const COMPLETION_STOP: &str = "}\n";

#[derive(Deserialize)]
struct OpenAICompletionChoice {
    pub text: String,
}

#[derive(Deserialize)]
struct OpenAICompletionResponse {
    pub choices: Vec<OpenAICompletionChoice>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum OpenAIGPTRole {
    Assistant,
    User,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct OpenAIGPTMessage {
    pub role: OpenAIGPTRole,
    pub content: String,
}

#[derive(Deserialize)]
struct OpenAIGPTMessageEntry {
    pub message: OpenAIGPTMessage,
}

#[derive(Deserialize)]
struct OpenAIGPTResponse {
    pub choices: Vec<OpenAIGPTMessageEntry>,
}

#[derive(Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CompletionModel {
    General,
    Code,
}

impl CompletionModel {
    fn api_name(self, config: &Config) -> String {
        match self {
            Self::General => config.models.general.clone(),
            Self::Code => config.models.code.clone(),
        }
    }
}

/// Shared HTTP plumbing for the OpenAI endpoints.
struct OpenAIClient {
    api_base: String,
    timeout: Duration,
    api_key: Option<String>,
}

impl OpenAIClient {
    fn new(config: &Config) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            api_key: None,
        }
    }

    fn load(&mut self, model: &str) -> Result<(), DoerError> {
        self.set_key(std::env::var(API_KEY_VAR).ok(), model)
    }

    fn set_key(&mut self, key: Option<String>, model: &str) -> Result<(), DoerError> {
        match key {
            Some(key) if !key.trim().is_empty() => {
                self.api_key = Some(key);
                Ok(())
            }
            _ => Err(missing_key_error(model)),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, DoerError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DoerError::Configuration(format!("{API_KEY_VAR} was not loaded")))?;
        let client: Client = ClientBuilder::new().timeout(self.timeout).build()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|err| DoerError::Configuration(format!("Invalid {API_KEY_VAR}: {err}")))?,
        );

        let url = format!("{}/{endpoint}", self.api_base);
        log::debug!("POST {url}");
        let response = client.post(&url).headers(headers).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<OpenAIErrorBody>(&text)
                .map_or(text, |body| body.error.message);
            return Err(DoerError::Backend(format!("{status}: {detail}")));
        }
        Ok(response.json().await?)
    }
}

fn missing_key_error(model: &str) -> DoerError {
    DoerError::Configuration(format!(
        "To use {model}, you need to set an API key for OpenAI.\n\
         You can get one here: https://platform.openai.com/account/api-keys.\n\
         Make sure to expose it in your env as {API_KEY_VAR}."
    ))
}

/// Stateless single-shot completions. The model completes a response literal whose
/// opening brace is already part of the prompt.
pub(crate) struct CompletionBackend {
    model: String,
    max_tokens: u32,
    client: OpenAIClient,
}

impl CompletionBackend {
    pub(crate) fn new(model: CompletionModel, config: &Config) -> Self {
        Self {
            model: model.api_name(config),
            max_tokens: config.max_tokens,
            client: OpenAIClient::new(config),
        }
    }
}

#[async_trait]
impl Backend for CompletionBackend {
    fn model(&self) -> &str {
        &self.model
    }

    fn load(&mut self) -> Result<(), DoerError> {
        self.client.load(&self.model)
    }

    async fn ask(&mut self, prompt: &str, request: &str) -> Result<String, DoerError> {
        let body = json!({
            "model": self.model,
            "prompt": build_completion_request(prompt, request),
            "stop": COMPLETION_STOP,
            "temperature": 0,
            "max_tokens": self.max_tokens,
        });
        let response: OpenAICompletionResponse = self.client.post("completions", &body).await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| DoerError::Backend("the completion had no choices".to_string()))?;
        Ok(wrap_completion(&text))
    }
}

/// Closes the literal opened by the prompt. The stop sequence only fires on a brace
/// followed by a newline, so a completion that ends on a bare closing brace keeps it.
fn wrap_completion(text: &str) -> String {
    let text = text.trim_end();
    let text = text.strip_suffix('}').unwrap_or(text);
    format!("{{{text}}}")
}

/// A conversation that keeps every turn, so later requests reuse the primed context.
pub(crate) struct ChatBackend {
    model: String,
    max_tokens: u32,
    client: OpenAIClient,
    history: Vec<OpenAIGPTMessage>,
}

impl ChatBackend {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            model: config.models.chat.clone(),
            max_tokens: config.max_tokens,
            client: OpenAIClient::new(config),
            history: Vec::new(),
        }
    }

    async fn send(&mut self, content: String) -> Result<String, DoerError> {
        self.history.push(OpenAIGPTMessage {
            role: OpenAIGPTRole::User,
            content,
        });
        let body = json!({
            "model": self.model,
            "messages": self.history,
            "temperature": 0,
            "max_tokens": self.max_tokens,
        });
        let reply = match self.client.post::<OpenAIGPTResponse>("chat/completions", &body).await {
            Ok(response) => response.choices.into_iter().next().map(|entry| entry.message),
            Err(err) => {
                self.history.pop();
                return Err(err);
            }
        };
        let Some(reply) = reply else {
            self.history.pop();
            return Err(DoerError::Backend("the chat reply had no choices".to_string()));
        };
        let content = reply.content.clone();
        self.history.push(reply);
        Ok(content)
    }
}

#[async_trait]
impl Backend for ChatBackend {
    fn model(&self) -> &str {
        &self.model
    }

    fn load(&mut self) -> Result<(), DoerError> {
        self.client.load(&self.model)
    }

    async fn prime(&mut self, prompt: &str) -> Result<Option<String>, DoerError> {
        let reply = self
            .send(prompt.to_string())
            .await
            .map_err(|err| match err {
                DoerError::Backend(reason) => {
                    DoerError::Backend(format!("could not start the chat session: {reason}"))
                }
                other => other,
            })?;
        Ok(Some(reply))
    }

    async fn ask(&mut self, _prompt: &str, request: &str) -> Result<String, DoerError> {
        let reply = self.send(build_chat_request(request)).await?;
        Ok(extract_object(&reply))
    }

    fn key_from_query(&self, query: &str) -> String {
        format!("chat:{}:{}", self.model, cache::query_key(query))
    }
}

fn extract_code_blocks(text: &str) -> Vec<String> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"(?s)```(?:\w+)?\n(.*?)\n```")
            .expect("The regex expression should be valid");
    }

    RE.captures_iter(text)
        .filter_map(|capture| capture.get(1))
        .map(|block| block.as_str().to_string())
        .collect()
}

/// Pulls the response literal out of a chat reply, which may be fenced or
/// surrounded by prose. Returns the reply unchanged when no braces are found, so
/// parsing reports the actual text.
fn extract_object(reply: &str) -> String {
    let text = extract_code_blocks(reply)
        .into_iter()
        .next()
        .unwrap_or_else(|| reply.to_string());
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text,
    }
}
