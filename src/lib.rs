#![allow(clippy::future_not_send)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod confirm;
mod context;
pub mod doer;
mod openai;
mod prompts;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use config::Config;
use doer::Backend;
use openai::{ChatBackend, CompletionBackend, CompletionModel};

/// What the model answered for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub explanation: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Response {
    /// Parses a raw `{"explanation": ..., "commands": [...]}` literal.
    pub fn parse(raw: &str) -> Result<Self, DoerError> {
        serde_json::from_str(raw.trim()).map_err(|err| DoerError::Parse {
            reason: err.to_string(),
            raw: raw.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum DoerError {
    #[error("{0}")]
    Configuration(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Could not parse the model response ({reason}):\n{raw}")]
    Parse { reason: String, raw: String },
    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DoerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(try_from = "String")]
pub enum BackendKind {
    #[default]
    #[value(alias = "gpt3")]
    General,
    #[value(alias = "codex")]
    Code,
    #[value(alias = "chatgpt")]
    Chat,
}

impl FromStr for BackendKind {
    type Err = DoerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "general" | "gpt3" => Ok(Self::General),
            "code" | "codex" => Ok(Self::Code),
            "chat" | "chatgpt" => Ok(Self::Chat),
            _ => Err(DoerError::Configuration(format!("Unknown model {s}"))),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = DoerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        get_doer(&value)
    }
}

impl BackendKind {
    /// Builds the backend for this kind. The concrete API model is taken from
    /// `config`, so two completion kinds never share a cache namespace unless they
    /// are configured with the same model.
    pub fn build(self, config: &Config) -> Box<dyn Backend> {
        match self {
            Self::General => Box::new(CompletionBackend::new(CompletionModel::General, config)),
            Self::Code => Box::new(CompletionBackend::new(CompletionModel::Code, config)),
            Self::Chat => Box::new(ChatBackend::new(config)),
        }
    }
}

/// Resolves a model selector into the backend kind that serves it.
pub fn get_doer(model: &str) -> Result<BackendKind, DoerError> {
    model.parse()
}

fn build_completion_request(prompt: &str, request: &str) -> String {
    format!("{prompt}\nRequest: {request}\n{{")
}

fn build_chat_request(request: &str) -> String {
    format!("Request: {request}")
}
