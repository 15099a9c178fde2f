use std::fmt::Debug;
use std::process::Command;

use async_trait::async_trait;

use crate::cache::{self, ResponseCache};
use crate::config::Config;
use crate::context::Context;
use crate::prompts;
use crate::{DoerError, Response};

/// A language-model service that answers requests with a raw response literal.
#[async_trait]
pub trait Backend: Send {
    /// Identifier of the concrete model, used to namespace cache keys.
    fn model(&self) -> &str;

    /// Picks up credentials. Called once before any request.
    fn load(&mut self) -> Result<(), DoerError>;

    /// Seeds the backend with the instruction prompt. Returns the backend's reply,
    /// if it gave one.
    async fn prime(&mut self, _prompt: &str) -> Result<Option<String>, DoerError> {
        Ok(None)
    }

    /// Sends `request` and returns text that should parse as a [`Response`].
    async fn ask(&mut self, prompt: &str, request: &str) -> Result<String, DoerError>;

    fn key_from_query(&self, query: &str) -> String {
        format!("{}:{}", self.model(), cache::query_key(query))
    }
}

/// Runs a single approved command.
pub trait Executor: Send {
    fn run(&mut self, command: &str) -> Result<(), DoerError>;
}

/// Runs commands through the system shell with the terminal attached.
pub struct ShellExecutor;

impl Executor for ShellExecutor {
    fn run(&mut self, command: &str) -> Result<(), DoerError> {
        let mut shell = if cfg!(windows) {
            let mut shell = Command::new("cmd");
            shell.arg("/C");
            shell
        } else {
            let mut shell = Command::new("sh");
            shell.arg("-c");
            shell
        };
        let status = shell.arg(command).status().map_err(|err| DoerError::Command {
            command: command.to_string(),
            reason: err.to_string(),
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(DoerError::Command {
                command: command.to_string(),
                reason: status.code().map_or_else(
                    || "terminated by a signal".to_string(),
                    |code| format!("exit code {code}"),
                ),
            })
        }
    }
}

/// Turns requests into [`Response`]s through a [`Backend`] and runs the commands
/// the user approves.
pub struct Doer {
    backend: Box<dyn Backend>,
    executor: Box<dyn Executor>,
    cache: ResponseCache,
    prompt: String,
    debug: bool,
    primed: bool,
}

impl Doer {
    pub fn new(backend: Box<dyn Backend>, config: &Config) -> Self {
        let cache = if config.cache {
            ResponseCache::default_path().map_or_else(ResponseCache::in_memory, ResponseCache::open)
        } else {
            ResponseCache::in_memory()
        };
        let prompt = String::from(prompts::DOER_TASK) + "\n" + &String::from(Context::from(config));
        Self {
            backend,
            executor: Box::new(ShellExecutor),
            cache,
            prompt,
            debug: config.debug,
            primed: false,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: Box<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn load_bot(&mut self) -> Result<(), DoerError> {
        self.backend.load()
    }

    /// Primes the backend once; later calls do nothing.
    pub async fn prime_convo(&mut self) -> Result<(), DoerError> {
        if self.primed {
            return Ok(());
        }
        self.dprint(&self.prompt);
        if let Some(reply) = self.backend.prime(&self.prompt).await? {
            self.dprint(&reply);
        }
        self.primed = true;
        Ok(())
    }

    pub fn key_from_query(&self, query: &str) -> String {
        self.backend.key_from_query(query)
    }

    /// Answers `text` from the cache, or asks the backend and caches the answer.
    pub async fn query(&mut self, text: &str) -> Result<Response, DoerError> {
        let key = self.key_from_query(text);
        if let Some(response) = self.cache.get(&key) {
            log::debug!("cache hit for {key}");
            return Ok(response.clone());
        }
        self.prime_convo().await?;
        let raw = self.backend.ask(&self.prompt, text).await?;
        self.dprint(&raw);
        let response = Response::parse(&raw)?;
        self.cache.insert(key, response.clone());
        Ok(response)
    }

    /// Runs the commands in order, stopping at the first one that fails.
    pub fn execute(&mut self, response: &Response) -> Result<(), DoerError> {
        for command in &response.commands {
            log::debug!("running {command}");
            self.executor.run(command)?;
        }
        Ok(())
    }

    pub fn dprint(&self, obj: &impl Debug) {
        if self.debug {
            log::debug!("{obj:#?}");
        }
    }
}
