//! Environment and file configuration.
//!
//! `GURU_CONFIG_PATH` may point to a UTF-8 JSON file:
//!
//! ```json
//! {
//!   "endpoint": "https://chat.example.com/api/chat",
//!   "timeout_sec": 120,
//!   "user_agent": "guru",
//!   "headers": {"x-api-key": "..."},
//!   "disable_auto_shrink": false,
//!   "oneshot": false,
//!   "verbose": false
//! }
//! ```
//!
//! Every field is optional and unknown fields are rejected. Environment
//! variables override the file; flags are enabled by the value `1`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use chat_stream::StreamConfig;
use serde::Deserialize;

use crate::error::ChatError;
use crate::orchestrator::AskOptions;

pub const CONFIG_PATH_ENV_VAR: &str = "GURU_CONFIG_PATH";
pub const ENDPOINT_ENV_VAR: &str = "GURU_ENDPOINT";
pub const TIMEOUT_ENV_VAR: &str = "GURU_TIMEOUT_SEC";
pub const DISABLE_AUTO_SHRINK_ENV_VAR: &str = "GURU_DISABLE_AUTO_SHRINK";
pub const ONESHOT_ENV_VAR: &str = "GURU_ONESHOT";
pub const VERBOSE_ENV_VAR: &str = "GURU_VERBOSE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    endpoint: Option<String>,
    timeout_sec: Option<u64>,
    user_agent: Option<String>,
    headers: BTreeMap<String, String>,
    disable_auto_shrink: bool,
    oneshot: bool,
    verbose: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuruConfig {
    /// Empty means the transport default.
    pub endpoint: String,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub ask: AskOptions,
    pub verbose: bool,
}

impl GuruConfig {
    pub fn from_env() -> Result<Self, ChatError> {
        let base = match env_string_opt(CONFIG_PATH_ENV_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        base.with_env_overrides()
    }

    pub fn from_file(path: &Path) -> Result<Self, ChatError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            ChatError::config(format!("failed to read {}: {error}", path.display()))
        })?;
        let file: FileConfig = serde_json::from_str(&raw).map_err(|error| {
            ChatError::config(format!("failed to parse {}: {error}", path.display()))
        })?;

        Ok(Self {
            endpoint: file.endpoint.unwrap_or_default(),
            timeout: file.timeout_sec.map(timeout_from_secs).transpose()?,
            user_agent: file.user_agent,
            headers: file.headers,
            ask: AskOptions {
                oneshot: file.oneshot,
                disable_auto_shrink: file.disable_auto_shrink,
            },
            verbose: file.verbose,
        })
    }

    fn with_env_overrides(mut self) -> Result<Self, ChatError> {
        if let Some(endpoint) = env_string_opt(ENDPOINT_ENV_VAR) {
            self.endpoint = endpoint;
        }
        if let Some(raw) = env_string_opt(TIMEOUT_ENV_VAR) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ChatError::config(format!("{TIMEOUT_ENV_VAR} must be a whole number of seconds"))
            })?;
            self.timeout = Some(timeout_from_secs(secs)?);
        }
        self.ask.disable_auto_shrink |= env_flag(DISABLE_AUTO_SHRINK_ENV_VAR);
        self.ask.oneshot |= env_flag(ONESHOT_ENV_VAR);
        self.verbose |= env_flag(VERBOSE_ENV_VAR);
        Ok(self)
    }

    pub fn stream_config(&self) -> StreamConfig {
        let mut config = StreamConfig::new(self.endpoint.clone()).with_headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        config
    }
}

fn timeout_from_secs(secs: u64) -> Result<Duration, ChatError> {
    if secs == 0 {
        return Err(ChatError::config("timeout_sec must be > 0"));
    }
    Ok(Duration::from_secs(secs))
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
