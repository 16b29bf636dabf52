// Runtime configuration read from the environment.
//
// Every value has a default; unknown or malformed values are errors, not silently ignored.

use crate::modules::pledges::core::ports::PledgeOrder;
use crate::modules::pledges::use_cases::submit_pledge::controller::SubmissionPolicy;
use crate::modules::pledges::use_cases::track_pledges::store::DEFAULT_CAPACITY;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: expected {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    LocalFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
    pub file: PathBuf,
    pub capacity: Option<usize>,
    pub order: PledgeOrder,
    pub submission: SubmissionPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup("PLEDGES_BACKEND").as_deref() {
            None | Some("memory") => Backend::InMemory,
            Some("file") => Backend::LocalFile,
            Some(other) => return Err(invalid("PLEDGES_BACKEND", "memory|file", other)),
        };

        let file = lookup("PLEDGES_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("pledges.json"));

        let capacity = match lookup("PLEDGES_CAPACITY") {
            None => Some(DEFAULT_CAPACITY),
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => None,
                Ok(n) => Some(n),
                Err(_) => return Err(invalid("PLEDGES_CAPACITY", "a non-negative integer", &raw)),
            },
        };

        let order = match lookup("PLEDGES_ORDERING").as_deref() {
            None => match backend {
                Backend::InMemory => PledgeOrder::NewestFirst,
                Backend::LocalFile => PledgeOrder::InsertionOrder,
            },
            Some("newest_first") => PledgeOrder::NewestFirst,
            Some("insertion") => PledgeOrder::InsertionOrder,
            Some(other) => {
                return Err(invalid("PLEDGES_ORDERING", "newest_first|insertion", other));
            }
        };

        let submit_delay = match lookup("PLEDGES_SUBMIT_DELAY_MS") {
            None => Duration::ZERO,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| invalid("PLEDGES_SUBMIT_DELAY_MS", "milliseconds", &raw))?,
        };

        let one_per_session = match lookup("PLEDGES_ONE_PER_SESSION").as_deref() {
            None | Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => return Err(invalid("PLEDGES_ONE_PER_SESSION", "true|false", other)),
        };

        Ok(Self {
            backend,
            file,
            capacity,
            order,
            submission: SubmissionPolicy {
                one_per_session,
                submit_delay,
            },
        })
    }
}

fn invalid(key: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        expected,
        value: value.to_string(),
    }
}
