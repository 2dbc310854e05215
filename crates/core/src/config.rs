//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_EVENT_CAPACITY};
use crate::forms::codec::AnswerPolicy;
use crate::{PromsError, PromsResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    answer_policy: AnswerPolicy,
    event_capacity: usize,
}

impl CoreConfig {
    pub fn new(
        data_dir: PathBuf,
        answer_policy: AnswerPolicy,
        event_capacity: usize,
    ) -> PromsResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(PromsError::InvalidInput("data_dir cannot be empty".into()));
        }
        if event_capacity == 0 {
            return Err(PromsError::InvalidInput(
                "event_capacity must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            answer_policy,
            event_capacity,
        })
    }

    /// Builds a configuration from raw (usually environment) values, applying defaults for
    /// anything missing or blank.
    pub fn from_values(
        data_dir: Option<String>,
        answer_policy: Option<String>,
        event_capacity: Option<String>,
    ) -> PromsResult<Self> {
        let data_dir = non_blank(data_dir).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Self::new(
            PathBuf::from(data_dir),
            answer_policy_from_env_value(answer_policy)?,
            event_capacity_from_env_value(event_capacity)?,
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn answer_policy(&self) -> AnswerPolicy {
        self.answer_policy
    }

    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the answer policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`AnswerPolicy::Truthy`].
pub fn answer_policy_from_env_value(value: Option<String>) -> PromsResult<AnswerPolicy> {
    let parsed = non_blank(value)
        .map(|v| v.parse::<AnswerPolicy>())
        .transpose()?;
    Ok(parsed.unwrap_or_default())
}

pub fn event_capacity_from_env_value(value: Option<String>) -> PromsResult<usize> {
    match non_blank(value) {
        None => Ok(DEFAULT_EVENT_CAPACITY),
        Some(v) => v.parse::<usize>().map_err(|e| {
            PromsError::InvalidInput(format!("invalid event capacity '{v}': {e}"))
        }),
    }
}
