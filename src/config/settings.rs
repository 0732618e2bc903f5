//! Workflow settings, optionally loaded from a TOML file.
//!
//! ```toml
//! [workflow]
//! max_call_attempts = 3
//! default_method = "LLAMADA_TELEFONICA"
//! default_verifier = "Sistema Automatizado PRL"
//! webhook_url = "https://voice.example.com/webhook/prl-call"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::checklist::{DEFAULT_METHOD, DEFAULT_VERIFIER};
use crate::workflow::transition::{DEFAULT_MAX_CALL_ATTEMPTS, RetryPolicy};

/// Callback endpoint of the voice platform's PRL flow.
pub const DEFAULT_WEBHOOK_URL: &str = "https://api.happyrobot.ai/webhook/prl-call";

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    workflow: WorkflowSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Failed calls at or past this many attempts mark the worker unreachable.
    pub max_call_attempts: u32,
    pub default_method: String,
    pub default_verifier: String,
    /// Where the voice platform should deliver call callbacks. Returned to
    /// the caller of `initiate_call`.
    pub webhook_url: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_call_attempts: DEFAULT_MAX_CALL_ATTEMPTS,
            default_method: DEFAULT_METHOD.to_string(),
            default_verifier: DEFAULT_VERIFIER.to_string(),
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
        }
    }
}

impl WorkflowSettings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: SettingsFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("bad workflow settings: {e}")))?;
        let settings = file.workflow;
        if settings.max_call_attempts == 0 {
            return Err(Error::Config(
                "max_call_attempts must be at least 1".to_string(),
            ));
        }
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_call_attempts: self.max_call_attempts,
        }
    }
}
