//! Oracle abstraction - the seam between the pipeline and the generative
//! model behind it.
//!
//! Everything above this trait treats the oracle as an untrusted emitter of
//! free text. Keeping the seam this narrow is what makes the pipeline
//! testable with a scripted substitute instead of a live model.

use anyhow::{Context, Result};
use subtext_core::ImagePayload;

/// Default model when the environment does not override it.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Low temperature: analysis wants consistency, not creativity.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// Bound on one oracle call. An unbounded hang in one request must not be
/// allowed to hold resources indefinitely.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A capability that turns a prompt into raw text.
///
/// Implementations may fail with transport/quota/auth errors and may return
/// text wrapped in decorative code fences; callers must not trust the shape
/// of what comes back.
#[async_trait::async_trait]
pub trait Oracle: Send + Sync + std::fmt::Debug {
    /// One generation call. `image` rides along as an inline attachment when
    /// the caller has one.
    async fn invoke(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        image: Option<&ImagePayload>,
    ) -> Result<String>;
}

/// Process-wide oracle configuration.
///
/// Read once at startup and injected into the client; never mutated
/// mid-flight. The pipeline itself never touches the environment.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl OracleConfig {
    /// Build the configuration from the process environment.
    ///
    /// `GEMINI_API_KEY` is required; the rest fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;

        let model =
            std::env::var("SUBTEXT_ORACLE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let temperature = std::env::var("SUBTEXT_ORACLE_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TEMPERATURE);

        let max_output_tokens = std::env::var("SUBTEXT_ORACLE_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS);

        let timeout_secs = std::env::var("SUBTEXT_ORACLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            api_key,
            model,
            temperature,
            max_output_tokens,
            timeout_secs,
        })
    }
}
