//! Data contracts for the analysis pipeline.
//!
//! Every value crossing a stage boundary or leaving the service is one of
//! these types. Wire names are `snake_case` and must match the stage schemas
//! in [`crate::schema`] exactly - a mismatch between the two is a contract
//! break, not a recoverable condition.

use serde::{Deserialize, Serialize};

use crate::error::InputValidationError;

/// Upper bound for caller-supplied message text, in characters.
pub const MAX_TEXT_LEN: usize = 5000;

/// Number of response strategies the synthesis stage is asked to produce.
///
/// This is a prompt-level request to the oracle, not a structural invariant:
/// the registry accepts whatever count comes back and the orchestrator logs
/// drift instead of failing the run.
pub const TARGET_STRATEGY_COUNT: usize = 3;

/// Severity of a detected risk signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Red,
    Yellow,
    Green,
}

/// Direction of a longitudinal pattern signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

/// Three-way reading of what a message says, suggests and leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtextSummary {
    /// What the sender states outright.
    pub explicit: String,

    /// What the phrasing suggests without stating.
    pub implied: String,

    /// What the sender is steering around.
    pub avoided: String,
}

/// A single risk signal detected in the analyzed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    /// Short label for the kind of risk (e.g. "escalation").
    #[serde(rename = "type")]
    pub kind: String,

    /// Severity bucket.
    pub level: RiskLevel,

    /// Estimated probability, 0-100.
    pub probability: f64,

    /// Free-text explanation of the signal.
    pub description: String,
}

/// A longitudinal signal across multiple messages.
///
/// Always empty in single-shot mode: pattern detection needs a historical
/// store that does not exist yet. The type is kept so the wire shape is
/// stable once one does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSignal {
    #[serde(rename = "type")]
    pub kind: String,

    /// Signal strength, 0-100.
    pub strength: f64,

    pub trend: Trend,

    pub description: String,
}

/// One candidate way the recipient could respond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,

    /// What this strategy optimizes for (e.g. "de-escalation").
    pub optimization_goal: String,

    /// Downsides the sender should weigh.
    pub risks: Vec<String>,

    /// Concrete reply text, when the oracle chose to draft one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_reply: Option<String>,
}

/// Output of the combined core-analysis stage.
///
/// Lives only for the duration of one pipeline run; the orchestrator folds
/// it into the final [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreAnalysis {
    pub subtext_summary: SubtextSummary,

    /// Inferred clarity/strength of sender intent, 0-100.
    pub intent_score: f64,

    /// Oracle's self-reported confidence, 0-100.
    pub confidence: f64,

    pub emotional_tones: Vec<String>,

    pub risk_flags: Vec<RiskFlag>,
}

/// Output of the strategy-synthesis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySet {
    pub strategies: Vec<Strategy>,
}

/// The final artifact returned to callers.
///
/// Constructed fresh per request, never persisted, discarded after being
/// returned. Every value of this type that leaves the pipeline has passed
/// through the guardrail exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub intent_score: f64,
    pub confidence: f64,
    pub emotional_tones: Vec<String>,
    pub subtext_summary: SubtextSummary,
    pub patterns: Vec<PatternSignal>,
    pub risk_flags: Vec<RiskFlag>,
    pub strategies: Vec<Strategy>,
}

/// An image attached to the analysis request, already base64-encoded by the
/// caller. The payload is handed to the oracle verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// MIME type of the encoded image (e.g. "image/png").
    pub mime_type: String,

    /// Base64-encoded image bytes.
    pub data: String,
}

/// Caller-supplied input for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeInput {
    /// The message to analyze. Required unless an image is supplied.
    #[serde(default)]
    pub text: Option<String>,

    /// Free-text situational context from the caller.
    #[serde(default)]
    pub context: Option<String>,

    /// Optional screenshot/photo of the conversation.
    #[serde(default)]
    pub image: Option<ImagePayload>,
}

impl AnalyzeInput {
    /// Check basic shape constraints before any oracle call is made.
    ///
    /// Collects every violation instead of stopping at the first so the
    /// caller gets a complete diagnostic.
    pub fn validate(&self) -> Result<(), InputValidationError> {
        let mut violations = Vec::new();

        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_text && self.image.is_none() {
            violations.push("at least one of `text` or `image` is required".to_string());
        }

        if let Some(text) = &self.text {
            if text.chars().count() > MAX_TEXT_LEN {
                violations.push(format!(
                    "`text` exceeds the maximum length of {} characters",
                    MAX_TEXT_LEN
                ));
            }
        }

        if let Some(image) = &self.image {
            if image.data.is_empty() {
                violations.push("`image.data` must not be empty".to_string());
            }
            if image.mime_type.is_empty() {
                violations.push("`image.mime_type` must not be empty".to_string());
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(InputValidationError { violations })
        }
    }
}
