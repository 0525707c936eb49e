//! Subtext Core - Data Contracts, Schema Registry and Safety Guardrail
//!
//! This crate holds the parts of Subtext that must never perform I/O:
//! the typed data model for analysis results, the schema registry that
//! stage outputs are validated against, the error taxonomy, and the
//! deterministic guardrail that rewrites oracle language before anything
//! reaches a consumer.
//!
//! # Trust model
//!
//! The generative oracle upstream of this crate is unreliable twice over:
//!
//! - **structurally** - it may return text that is not the serialization
//!   format it was asked for, or a value missing fields, with wrong types,
//!   or with numbers outside their declared ranges;
//! - **semantically** - even a well-formed value may carry overconfident or
//!   directive phrasing this service must not relay.
//!
//! The schema registry handles the first problem, the guardrail the
//! second. Both are pure and side-effect free so they can be exercised
//! exhaustively in tests.

pub mod error;
pub mod guardrail;
pub mod schema;
pub mod types;

pub use error::{
    GenerationError, InputValidationError, PipelineError, Result, GENERIC_FAILURE_MESSAGE,
};
pub use guardrail::enforce;
pub use schema::{validate, FieldViolation, SchemaName, SchemaViolation};
pub use types::{
    AnalysisResult, AnalyzeInput, CoreAnalysis, ImagePayload, PatternSignal, RiskFlag, RiskLevel,
    Strategy, StrategySet, SubtextSummary, Trend, MAX_TEXT_LEN, TARGET_STRATEGY_COUNT,
};
