//! Subtext Engine - Structured Multi-Stage Generation Pipeline
//!
//! Converts an unreliable free-form oracle into schema-conformant,
//! policy-compliant analysis results. The engine owns the oracle seam
//! ([`oracle::Oracle`]), the Gemini-backed implementation of it, the
//! structured generation client that makes one oracle call provably
//! conform to a registered schema, and the orchestrator that sequences
//! the dependent stages into a final [`subtext_core::AnalysisResult`].
//!
//! # Failure policy
//!
//! Nothing in this crate retries. A single oracle failure is terminal for
//! the request; callers retry the whole request at their discretion. No
//! partial result ever leaves the pipeline, and no raw oracle error detail
//! travels past the structured client - detail goes to the logs, callers
//! get typed errors with generic public renderings.

pub mod gemini;
pub mod oracle;
pub mod pipeline;
pub mod structured;

pub use gemini::GeminiOracle;
pub use oracle::{Oracle, OracleConfig};
pub use pipeline::AnalysisPipeline;
pub use structured::StructuredClient;
