//! Analysis pipeline orchestrator.
//!
//! Sequences the generation stages, threading earlier stage output into the
//! prompt context of later ones, and assembles the final result. Control
//! flow is strictly forward: stage 2 needs stage 1's output in its prompt,
//! so the stages run sequentially and a stage failure aborts the whole run.
//! A partially populated result is never returned - the consumer could not
//! tell "no strategies exist" from "strategies failed to generate".

use std::sync::Arc;

use crate::oracle::Oracle;
use crate::structured::StructuredClient;
use subtext_core::{
    guardrail, AnalysisResult, AnalyzeInput, CoreAnalysis, PipelineError, Result, SchemaName,
    StrategySet, TARGET_STRATEGY_COUNT,
};

const STAGE_CORE_ANALYSIS: &str = "core_analysis";
const STAGE_STRATEGY_SYNTHESIS: &str = "strategy_synthesis";

/// One combined call covers subtext, intent, tones and risks: fewer oracle
/// round-trips means less latency and less quota pressure than a
/// finer-grained decomposition.
const CORE_ANALYSIS_INSTRUCTION: &str = r#"You are an expert communication analyst. Perform a comprehensive analysis of the message you are given:
1. Extract the explicit, implied, and avoided meanings.
2. Assess the emotional tones and an intent score (0-100), with your confidence (0-100).
3. Identify risk flags, each with a level (red, yellow or green) and a probability (0-100).

Respond with ONLY a raw JSON object, no markdown, no explanation, in this shape:
{
  "subtext_summary": {"explicit": "...", "implied": "...", "avoided": "..."},
  "intent_score": 0,
  "confidence": 0,
  "emotional_tones": ["..."],
  "risk_flags": [{"type": "...", "level": "yellow", "probability": 0, "description": "..."}]
}"#;

const STRATEGY_INSTRUCTION: &str = r#"Generate exactly 3 distinct response strategies based on the analysis. DO NOT tell the user what to do - offer options, each with the goal it optimizes for and the risks it carries.

Respond with ONLY a raw JSON object, no markdown, no explanation, in this shape:
{
  "strategies": [{"name": "...", "optimization_goal": "...", "risks": ["..."], "sample_reply": "..."}]
}"#;

#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    client: StructuredClient,
}

impl AnalysisPipeline {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            client: StructuredClient::new(oracle),
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// Stage graph: input validation (no oracle involved), combined core
    /// analysis, strategy synthesis fed by the serialized core analysis,
    /// the pattern placeholder, assembly, guardrail. Every failure path
    /// aborts before the next stage is invoked.
    pub async fn run(&self, input: AnalyzeInput) -> Result<AnalysisResult> {
        input.validate()?;

        let core_payload = describe_input(&input);
        tracing::info!("starting analysis run");

        let core: CoreAnalysis = self
            .client
            .generate(
                CORE_ANALYSIS_INSTRUCTION,
                &core_payload,
                input.image.as_ref(),
                SchemaName::CoreAnalysis,
            )
            .await
            .map_err(|source| PipelineError::Stage {
                stage: STAGE_CORE_ANALYSIS,
                source,
            })?;

        tracing::debug!(
            "core analysis complete: intent={} confidence={} tones={} risks={}",
            core.intent_score,
            core.confidence,
            core.emotional_tones.len(),
            core.risk_flags.len()
        );

        // Stage 2 sees the original message plus the serialized stage-1
        // output; the image is not re-sent, the analysis already covers it.
        let strategy_payload = format!(
            "{}\nAnalysis summary: {}.",
            core_payload,
            serde_json::to_string(&core).unwrap_or_default()
        );

        let strategy_set: StrategySet = self
            .client
            .generate(
                STRATEGY_INSTRUCTION,
                &strategy_payload,
                None,
                SchemaName::StrategySet,
            )
            .await
            .map_err(|source| PipelineError::Stage {
                stage: STAGE_STRATEGY_SYNTHESIS,
                source,
            })?;

        // The count of 3 is a prompt contract, not a validated invariant:
        // drift is accepted and logged, not failed.
        if strategy_set.strategies.len() != TARGET_STRATEGY_COUNT {
            tracing::warn!(
                "strategy stage returned {} strategies instead of {}",
                strategy_set.strategies.len(),
                TARGET_STRATEGY_COUNT
            );
        }

        let raw = AnalysisResult {
            intent_score: core.intent_score,
            confidence: core.confidence,
            emotional_tones: core.emotional_tones,
            subtext_summary: core.subtext_summary,
            // Pattern detection needs history across requests; nothing is
            // persisted yet, so this stage stays a declared placeholder.
            patterns: Vec::new(),
            risk_flags: core.risk_flags,
            strategies: strategy_set.strategies,
        };

        tracing::info!("analysis run complete");
        Ok(guardrail::enforce(raw))
    }
}

fn describe_input(input: &AnalyzeInput) -> String {
    let text = match input.text.as_deref() {
        Some(text) => format!("Input: \"{}\".", text),
        None => "Input: the attached image of a conversation.".to_string(),
    };
    format!(
        "{} Context: {}.",
        text,
        input.context.as_deref().unwrap_or("None")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use subtext_core::{GenerationError, ImagePayload};

    /// Replays a scripted sequence of oracle responses and counts
    /// invocations, so tests can pin which stages actually ran.
    #[derive(Debug)]
    struct ScriptedOracle {
        responses: Mutex<VecDeque<std::result::Result<String, String>>>,
        invocations: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<std::result::Result<String, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                invocations: AtomicUsize::new(0),
            }
        }

        fn invocation_count(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Oracle for ScriptedOracle {
        async fn invoke(
            &self,
            _system_instruction: &str,
            _user_prompt: &str,
            _image: Option<&ImagePayload>,
        ) -> Result<String> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("oracle invoked more times than scripted");
            next.map_err(|message| anyhow::anyhow!("{}", message))
        }
    }

    fn text_input(text: &str) -> AnalyzeInput {
        AnalyzeInput {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn core_json(implied: &str, risk_description: &str) -> String {
        format!(
            r#"{{
                "subtext_summary": {{
                    "explicit": "States a plan for tonight",
                    "implied": "{}",
                    "avoided": "Their own doubts"
                }},
                "intent_score": 82,
                "confidence": 74,
                "emotional_tones": ["resolute", "anxious"],
                "risk_flags": [{{
                    "type": "escalation",
                    "level": "red",
                    "probability": 70,
                    "description": "{}"
                }}]
            }}"#,
            implied, risk_description
        )
    }

    fn strategies_json(names: &[&str]) -> String {
        let entries: Vec<String> = names
            .iter()
            .map(|name| {
                format!(
                    r#"{{"name": "{}", "optimization_goal": "clarity", "risks": ["may stall"]}}"#,
                    name
                )
            })
            .collect();
        format!(r#"{{"strategies": [{}]}}"#, entries.join(","))
    }

    #[tokio::test]
    async fn core_failure_skips_strategy_stage() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Err(
            "HTTP 500 from upstream".to_string()
        )]));
        let pipeline = AnalysisPipeline::new(oracle.clone());

        let err = pipeline.run(text_input("hello")).await.unwrap_err();

        assert_eq!(oracle.invocation_count(), 1);
        match err {
            PipelineError::Stage { stage, .. } => assert_eq!(stage, STAGE_CORE_ANALYSIS),
            other => panic!("expected stage failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn strategy_failure_aborts_the_whole_run() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(core_json("wants out", "hard ultimatum")),
            Ok("not json at all".to_string()),
        ]));
        let pipeline = AnalysisPipeline::new(oracle.clone());

        let err = pipeline.run(text_input("hello")).await.unwrap_err();

        assert_eq!(oracle.invocation_count(), 2);
        match err {
            PipelineError::Stage { stage, source } => {
                assert_eq!(stage, STAGE_STRATEGY_SYNTHESIS);
                assert!(matches!(source, GenerationError::Parse { .. }));
            }
            other => panic!("expected stage failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_oracle_call() {
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let pipeline = AnalysisPipeline::new(oracle.clone());

        let err = pipeline.run(AnalyzeInput::default()).await.unwrap_err();

        assert_eq!(oracle.invocation_count(), 0);
        assert!(err.is_caller_fault());
        assert!(err.public_message().contains("`text` or `image`"));
    }

    #[tokio::test]
    async fn oversized_text_is_rejected_before_any_oracle_call() {
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let pipeline = AnalysisPipeline::new(oracle.clone());

        let err = pipeline
            .run(text_input(&"x".repeat(subtext_core::MAX_TEXT_LEN + 1)))
            .await
            .unwrap_err();

        assert_eq!(oracle.invocation_count(), 0);
        assert!(err.is_caller_fault());
    }

    #[tokio::test]
    async fn full_run_sanitizes_flagged_oracle_language() {
        // The oracle echoes back absolute and prescriptive language from
        // the input; none of it may survive the guardrail.
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(core_json(
                "She will definitely always leave him",
                "you should tell him tonight",
            )),
            Ok(strategies_json(&[
                "Definitely wait",
                "Tell them directly",
                "Ask a question",
            ])),
        ]));
        let pipeline = AnalysisPipeline::new(oracle.clone());

        let result = pipeline
            .run(text_input(
                "I will definitely always leave him, you should tell him tonight.",
            ))
            .await
            .unwrap();

        assert_eq!(oracle.invocation_count(), 2);

        let implied = &result.subtext_summary.implied;
        assert!(!implied.to_lowercase().contains("definitely"));
        assert!(!implied.to_lowercase().contains("always"));
        assert!(!implied.to_lowercase().contains("leave him"));
        assert_eq!(implied, "She will likely likely [consider]");

        let risk = &result.risk_flags[0].description;
        assert!(!risk.to_lowercase().contains("you should"));
        assert!(!risk.to_lowercase().contains("tell him"));
        assert_eq!(risk, "[consider] [consider] tonight");

        assert_eq!(result.strategies[0].name, "likely wait");
        assert_eq!(result.strategies[1].name, "[consider] directly");
    }

    #[tokio::test]
    async fn fenced_core_output_still_reaches_strategy_stage() {
        let fenced = format!("```json\n{}\n```", core_json("a", "b"));
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(fenced),
            Ok(strategies_json(&["One", "Two", "Three"])),
        ]));
        let pipeline = AnalysisPipeline::new(oracle.clone());

        let result = pipeline.run(text_input("hello")).await.unwrap();

        assert_eq!(oracle.invocation_count(), 2);
        assert_eq!(result.strategies.len(), 3);
        assert_eq!(result.intent_score, 82.0);
    }

    #[tokio::test]
    async fn strategy_count_drift_is_accepted() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(core_json("a", "b")),
            Ok(strategies_json(&["Only one", "And two"])),
        ]));
        let pipeline = AnalysisPipeline::new(oracle);

        let result = pipeline.run(text_input("hello")).await.unwrap();
        assert_eq!(result.strategies.len(), 2);
    }

    #[tokio::test]
    async fn patterns_are_always_empty_in_single_shot_mode() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(core_json("a", "b")),
            Ok(strategies_json(&["One", "Two", "Three"])),
        ]));
        let pipeline = AnalysisPipeline::new(oracle);

        let result = pipeline.run(text_input("hello")).await.unwrap();
        assert!(result.patterns.is_empty());
    }

    #[tokio::test]
    async fn image_only_input_runs_the_pipeline() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(core_json("a", "b")),
            Ok(strategies_json(&["One", "Two", "Three"])),
        ]));
        let pipeline = AnalysisPipeline::new(oracle.clone());

        let input = AnalyzeInput {
            image: Some(ImagePayload {
                mime_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            }),
            ..Default::default()
        };

        let result = pipeline.run(input).await.unwrap();
        assert_eq!(oracle.invocation_count(), 2);
        assert_eq!(result.confidence, 74.0);
    }

    #[test]
    fn describe_input_mentions_context_when_present() {
        let mut input = text_input("hey");
        input.context = Some("long-distance relationship".to_string());
        let described = describe_input(&input);
        assert!(described.contains("\"hey\""));
        assert!(described.contains("long-distance relationship"));
    }
}
