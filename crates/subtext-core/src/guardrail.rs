//! Safety guardrail - the last gate before a result leaves the pipeline.
//!
//! The oracle is untrusted at the semantic level: even a structurally valid
//! result may carry overconfident or directive language that this service
//! must not relay. The guardrail rewrites every exposed free-text field and
//! clamps the bounded scores, deterministically and without ever failing.
//! No consumer may see a result that has not passed through [`enforce`].

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::AnalysisResult;

/// Unconditional/universal claims the oracle must not assert.
const ABSOLUTE_TERMS: &[&str] = &[
    "definitely",
    "absolutely",
    "always",
    "never",
    "must",
    "obviously",
    "undeniably",
];

/// Direct second-person directives the oracle must not issue.
const PRESCRIPTIVE_PHRASES: &[&str] = &[
    "you should",
    "you need to",
    "do this",
    "tell them",
    "tell him",
    "tell her",
    "ask him",
    "ask her",
    "break up",
    "leave him",
    "leave her",
];

/// Replacement for absolute terms. Contains no listed term, so a second
/// pass finds nothing to rewrite.
const HEDGE: &str = "likely";

/// Replacement for prescriptive phrases.
const PLACEHOLDER: &str = "[consider]";

lazy_static! {
    static ref ABSOLUTE_RES: Vec<Regex> = compile_word_bounded(ABSOLUTE_TERMS);
    static ref PRESCRIPTIVE_RES: Vec<Regex> = compile_word_bounded(PRESCRIPTIVE_PHRASES);
}

/// Case-insensitive, word-boundary-anchored pattern per listed entry, so
/// substrings inside unrelated words (e.g. "alwaysish") stay untouched.
fn compile_word_bounded(entries: &[&str]) -> Vec<Regex> {
    entries
        .iter()
        .map(|entry| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(entry)))
                .expect("guardrail pattern must compile")
        })
        .collect()
}

/// Rewrite one free-text field.
pub fn sanitize_text(text: &str) -> String {
    let mut sanitized = text.to_string();

    for re in ABSOLUTE_RES.iter() {
        sanitized = re.replace_all(&sanitized, HEDGE).into_owned();
    }
    for re in PRESCRIPTIVE_RES.iter() {
        sanitized = re.replace_all(&sanitized, PLACEHOLDER).into_owned();
    }

    sanitized
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Apply the safety policy to an assembled result.
///
/// Total over any well-typed [`AnalysisResult`]: sanitizes the subtext
/// fields, strategy name/goal/risks, and pattern/risk descriptions, and
/// clamps `intent_score` and `confidence` into [0, 100]. The clamp is
/// redundant with schema validation on purpose - the guardrail must be safe
/// to run even on a result that bypassed validation.
pub fn enforce(result: AnalysisResult) -> AnalysisResult {
    let mut safe = result;

    safe.subtext_summary.explicit = sanitize_text(&safe.subtext_summary.explicit);
    safe.subtext_summary.implied = sanitize_text(&safe.subtext_summary.implied);
    safe.subtext_summary.avoided = sanitize_text(&safe.subtext_summary.avoided);

    safe.intent_score = clamp_score(safe.intent_score);
    safe.confidence = clamp_score(safe.confidence);

    for strategy in &mut safe.strategies {
        strategy.name = sanitize_text(&strategy.name);
        strategy.optimization_goal = sanitize_text(&strategy.optimization_goal);
        strategy.risks = strategy.risks.iter().map(|r| sanitize_text(r)).collect();
    }

    for pattern in &mut safe.patterns {
        pattern.description = sanitize_text(&pattern.description);
    }

    for flag in &mut safe.risk_flags {
        flag.description = sanitize_text(&flag.description);
    }

    safe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        PatternSignal, RiskFlag, RiskLevel, Strategy, SubtextSummary, Trend,
    };
    use proptest::prelude::*;

    fn result_with(summary: &str, score: f64) -> AnalysisResult {
        AnalysisResult {
            intent_score: score,
            confidence: score,
            emotional_tones: vec!["tense".to_string()],
            subtext_summary: SubtextSummary {
                explicit: summary.to_string(),
                implied: summary.to_string(),
                avoided: summary.to_string(),
            },
            patterns: vec![],
            risk_flags: vec![],
            strategies: vec![],
        }
    }

    #[test]
    fn replaces_absolute_terms_with_hedge() {
        assert_eq!(
            sanitize_text("He will definitely cancel"),
            "He will likely cancel"
        );
        assert_eq!(sanitize_text("She always does this"), "She likely does this");
    }

    #[test]
    fn replacement_is_case_insensitive() {
        assert_eq!(sanitize_text("NEVER again"), "likely again");
        assert_eq!(sanitize_text("Obviously upset"), "likely upset");
    }

    #[test]
    fn substrings_inside_unrelated_words_are_untouched() {
        assert_eq!(sanitize_text("an alwaysish feeling"), "an alwaysish feeling");
        assert_eq!(sanitize_text("mustard on the side"), "mustard on the side");
        assert_eq!(sanitize_text("nevertheless"), "nevertheless");
    }

    #[test]
    fn replaces_prescriptive_phrases_with_placeholder() {
        assert_eq!(
            sanitize_text("You should call her tonight"),
            "[consider] call her tonight"
        );
        assert_eq!(
            sanitize_text("Maybe tell them how you feel"),
            "Maybe [consider] how you feel"
        );
    }

    #[test]
    fn sanitize_is_idempotent() {
        let noisy = "You should definitely leave him, he ALWAYS does this, never forget it";
        let once = sanitize_text(noisy);
        let twice = sanitize_text(&once);
        assert_eq!(once, twice);
        assert!(!once.to_lowercase().contains("definitely"));
        assert!(!once.to_lowercase().contains("you should"));
    }

    #[test]
    fn clamps_scores_at_both_ends() {
        let low = enforce(result_with("fine", -1.0));
        assert_eq!(low.intent_score, 0.0);
        assert_eq!(low.confidence, 0.0);

        let high = enforce(result_with("fine", 101.0));
        assert_eq!(high.intent_score, 100.0);
        assert_eq!(high.confidence, 100.0);

        let zero = enforce(result_with("fine", 0.0));
        assert_eq!(zero.intent_score, 0.0);

        let hundred = enforce(result_with("fine", 100.0));
        assert_eq!(hundred.intent_score, 100.0);
    }

    #[test]
    fn enforce_covers_every_enumerated_text_field() {
        let mut result = result_with("they must respond", 50.0);
        result.strategies.push(Strategy {
            name: "Definitely wait".to_string(),
            optimization_goal: "you should give space".to_string(),
            risks: vec!["he never responds well to silence".to_string()],
            sample_reply: Some("ok".to_string()),
        });
        result.patterns.push(PatternSignal {
            kind: "withdrawal".to_string(),
            strength: 40.0,
            trend: Trend::Stable,
            description: "she always goes quiet first".to_string(),
        });
        result.risk_flags.push(RiskFlag {
            kind: "ultimatum".to_string(),
            level: RiskLevel::Red,
            probability: 80.0,
            description: "you need to decide now".to_string(),
        });

        let safe = enforce(result);

        assert_eq!(safe.subtext_summary.explicit, "they likely respond");
        assert_eq!(safe.strategies[0].name, "likely wait");
        assert_eq!(safe.strategies[0].optimization_goal, "[consider] give space");
        assert_eq!(
            safe.strategies[0].risks[0],
            "he likely responds well to silence"
        );
        assert_eq!(safe.patterns[0].description, "she likely goes quiet first");
        assert_eq!(safe.risk_flags[0].description, "[consider] decide now");
    }

    #[test]
    fn enforce_is_idempotent_on_full_results() {
        let mut result = result_with("you should definitely go", 150.0);
        result.strategies.push(Strategy {
            name: "never mind".to_string(),
            optimization_goal: "calm".to_string(),
            risks: vec![],
            sample_reply: None,
        });

        let once = enforce(result);
        let twice = enforce(once.clone());
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn sanitize_idempotent_on_arbitrary_text(text in "\\PC{0,200}") {
            let once = sanitize_text(&text);
            let twice = sanitize_text(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn clamped_scores_stay_in_range(score in -1000.0f64..1000.0) {
            let safe = enforce(result_with("x", score));
            prop_assert!((0.0..=100.0).contains(&safe.intent_score));
            prop_assert!((0.0..=100.0).contains(&safe.confidence));
        }
    }
}
