//! Schema registry - named data contracts for stage outputs.
//!
//! The oracle is untrusted at the structural level: it may omit fields, use
//! wrong types, or emit numbers outside their declared ranges regardless of
//! what the prompt asked for. Before any stage output is deserialized into a
//! typed value, it is checked here against the contract for that stage.
//!
//! Validation is total over any JSON value and enumerates **every**
//! violation instead of failing on the first mismatch, so one log line can
//! carry the complete diagnostic for a bad oracle response.

use serde_json::Value;
use thiserror::Error;

/// Names of the registered contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaName {
    /// Combined output of the core-analysis stage.
    CoreAnalysis,
    /// Output of the strategy-synthesis stage.
    StrategySet,
    /// The final assembled artifact.
    AnalysisResult,
}

impl SchemaName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaName::CoreAnalysis => "core_analysis",
            SchemaName::StrategySet => "strategy_set",
            SchemaName::AnalysisResult => "analysis_result",
        }
    }
}

impl std::fmt::Display for SchemaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted path to the offending field (e.g. `risk_flags[2].probability`).
    pub field: String,

    /// What was wrong with it.
    pub problem: String,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

/// A value failed validation against a named schema.
///
/// `Display` is deliberately terse; [`SchemaViolation::details`] renders the
/// full violation list for the logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("value does not conform to schema `{schema}` ({} violations)", .violations.len())]
pub struct SchemaViolation {
    pub schema: &'static str,
    pub violations: Vec<FieldViolation>,
}

impl SchemaViolation {
    /// Full diagnostic, one violation per line.
    pub fn details(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Validate `candidate` against the named contract.
///
/// Returns `Ok(())` when the value conforms, or a [`SchemaViolation`]
/// listing every field that failed.
pub fn validate(candidate: &Value, schema: SchemaName) -> Result<(), SchemaViolation> {
    let mut checker = Checker::new();

    match schema {
        SchemaName::CoreAnalysis => check_core_analysis(&mut checker, candidate),
        SchemaName::StrategySet => check_strategy_set(&mut checker, candidate),
        SchemaName::AnalysisResult => check_analysis_result(&mut checker, candidate),
    }

    checker.finish(schema)
}

const RISK_LEVELS: &[&str] = &["red", "yellow", "green"];
const TRENDS: &[&str] = &["increasing", "stable", "decreasing"];

fn check_core_analysis(c: &mut Checker, value: &Value) {
    let Some(obj) = c.object(value, "") else {
        return;
    };

    if let Some(summary) = c.field(obj, "subtext_summary") {
        check_subtext_summary(c, summary);
    }
    c.bounded_number(obj, "intent_score");
    c.bounded_number(obj, "confidence");
    c.string_array(obj, "emotional_tones");
    c.array_of(obj, "risk_flags", check_risk_flag);
}

fn check_strategy_set(c: &mut Checker, value: &Value) {
    let Some(obj) = c.object(value, "") else {
        return;
    };
    c.array_of(obj, "strategies", check_strategy);
}

fn check_analysis_result(c: &mut Checker, value: &Value) {
    let Some(obj) = c.object(value, "") else {
        return;
    };

    c.bounded_number(obj, "intent_score");
    c.bounded_number(obj, "confidence");
    c.string_array(obj, "emotional_tones");
    if let Some(summary) = c.field(obj, "subtext_summary") {
        check_subtext_summary(c, summary);
    }
    c.array_of(obj, "patterns", check_pattern_signal);
    c.array_of(obj, "risk_flags", check_risk_flag);
    c.array_of(obj, "strategies", check_strategy);
}

fn check_subtext_summary(c: &mut Checker, value: &Value) {
    let Some(obj) = c.object(value, "subtext_summary") else {
        return;
    };
    c.string(obj, "subtext_summary", "explicit");
    c.string(obj, "subtext_summary", "implied");
    c.string(obj, "subtext_summary", "avoided");
}

fn check_risk_flag(c: &mut Checker, path: &str, value: &Value) {
    let Some(obj) = c.object(value, path) else {
        return;
    };
    c.string(obj, path, "type");
    c.enum_string(obj, path, "level", RISK_LEVELS);
    c.bounded_number_at(obj, path, "probability");
    c.string(obj, path, "description");
}

fn check_pattern_signal(c: &mut Checker, path: &str, value: &Value) {
    let Some(obj) = c.object(value, path) else {
        return;
    };
    c.string(obj, path, "type");
    c.bounded_number_at(obj, path, "strength");
    c.enum_string(obj, path, "trend", TRENDS);
    c.string(obj, path, "description");
}

fn check_strategy(c: &mut Checker, path: &str, value: &Value) {
    let Some(obj) = c.object(value, path) else {
        return;
    };
    c.string(obj, path, "name");
    c.string(obj, path, "optimization_goal");
    c.string_array_at(obj, path, "risks");
    c.optional_string(obj, path, "sample_reply");
}

/// Accumulates violations while walking a candidate value.
struct Checker {
    violations: Vec<FieldViolation>,
}

type JsonObject = serde_json::Map<String, Value>;

impl Checker {
    fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    fn finish(self, schema: SchemaName) -> Result<(), SchemaViolation> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolation {
                schema: schema.as_str(),
                violations: self.violations,
            })
        }
    }

    fn push(&mut self, field: impl Into<String>, problem: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            problem: problem.into(),
        });
    }

    fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a JsonObject> {
        match value.as_object() {
            Some(obj) => Some(obj),
            None => {
                let field = if path.is_empty() { "$" } else { path };
                self.push(field, format!("expected object, got {}", type_name(value)));
                None
            }
        }
    }

    fn field<'a>(&mut self, obj: &'a JsonObject, name: &str) -> Option<&'a Value> {
        match obj.get(name) {
            Some(value) => Some(value),
            None => {
                self.push(name, "missing required field");
                None
            }
        }
    }

    fn string(&mut self, obj: &JsonObject, path: &str, name: &str) {
        let full = join(path, name);
        match obj.get(name) {
            None => self.push(full, "missing required field"),
            Some(Value::String(_)) => {}
            Some(other) => self.push(full, format!("expected string, got {}", type_name(other))),
        }
    }

    fn optional_string(&mut self, obj: &JsonObject, path: &str, name: &str) {
        match obj.get(name) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(other) => self.push(
                join(path, name),
                format!("expected string or null, got {}", type_name(other)),
            ),
        }
    }

    fn bounded_number(&mut self, obj: &JsonObject, name: &str) {
        self.bounded_number_at(obj, "", name);
    }

    fn bounded_number_at(&mut self, obj: &JsonObject, path: &str, name: &str) {
        let full = join(path, name);
        match obj.get(name) {
            None => self.push(full, "missing required field"),
            Some(value) => match value.as_f64() {
                Some(n) if (0.0..=100.0).contains(&n) => {}
                Some(n) => self.push(full, format!("{} is outside the range [0, 100]", n)),
                None => self.push(full, format!("expected number, got {}", type_name(value))),
            },
        }
    }

    fn enum_string(&mut self, obj: &JsonObject, path: &str, name: &str, allowed: &[&str]) {
        let full = join(path, name);
        match obj.get(name) {
            None => self.push(full, "missing required field"),
            Some(Value::String(s)) if allowed.contains(&s.as_str()) => {}
            Some(Value::String(s)) => self.push(
                full,
                format!("`{}` is not one of {}", s, allowed.join("|")),
            ),
            Some(other) => self.push(full, format!("expected string, got {}", type_name(other))),
        }
    }

    fn string_array(&mut self, obj: &JsonObject, name: &str) {
        self.string_array_at(obj, "", name);
    }

    fn string_array_at(&mut self, obj: &JsonObject, path: &str, name: &str) {
        let full = join(path, name);
        match obj.get(name) {
            None => self.push(full, "missing required field"),
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        self.push(
                            format!("{}[{}]", full, i),
                            format!("expected string, got {}", type_name(item)),
                        );
                    }
                }
            }
            Some(other) => self.push(full, format!("expected array, got {}", type_name(other))),
        }
    }

    fn array_of(
        &mut self,
        obj: &JsonObject,
        name: &str,
        check_item: fn(&mut Checker, &str, &Value),
    ) {
        match obj.get(name) {
            None => self.push(name, "missing required field"),
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    check_item(self, &format!("{}[{}]", name, i), item);
                }
            }
            Some(other) => self.push(name, format!("expected array, got {}", type_name(other))),
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
