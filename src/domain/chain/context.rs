//! Execution context and placeholder resolution
//!
//! Templates may reference:
//! - `{user_input}` - the input the run was started with
//! - `{STEPn}` or `{STEP_n}` - the output of an earlier step `n`
//! - `{name}` - a run-time chain argument
//!
//! Resolution is a single left-to-right pass. Substituted text is never
//! rescanned, and anything that cannot be resolved stays verbatim.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use super::error::ChainError;

/// Regex for a placeholder: an identifier in single braces
static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Regex for a step reference name: STEP3 or STEP_3
static STEP_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^STEP_?([0-9]+)$").unwrap());

const USER_INPUT: &str = "user_input";

fn step_reference(name: &str) -> Option<u32> {
    STEP_REFERENCE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Names of run-time arguments used by a template, excluding built-in references
pub fn argument_names(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_PATTERN.captures_iter(template) {
        let name = &caps[1];
        if name == USER_INPUT || step_reference(name).is_some() {
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// State carried through one chain run
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    user_input: String,
    args: HashMap<String, String>,
    outputs: BTreeMap<u32, String>,
    agent_override: Option<String>,
    call_stack: Vec<String>,
}

impl ExecutionContext {
    /// Context for a top-level run of `chain_name`
    pub fn new(chain_name: impl Into<String>, user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            args: HashMap::new(),
            outputs: BTreeMap::new(),
            agent_override: None,
            call_stack: vec![chain_name.into()],
        }
    }

    pub fn with_args(mut self, args: HashMap<String, String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_agent_override(mut self, agent_name: Option<String>) -> Self {
        self.agent_override = agent_name;
        self
    }

    /// Seed outputs for steps that are not executed in this run
    pub fn with_outputs(mut self, outputs: BTreeMap<u32, String>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Context for a nested run of `chain_name`, sharing args and agent override
    pub fn child(
        &self,
        chain_name: &str,
        user_input: impl Into<String>,
        max_depth: usize,
    ) -> Result<Self, ChainError> {
        if self.call_stack.iter().any(|name| name == chain_name) {
            let mut path = self.call_stack.clone();
            path.push(chain_name.to_string());
            return Err(ChainError::CyclicChainReference(path));
        }

        if self.call_stack.len() >= max_depth {
            return Err(ChainError::MaxDepthExceeded(max_depth));
        }

        let mut call_stack = self.call_stack.clone();
        call_stack.push(chain_name.to_string());

        Ok(Self {
            user_input: user_input.into(),
            args: self.args.clone(),
            outputs: BTreeMap::new(),
            agent_override: self.agent_override.clone(),
            call_stack,
        })
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn args(&self) -> &HashMap<String, String> {
        &self.args
    }

    pub fn agent_override(&self) -> Option<&str> {
        self.agent_override.as_deref()
    }

    pub fn call_stack(&self) -> &[String] {
        &self.call_stack
    }

    /// Name of the chain this context is running
    pub fn chain_name(&self) -> &str {
        self.call_stack.last().map(String::as_str).unwrap_or_default()
    }

    /// The agent a step runs under: the override if set, else the step's own
    pub fn agent_for<'a>(&'a self, step_agent: &'a str) -> &'a str {
        self.agent_override.as_deref().unwrap_or(step_agent)
    }

    pub fn record_output(&mut self, step_number: u32, output: impl Into<String>) {
        self.outputs.insert(step_number, output.into());
    }

    pub fn output(&self, step_number: u32) -> Option<&str> {
        self.outputs.get(&step_number).map(String::as_str)
    }

    pub fn outputs(&self) -> &BTreeMap<u32, String> {
        &self.outputs
    }

    /// Resolve placeholders in `template` for the step numbered `current_step`
    pub fn resolve(&self, template: &str, current_step: u32) -> String {
        PLACEHOLDER_PATTERN
            .replace_all(template, |caps: &Captures| {
                let name = &caps[1];

                if name == USER_INPUT {
                    return self.user_input.clone();
                }

                if let Some(step_number) = step_reference(name) {
                    return match self.outputs.get(&step_number) {
                        Some(output) if step_number < current_step => output.clone(),
                        _ => caps[0].to_string(),
                    };
                }

                match self.args.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Resolve placeholders inside every string of a JSON value, leaving its structure intact
    pub fn resolve_json(&self, value: &Value, current_step: u32) -> Value {
        match value {
            Value::String(s) => Value::String(self.resolve(s, current_step)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_json(item, current_step))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.resolve_json(item, current_step)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ExecutionContext {
        let mut ctx = ExecutionContext::new("root", "hello");
        ctx.record_output(1, "first");
        ctx.record_output(2, "second");
        ctx
    }

    #[test]
    fn test_resolve_user_input_and_steps() {
        let ctx = context();
        assert_eq!(
            ctx.resolve("{user_input}: {STEP1} then {STEP_2}", 3),
            "hello: first then second"
        );
    }

    #[test]
    fn test_forward_and_missing_references_stay_verbatim() {
        let ctx = context();
        assert_eq!(ctx.resolve("{STEP2} {STEP3}", 2), "{STEP2} {STEP3}");
        assert_eq!(ctx.resolve("{STEP9}", 10), "{STEP9}");
    }

    #[test]
    fn test_unknown_and_malformed_placeholders_stay_verbatim() {
        let ctx = context();
        assert_eq!(
            ctx.resolve("{unknown} {{user_input}} { user_input } {1abc} {}", 1),
            "{unknown} {hello} { user_input } {1abc} {}"
        );
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let mut ctx = ExecutionContext::new("root", "{STEP1}");
        ctx.record_output(1, "{user_input}");

        assert_eq!(ctx.resolve("{user_input}|{STEP1}", 2), "{STEP1}|{user_input}");
    }

    #[test]
    fn test_resolve_json_keeps_structure() {
        let mut ctx = ExecutionContext::new("root", "x");
        ctx.record_output(1, "say \"hi\"\nbye");

        let template = serde_json::json!({
            "input": "{STEP1}",
            "{STEP1}": 3,
            "list": ["a {user_input}", true]
        });

        assert_eq!(
            ctx.resolve_json(&template, 2),
            serde_json::json!({
                "input": "say \"hi\"\nbye",
                "{STEP1}": 3,
                "list": ["a x", true]
            })
        );
    }

    #[test]
    fn test_args_resolve() {
        let mut args = HashMap::new();
        args.insert("topic".to_string(), "rust".to_string());
        let ctx = ExecutionContext::new("root", "x").with_args(args);

        assert_eq!(ctx.resolve("About {topic}, not {other}", 1), "About rust, not {other}");
    }

    #[test]
    fn test_argument_names_skip_builtins() {
        assert_eq!(
            argument_names("{user_input} {STEP1} {STEP_2} {topic} {topic} {tone}"),
            vec!["topic", "tone"]
        );
    }

    #[test]
    fn test_child_detects_cycles() {
        let ctx = ExecutionContext::new("a", "x");
        let child = ctx.child("b", "y", 10).unwrap();

        assert_eq!(child.call_stack(), ["a", "b"]);
        assert_eq!(child.chain_name(), "b");
        assert_eq!(child.user_input(), "y");

        let err = child.child("a", "z", 10).unwrap_err();
        assert_eq!(
            err,
            ChainError::CyclicChainReference(vec![
                "a".to_string(),
                "b".to_string(),
                "a".to_string()
            ])
        );
    }

    #[test]
    fn test_child_respects_max_depth() {
        let ctx = ExecutionContext::new("a", "x");
        let child = ctx.child("b", "y", 2).unwrap();
        assert_eq!(child.child("c", "z", 2).unwrap_err(), ChainError::MaxDepthExceeded(2));
    }

    #[test]
    fn test_child_inherits_override_but_not_outputs() {
        let mut ctx = ExecutionContext::new("a", "x").with_agent_override(Some("boss".to_string()));
        ctx.record_output(1, "done");

        let child = ctx.child("b", "y", 5).unwrap();

        assert_eq!(child.agent_for("worker"), "boss");
        assert!(child.outputs().is_empty());
        assert_eq!(ExecutionContext::new("a", "x").agent_for("worker"), "worker");
    }
}
