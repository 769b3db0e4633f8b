//! Chain entity and step list editing

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ChainError;
use super::step::{ChainStep, StepKind};
use crate::domain::storage::{StorageEntity, StorageKey};

const MAX_CHAIN_NAME_LENGTH: usize = 100;

/// Unique, human readable chain name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainName(String);

impl ChainName {
    /// Create a new ChainName after validation
    pub fn new(name: impl Into<String>) -> Result<Self, ChainError> {
        let name = name.into();
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(ChainError::validation("Chain name cannot be empty"));
        }

        if trimmed.chars().count() > MAX_CHAIN_NAME_LENGTH {
            return Err(ChainError::validation(format!(
                "Chain name cannot exceed {} characters",
                MAX_CHAIN_NAME_LENGTH
            )));
        }

        if trimmed.contains('/') || trimmed.chars().any(char::is_control) {
            return Err(ChainError::validation(format!(
                "Chain name '{}' contains invalid characters",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChainName {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChainName> for String {
    fn from(name: ChainName) -> Self {
        name.0
    }
}

impl std::fmt::Display for ChainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for ChainName {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// A named, ordered list of steps
///
/// Step numbers are always `1..=len` with no gaps; every editing operation
/// keeps that invariant and leaves the chain untouched when it fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    name: ChainName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    steps: Vec<ChainStep>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Chain {
    pub fn new(name: ChainName) -> Self {
        let now = Utc::now();
        Self {
            name,
            description: None,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build a chain from an externally supplied step list, sorted by step number
    pub fn from_steps(name: ChainName, mut steps: Vec<ChainStep>) -> Result<Self, ChainError> {
        steps.sort_by_key(|s| s.step_number);

        for (index, step) in steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.step_number != expected {
                return Err(ChainError::validation(format!(
                    "Step numbers must be contiguous starting at 1; expected {} but found {}",
                    expected, step.step_number
                )));
            }
        }

        let mut chain = Self::new(name);
        chain.steps = steps;
        Ok(chain)
    }

    pub fn name(&self) -> &ChainName {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn step(&self, step_number: u32) -> Option<&ChainStep> {
        let index = (step_number as usize).checked_sub(1)?;
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_name(&mut self, name: ChainName) {
        self.name = name;
        self.touch();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    /// Insert a step at `step_number`, shifting later steps up by one
    pub fn add_step(
        &mut self,
        step_number: u32,
        agent_name: impl Into<String>,
        kind: StepKind,
    ) -> Result<&ChainStep, ChainError> {
        self.insert_step(ChainStep::new(step_number, agent_name, kind))
    }

    /// Insert a fully specified step at its `step_number`, shifting later steps up by one
    pub fn insert_step(&mut self, step: ChainStep) -> Result<&ChainStep, ChainError> {
        self.check_insert_position(step.step_number)?;

        let index = step.step_number as usize - 1;
        self.steps.insert(index, step);
        self.renumber_from(index);
        self.touch();

        Ok(&self.steps[index])
    }

    /// Replace step `step_number` in place, or append it when it is `len + 1`
    pub fn upsert_step(&mut self, step: ChainStep) -> Result<&ChainStep, ChainError> {
        self.check_insert_position(step.step_number)?;

        let index = step.step_number as usize - 1;
        if index == self.steps.len() {
            self.steps.push(step);
        } else {
            self.steps[index] = step;
        }
        self.touch();

        Ok(&self.steps[index])
    }

    /// Swap two existing steps; only the pair is renumbered
    pub fn move_step(&mut self, old_step_number: u32, new_step_number: u32) -> Result<(), ChainError> {
        let old_index = self.existing_index(old_step_number)?;
        let new_index = self.existing_index(new_step_number)?;

        if old_index == new_index {
            return Ok(());
        }

        self.steps.swap(old_index, new_index);
        self.steps[old_index].step_number = old_step_number;
        self.steps[new_index].step_number = new_step_number;
        self.touch();

        Ok(())
    }

    /// Remove a step and shift later steps down by one
    pub fn delete_step(&mut self, step_number: u32) -> Result<ChainStep, ChainError> {
        let index = self.existing_index(step_number)?;

        let removed = self.steps.remove(index);
        self.renumber_from(index);
        self.touch();

        Ok(removed)
    }

    /// Every distinct run-time argument name referenced by the steps, in first-use order
    pub fn argument_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for step in &self.steps {
            for name in super::context::argument_names(step.kind.template()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    fn check_insert_position(&self, step_number: u32) -> Result<(), ChainError> {
        let max = self.steps.len() as u32 + 1;
        if step_number < 1 || step_number > max {
            return Err(ChainError::InvalidPosition {
                position: step_number,
                max,
            });
        }
        Ok(())
    }

    fn existing_index(&self, step_number: u32) -> Result<usize, ChainError> {
        if step_number < 1 || step_number as usize > self.steps.len() {
            return Err(ChainError::out_of_range(self.name.as_str(), step_number));
        }
        Ok(step_number as usize - 1)
    }

    fn renumber_from(&mut self, index: usize) {
        for (offset, step) in self.steps.iter_mut().enumerate().skip(index) {
            step.step_number = offset as u32 + 1;
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl StorageEntity for Chain {
    type Key = ChainName;

    fn key(&self) -> &Self::Key {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> ChainName {
        ChainName::new(value).unwrap()
    }

    fn chain_with_prompts(prompts: &[&str]) -> Chain {
        let mut chain = Chain::new(name("test"));
        for (i, prompt) in prompts.iter().enumerate() {
            chain
                .add_step(i as u32 + 1, "agent", StepKind::prompt(*prompt))
                .unwrap();
        }
        chain
    }

    fn prompts(chain: &Chain) -> Vec<&str> {
        chain.steps().iter().map(|s| s.kind.template()).collect()
    }

    fn assert_dense(chain: &Chain) {
        for (i, step) in chain.steps().iter().enumerate() {
            assert_eq!(step.step_number, i as u32 + 1);
        }
    }

    #[test]
    fn test_chain_name_validation() {
        assert_eq!(name("  Smart Instruct ").as_str(), "Smart Instruct");
        assert!(ChainName::new("").is_err());
        assert!(ChainName::new("   ").is_err());
        assert!(ChainName::new("a/b").is_err());
        assert!(ChainName::new("x".repeat(101)).is_err());
        assert!(ChainName::new("x".repeat(100)).is_ok());
    }

    #[test]
    fn test_add_step_in_middle_shifts_later_steps() {
        let mut chain = chain_with_prompts(&["A", "B", "C"]);

        chain.add_step(2, "agent", StepKind::prompt("X")).unwrap();

        assert_eq!(prompts(&chain), vec!["A", "X", "B", "C"]);
        assert_dense(&chain);
    }

    #[test]
    fn test_add_step_appends_at_len_plus_one() {
        let mut chain = chain_with_prompts(&["A"]);
        let step = chain.add_step(2, "agent", StepKind::prompt("B")).unwrap();
        assert_eq!(step.step_number, 2);
        assert_eq!(prompts(&chain), vec!["A", "B"]);
    }

    #[test]
    fn test_add_step_invalid_position_leaves_chain_unchanged() {
        let mut chain = chain_with_prompts(&["A", "B"]);
        let before = chain.clone();

        let err = chain.add_step(4, "agent", StepKind::prompt("X")).unwrap_err();
        assert_eq!(err, ChainError::InvalidPosition { position: 4, max: 3 });

        let err = chain.add_step(0, "agent", StepKind::prompt("X")).unwrap_err();
        assert!(matches!(err, ChainError::InvalidPosition { position: 0, .. }));

        assert_eq!(chain, before);
    }

    #[test]
    fn test_delete_step_renumbers() {
        let mut chain = chain_with_prompts(&["A", "B", "C", "D"]);

        let removed = chain.delete_step(2).unwrap();

        assert_eq!(removed.kind.template(), "B");
        assert_eq!(prompts(&chain), vec!["A", "C", "D"]);
        assert_dense(&chain);
    }

    #[test]
    fn test_delete_missing_step_is_out_of_range() {
        let mut chain = chain_with_prompts(&["A"]);
        let err = chain.delete_step(2).unwrap_err();
        assert_eq!(err, ChainError::out_of_range("test", 2));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_move_step_swaps_pair() {
        let mut chain = chain_with_prompts(&["A", "B", "C"]);

        chain.move_step(1, 3).unwrap();

        assert_eq!(prompts(&chain), vec!["C", "B", "A"]);
        assert_dense(&chain);
    }

    #[test]
    fn test_move_step_out_of_range() {
        let mut chain = chain_with_prompts(&["A", "B"]);
        let before = chain.clone();

        let err = chain.move_step(1, 5).unwrap_err();

        assert!(matches!(err, ChainError::OutOfRange { step_number: 5, .. }));
        assert_eq!(chain, before);
    }

    #[test]
    fn test_upsert_replaces_or_appends() {
        let mut chain = chain_with_prompts(&["A", "B"]);

        chain
            .upsert_step(ChainStep::new(2, "other", StepKind::prompt("B2")))
            .unwrap();
        chain
            .upsert_step(ChainStep::new(3, "other", StepKind::prompt("C")))
            .unwrap();
        let err = chain
            .upsert_step(ChainStep::new(5, "other", StepKind::prompt("E")))
            .unwrap_err();

        assert_eq!(prompts(&chain), vec!["A", "B2", "C"]);
        assert_eq!(chain.step(2).unwrap().agent_name, "other");
        assert!(matches!(err, ChainError::InvalidPosition { position: 5, max: 4 }));
    }

    #[test]
    fn test_from_steps_sorts_and_validates_numbering() {
        let chain = Chain::from_steps(
            name("imported"),
            vec![
                ChainStep::new(2, "a", StepKind::prompt("second")),
                ChainStep::new(1, "a", StepKind::prompt("first")),
            ],
        )
        .unwrap();
        assert_eq!(prompts(&chain), vec!["first", "second"]);

        let err = Chain::from_steps(
            name("gappy"),
            vec![
                ChainStep::new(1, "a", StepKind::prompt("first")),
                ChainStep::new(3, "a", StepKind::prompt("third")),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
    }

    #[test]
    fn test_argument_names_are_distinct_and_ordered() {
        let chain = chain_with_prompts(&[
            "Write about {topic} for {user_input}",
            "Translate {STEP1} into {language}",
            "Polish {STEP_2} about {topic}",
        ]);

        assert_eq!(chain.argument_names(), vec!["topic", "language"]);
    }

    #[test]
    fn test_chain_document_round_trip_keeps_steps() {
        let chain = chain_with_prompts(&["A", "B"]).with_description("demo");
        let json = serde_json::to_string(&chain).unwrap();
        let parsed: Chain = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, chain);
        assert_eq!(parsed.description(), Some("demo"));
    }
}
