//! Portable chain document used for import, export and seed files

use serde::{Deserialize, Serialize};

use super::entity::{Chain, ChainName};
use super::error::ChainError;
use super::step::ChainStep;

/// A chain as exchanged with the outside world, without timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<ChainStep>,
}

impl ChainDocument {
    /// Validate the name and step numbering and build a fresh chain
    pub fn into_chain(self) -> Result<Chain, ChainError> {
        let name = ChainName::new(self.name)?;
        let mut chain = Chain::from_steps(name, self.steps)?;
        chain.set_description(self.description);
        Ok(chain)
    }
}

impl From<&Chain> for ChainDocument {
    fn from(chain: &Chain) -> Self {
        Self {
            name: chain.name().to_string(),
            description: chain.description().map(str::to_string),
            steps: chain.steps().to_vec(),
        }
    }
}
