pub mod duplication;

pub use duplication::*;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the duplication detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Fragments that open a sentence of reasoning narration. Used only when
    /// an exchange has no thinking message to compare against.
    #[serde(default = "default_reasoning_phrases")]
    pub reasoning_phrases: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            reasoning_phrases: default_reasoning_phrases(),
        }
    }
}

fn default_reasoning_phrases() -> Vec<String> {
    [
        "I'm thinking",
        "I'm now thinking",
        "I'm focusing",
        "My current thinking",
        "Clarifying",
        "Analyzing",
        "Developing",
        "Crafting",
        "Simplifying",
        "I've been thinking",
        "I am thinking",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Accepted layouts for a phrase file
#[derive(Deserialize)]
#[serde(untagged)]
enum PhraseFile {
    List(Vec<String>),
    Config(DetectorConfig),
}

impl DetectorConfig {
    /// Parse either a bare JSON array of phrases or `{"reasoning_phrases": [...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: PhraseFile =
            serde_json::from_str(json).context("Failed to parse phrase configuration")?;
        Ok(match parsed {
            PhraseFile::List(reasoning_phrases) => Self { reasoning_phrases },
            PhraseFile::Config(config) => config,
        })
    }

    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read phrase file: {:?}", path))?;
        Self::from_json(&content)
    }
}
