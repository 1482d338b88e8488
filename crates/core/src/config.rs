//! File-backed settings.
//!
//! ```toml
//! [selection]
//! top_k = 5
//! lambda = 0.72
//!
//! [embedder]
//! kind = "ollama"        # or "hashing"
//! url = "http://localhost:11434"
//! model = "all-minilm"
//! batch_size = 32
//! dims = 384
//!
//! [classifier]
//! model = "models/heading_forest.json"
//! ```
//!
//! Every table and key is optional. Finding the file and layering CLI flags
//! on top is the binary's job.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::embed::DEFAULT_HASHING_DIMS;
use crate::mmr::{DEFAULT_LAMBDA, DEFAULT_TOP_K};
use crate::Error;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub selection: SelectionSettings,
    pub embedder: EmbedderSettings,
    pub classifier: ClassifierSettings,
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let settings: Settings = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.selection.lambda) {
            return Err(Error::Config(format!(
                "selection.lambda must be within [0, 1], got {}",
                self.selection.lambda
            )));
        }
        if self.selection.top_k == 0 {
            return Err(Error::Config("selection.top_k must be at least 1".into()));
        }
        if self.embedder.batch_size == 0 {
            return Err(Error::Config("embedder.batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub top_k: usize,
    pub lambda: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            lambda: DEFAULT_LAMBDA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    #[default]
    Ollama,
    Hashing,
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedderKind::Ollama => write!(f, "ollama"),
            EmbedderKind::Hashing => write!(f, "hashing"),
        }
    }
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(EmbedderKind::Ollama),
            "hashing" => Ok(EmbedderKind::Hashing),
            other => Err(Error::Config(format!("unknown embedder kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderSettings {
    pub kind: EmbedderKind,
    pub url: String,
    pub model: String,
    pub batch_size: usize,
    /// Only used by the hashing embedder.
    pub dims: usize,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            dims: DEFAULT_HASHING_DIMS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub model: Option<PathBuf>,
}
