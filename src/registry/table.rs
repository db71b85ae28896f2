//! Model lookup table.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ModelConfig;
use crate::error::{Error, Result};

/// A routable model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub endpoint: String,
    pub name: String,
    pub description: String,
}

impl From<&ModelConfig> for ModelEntry {
    fn from(config: &ModelConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
        }
    }
}

/// Client-facing view of a model, as served by `GET /v1/models`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub description: String,
}

/// Read-only registry, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: BTreeMap<String, ModelEntry>,
}

impl ModelRegistry {
    /// Build the registry from configured models.
    ///
    /// Later duplicates replace earlier ones; `Config` validation rejects
    /// duplicates before this point.
    pub fn new(models: &[ModelConfig]) -> Self {
        let entries = models
            .iter()
            .map(|m| (m.id.clone(), ModelEntry::from(m)))
            .collect();
        Self { entries }
    }

    /// Resolve a model identifier to its entry.
    pub fn lookup(&self, model: &str) -> Result<&ModelEntry> {
        self.entries.get(model).ok_or_else(|| Error::UnknownModel {
            model: model.to_string(),
        })
    }

    /// Display metadata for every model, ordered by identifier.
    pub fn listing(&self) -> BTreeMap<String, ModelInfo> {
        self.entries
            .iter()
            .map(|(id, entry)| {
                (
                    id.clone(),
                    ModelInfo {
                        name: entry.name.clone(),
                        description: entry.description.clone(),
                    },
                )
            })
            .collect()
    }

    /// Model identifiers in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
