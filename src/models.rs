//! Generative model catalog.

use crate::error::{BiError, Result};
use serde::Serialize;
use tracing::warn;

pub const DEFAULT_MODEL_ID: &str = "gemini-2.0-flash-001";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

const MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "gemini-2.0-flash-001",
        label: "Gemini 2.0 Flash ⚡",
        description: "Fastest model — ideal for demos and quick Q&A",
        icon: "⚡",
    },
    ModelDescriptor {
        id: "gemini-1.5-pro-002",
        label: "Gemini 1.5 Pro 🧠",
        description: "Most capable — best for complex multi-step reasoning",
        icon: "🧠",
    },
    ModelDescriptor {
        id: "gemini-1.5-flash-002",
        label: "Gemini 1.5 Flash ⚖️",
        description: "Balanced speed and quality",
        icon: "⚖️",
    },
    ModelDescriptor {
        id: "gemini-1.0-pro-002",
        label: "Gemini 1.0 Pro 🔧",
        description: "Stable production model",
        icon: "🔧",
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRegistry;

impl ModelRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn all(&self) -> &'static [ModelDescriptor] {
        MODELS
    }

    pub fn default_model(&self) -> &'static ModelDescriptor {
        &MODELS[0]
    }

    pub fn resolve(&self, id: &str) -> Result<&'static ModelDescriptor> {
        MODELS
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| BiError::UnknownModel(id.to_string()))
    }

    /// Accepts a model id or its display label; unknown selectors map to the default model.
    pub fn resolve_or_default(&self, selector: &str) -> &'static ModelDescriptor {
        if let Some(model) = MODELS.iter().find(|m| m.id == selector || m.label == selector) {
            return model;
        }
        warn!(
            "{}; falling back to '{}'",
            BiError::UnknownModel(selector.to_string()),
            DEFAULT_MODEL_ID
        );
        self.default_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_id_and_label() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.resolve("gemini-1.5-pro-002").unwrap().label, "Gemini 1.5 Pro 🧠");
        assert_eq!(
            registry.resolve_or_default("Gemini 1.0 Pro 🔧").id,
            "gemini-1.0-pro-002"
        );
    }

    #[test]
    fn test_unknown_model_falls_back() {
        let registry = ModelRegistry::new();
        assert!(matches!(registry.resolve("gpt-4"), Err(BiError::UnknownModel(_))));
        assert_eq!(registry.resolve_or_default("gpt-4").id, DEFAULT_MODEL_ID);
    }
}
