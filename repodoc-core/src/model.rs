//! Structural model produced by the analyzer and consumed by every later stage.
//!
//! All types here are plain values: no back-references, no shared ownership. A
//! [`StructuralUnit`] owns everything it contains, whether it describes a single file or
//! the aggregate of a whole repository.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-file (and later, repository-wide) structural model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralUnit {
    pub package_name: Option<String>,
    pub imports: Vec<String>,
    pub classes: Vec<ClassEntity>,
    pub interfaces: Vec<InterfaceEntity>,
}

impl StructuralUnit {
    /// Aggregates per-file units: classes and interfaces are concatenated, imports are
    /// unioned (and sorted, so the result does not depend on the order of `units`).
    ///
    /// Class names are not deduplicated; two files declaring the same simple name both
    /// appear in the result.
    pub fn aggregate<I>(units: I) -> StructuralUnit
    where
        I: IntoIterator<Item = StructuralUnit>,
    {
        let mut imports = BTreeSet::new();
        let mut classes = Vec::new();
        let mut interfaces = Vec::new();
        for unit in units {
            imports.extend(unit.imports);
            classes.extend(unit.classes);
            interfaces.extend(unit.interfaces);
        }
        StructuralUnit {
            package_name: None,
            imports: imports.into_iter().collect(),
            classes,
            interfaces,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntity {
    pub name: String,
    pub extends_name: Option<String>,
    pub implements_names: Vec<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceEntity {
    pub name: String,
    pub extends_names: Vec<String>,
    pub methods: Vec<Method>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub return_type: String,
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl Method {
    /// `name(T1, T2): Ret`, the form used in enrichment prompts.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self
            .parameters
            .iter()
            .map(|p| p.type_name.as_str())
            .collect();
        format!("{}({}): {}", self.name, types.join(", "), self.return_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
}

/// Outcome of a single enrichment call. A fallback is still usable text, but it is not
/// counted as an AI enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "text", rename_all = "lowercase")]
pub enum Enrichment {
    Generated(String),
    Fallback(String),
}

impl Enrichment {
    pub fn text(&self) -> &str {
        match self {
            Enrichment::Generated(text) | Enrichment::Fallback(text) => text,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Enrichment::Generated(_))
    }

    /// First line of the text, trimmed. Used for inline annotations.
    pub fn first_line(&self) -> &str {
        self.text().lines().next().unwrap_or("").trim()
    }
}

/// `ClassName` / `ClassName.methodName` → enrichment text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrichmentMap {
    entries: BTreeMap<String, Enrichment>,
}

impl EnrichmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Enrichment) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Enrichment> {
        self.entries.get(key)
    }

    /// Last write wins per key.
    pub fn merge(&mut self, other: EnrichmentMap) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn generated_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_generated()).count()
    }

    /// Plain key → text view, as written to the AI metadata file.
    pub fn texts(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.text().to_string()))
            .collect()
    }
}
