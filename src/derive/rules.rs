use crate::core::{Record, Value};
use serde::{Deserialize, Serialize};

/// Which record a mapping rule reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    #[default]
    Source,
    Linked,
}

/// An attribute on either the source or the linked record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    #[serde(default)]
    pub origin: Origin,
    pub field: String,
}

impl FieldRef {
    pub fn source(field: impl Into<String>) -> Self {
        Self {
            origin: Origin::Source,
            field: field.into(),
        }
    }

    pub fn linked(field: impl Into<String>) -> Self {
        Self {
            origin: Origin::Linked,
            field: field.into(),
        }
    }

    /// Non-empty value of the referenced attribute, if any.
    pub fn resolve<'a>(&self, source: &'a Record, linked: Option<&'a Record>) -> Option<&'a Value> {
        let record = match self.origin {
            Origin::Source => source,
            Origin::Linked => linked?,
        };
        record.non_empty(&self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    pub from: FieldRef,
    pub to: String,
}

/// Ordered candidates; the first non-empty one wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackChain {
    pub target: String,
    pub candidates: Vec<FieldRef>,
    #[serde(default)]
    pub default: Option<Value>,
}

impl FallbackChain {
    /// Never fails: falls back to the chain default, then to empty text.
    pub fn evaluate(&self, source: &Record, linked: Option<&Record>) -> Value {
        self.candidates
            .iter()
            .find_map(|candidate| candidate.resolve(source, linked))
            .cloned()
            .or_else(|| self.default.clone())
            .unwrap_or_else(|| Value::Text(String::new()))
    }
}

/// A child collection of the linked record merged into the derived record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMerge {
    /// Collection name on the linked record
    pub from: String,
    /// Collection name on the derived record
    pub into: String,
    pub dedup_key: String,
    /// Attributes to carry over; empty copies whole rows
    #[serde(default)]
    pub fields: Vec<String>,
}

impl CollectionMerge {
    pub fn new(
        from: impl Into<String>,
        into: impl Into<String>,
        dedup_key: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            into: into.into(),
            dedup_key: dedup_key.into(),
            fields: Vec::new(),
        }
    }

    pub fn project(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}

/// Static table describing how a derived record is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingRuleSet {
    pub pass_through: Vec<String>,
    pub renames: Vec<RenameRule>,
    pub fallbacks: Vec<FallbackChain>,
    pub constants: Vec<(String, Value)>,
    pub merges: Vec<CollectionMerge>,
}

impl MappingRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pass_through(mut self, fields: &[&str]) -> Self {
        self.pass_through
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn rename(mut self, from: FieldRef, to: impl Into<String>) -> Self {
        self.renames.push(RenameRule { from, to: to.into() });
        self
    }

    pub fn fallback(
        mut self,
        target: impl Into<String>,
        candidates: Vec<FieldRef>,
        default: Option<Value>,
    ) -> Self {
        self.fallbacks.push(FallbackChain {
            target: target.into(),
            candidates,
            default,
        });
        self
    }

    pub fn constant(mut self, target: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.push((target.into(), value.into()));
        self
    }

    pub fn merge(mut self, merge: CollectionMerge) -> Self {
        self.merges.push(merge);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.pass_through.iter().any(|f| f.trim().is_empty()) {
            return Err("pass-through field names must not be empty".to_string());
        }
        for rule in &self.renames {
            if rule.from.field.trim().is_empty() || rule.to.trim().is_empty() {
                return Err(format!(
                    "rename '{}' -> '{}' has an empty field name",
                    rule.from.field, rule.to
                ));
            }
        }
        for chain in &self.fallbacks {
            if chain.target.trim().is_empty() {
                return Err("fallback chain target must not be empty".to_string());
            }
            if chain.candidates.is_empty() && chain.default.is_none() {
                return Err(format!(
                    "fallback chain '{}' has neither candidates nor a default",
                    chain.target
                ));
            }
        }
        for merge in &self.merges {
            if merge.from.trim().is_empty()
                || merge.into.trim().is_empty()
                || merge.dedup_key.trim().is_empty()
            {
                return Err(format!(
                    "collection merge '{}' -> '{}' needs collection names and a dedup key",
                    merge.from, merge.into
                ));
            }
        }
        Ok(())
    }
}
