use crate::core::{DeriveError, Result, Value};
use crate::derive::rules::{CollectionMerge, FieldRef, MappingRuleSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Derivation configuration
///
/// Names the three record types involved, the attributes that tie them together,
/// and the mapping rules used to build the derived record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationConfig {
    /// Type of the record that triggers derivation
    pub source_type: String,

    /// Type of the record the source references
    pub linked_type: String,

    /// Type of the record being created
    pub target_type: String,

    /// Attribute on the source holding the linked record's id
    pub link_field: String,

    /// Attribute on the source pointing at its derived record
    pub back_reference_field: String,

    /// Attribute on the linked record that is cascaded
    pub status_field: String,

    /// Value the linked status is moved to after a successful derivation
    pub terminal_status: Value,

    /// Fail when the source has no linked record
    #[serde(default = "default_true")]
    pub linked_required: bool,

    /// Attribute on the derived record that receives the source id
    #[serde(default)]
    pub source_link_field: Option<String>,

    /// Attribute on the derived record that receives the linked id
    #[serde(default)]
    pub linked_link_field: Option<String>,

    /// Upper bound on persisting the derived record
    #[serde(default, rename = "persist_timeout_ms", with = "optional_millis")]
    pub persist_timeout: Option<Duration>,

    #[serde(default)]
    pub rules: MappingRuleSet,
}

fn default_true() -> bool {
    true
}

impl DerivationConfig {
    /// Create a configuration with no mapping rules
    pub fn new(source_type: &str, linked_type: &str, target_type: &str) -> Self {
        Self {
            source_type: source_type.to_string(),
            linked_type: linked_type.to_string(),
            target_type: target_type.to_string(),
            link_field: linked_type.to_lowercase(),
            back_reference_field: target_type.to_lowercase(),
            status_field: "status".to_string(),
            terminal_status: Value::from("Converted"),
            linked_required: true,
            source_link_field: None,
            linked_link_field: None,
            persist_timeout: None,
            rules: MappingRuleSet::default(),
        }
    }

    /// Quotation → Project, consulting the quotation's Opportunity.
    pub fn quotation_to_project() -> Self {
        Self::new("Quotation", "Opportunity", "Project")
            .source_link_field("quotation")
            .linked_link_field("opportunity")
            .rules(
                MappingRuleSet::new()
                    .constant("status", "Open")
                    .pass_through(&["company", "currency", "customer", "cost_center"])
                    .rename(FieldRef::source("grand_total"), "estimated_costing")
                    .rename(FieldRef::source("transaction_date"), "expected_start_date")
                    .rename(FieldRef::linked("expected_closing"), "expected_end_date")
                    .fallback(
                        "project_name",
                        vec![
                            FieldRef::source("title"),
                            FieldRef::linked("title"),
                            FieldRef::source("customer_name"),
                            FieldRef::source("party_name"),
                        ],
                        None,
                    )
                    .merge(CollectionMerge::new("users", "users", "user")),
            )
    }

    /// Set the link attribute on the source
    pub fn link_field(mut self, field: &str) -> Self {
        self.link_field = field.to_string();
        self
    }

    /// Set the back-reference attribute on the source
    pub fn back_reference_field(mut self, field: &str) -> Self {
        self.back_reference_field = field.to_string();
        self
    }

    /// Set the cascaded status attribute and its terminal value
    pub fn status(mut self, field: &str, terminal: impl Into<Value>) -> Self {
        self.status_field = field.to_string();
        self.terminal_status = terminal.into();
        self
    }

    pub fn linked_required(mut self, required: bool) -> Self {
        self.linked_required = required;
        self
    }

    pub fn source_link_field(mut self, field: &str) -> Self {
        self.source_link_field = Some(field.to_string());
        self
    }

    pub fn linked_link_field(mut self, field: &str) -> Self {
        self.linked_link_field = Some(field.to_string());
        self
    }

    /// Set persist timeout
    pub fn persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = Some(timeout);
        self
    }

    pub fn rules(mut self, rules: MappingRuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DeriveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DeriveError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("source_type", &self.source_type),
            ("linked_type", &self.linked_type),
            ("target_type", &self.target_type),
            ("link_field", &self.link_field),
            ("back_reference_field", &self.back_reference_field),
            ("status_field", &self.status_field),
        ];
        for (setting, value) in names {
            if value.trim().is_empty() {
                return Err(DeriveError::Config(format!("{} cannot be empty", setting)));
            }
        }

        if self.terminal_status.is_empty() {
            return Err(DeriveError::Config("terminal_status cannot be empty".to_string()));
        }

        if self.link_field == self.back_reference_field {
            return Err(DeriveError::Config(
                "link_field and back_reference_field must differ".to_string(),
            ));
        }

        if self.persist_timeout.is_some_and(|t| t.is_zero()) {
            return Err(DeriveError::Config("persist_timeout must be > 0".to_string()));
        }

        self.rules.validate().map_err(DeriveError::Config)
    }
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self::quotation_to_project()
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
