use super::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute name → value mapping shared by records and child rows.
pub type Fields = BTreeMap<String, Value>;

/// Opaque record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for a newly inserted record.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Reads an identifier out of a reference attribute.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.key().map(Self)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&RecordId> for Value {
    fn from(id: &RecordId) -> Self {
        Value::Text(id.0.clone())
    }
}

/// One row of a nested collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChildRow {
    pub fields: Fields,
}

impl ChildRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// A typed business record: identifier, attributes and named child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: RecordId,
    pub doc_type: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub children: BTreeMap<String, Vec<ChildRow>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl Record {
    /// Unsaved record of the given type; the store assigns the id on insert.
    pub fn draft(doc_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::default(),
            doc_type: doc_type.into(),
            fields: Fields::new(),
            children: BTreeMap::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn new(doc_type: impl Into<String>, id: impl Into<RecordId>) -> Self {
        let mut record = Self::draft(doc_type);
        record.id = id.into();
        record
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn with_child(mut self, collection: impl Into<String>, row: ChildRow) -> Self {
        self.children.entry(collection.into()).or_default().push(row);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Value of a field only when it is present and non-empty.
    pub fn non_empty(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|value| !value.is_empty())
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn reference(&self, field: &str) -> Option<RecordId> {
        self.fields.get(field).and_then(RecordId::from_value)
    }

    pub fn collection(&self, name: &str) -> &[ChildRow] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
