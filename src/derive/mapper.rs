use super::rules::MappingRuleSet;
use crate::core::{Record, Value};

/// Builds the unsaved draft of a derived record from its source (and linked) record.
pub struct FieldMapper<'a> {
    rules: &'a MappingRuleSet,
    source_link_field: Option<&'a str>,
    linked_link_field: Option<&'a str>,
}

impl<'a> FieldMapper<'a> {
    pub fn new(rules: &'a MappingRuleSet) -> Self {
        Self {
            rules,
            source_link_field: None,
            linked_link_field: None,
        }
    }

    /// Stamp the source identifier on the draft under `field`.
    pub fn link_source_as(mut self, field: Option<&'a str>) -> Self {
        self.source_link_field = field;
        self
    }

    /// Stamp the linked identifier on the draft under `field`.
    pub fn link_linked_as(mut self, field: Option<&'a str>) -> Self {
        self.linked_link_field = field;
        self
    }

    /// Rules apply in order: constants, pass-through, renames, fallback chains,
    /// so later rules win when two of them target the same attribute.
    pub fn build_draft(
        &self,
        source: &Record,
        linked: Option<&Record>,
        target_type: &str,
    ) -> Record {
        let mut draft = Record::draft(target_type);

        for (target, value) in &self.rules.constants {
            draft.set(target.clone(), value.clone());
        }

        for field in &self.rules.pass_through {
            if let Some(value) = source.non_empty(field) {
                draft.set(field.clone(), value.clone());
            }
        }

        for rule in &self.rules.renames {
            if let Some(value) = rule.from.resolve(source, linked) {
                draft.set(rule.to.clone(), value.clone());
            }
        }

        for chain in &self.rules.fallbacks {
            draft.set(chain.target.clone(), chain.evaluate(source, linked));
        }

        if let Some(field) = self.source_link_field {
            draft.set(field, Value::from(&source.id));
        }
        if let (Some(field), Some(linked)) = (self.linked_link_field, linked) {
            draft.set(field, Value::from(&linked.id));
        }

        draft
    }
}
