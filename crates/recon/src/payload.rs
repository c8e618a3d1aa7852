use contact_migrate_core::{
    Attribute, AttributeGroup, ContactAttributes, ContactRecord, Identity, RecordError,
};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::compare::FieldDiff;

// ---------------------------------------------------------------------------
// AttributePayload
// ---------------------------------------------------------------------------

/// Attribute values to send to a directory, in declared attribute order.
/// Never contains blank values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributePayload {
    entries: Vec<(Attribute, String)>,
}

impl AttributePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value. Blank values are dropped; a repeated attribute replaces
    /// the earlier value in place.
    pub fn insert(&mut self, attribute: Attribute, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(a, _)| *a == attribute) {
            Some(entry) => entry.1 = value,
            None => {
                let pos = self.entries.partition_point(|(a, _)| *a < attribute);
                self.entries.insert(pos, (attribute, value));
            }
        }
    }

    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| *a == attribute)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &str)> + '_ {
        self.entries.iter().map(|(a, v)| (*a, v.as_str()))
    }

    /// Write every payload value onto `target`.
    pub fn apply_to(&self, target: &mut ContactAttributes) {
        for (attribute, value) in self.iter() {
            target.set(attribute, Some(value.to_string()));
        }
    }
}

impl Serialize for AttributePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (attribute, value) in &self.entries {
            map.serialize_entry(attribute.name(), value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Update projection
// ---------------------------------------------------------------------------

/// An applied (or, in a dry run, would-be) field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub attribute: Attribute,
    pub group: AttributeGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,
    pub new: String,
}

impl FieldChange {
    pub fn new(attribute: Attribute, old: Option<String>, new: String) -> Self {
        Self {
            attribute,
            group: attribute.group(),
            old,
            new,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    pub payload: AttributePayload,
    pub changes: Vec<FieldChange>,
    /// Diffs that would blank a populated field. Never sent.
    pub suppressed: Vec<FieldDiff>,
}

/// Project diffs into an update. Only diffs with a non-empty new value are
/// sent; a populated destination field is never cleared.
pub fn update_payload(diffs: &[FieldDiff]) -> UpdatePlan {
    let mut plan = UpdatePlan::default();
    for diff in diffs {
        match &diff.new {
            Some(new) => {
                plan.payload.insert(diff.attribute, new.clone());
                plan.changes.push(FieldChange::new(
                    diff.attribute,
                    diff.existing.clone(),
                    new.clone(),
                ));
            }
            None => plan.suppressed.push(diff.clone()),
        }
    }
    plan
}

// ---------------------------------------------------------------------------
// Create projection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub identity: Identity,
    /// Sent with the create call.
    pub initial: AttributePayload,
    /// Sent as an update right after the create succeeds.
    pub follow_up: AttributePayload,
}

impl CreatePlan {
    /// Every attribute the new contact will carry, as changes from empty.
    pub fn changes(&self) -> Vec<FieldChange> {
        let mut changes: Vec<FieldChange> = self
            .initial
            .iter()
            .chain(self.follow_up.iter())
            .map(|(attribute, value)| FieldChange::new(attribute, None, value.to_string()))
            .collect();
        changes.sort_by_key(|c| c.attribute);
        changes
    }
}

pub fn creation_payload(record: &ContactRecord) -> Result<CreatePlan, RecordError> {
    let identity = record.identity()?;
    let mut initial = AttributePayload::new();
    let mut follow_up = AttributePayload::new();

    for (attribute, value) in record.attributes.non_empty() {
        if attribute.is_creation_field() {
            initial.insert(attribute, value);
        } else {
            follow_up.insert(attribute, value);
        }
    }

    Ok(CreatePlan {
        identity,
        initial,
        follow_up,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;

    #[test]
    fn payload_keeps_declared_order_and_drops_blanks() {
        let mut p = AttributePayload::new();
        p.insert(Attribute::City, "Oslo");
        p.insert(Attribute::FirstName, "Ada");
        p.insert(Attribute::Notes, "  ");
        p.insert(Attribute::City, "Bergen");

        let entries: Vec<_> = p.iter().collect();
        assert_eq!(
            entries,
            vec![(Attribute::FirstName, "Ada"), (Attribute::City, "Bergen")]
        );
        assert_eq!(p.get(Attribute::Notes), None);
    }

    #[test]
    fn payload_serializes_as_object() {
        let mut p = AttributePayload::new();
        p.insert(Attribute::Title, "CEO");
        p.insert(Attribute::CustomAttribute1, "x");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"Title":"CEO","CustomAttribute1":"x"}"#);
    }

    #[test]
    fn update_never_clears() {
        let mut existing = ContactAttributes::default();
        existing.notes = Some("Important".into());
        existing.title = Some("CTO".into());
        let mut imported = ContactAttributes::default();
        imported.notes = Some(String::new());
        imported.title = Some("CEO".into());

        let plan = update_payload(&compare(&existing, &imported));
        assert_eq!(plan.payload.len(), 1);
        assert_eq!(plan.payload.get(Attribute::Title), Some("CEO"));
        assert_eq!(plan.payload.get(Attribute::Notes), None);
        assert_eq!(plan.suppressed.len(), 1);
        assert_eq!(plan.suppressed[0].attribute, Attribute::Notes);
        assert_eq!(plan.changes[0].old.as_deref(), Some("CTO"));
        assert_eq!(plan.changes[0].group, AttributeGroup::Personal);
    }

    #[test]
    fn creation_splits_initial_and_follow_up() {
        let mut record = ContactRecord::new("a@x.com");
        record.alias = Some("ada".into());
        record.attributes.first_name = Some("Ada".into());
        record.attributes.last_name = Some("Lovelace".into());
        record.attributes.title = Some("Analyst".into());
        record.attributes.pager = Some(" ".into());

        let plan = creation_payload(&record).unwrap();
        assert_eq!(plan.identity.external_address, "a@x.com");
        assert_eq!(plan.initial.len(), 2);
        assert_eq!(plan.follow_up.len(), 1);
        assert_eq!(plan.follow_up.get(Attribute::Title), Some("Analyst"));

        let changed: Vec<_> = plan.changes().iter().map(|c| c.attribute).collect();
        assert_eq!(
            changed,
            vec![Attribute::FirstName, Attribute::LastName, Attribute::Title]
        );
    }

    #[test]
    fn creation_requires_external_address() {
        assert!(creation_payload(&ContactRecord::default()).is_err());
    }
}
