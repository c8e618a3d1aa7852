// Field comparison between a destination record and an imported record.
// Pure functions: two attribute sets in, ordered differences out.

use contact_migrate_core::{Attribute, ContactAttributes};
use serde::Serialize;

/// One attribute whose normalized values differ. `None` means empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub attribute: Attribute,
    pub existing: Option<String>,
    pub new: Option<String>,
}

impl FieldDiff {
    /// The imported record is empty where the destination has a value.
    pub fn is_clear(&self) -> bool {
        self.new.is_none() && self.existing.is_some()
    }
}

/// Differences between `existing` (destination) and `imported` (source of
/// truth), in `Attribute::ALL` order regardless of which fields differ.
pub fn compare(existing: &ContactAttributes, imported: &ContactAttributes) -> Vec<FieldDiff> {
    Attribute::ALL
        .iter()
        .filter_map(|&attribute| {
            let old = existing.value(attribute);
            let new = imported.value(attribute);
            (old != new).then(|| FieldDiff {
                attribute,
                existing: old.map(str::to_string),
                new: new.map(str::to_string),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(Attribute, &str)]) -> ContactAttributes {
        let mut a = ContactAttributes::default();
        for (attr, value) in pairs {
            a.set(*attr, Some(value.to_string()));
        }
        a
    }

    #[test]
    fn identical_records_have_no_diffs() {
        let a = attrs(&[(Attribute::Title, "CEO"), (Attribute::City, "Oslo")]);
        assert!(compare(&a, &a.clone()).is_empty());
    }

    #[test]
    fn title_change() {
        let existing = attrs(&[(Attribute::Title, "CTO")]);
        let imported = attrs(&[(Attribute::Title, "CEO")]);
        let diffs = compare(&existing, &imported);
        assert_eq!(
            diffs,
            vec![FieldDiff {
                attribute: Attribute::Title,
                existing: Some("CTO".into()),
                new: Some("CEO".into()),
            }]
        );
        assert!(!diffs[0].is_clear());
    }

    #[test]
    fn blank_values_are_equivalent() {
        let existing = attrs(&[(Attribute::Notes, ""), (Attribute::Office, "  ")]);
        let imported = attrs(&[(Attribute::Department, "\t")]);
        assert!(compare(&existing, &imported).is_empty());
    }

    #[test]
    fn clear_is_reported() {
        let existing = attrs(&[(Attribute::Notes, "Important")]);
        let imported = attrs(&[(Attribute::Notes, "")]);
        let diffs = compare(&existing, &imported);
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].is_clear());
        assert_eq!(diffs[0].existing.as_deref(), Some("Important"));
        assert_eq!(diffs[0].new, None);
    }

    #[test]
    fn diffs_follow_declared_order() {
        // Set in reverse of declaration order
        let imported = attrs(&[
            (Attribute::CustomAttribute3, "c"),
            (Attribute::City, "Oslo"),
            (Attribute::FirstName, "Ada"),
        ]);
        let diffs = compare(&ContactAttributes::default(), &imported);
        let order: Vec<_> = diffs.iter().map(|d| d.attribute).collect();
        assert_eq!(
            order,
            vec![Attribute::FirstName, Attribute::City, Attribute::CustomAttribute3]
        );
    }

    #[test]
    fn surrounding_whitespace_is_significant() {
        let existing = attrs(&[(Attribute::Company, "Acme")]);
        let imported = attrs(&[(Attribute::Company, "Acme ")]);
        assert_eq!(compare(&existing, &imported).len(), 1);
    }
}
