use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attribute::{normalize, Attribute, ContactAttributes};
use crate::error::RecordError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Fields that identify a contact. Never compared, only sent on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Identity {
    pub external_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Where and when a record was exported. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Provenance {
    pub exported_at: DateTime<Utc>,
    pub exported_by: String,
    pub source_system: String,
}

// ---------------------------------------------------------------------------
// ContactRecord
// ---------------------------------------------------------------------------

/// One contact as it travels from the source export to the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub attributes: ContactAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Serialized record keys outside the attribute set.
const RECORD_FIELDS: &[&str] = &["ExternalAddress", "Alias", "DisplayName", "Name", "Provenance"];

impl ContactRecord {
    /// Whether `key` deserializes into a record field. Other keys are
    /// dropped by the flattened attribute set.
    pub fn is_known_field(key: &str) -> bool {
        RECORD_FIELDS.contains(&key) || Attribute::from_name(key).is_some()
    }

    pub fn new(external_address: impl Into<String>) -> Self {
        Self {
            external_address: Some(external_address.into()),
            ..Self::default()
        }
    }

    /// The join key, or `None` when absent or blank.
    pub fn external_address(&self) -> Option<&str> {
        normalize(self.external_address.as_deref())
    }

    /// Reject records that cannot be matched against a destination.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.external_address().is_none() {
            return Err(RecordError::MissingExternalAddress {
                label: self.label().to_string(),
            });
        }
        Ok(())
    }

    /// Identity fields for the create call. Blank optional fields are dropped.
    pub fn identity(&self) -> Result<Identity, RecordError> {
        let external_address = self
            .external_address()
            .ok_or_else(|| RecordError::MissingExternalAddress {
                label: self.label().to_string(),
            })?
            .to_string();

        Ok(Identity {
            external_address,
            alias: normalize(self.alias.as_deref()).map(str::to_string),
            display_name: normalize(self.display_name.as_deref()).map(str::to_string),
            name: normalize(self.name.as_deref()).map(str::to_string),
        })
    }

    /// Human label for log lines: display name, then name, alias, address.
    pub fn label(&self) -> &str {
        [
            self.display_name.as_deref(),
            self.name.as_deref(),
            self.alias.as_deref(),
            self.external_address.as_deref(),
        ]
        .into_iter()
        .find_map(normalize)
        .unwrap_or("<unnamed>")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
