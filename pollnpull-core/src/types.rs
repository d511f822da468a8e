//! The developer record exchanged between source and target.

use serde::{Deserialize, Serialize};

use crate::error::InvalidDeveloper;

/// A single developer row.
///
/// `id` is the natural key used for deduplication. A record with an empty
/// `id` or `full_name` is invalid and must never be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    pub id: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_handle: Option<String>,
}

impl Developer {
    /// Build a record from its required fields. Both are trimmed before validation.
    pub fn new(
        id: impl AsRef<str>,
        full_name: impl AsRef<str>,
    ) -> Result<Self, InvalidDeveloper> {
        let dev = Self {
            id: id.as_ref().trim().to_owned(),
            full_name: full_name.as_ref().trim().to_owned(),
            organization: None,
            contact_handle: None,
        };
        dev.validate()?;
        Ok(dev)
    }

    pub fn with_organization(mut self, organization: impl AsRef<str>) -> Self {
        self.organization = non_blank(organization.as_ref());
        self
    }

    pub fn with_contact_handle(mut self, contact_handle: impl AsRef<str>) -> Self {
        self.contact_handle = non_blank(contact_handle.as_ref());
        self
    }

    /// Check the record invariant. Struct literals bypass [`Developer::new`],
    /// so anything crossing an adapter boundary is re-checked here.
    pub fn validate(&self) -> Result<(), InvalidDeveloper> {
        if self.id.trim().is_empty() {
            return Err(InvalidDeveloper::MissingId);
        }
        if self.full_name.trim().is_empty() {
            return Err(InvalidDeveloper::MissingFullName {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_required_fields() {
        let dev = Developer::new("  a1 ", " Ann Lee ").expect("valid");
        assert_eq!(dev.id, "a1");
        assert_eq!(dev.full_name, "Ann Lee");
        assert!(dev.organization.is_none());
    }

    #[test]
    fn blank_optional_fields_become_none() {
        let dev = Developer::new("a", "Ann")
            .expect("valid")
            .with_organization("   ")
            .with_contact_handle(" @ann ");
        assert_eq!(dev.organization, None);
        assert_eq!(dev.contact_handle.as_deref(), Some("@ann"));
    }

    #[test]
    fn validate_catches_struct_literals() {
        let dev = Developer {
            id: "x".into(),
            full_name: " ".into(),
            organization: None,
            contact_handle: None,
        };
        assert_eq!(
            dev.validate(),
            Err(InvalidDeveloper::MissingFullName { id: "x".into() })
        );
    }

    #[test]
    fn serde_omits_missing_optionals() {
        let dev = Developer::new("a", "Ann").expect("valid");
        let yaml = serde_yaml::to_string(&dev).expect("serialize");
        assert!(!yaml.contains("organization"));
        let back: Developer = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, dev);
    }
}
