//! Distinct attribute values present in the contact set, used to offer
//! only meaningful choices when building criteria.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use audience_core::types::Contact;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub property_types: Vec<String>,
    pub bedrooms: Vec<u32>,
    pub bathrooms: Vec<u32>,
    pub locations: Vec<String>,
    pub tags: Vec<String>,
}

impl FilterOptions {
    /// Sorted distinct values across active contacts. Blank strings and zero
    /// room counts are not offered.
    pub fn from_contacts(contacts: &[Contact]) -> Self {
        let mut property_types = BTreeSet::new();
        let mut bedrooms = BTreeSet::new();
        let mut bathrooms = BTreeSet::new();
        let mut locations = BTreeSet::new();
        let mut tags = BTreeSet::new();

        for contact in contacts.iter().filter(|c| c.is_active) {
            if let Some(pt) = non_blank(contact.property_type.as_deref()) {
                property_types.insert(pt.to_string());
            }
            if let Some(n) = contact.bedrooms.filter(|n| *n > 0) {
                bedrooms.insert(n);
            }
            if let Some(n) = contact.bathrooms.filter(|n| *n > 0) {
                bathrooms.insert(n);
            }
            if let Some(loc) = non_blank(contact.preferred_location.as_deref()) {
                locations.insert(loc.to_string());
            }
            tags.extend(
                contact
                    .custom_tags
                    .iter()
                    .filter(|t| !t.trim().is_empty())
                    .cloned(),
            );
        }

        Self {
            property_types: property_types.into_iter().collect(),
            bedrooms: bedrooms.into_iter().collect(),
            bathrooms: bathrooms.into_iter().collect(),
            locations: locations.into_iter().collect(),
            tags: tags.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.property_types.is_empty()
            && self.bedrooms.is_empty()
            && self.bathrooms.is_empty()
            && self.locations.is_empty()
            && self.tags.is_empty()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
