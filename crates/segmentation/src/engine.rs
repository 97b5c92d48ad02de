//! Membership resolution — turns an audience and the current contact set into
//! a member list, and diffs membership snapshots for write-back.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use audience_core::types::{Audience, AudienceMode, Contact, ContactId, FilterCriteria};

use crate::predicates::matches_active;

/// Associations to add and remove to move from one snapshot to another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDelta {
    pub to_add: Vec<ContactId>,
    pub to_remove: Vec<ContactId>,
}

impl MembershipDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Ids of active contacts matching `criteria`, in contact order.
pub fn filter_contacts(contacts: &[Contact], criteria: &FilterCriteria) -> Vec<ContactId> {
    contacts
        .iter()
        .filter(|c| matches_active(c, criteria))
        .map(|c| c.id.clone())
        .collect()
}

/// Current members of `audience` given the full contact set.
///
/// Filtered audiences are evaluated live. Static audiences keep their
/// explicit members, minus any that are no longer present or active in
/// `contacts`.
pub fn compute_membership(audience: &Audience, contacts: &[Contact]) -> Vec<ContactId> {
    match &audience.mode {
        AudienceMode::Filtered { criteria } => filter_contacts(contacts, criteria),
        AudienceMode::Static { member_ids } => contacts
            .iter()
            .filter(|c| c.is_active && member_ids.contains(&c.id))
            .map(|c| c.id.clone())
            .collect(),
    }
}

/// Active members among contacts returned by an association lookup.
pub fn active_members(associated: &[Contact]) -> Vec<ContactId> {
    let mut seen = HashSet::new();
    associated
        .iter()
        .filter(|c| c.is_active && seen.insert(c.id.as_str()))
        .map(|c| c.id.clone())
        .collect()
}

/// `to_add = current - original`, `to_remove = original - current`.
pub fn reconcile_members(
    original: &BTreeSet<ContactId>,
    current: &BTreeSet<ContactId>,
) -> MembershipDelta {
    MembershipDelta {
        to_add: current.difference(original).cloned().collect(),
        to_remove: original.difference(current).cloned().collect(),
    }
}

/// Number of members `audience` has right now.
pub fn count_members(audience: &Audience, contacts: &[Contact]) -> u64 {
    compute_membership(audience, contacts).len() as u64
}
