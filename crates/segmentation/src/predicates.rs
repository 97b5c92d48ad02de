//! Predicate evaluation for audience filter criteria.
//!
//! Every dimension is conjunctive. A dimension only excludes a contact when
//! the criteria constrain it *and* the contact carries the attribute; missing
//! contact data never disqualifies. Tags and notes are the exception: a
//! contact without tags or notes fails an active tag or search constraint.

use std::collections::BTreeSet;

use audience_core::types::{Contact, FilterCriteria};

/// Returns true when `contact` satisfies every active dimension of `criteria`.
pub fn matches(contact: &Contact, criteria: &FilterCriteria) -> bool {
    in_set(contact.property_type.as_ref(), criteria.property_type.as_ref())
        && in_set(contact.bedrooms.as_ref(), criteria.bedrooms.as_ref())
        && in_set(contact.bathrooms.as_ref(), criteria.bathrooms.as_ref())
        && budget_overlaps(contact, criteria)
        && within_bounds(
            contact.square_feet,
            criteria.square_feet_min,
            criteria.square_feet_max,
        )
        && in_set(
            contact.preferred_location.as_ref(),
            criteria.preferred_location.as_ref(),
        )
        && shares_tag(&contact.custom_tags, criteria.custom_tags.as_ref())
        && notes_contain(contact.notes.as_deref(), criteria.search_term())
}

/// Like [`matches`], but inactive contacts never match.
pub fn matches_active(contact: &Contact, criteria: &FilterCriteria) -> bool {
    contact.is_active && matches(contact, criteria)
}

/// Exact set membership. An empty or absent set, or an absent contact value,
/// does not exclude.
pub fn in_set<T: Ord>(value: Option<&T>, allowed: Option<&BTreeSet<T>>) -> bool {
    match (value, allowed) {
        (Some(v), Some(set)) if !set.is_empty() => set.contains(v),
        _ => true,
    }
}

/// Range overlap between the contact's `[budget_min, budget_max]` and the
/// criteria bounds. Each bound tests the opposite end of the contact's range.
pub fn budget_overlaps(contact: &Contact, criteria: &FilterCriteria) -> bool {
    if let (Some(floor), Some(top)) = (criteria.budget_min, contact.budget_max) {
        if top < floor {
            return false;
        }
    }
    if let (Some(ceiling), Some(bottom)) = (criteria.budget_max, contact.budget_min) {
        if bottom > ceiling {
            return false;
        }
    }
    true
}

/// One-sided bound checks against a single value, applied independently.
pub fn within_bounds(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    let Some(v) = value else {
        return true;
    };
    min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m)
}

/// Contact must share at least one tag with a non-empty criteria tag set.
pub fn shares_tag(tags: &BTreeSet<String>, wanted: Option<&BTreeSet<String>>) -> bool {
    match wanted {
        Some(wanted) if !wanted.is_empty() => !tags.is_disjoint(wanted),
        _ => true,
    }
}

/// Case-insensitive substring search over notes.
pub fn notes_contain(notes: Option<&str>, term: Option<&str>) -> bool {
    match term {
        None => true,
        Some(term) => notes.is_some_and(|n| n.to_lowercase().contains(&term.to_lowercase())),
    }
}
