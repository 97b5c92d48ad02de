//! Property-based tests for filter predicates over generated contacts and
//! criteria.

use std::collections::BTreeSet;

use proptest::collection::btree_set;
use proptest::option;
use proptest::prelude::*;
use proptest::sample::select;

use audience_core::types::{Contact, FilterCriteria};
use audience_segmentation::matches;

const PROPERTY_TYPES: &[&str] = &["House", "Condo", "Townhouse", "Land"];
const LOCATIONS: &[&str] = &["Pune", "Mumbai", "Goa", "Nashik"];
const TAGS: &[&str] = &["VIP", "Hot Lead", "Investor", "First Time"];

fn word(choices: &'static [&'static str]) -> impl Strategy<Value = String> {
    select(choices).prop_map(str::to_string)
}

fn words(choices: &'static [&'static str]) -> impl Strategy<Value = Option<BTreeSet<String>>> {
    option::of(btree_set(word(choices), 0..3))
}

fn rooms() -> impl Strategy<Value = Option<BTreeSet<u32>>> {
    option::of(btree_set(0u32..6, 0..3))
}

fn amount() -> impl Strategy<Value = Option<f64>> {
    option::of(0.0f64..2_000_000.0)
}

fn arb_contact() -> impl Strategy<Value = Contact> {
    (
        option::of(word(PROPERTY_TYPES)),
        option::of(0u32..6),
        option::of(0u32..6),
        amount(),
        amount(),
        option::of(200.0f64..6_000.0),
        option::of(word(LOCATIONS)),
        btree_set(word(TAGS), 0..3),
        option::of("[a-z ]{0,24}"),
        any::<bool>(),
    )
        .prop_map(
            |(
                property_type,
                bedrooms,
                bathrooms,
                budget_min,
                budget_max,
                square_feet,
                preferred_location,
                custom_tags,
                notes,
                is_active,
            )| Contact {
                property_type,
                bedrooms,
                bathrooms,
                budget_min,
                budget_max,
                square_feet,
                preferred_location,
                custom_tags,
                notes,
                is_active,
                ..Contact::new("c-1", "c1@example.com")
            },
        )
}

fn arb_criteria() -> impl Strategy<Value = FilterCriteria> {
    (
        words(PROPERTY_TYPES),
        rooms(),
        rooms(),
        amount(),
        amount(),
        option::of(200.0f64..6_000.0),
        option::of(200.0f64..6_000.0),
        words(LOCATIONS),
        words(TAGS),
        option::of("[a-z]{0,4}"),
    )
        .prop_map(
            |(
                property_type,
                bedrooms,
                bathrooms,
                budget_min,
                budget_max,
                square_feet_min,
                square_feet_max,
                preferred_location,
                custom_tags,
                notes_search,
            )| FilterCriteria {
                property_type,
                bedrooms,
                bathrooms,
                budget_min,
                budget_max,
                square_feet_min,
                square_feet_max,
                preferred_location,
                custom_tags,
                notes_search,
            },
        )
}

// Property: empty criteria match every contact
proptest! {
    #[test]
    fn empty_criteria_match_any_contact(contact in arb_contact()) {
        prop_assert!(matches(&contact, &FilterCriteria::default()));
    }
}

// Property: a dimension the contact has no data for never changes the result
proptest! {
    #[test]
    fn missing_property_type_is_ignored(
        contact in arb_contact(),
        criteria in arb_criteria(),
        other in words(PROPERTY_TYPES),
    ) {
        let contact = Contact { property_type: None, ..contact };
        let changed = FilterCriteria { property_type: other, ..criteria.clone() };
        prop_assert_eq!(matches(&contact, &criteria), matches(&contact, &changed));
    }

    #[test]
    fn missing_bedrooms_are_ignored(
        contact in arb_contact(),
        criteria in arb_criteria(),
        other in rooms(),
    ) {
        let contact = Contact { bedrooms: None, ..contact };
        let changed = FilterCriteria { bedrooms: other, ..criteria.clone() };
        prop_assert_eq!(matches(&contact, &criteria), matches(&contact, &changed));
    }

    #[test]
    fn missing_bathrooms_are_ignored(
        contact in arb_contact(),
        criteria in arb_criteria(),
        other in rooms(),
    ) {
        let contact = Contact { bathrooms: None, ..contact };
        let changed = FilterCriteria { bathrooms: other, ..criteria.clone() };
        prop_assert_eq!(matches(&contact, &criteria), matches(&contact, &changed));
    }

    #[test]
    fn missing_budget_ceiling_ignores_floor_criterion(
        contact in arb_contact(),
        criteria in arb_criteria(),
        other in amount(),
    ) {
        let contact = Contact { budget_max: None, ..contact };
        let changed = FilterCriteria { budget_min: other, ..criteria.clone() };
        prop_assert_eq!(matches(&contact, &criteria), matches(&contact, &changed));
    }

    #[test]
    fn missing_budget_floor_ignores_ceiling_criterion(
        contact in arb_contact(),
        criteria in arb_criteria(),
        other in amount(),
    ) {
        let contact = Contact { budget_min: None, ..contact };
        let changed = FilterCriteria { budget_max: other, ..criteria.clone() };
        prop_assert_eq!(matches(&contact, &criteria), matches(&contact, &changed));
    }

    #[test]
    fn missing_square_feet_are_ignored(
        contact in arb_contact(),
        criteria in arb_criteria(),
        min in option::of(200.0f64..6_000.0),
        max in option::of(200.0f64..6_000.0),
    ) {
        let contact = Contact { square_feet: None, ..contact };
        let changed = FilterCriteria {
            square_feet_min: min,
            square_feet_max: max,
            ..criteria.clone()
        };
        prop_assert_eq!(matches(&contact, &criteria), matches(&contact, &changed));
    }

    #[test]
    fn missing_location_is_ignored(
        contact in arb_contact(),
        criteria in arb_criteria(),
        other in words(LOCATIONS),
    ) {
        let contact = Contact { preferred_location: None, ..contact };
        let changed = FilterCriteria { preferred_location: other, ..criteria.clone() };
        prop_assert_eq!(matches(&contact, &criteria), matches(&contact, &changed));
    }
}
