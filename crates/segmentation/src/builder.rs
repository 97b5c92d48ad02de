//! Fluent construction of filter criteria and audience requests, plus the
//! toggle helpers used when editing criteria one value at a time.

use std::collections::BTreeSet;

use audience_core::error::{SegmentationError, SegmentationResult};
use audience_core::types::{ContactId, FilterCriteria, NewAudience};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct CriteriaBuilder {
    criteria: FilterCriteria,
}

impl CriteriaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property_types<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend(&mut self.criteria.property_type, values.into_iter().map(Into::into));
        self
    }

    pub fn bedrooms(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        extend(&mut self.criteria.bedrooms, values);
        self
    }

    pub fn bathrooms(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        extend(&mut self.criteria.bathrooms, values);
        self
    }

    pub fn budget_min(mut self, floor: f64) -> Self {
        self.criteria.budget_min = Some(floor);
        self
    }

    pub fn budget_max(mut self, ceiling: f64) -> Self {
        self.criteria.budget_max = Some(ceiling);
        self
    }

    pub fn square_feet_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.criteria.square_feet_min = min;
        self.criteria.square_feet_max = max;
        self
    }

    pub fn locations<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend(
            &mut self.criteria.preferred_location,
            values.into_iter().map(Into::into),
        );
        self
    }

    pub fn tags<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend(&mut self.criteria.custom_tags, values.into_iter().map(Into::into));
        self
    }

    pub fn notes_search(mut self, term: impl Into<String>) -> Self {
        self.criteria.notes_search = Some(term.into());
        self
    }

    pub fn build(self) -> FilterCriteria {
        self.criteria.normalized()
    }
}

fn extend<T: Ord>(slot: &mut Option<BTreeSet<T>>, values: impl IntoIterator<Item = T>) {
    slot.get_or_insert_with(BTreeSet::new).extend(values);
}

/// Add `value` if absent, remove it if present. A set emptied by the toggle
/// becomes `None`.
pub fn toggle<T: Ord>(slot: &mut Option<BTreeSet<T>>, value: T) {
    let set = slot.get_or_insert_with(BTreeSet::new);
    if !set.remove(&value) {
        set.insert(value);
    }
    if set.is_empty() {
        *slot = None;
    }
}

/// Per-dimension toggles over [`FilterCriteria`].
pub trait CriteriaToggles {
    fn toggle_property_type(&mut self, value: &str);
    fn toggle_bedrooms(&mut self, value: u32);
    fn toggle_bathrooms(&mut self, value: u32);
    fn toggle_location(&mut self, value: &str);
    fn toggle_tag(&mut self, value: &str);
}

impl CriteriaToggles for FilterCriteria {
    fn toggle_property_type(&mut self, value: &str) {
        toggle(&mut self.property_type, value.to_string());
    }

    fn toggle_bedrooms(&mut self, value: u32) {
        toggle(&mut self.bedrooms, value);
    }

    fn toggle_bathrooms(&mut self, value: u32) {
        toggle(&mut self.bathrooms, value);
    }

    fn toggle_location(&mut self, value: &str) {
        toggle(&mut self.preferred_location, value.to_string());
    }

    fn toggle_tag(&mut self, value: &str) {
        toggle(&mut self.custom_tags, value.to_string());
    }
}

/// Check name and description limits. Returns the trimmed name and a
/// description with blanks collapsed to `None`.
pub fn validate_details(
    name: &str,
    description: Option<&str>,
) -> SegmentationResult<(String, Option<String>)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SegmentationError::Validation(
            "audience name is required".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(SegmentationError::Validation(format!(
            "audience name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
        return Err(SegmentationError::Validation(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok((name.to_string(), description.map(str::to_string)))
}

pub struct AudienceBuilder {
    name: String,
    description: Option<String>,
    filters: Option<FilterCriteria>,
    contact_ids: Vec<ContactId>,
}

impl AudienceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            filters: None,
            contact_ids: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn filters(mut self, criteria: FilterCriteria) -> Self {
        self.filters = Some(criteria);
        self
    }

    pub fn contacts<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ContactId>,
    {
        self.contact_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Validate and produce the creation request. Active criteria and an
    /// initial member list are mutually exclusive.
    pub fn build(self) -> SegmentationResult<NewAudience> {
        let (name, description) = validate_details(&self.name, self.description.as_deref())?;
        let filters = self.filters.and_then(FilterCriteria::into_active);
        if filters.is_some() && !self.contact_ids.is_empty() {
            return Err(SegmentationError::InconsistentState(
                "an audience cannot have both filter criteria and explicit contacts".to_string(),
            ));
        }
        Ok(NewAudience {
            name,
            description,
            filters,
            contact_ids: self.contact_ids,
        })
    }
}
