use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Contact identifier, unique within an organization.
pub type ContactId = String;

/// Audience identifier as issued by the persistence layer.
pub type AudienceId = String;

/// A person of interest to an organization, reduced to the attributes that
/// matter for segmentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub budget_min: Option<f64>,
    #[serde(default)]
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub square_feet: Option<f64>,
    #[serde(default)]
    pub preferred_location: Option<String>,
    #[serde(default)]
    pub custom_tags: BTreeSet<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Contact {
    pub fn new(id: impl Into<ContactId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            is_active: true,
            ..Default::default()
        }
    }
}

/// Sparse set of independent constraints. Every dimension is optional and an
/// absent (or empty) dimension imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<BTreeSet<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<BTreeSet<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_feet_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_feet_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_location: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_search: Option<String>,
}

impl FilterCriteria {
    /// Number of dimensions that currently constrain membership.
    pub fn active_dimensions(&self) -> usize {
        fn set<T>(s: &Option<BTreeSet<T>>) -> usize {
            s.as_ref().map_or(0, |s| usize::from(!s.is_empty()))
        }
        set(&self.property_type)
            + set(&self.bedrooms)
            + set(&self.bathrooms)
            + set(&self.preferred_location)
            + set(&self.custom_tags)
            + usize::from(self.budget_min.is_some())
            + usize::from(self.budget_max.is_some())
            + usize::from(self.square_feet_min.is_some())
            + usize::from(self.square_feet_max.is_some())
            + usize::from(self.search_term().is_some())
    }

    /// True when no dimension constrains membership; such criteria match
    /// every active contact.
    pub fn is_empty(&self) -> bool {
        self.active_dimensions() == 0
    }

    /// Trimmed notes search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.notes_search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Copy with empty sets and a blank search term dropped.
    pub fn normalized(&self) -> Self {
        fn keep<T: Clone>(s: &Option<BTreeSet<T>>) -> Option<BTreeSet<T>> {
            s.as_ref().filter(|s| !s.is_empty()).cloned()
        }
        Self {
            property_type: keep(&self.property_type),
            bedrooms: keep(&self.bedrooms),
            bathrooms: keep(&self.bathrooms),
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            square_feet_min: self.square_feet_min,
            square_feet_max: self.square_feet_max,
            preferred_location: keep(&self.preferred_location),
            custom_tags: keep(&self.custom_tags),
            notes_search: self.search_term().map(str::to_string),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Normalized criteria if any dimension is active, otherwise `None`.
    pub fn into_active(self) -> Option<Self> {
        let normalized = self.normalized();
        (!normalized.is_empty()).then_some(normalized)
    }
}

/// Audience as persisted by the storage layer. Storage may hold both
/// criteria and stale associations at once; [`Audience`] decides which one is
/// authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceRecord {
    pub id: AudienceId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub filters: Option<FilterCriteria>,
    #[serde(default)]
    pub contact_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable audience metadata. `filters: None` stores a null filter and puts
/// the audience in static mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceMeta {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub filters: Option<FilterCriteria>,
}

/// Request to create an audience, filtered when `filters` is active and
/// static otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAudience {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub filters: Option<FilterCriteria>,
    #[serde(default)]
    pub contact_ids: Vec<ContactId>,
}

/// Membership authority of an audience. The two modes are mutually
/// exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AudienceMode {
    Filtered { criteria: FilterCriteria },
    Static { member_ids: BTreeSet<ContactId> },
}

impl AudienceMode {
    /// Resolve the authoritative mode from stored parts. Active criteria win
    /// and any stored associations are ignored.
    pub fn from_parts(
        filters: Option<FilterCriteria>,
        associations: impl IntoIterator<Item = ContactId>,
    ) -> Self {
        match filters.and_then(FilterCriteria::into_active) {
            Some(criteria) => Self::Filtered { criteria },
            None => Self::Static {
                member_ids: associations.into_iter().collect(),
            },
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Filtered { .. } => ModeKind::Filtered,
            Self::Static { .. } => ModeKind::Static,
        }
    }

    pub fn criteria(&self) -> Option<&FilterCriteria> {
        match self {
            Self::Filtered { criteria } => Some(criteria),
            Self::Static { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Filtered,
    Static,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filtered => f.write_str("filtered"),
            Self::Static => f.write_str("static"),
        }
    }
}

/// A named collection of contacts with exactly one source of membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audience {
    pub id: AudienceId,
    pub name: String,
    pub description: Option<String>,
    pub mode: AudienceMode,
    /// Last persisted count. Display code recomputes instead of trusting it.
    pub contact_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audience {
    pub fn from_record(
        record: AudienceRecord,
        associations: impl IntoIterator<Item = ContactId>,
    ) -> Self {
        Self {
            mode: AudienceMode::from_parts(record.filters, associations),
            id: record.id,
            name: record.name,
            description: record.description,
            contact_count: record.contact_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self.mode, AudienceMode::Filtered { .. })
    }
}

/// Organization scope and credentials for a single request against the
/// external collaborators.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestScope {
    pub org_id: String,
    bearer: Option<String>,
}

impl RequestScope {
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            bearer: None,
        }
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }
}

impl fmt::Debug for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScope")
            .field("org_id", &self.org_id)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
