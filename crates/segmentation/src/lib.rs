//! Audience segmentation engine — filter predicates, membership resolution,
//! manual-edit reconciliation, and the service that persists the results.

pub mod adapters;
pub mod builder;
pub mod draft;
pub mod engine;
pub mod facets;
pub mod gateway;
pub mod predicates;
pub mod service;
pub mod store;

pub use builder::{AudienceBuilder, CriteriaBuilder};
pub use draft::{CommitPlan, MembershipDraft};
pub use engine::{compute_membership, reconcile_members, MembershipDelta};
pub use facets::FilterOptions;
pub use gateway::{AudienceStore, ContactSource};
pub use predicates::matches;
pub use service::{AudienceService, Freshness, MembershipSnapshot};
pub use store::{InMemoryAudienceStore, InMemoryContactSource};
