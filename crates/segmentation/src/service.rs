//! Audience service — wires the pure engine to the contact source and the
//! audience store.
//!
//! Filtered audiences are always evaluated live and fail closed when the
//! contact source is down. Static audiences read their associations and may
//! fall back to the last list fetched successfully.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use audience_core::config::SegmentationConfig;
use audience_core::error::{SegmentationError, SegmentationResult};
use audience_core::types::{
    Audience, AudienceId, AudienceMeta, AudienceRecord, Contact, ContactId, FilterCriteria,
    ModeKind, NewAudience, RequestScope,
};

use crate::builder::validate_details;
use crate::draft::{CommitPlan, MembershipDraft};
use crate::engine::{active_members, filter_contacts, MembershipDelta};
use crate::facets::FilterOptions;
use crate::gateway::{AudienceStore, ContactSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    /// Served from the last successful association fetch.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub audience_id: AudienceId,
    pub mode: ModeKind,
    pub member_ids: Vec<ContactId>,
    pub freshness: Freshness,
}

impl MembershipSnapshot {
    pub fn count(&self) -> u64 {
        self.member_ids.len() as u64
    }
}

/// Live match result for criteria that are not saved yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPreview {
    pub matching_ids: Vec<ContactId>,
    pub matching_count: usize,
    pub options: FilterOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub audience: Audience,
    pub delta: MembershipDelta,
    /// Live member count after the commit. `None` when the recount could not
    /// reach its data; the commit itself has still landed.
    pub contact_count: Option<u64>,
}

pub struct AudienceService {
    contacts: Arc<dyn ContactSource>,
    store: Arc<dyn AudienceStore>,
    config: SegmentationConfig,
    last_known: DashMap<AudienceId, Vec<ContactId>>,
}

impl AudienceService {
    pub fn new(
        contacts: Arc<dyn ContactSource>,
        store: Arc<dyn AudienceStore>,
        config: SegmentationConfig,
    ) -> Self {
        Self {
            contacts,
            store,
            config,
            last_known: DashMap::new(),
        }
    }

    async fn active_contacts(&self, scope: &RequestScope) -> SegmentationResult<Vec<Contact>> {
        let mut contacts = self
            .contacts
            .list_active_contacts(scope)
            .await
            .map_err(SegmentationError::DataUnavailable)?;
        // The source promises active contacts only; filter again regardless.
        contacts.retain(|c| c.is_active);
        Ok(contacts)
    }

    async fn record(&self, scope: &RequestScope, id: &str) -> SegmentationResult<AudienceRecord> {
        self.store
            .get_audience(scope, id)
            .await?
            .ok_or_else(|| SegmentationError::AudienceNotFound(id.to_string()))
    }

    async fn association_ids(
        &self,
        scope: &RequestScope,
        id: &str,
    ) -> SegmentationResult<Vec<ContactId>> {
        let associated = self.store.list_associations(scope, id).await?;
        Ok(associated.into_iter().map(|c| c.id).collect())
    }

    /// Create an audience. Active criteria make it filtered; otherwise the
    /// initial contact ids become its explicit membership.
    pub async fn create_audience(
        &self,
        scope: &RequestScope,
        request: NewAudience,
    ) -> SegmentationResult<Audience> {
        let (name, description) = validate_details(&request.name, request.description.as_deref())?;
        let filters = request.filters.and_then(FilterCriteria::into_active);
        if filters.is_some() && !request.contact_ids.is_empty() {
            return Err(SegmentationError::InconsistentState(
                "an audience cannot have both filter criteria and explicit contacts".to_string(),
            ));
        }
        let contact_ids: Vec<ContactId> = request
            .contact_ids
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let request = NewAudience {
            name,
            description,
            filters,
            contact_ids,
        };

        let record = self.store.create_audience(scope, &request).await?;
        let mode = if request.filters.is_some() {
            ModeKind::Filtered
        } else {
            ModeKind::Static
        };
        metrics::counter!("segmentation.audience.created").increment(1);
        info!(
            audience_id = %record.id,
            mode = %mode,
            initial_members = request.contact_ids.len(),
            "audience created"
        );
        Ok(Audience::from_record(record, request.contact_ids))
    }

    /// Load an audience with its authoritative mode. Associations are only
    /// fetched for static audiences.
    pub async fn load_audience(
        &self,
        scope: &RequestScope,
        id: &str,
    ) -> SegmentationResult<Audience> {
        let record = self.record(scope, id).await?;
        let has_criteria = record
            .filters
            .as_ref()
            .is_some_and(|f| !f.is_empty());
        let associations = if has_criteria {
            Vec::new()
        } else {
            self.association_ids(scope, id).await?
        };
        Ok(Audience::from_record(record, associations))
    }

    /// Rename or re-describe an audience. Mode and criteria are untouched.
    pub async fn update_details(
        &self,
        scope: &RequestScope,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> SegmentationResult<AudienceRecord> {
        let (name, description) = validate_details(name, description)?;
        let record = self.record(scope, id).await?;
        let meta = AudienceMeta {
            name,
            description,
            filters: record.filters,
        };
        let saved = self.store.save_audience_meta(scope, id, &meta).await?;
        info!(audience_id = %id, "audience details updated");
        Ok(saved)
    }

    /// Current members of an audience.
    pub async fn resolve_membership(
        &self,
        scope: &RequestScope,
        id: &str,
    ) -> SegmentationResult<MembershipSnapshot> {
        let record = self.record(scope, id).await?;

        if let Some(criteria) = record.filters.and_then(FilterCriteria::into_active) {
            let contacts = self.active_contacts(scope).await.map_err(|e| {
                warn!(audience_id = %id, error = %e, "filtered membership unavailable");
                e
            })?;
            let member_ids = filter_contacts(&contacts, &criteria);
            metrics::counter!("segmentation.membership.resolved").increment(1);
            debug!(audience_id = %id, members = member_ids.len(), "filtered membership resolved");
            return Ok(MembershipSnapshot {
                audience_id: id.to_string(),
                mode: ModeKind::Filtered,
                member_ids,
                freshness: Freshness::Fresh,
            });
        }

        match self.store.list_associations(scope, id).await {
            Ok(associated) => {
                let member_ids = active_members(&associated);
                self.last_known.insert(id.to_string(), member_ids.clone());
                metrics::counter!("segmentation.membership.resolved").increment(1);
                debug!(audience_id = %id, members = member_ids.len(), "static membership resolved");
                Ok(MembershipSnapshot {
                    audience_id: id.to_string(),
                    mode: ModeKind::Static,
                    member_ids,
                    freshness: Freshness::Fresh,
                })
            }
            Err(e) => {
                let cached = self
                    .config
                    .static_fallback
                    .then(|| self.last_known.get(id).map(|r| r.value().clone()))
                    .flatten();
                match cached {
                    Some(member_ids) => {
                        metrics::counter!("segmentation.membership.fallback").increment(1);
                        warn!(
                            audience_id = %id,
                            error = %e,
                            members = member_ids.len(),
                            "association fetch failed, serving last known membership"
                        );
                        Ok(MembershipSnapshot {
                            audience_id: id.to_string(),
                            mode: ModeKind::Static,
                            member_ids,
                            freshness: Freshness::Stale,
                        })
                    }
                    None => Err(e.into()),
                }
            }
        }
    }

    /// Recompute the displayed count after contacts were deleted or
    /// deactivated. The stored `contact_count` is never trusted.
    pub async fn recount_after_contact_change(
        &self,
        scope: &RequestScope,
        id: &str,
    ) -> SegmentationResult<u64> {
        let snapshot = self.resolve_membership(scope, id).await?;
        metrics::counter!("segmentation.recount").increment(1);
        info!(
            audience_id = %id,
            mode = %snapshot.mode,
            count = snapshot.count(),
            stale = snapshot.freshness == Freshness::Stale,
            "audience recounted"
        );
        Ok(snapshot.count())
    }

    /// Recount every audience in scope. Failures are reported per audience.
    pub async fn recount_all(
        &self,
        scope: &RequestScope,
    ) -> SegmentationResult<Vec<(AudienceId, SegmentationResult<u64>)>> {
        let ids = self.store.list_audience_ids(scope).await?;
        let mut counts = Vec::with_capacity(ids.len());
        for id in ids {
            let count = self.recount_after_contact_change(scope, &id).await;
            counts.push((id, count));
        }
        Ok(counts)
    }

    /// Matching contacts and filter options for unsaved criteria.
    pub async fn matching_preview(
        &self,
        scope: &RequestScope,
        criteria: &FilterCriteria,
    ) -> SegmentationResult<MatchPreview> {
        let contacts = self.active_contacts(scope).await?;
        let matching_ids = filter_contacts(&contacts, &criteria.normalized());
        Ok(MatchPreview {
            matching_count: matching_ids.len(),
            matching_ids,
            options: FilterOptions::from_contacts(&contacts),
        })
    }

    /// Open a membership draft seeded with the current persisted state.
    pub async fn open_draft(
        &self,
        scope: &RequestScope,
        id: &str,
    ) -> SegmentationResult<MembershipDraft> {
        let record = self.record(scope, id).await?;
        let persisted = self.association_ids(scope, id).await?;
        let audience = Audience::from_record(record, persisted.clone());
        let contacts = if audience.is_filtered() {
            self.active_contacts(scope).await?
        } else {
            Vec::new()
        };
        Ok(MembershipDraft::open(&audience, persisted, &contacts))
    }

    /// Evaluate `criteria` and stage the result as the draft's selection.
    pub async fn apply_filters(
        &self,
        scope: &RequestScope,
        draft: &mut MembershipDraft,
        criteria: FilterCriteria,
    ) -> SegmentationResult<usize> {
        let contacts = self.active_contacts(scope).await?;
        let selected = draft.apply_filters(criteria, &contacts).len();
        debug!(audience_id = %draft.audience_id(), selected, "filters applied to draft");
        Ok(selected)
    }

    /// Persist a draft.
    ///
    /// Writes are ordered so a failure part way leaves the previous mode
    /// authoritative and its membership intact. A filtered commit stores the
    /// criteria before purging associations. A static commit rewrites the
    /// associations before nulling the stored filter.
    pub async fn commit_draft(
        &self,
        scope: &RequestScope,
        draft: &MembershipDraft,
    ) -> SegmentationResult<CommitOutcome> {
        let plan = draft.plan();
        let record = self.record(scope, &plan.audience_id).await?;
        self.apply_plan(scope, record, plan).await
    }

    async fn apply_plan(
        &self,
        scope: &RequestScope,
        record: AudienceRecord,
        plan: CommitPlan,
    ) -> SegmentationResult<CommitOutcome> {
        let id = plan.audience_id.as_str();
        let meta = AudienceMeta {
            name: record.name,
            description: record.description,
            filters: plan.filters.clone(),
        };

        let saved = match plan.mode {
            ModeKind::Filtered => {
                let saved = self.store.save_audience_meta(scope, id, &meta).await?;
                self.write_delta(scope, id, &plan.delta).await?;
                saved
            }
            ModeKind::Static => {
                self.write_delta(scope, id, &plan.delta).await?;
                self.store.save_audience_meta(scope, id, &meta).await?
            }
        };
        self.last_known.remove(id);

        metrics::counter!("segmentation.commit.added").increment(plan.delta.to_add.len() as u64);
        metrics::counter!("segmentation.commit.removed")
            .increment(plan.delta.to_remove.len() as u64);
        info!(
            audience_id = %id,
            mode = %plan.mode,
            added = plan.delta.to_add.len(),
            removed = plan.delta.to_remove.len(),
            "audience membership committed"
        );

        let audience = Audience::from_record(saved, plan.members);
        let contact_count = match self.recount_after_contact_change(scope, id).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(audience_id = %id, error = %e, "recount after commit failed");
                None
            }
        };
        Ok(CommitOutcome {
            audience,
            delta: plan.delta,
            contact_count,
        })
    }

    async fn write_delta(
        &self,
        scope: &RequestScope,
        id: &str,
        delta: &MembershipDelta,
    ) -> SegmentationResult<()> {
        if !delta.to_add.is_empty() {
            self.store.add_associations(scope, id, &delta.to_add).await?;
        }
        if !delta.to_remove.is_empty() {
            self.store
                .remove_associations(scope, id, &delta.to_remove)
                .await?;
        }
        Ok(())
    }

    /// Add contacts to a static audience. Filtered audiences must be
    /// converted through a draft first.
    pub async fn assign_contacts(
        &self,
        scope: &RequestScope,
        id: &str,
        contact_ids: &[ContactId],
    ) -> SegmentationResult<MembershipDelta> {
        let record = self.record(scope, id).await?;
        if record.filters.as_ref().is_some_and(|f| !f.is_empty()) {
            return Err(SegmentationError::InconsistentState(format!(
                "audience {} is filtered; clear its criteria before assigning contacts",
                id
            )));
        }
        let current: BTreeSet<ContactId> =
            self.association_ids(scope, id).await?.into_iter().collect();
        let to_add: Vec<ContactId> = contact_ids
            .iter()
            .filter(|c| !current.contains(*c))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !to_add.is_empty() {
            self.store.add_associations(scope, id, &to_add).await?;
            self.last_known.remove(id);
        }
        info!(audience_id = %id, added = to_add.len(), "contacts assigned");
        Ok(MembershipDelta {
            to_add,
            to_remove: Vec::new(),
        })
    }
}
