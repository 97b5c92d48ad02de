//! Membership drafts for the filter, preview, hand-edit, save workflow.
//!
//! A draft snapshots the persisted associations of an audience, stages a
//! candidate selection, and produces a [`CommitPlan`] describing the writes
//! needed to persist it. Nothing here performs I/O.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use audience_core::types::{
    Audience, AudienceId, AudienceMode, Contact, ContactId, FilterCriteria, ModeKind,
};

use crate::engine::{filter_contacts, reconcile_members, MembershipDelta};

/// Writes required to persist a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitPlan {
    pub audience_id: AudienceId,
    pub mode: ModeKind,
    /// Criteria to store. `None` nulls the stored filter.
    pub filters: Option<FilterCriteria>,
    pub delta: MembershipDelta,
    /// Members the audience holds after the commit (static mode only).
    pub members: BTreeSet<ContactId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MembershipDraft {
    audience_id: AudienceId,
    original: BTreeSet<ContactId>,
    selection: BTreeSet<ContactId>,
    criteria: Option<FilterCriteria>,
    edited: bool,
}

impl MembershipDraft {
    /// Open a draft for `audience`.
    ///
    /// `persisted` are the raw stored association ids, inactive contacts
    /// included. `contacts` is the active contact set used to evaluate a
    /// filtered audience.
    pub fn open(
        audience: &Audience,
        persisted: impl IntoIterator<Item = ContactId>,
        contacts: &[Contact],
    ) -> Self {
        let original: BTreeSet<ContactId> = persisted.into_iter().collect();
        match &audience.mode {
            AudienceMode::Filtered { criteria } => Self {
                audience_id: audience.id.clone(),
                selection: filter_contacts(contacts, criteria).into_iter().collect(),
                original,
                criteria: Some(criteria.clone()),
                edited: false,
            },
            AudienceMode::Static { .. } => Self {
                audience_id: audience.id.clone(),
                selection: original.clone(),
                original,
                criteria: None,
                edited: false,
            },
        }
    }

    pub fn audience_id(&self) -> &str {
        &self.audience_id
    }

    pub fn selection(&self) -> &BTreeSet<ContactId> {
        &self.selection
    }

    pub fn original(&self) -> &BTreeSet<ContactId> {
        &self.original
    }

    pub fn criteria(&self) -> Option<&FilterCriteria> {
        self.criteria.as_ref()
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Stage the contacts matching `criteria` as the candidate selection.
    ///
    /// Empty criteria select every active contact and leave the draft
    /// without criteria, so it will save as a static audience.
    pub fn apply_filters(
        &mut self,
        criteria: FilterCriteria,
        contacts: &[Contact],
    ) -> &BTreeSet<ContactId> {
        let criteria = criteria.normalized();
        self.selection = filter_contacts(contacts, &criteria).into_iter().collect();
        if criteria.is_empty() {
            self.criteria = None;
            self.edited = true;
        } else {
            self.criteria = Some(criteria);
            self.edited = false;
        }
        &self.selection
    }

    /// Flip a single contact in or out of the selection. Returns whether it
    /// is selected afterwards.
    pub fn toggle(&mut self, id: impl Into<ContactId>) -> bool {
        let id = id.into();
        self.edited = true;
        if self.selection.remove(&id) {
            false
        } else {
            self.selection.insert(id);
            true
        }
    }

    pub fn select(&mut self, ids: impl IntoIterator<Item = ContactId>) {
        self.selection.extend(ids);
        self.edited = true;
    }

    pub fn deselect<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.selection.remove(id);
        }
        self.edited = true;
    }

    /// Drop the criteria and freeze the current selection as explicit
    /// membership.
    pub fn clear_filters(&mut self) {
        if self.criteria.take().is_some() {
            self.edited = true;
        }
    }

    /// Writes needed to persist this draft.
    ///
    /// An untouched filtered draft keeps its criteria and purges every stored
    /// association. Any manual edit commits static membership with the
    /// stored filter nulled, so a later evaluation cannot discard the edits.
    pub fn plan(&self) -> CommitPlan {
        match (&self.criteria, self.edited) {
            (Some(criteria), false) => CommitPlan {
                audience_id: self.audience_id.clone(),
                mode: ModeKind::Filtered,
                filters: Some(criteria.clone()),
                delta: reconcile_members(&self.original, &BTreeSet::new()),
                members: BTreeSet::new(),
            },
            _ => CommitPlan {
                audience_id: self.audience_id.clone(),
                mode: ModeKind::Static,
                filters: None,
                delta: reconcile_members(&self.original, &self.selection),
                members: self.selection.clone(),
            },
        }
    }
}
