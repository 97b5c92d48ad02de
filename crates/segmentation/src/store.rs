//! In-memory collaborators backed by DashMap.
//!
//! Production: replace with the organization's REST API or a database.
//! These provide the same contract for development, the preview tool, and
//! tests. Each can be switched offline to exercise failure paths.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use audience_core::types::{
    AudienceId, AudienceMeta, AudienceRecord, Contact, ContactId, NewAudience, RequestScope,
};

use crate::gateway::{AudienceStore, ContactSource};

/// Thread-safe in-memory contact directory.
#[derive(Default)]
pub struct InMemoryContactSource {
    contacts: DashMap<ContactId, Contact>,
    offline: AtomicBool,
}

impl InMemoryContactSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let source = Self::new();
        for contact in contacts {
            source.upsert(contact);
        }
        source
    }

    pub fn upsert(&self, contact: Contact) {
        self.contacts.insert(contact.id.clone(), contact);
    }

    /// Soft-delete. Returns false if the contact is unknown.
    pub fn deactivate(&self, id: &str) -> bool {
        self.contacts
            .get_mut(id)
            .map(|mut entry| {
                entry.value_mut().is_active = false;
                debug!(contact_id = %id, "contact deactivated");
            })
            .is_some()
    }

    pub fn get(&self, id: &str) -> Option<Contact> {
        self.contacts.get(id).map(|r| r.value().clone())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

#[async_trait]
impl ContactSource for InMemoryContactSource {
    async fn list_active_contacts(&self, scope: &RequestScope) -> Result<Vec<Contact>> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("contact directory for org '{}' is unreachable", scope.org_id);
        }
        let mut contacts: Vec<Contact> = self
            .contacts
            .iter()
            .filter(|r| r.value().is_active)
            .map(|r| r.value().clone())
            .collect();
        contacts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(contacts)
    }
}

/// Thread-safe in-memory audience store. Association lookups resolve
/// contacts through the shared contact directory. Every audience belongs to
/// the org that created it and is invisible to other orgs.
pub struct InMemoryAudienceStore {
    contacts: Arc<InMemoryContactSource>,
    audiences: DashMap<AudienceId, AudienceRecord>,
    owners: DashMap<AudienceId, String>,
    associations: DashMap<AudienceId, BTreeSet<ContactId>>,
    offline: AtomicBool,
}

impl InMemoryAudienceStore {
    pub fn new(contacts: Arc<InMemoryContactSource>) -> Self {
        info!("Audience store initialized (in-memory, development mode)");
        Self {
            contacts,
            audiences: DashMap::new(),
            owners: DashMap::new(),
            associations: DashMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Raw stored association ids, bypassing contact resolution.
    pub fn association_ids(&self, id: &str) -> BTreeSet<ContactId> {
        self.associations
            .get(id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Insert a record as-is for `scope`'s org, including dual-mode states
    /// storage can hold.
    pub fn insert_record(
        &self,
        scope: &RequestScope,
        record: AudienceRecord,
        associations: BTreeSet<ContactId>,
    ) {
        self.owners.insert(record.id.clone(), scope.org_id.clone());
        self.associations.insert(record.id.clone(), associations);
        self.audiences.insert(record.id.clone(), record);
    }

    fn owned_by(&self, scope: &RequestScope, id: &str) -> bool {
        self.owners
            .get(id)
            .is_some_and(|owner| *owner.value() == scope.org_id)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("audience store is unreachable");
        }
        Ok(())
    }

    fn ensure_exists(&self, scope: &RequestScope, id: &str) -> Result<()> {
        if !self.owned_by(scope, id) || !self.audiences.contains_key(id) {
            return Err(anyhow!("audience '{}' not found", id));
        }
        Ok(())
    }

    fn touch(&self, id: &str) {
        let count = self.associations.get(id).map_or(0, |r| r.value().len()) as u64;
        if let Some(mut entry) = self.audiences.get_mut(id) {
            let record = entry.value_mut();
            record.contact_count = count;
            record.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl AudienceStore for InMemoryAudienceStore {
    async fn create_audience(
        &self,
        scope: &RequestScope,
        audience: &NewAudience,
    ) -> Result<AudienceRecord> {
        self.ensure_online()?;
        let now = Utc::now();
        let members: BTreeSet<ContactId> = audience.contact_ids.iter().cloned().collect();
        let record = AudienceRecord {
            id: Uuid::new_v4().to_string(),
            name: audience.name.clone(),
            description: audience.description.clone(),
            filters: audience.filters.clone(),
            contact_count: members.len() as u64,
            created_at: now,
            updated_at: now,
        };
        info!(
            org_id = %scope.org_id,
            audience_id = %record.id,
            name = %record.name,
            "audience created"
        );
        self.insert_record(scope, record.clone(), members);
        Ok(record)
    }

    async fn get_audience(
        &self,
        scope: &RequestScope,
        id: &str,
    ) -> Result<Option<AudienceRecord>> {
        self.ensure_online()?;
        if !self.owned_by(scope, id) {
            return Ok(None);
        }
        Ok(self.audiences.get(id).map(|r| r.value().clone()))
    }

    async fn save_audience_meta(
        &self,
        scope: &RequestScope,
        id: &str,
        meta: &AudienceMeta,
    ) -> Result<AudienceRecord> {
        self.ensure_online()?;
        self.ensure_exists(scope, id)?;
        let mut entry = self
            .audiences
            .get_mut(id)
            .ok_or_else(|| anyhow!("audience '{}' not found", id))?;
        let record = entry.value_mut();
        record.name = meta.name.clone();
        record.description = meta.description.clone();
        record.filters = meta.filters.clone();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn add_associations(
        &self,
        scope: &RequestScope,
        id: &str,
        contact_ids: &[ContactId],
    ) -> Result<()> {
        self.ensure_online()?;
        self.ensure_exists(scope, id)?;
        self.associations
            .entry(id.to_string())
            .or_default()
            .extend(contact_ids.iter().cloned());
        self.touch(id);
        Ok(())
    }

    async fn remove_associations(
        &self,
        scope: &RequestScope,
        id: &str,
        contact_ids: &[ContactId],
    ) -> Result<()> {
        self.ensure_online()?;
        self.ensure_exists(scope, id)?;
        if let Some(mut members) = self.associations.get_mut(id) {
            for contact_id in contact_ids {
                members.remove(contact_id);
            }
        }
        self.touch(id);
        Ok(())
    }

    async fn list_associations(&self, scope: &RequestScope, id: &str) -> Result<Vec<Contact>> {
        self.ensure_online()?;
        self.ensure_exists(scope, id)?;
        Ok(self
            .association_ids(id)
            .iter()
            .filter_map(|contact_id| self.contacts.get(contact_id))
            .collect())
    }

    async fn list_audience_ids(&self, scope: &RequestScope) -> Result<Vec<AudienceId>> {
        self.ensure_online()?;
        let mut ids: Vec<AudienceId> = self
            .owners
            .iter()
            .filter(|r| *r.value() == scope.org_id)
            .map(|r| r.key().clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
