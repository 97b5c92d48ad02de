//! Contracts for the external collaborators the engine reads from and writes
//! back to. Implementations report failures as `anyhow::Error`; the engine
//! surfaces them to its caller without rewording.

use anyhow::Result;
use async_trait::async_trait;

use audience_core::types::{
    AudienceId, AudienceMeta, AudienceRecord, Contact, ContactId, NewAudience, RequestScope,
};

/// Read-only source of the organization's contacts.
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Contacts in scope that are not soft-deleted.
    async fn list_active_contacts(&self, scope: &RequestScope) -> Result<Vec<Contact>>;
}

/// Storage for audience records and explicit contact associations.
#[async_trait]
pub trait AudienceStore: Send + Sync {
    async fn create_audience(
        &self,
        scope: &RequestScope,
        audience: &NewAudience,
    ) -> Result<AudienceRecord>;

    async fn get_audience(
        &self,
        scope: &RequestScope,
        id: &str,
    ) -> Result<Option<AudienceRecord>>;

    /// Overwrite name, description and filters. `filters: None` stores null.
    async fn save_audience_meta(
        &self,
        scope: &RequestScope,
        id: &str,
        meta: &AudienceMeta,
    ) -> Result<AudienceRecord>;

    async fn add_associations(
        &self,
        scope: &RequestScope,
        id: &str,
        contact_ids: &[ContactId],
    ) -> Result<()>;

    async fn remove_associations(
        &self,
        scope: &RequestScope,
        id: &str,
        contact_ids: &[ContactId],
    ) -> Result<()>;

    /// Associated contacts, soft-deleted ones included.
    async fn list_associations(&self, scope: &RequestScope, id: &str) -> Result<Vec<Contact>>;

    async fn list_audience_ids(&self, scope: &RequestScope) -> Result<Vec<AudienceId>>;
}
