//! Integration tests for the audience lifecycle against the in-memory
//! collaborators: filter, preview, hand-edit, commit, recount.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use audience_core::config::SegmentationConfig;
    use audience_core::types::{AudienceMode, Contact, FilterCriteria, ModeKind, RequestScope};
    use audience_segmentation::adapters::normalize_contacts;
    use audience_segmentation::{
        AudienceBuilder, AudienceService, AudienceStore, CriteriaBuilder, InMemoryAudienceStore,
        InMemoryContactSource,
    };

    fn scope() -> RequestScope {
        RequestScope::new("org-acme").with_bearer("test-token")
    }

    fn setup(
        contacts: Vec<Contact>,
    ) -> (
        Arc<InMemoryContactSource>,
        Arc<InMemoryAudienceStore>,
        AudienceService,
    ) {
        let source = Arc::new(InMemoryContactSource::with_contacts(contacts));
        let store = Arc::new(InMemoryAudienceStore::new(source.clone()));
        let service =
            AudienceService::new(source.clone(), store.clone(), SegmentationConfig::default());
        (source, store, service)
    }

    /// Twenty contacts: even ids are houses, odd ids are condos.
    fn neighbourhood() -> Vec<Contact> {
        (1..=20)
            .map(|i| Contact {
                property_type: Some(if i % 2 == 0 { "House" } else { "Condo" }.to_string()),
                budget_min: Some(100_000.0 * i as f64),
                budget_max: Some(100_000.0 * i as f64 + 150_000.0),
                ..Contact::new(format!("{:02}", i), format!("c{}@example.com", i))
            })
            .collect()
    }

    fn as_set(ids: &[String]) -> BTreeSet<String> {
        ids.iter().cloned().collect()
    }

    #[tokio::test]
    async fn test_end_to_end_scenario_from_raw_payloads() {
        let raw = serde_json::json!([
            {
                "id": 1,
                "email": "one@example.com",
                "budget_min": 200000,
                "budget_max": 400000,
                "property_type": "Condo"
            },
            {
                "Id": 2,
                "Email": "two@example.com",
                "BudgetMin": 500000,
                "BudgetMax": 800000,
                "PropertyType": "House"
            },
        ]);
        let (_, _, service) = setup(normalize_contacts(&raw).unwrap());

        let request = AudienceBuilder::new("Big house buyers")
            .filters(
                CriteriaBuilder::new()
                    .property_types(["House"])
                    .budget_min(450_000.0)
                    .build(),
            )
            .build()
            .unwrap();
        let audience = service.create_audience(&scope(), request).await.unwrap();
        let snapshot = service.resolve_membership(&scope(), &audience.id).await.unwrap();
        assert_eq!(snapshot.member_ids, vec!["2"]);
    }

    #[tokio::test]
    async fn test_manual_edit_freezes_filtered_audience() {
        let (_, store, service) = setup(neighbourhood());
        // Budgets reaching 650k: ids 05..20. Capping at 1.6M leaves 05..16.
        let criteria = CriteriaBuilder::new().budget_min(650_000.0).build();
        let audience = service
            .create_audience(
                &scope(),
                AudienceBuilder::new("Upper market").filters(criteria).build().unwrap(),
            )
            .await
            .unwrap();

        // Stale associations left behind by an older static incarnation.
        store
            .add_associations(&scope(), &audience.id, &["01".to_string()])
            .await
            .unwrap();

        let mut draft = service.open_draft(&scope(), &audience.id).await.unwrap();
        let refined = CriteriaBuilder::new()
            .budget_min(650_000.0)
            .budget_max(1_600_000.0)
            .build();
        let selected = service.apply_filters(&scope(), &mut draft, refined).await.unwrap();
        assert_eq!(selected, 12);

        draft.toggle("10");
        let expected: BTreeSet<String> = draft.selection().clone();
        assert_eq!(expected.len(), 11);

        let outcome = service.commit_draft(&scope(), &draft).await.unwrap();
        assert!(!outcome.audience.is_filtered());
        assert_eq!(outcome.contact_count, Some(11));
        assert_eq!(outcome.delta.to_remove, vec!["01"]);

        let stored = store.get_audience(&scope(), &audience.id).await.unwrap().unwrap();
        assert!(stored.filters.is_none());
        assert_eq!(store.association_ids(&audience.id), expected);

        // Re-fetching uses the frozen list, not the old criteria.
        let reloaded = service.load_audience(&scope(), &audience.id).await.unwrap();
        assert_eq!(reloaded.mode, AudienceMode::Static { member_ids: expected.clone() });
        let snapshot = service.resolve_membership(&scope(), &audience.id).await.unwrap();
        assert_eq!(snapshot.mode, ModeKind::Static);
        assert_eq!(as_set(&snapshot.member_ids), expected);
    }

    #[tokio::test]
    async fn test_untouched_filtered_commit_purges_stale_associations() {
        let (_, store, service) = setup(neighbourhood());
        let houses = CriteriaBuilder::new().property_types(["House"]).build();
        let audience = service
            .create_audience(
                &scope(),
                AudienceBuilder::new("Houses").filters(houses.clone()).build().unwrap(),
            )
            .await
            .unwrap();
        store
            .add_associations(&scope(), &audience.id, &["03".to_string(), "05".to_string()])
            .await
            .unwrap();

        let draft = service.open_draft(&scope(), &audience.id).await.unwrap();
        let outcome = service.commit_draft(&scope(), &draft).await.unwrap();

        assert!(outcome.audience.is_filtered());
        assert_eq!(outcome.contact_count, Some(10));
        assert!(store.association_ids(&audience.id).is_empty());
        let stored = store.get_audience(&scope(), &audience.id).await.unwrap().unwrap();
        assert_eq!(stored.filters, Some(houses));
    }

    #[tokio::test]
    async fn test_inactive_contacts_never_counted() {
        let (source, _, service) = setup(neighbourhood());
        let everyone = service
            .create_audience(
                &scope(),
                AudienceBuilder::new("Condos")
                    .filters(FilterCriteria {
                        property_type: Some(BTreeSet::from(["Condo".to_string()])),
                        ..Default::default()
                    })
                    .build()
                    .unwrap(),
            )
            .await
            .unwrap();
        let picked = service
            .create_audience(
                &scope(),
                AudienceBuilder::new("Picked").contacts(["01", "02"]).build().unwrap(),
            )
            .await
            .unwrap();

        source.deactivate("01");

        let filtered = service.resolve_membership(&scope(), &everyone.id).await.unwrap();
        assert!(!filtered.member_ids.contains(&"01".to_string()));
        assert_eq!(filtered.count(), 9);

        let manual = service
            .recount_after_contact_change(&scope(), &picked.id)
            .await
            .unwrap();
        assert_eq!(manual, 1);
    }

    #[tokio::test]
    async fn test_store_errors_surface_unchanged() {
        let (_, store, service) = setup(neighbourhood());
        let audience = service
            .create_audience(
                &scope(),
                AudienceBuilder::new("Picked").contacts(["02"]).build().unwrap(),
            )
            .await
            .unwrap();
        let draft = service.open_draft(&scope(), &audience.id).await.unwrap();

        store.set_offline(true);
        let err = service.commit_draft(&scope(), &draft).await.unwrap_err();
        assert_eq!(err.to_string(), "audience store is unreachable");
    }
}
