//! Audience Preview — evaluate audience criteria against a contact export.
//!
//! Loads a JSON array of contact payloads, normalizes them, creates an
//! audience in the in-memory store, and prints its membership together with
//! the filter options present in the data.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use audience_core::config::AppConfig;
use audience_core::types::{FilterCriteria, RequestScope};
use audience_segmentation::adapters::{normalize_contacts, normalize_filters};
use audience_segmentation::{
    AudienceBuilder, AudienceService, FilterOptions, InMemoryAudienceStore, InMemoryContactSource,
};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "audience-preview")]
#[command(about = "Preview audience membership for a contact export")]
#[command(version)]
struct Cli {
    /// JSON file holding an array of contact payloads
    #[arg(long)]
    contacts: PathBuf,

    /// Filter criteria as a JSON object; omit for a static audience
    #[arg(long)]
    criteria: Option<String>,

    /// Contact ids for a static audience (comma-separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "criteria")]
    members: Vec<String>,

    /// Audience name
    #[arg(long, default_value = "Preview")]
    name: String,

    /// Organization identifier (overrides config)
    #[arg(long, env = "AUDIENCE_ENGINE__ORG_ID")]
    org_id: Option<String>,

    /// Maximum member ids to print (overrides config)
    #[arg(long)]
    limit: Option<usize>,

    /// Emit JSON logs (overrides config)
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

#[derive(Serialize)]
struct Report {
    audience_id: String,
    name: String,
    mode: String,
    criteria: Option<FilterCriteria>,
    contact_count: u64,
    members: Vec<String>,
    truncated: bool,
    options: FilterOptions,
}

fn init_tracing(filter: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_result = AppConfig::load();
    let mut config = config_result.as_ref().cloned().unwrap_or_default();
    if cli.json_logs {
        config.log.json = true;
    }
    init_tracing(&config.log.filter, config.log.json);
    if let Err(e) = &config_result {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    // Apply CLI overrides
    if let Some(org_id) = cli.org_id {
        config.org_id = org_id;
    }
    if let Some(limit) = cli.limit {
        config.segmentation.preview_limit = limit;
    }

    let raw = std::fs::read_to_string(&cli.contacts)
        .with_context(|| format!("reading {}", cli.contacts.display()))?;
    let payloads: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", cli.contacts.display()))?;
    let contacts = normalize_contacts(&payloads)?;
    info!(
        org_id = %config.org_id,
        contacts = contacts.len(),
        "Contacts loaded"
    );

    let criteria = match cli.criteria.as_deref() {
        Some(text) => {
            let value: serde_json::Value =
                serde_json::from_str(text).context("parsing --criteria")?;
            normalize_filters(Some(&value))
        }
        None => None,
    };

    let source = Arc::new(InMemoryContactSource::with_contacts(contacts));
    let store = Arc::new(InMemoryAudienceStore::new(source.clone()));
    let service = AudienceService::new(source.clone(), store, config.segmentation.clone());
    let scope = RequestScope::new(config.org_id.clone());

    let mut builder = AudienceBuilder::new(cli.name).contacts(cli.members);
    if let Some(criteria) = criteria {
        builder = builder.filters(criteria);
    }
    let audience = service.create_audience(&scope, builder.build()?).await?;
    let snapshot = service.resolve_membership(&scope, &audience.id).await?;
    let preview = service
        .matching_preview(&scope, &FilterCriteria::default())
        .await?;

    let limit = config.segmentation.preview_limit;
    let report = Report {
        audience_id: audience.id.clone(),
        name: audience.name.clone(),
        mode: snapshot.mode.to_string(),
        criteria: audience.mode.criteria().cloned(),
        contact_count: snapshot.count(),
        truncated: snapshot.member_ids.len() > limit,
        members: snapshot.member_ids.into_iter().take(limit).collect(),
        options: preview.options,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(audience_id = %audience.id, count = report.contact_count, "Preview complete");
    Ok(())
}
