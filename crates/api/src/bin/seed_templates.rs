//! Import templates and their prompts from a JSON file.
//!
//! ```text
//! seed-templates --file templates.json --publish true --visibility public --model gemini-1.5-pro
//! ```
//!
//! The file holds `[{ "id": "<slug>", "name": "...", "prompt": "..." }]`.
//! Each record upserts its template by slug and writes prompt version 1 as
//! the current version. The whole import is one transaction.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use imageai_core::template::{is_valid_slug, TemplateStatus, Visibility};
use imageai_db::models::template_version::UpsertTemplateVersion;
use imageai_db::repositories::{TemplateRepo, TemplateVersionRepo};
use serde::Deserialize;
use serde_json::json;

use imageai_api::config::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "seed-templates", about = "Import templates from a JSON file")]
struct Args {
    /// Path to the templates JSON file.
    #[arg(long, default_value = "templates.json")]
    file: PathBuf,

    /// Mark imported templates as published.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    publish: bool,

    /// Visibility of imported templates (public|private).
    #[arg(long, default_value = "public")]
    visibility: Visibility,

    /// Model provider, recorded in the version's model parameters.
    #[arg(long, default_value = "gemini")]
    provider: String,

    /// Model name for the imported versions.
    #[arg(long, default_value = imageai_genai::DEFAULT_MODEL)]
    model: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SeedRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    prompt: String,
}

/// Keep records with a valid slug, a name and a prompt; log the rest.
fn usable_records(records: Vec<SeedRecord>) -> Vec<SeedRecord> {
    records
        .into_iter()
        .filter(|r| {
            let ok = is_valid_slug(&r.id) && !r.name.trim().is_empty() && !r.prompt.trim().is_empty();
            if !ok {
                tracing::warn!(
                    id = %r.id,
                    name = %r.name,
                    prompt_len = r.prompt.len(),
                    "Skipping invalid record",
                );
            }
            ok
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed_templates=info,imageai_db=info".into()),
        )
        .init();

    let args = Args::parse();
    tracing::info!(file = %args.file.display(), "Reading templates");

    let raw = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let records: Vec<SeedRecord> =
        serde_json::from_slice(&raw).context("Failed to decode templates JSON")?;
    let records = usable_records(records);
    if records.is_empty() {
        tracing::info!("No templates to import");
        return Ok(());
    }

    let config = ServerConfig::from_env().context("Invalid configuration")?;
    let pool = imageai_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    imageai_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let status = if args.publish {
        TemplateStatus::Published
    } else {
        TemplateStatus::Draft
    };

    let mut tx = pool.begin().await?;
    for record in &records {
        let template_id =
            TemplateRepo::upsert_seed(&mut tx, &record.id, record.name.trim(), status, args.visibility)
                .await
                .with_context(|| format!("Failed to upsert template '{}'", record.id))?;

        TemplateVersionRepo::upsert_current(
            &mut tx,
            template_id,
            &UpsertTemplateVersion {
                version: 1,
                prompt_template: record.prompt.clone(),
                model_name: Some(args.model.clone()),
                model_parameters: json!({ "provider": args.provider }),
            },
        )
        .await
        .with_context(|| format!("Failed to write prompt for '{}'", record.id))?;
    }
    tx.commit().await?;

    tracing::info!(
        count = records.len(),
        status = %status,
        visibility = %args.visibility,
        provider = %args.provider,
        model = %args.model,
        "Imported templates",
    );
    Ok(())
}
