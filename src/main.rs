use std::sync::Arc;
use tracing::info;

use helios_core::config::AppConfig;
use helios_db::{
    create_pool, PgCallRecordRepository, PgPatternRepository, PgQuotaRepository,
};
use helios_ingest::{IngestPipeline, IngestServer};
use helios_rating::{CountryClassifier, QuotaLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("🚀 Starting Helios CDR");

    let config = AppConfig::load()?;

    let pool = create_pool(
        &config.database.url,
        Some(config.database.max_connections),
    )
    .await?;
    info!("✅ Database pool created");

    sqlx::migrate!("crates/helios-db/migrations")
        .run(&pool)
        .await?;
    info!("✅ Migrations applied");

    let record_repo = Arc::new(PgCallRecordRepository::new(pool.clone()));
    let pattern_repo = Arc::new(PgPatternRepository::new(pool.clone()));
    let quota_repo = Arc::new(PgQuotaRepository::new(pool.clone()));

    let ledger = Arc::new(QuotaLedger::new(quota_repo));
    let classifier = CountryClassifier::new(config.classifier.clone());

    let pipeline = Arc::new(IngestPipeline::new(
        record_repo,
        pattern_repo,
        ledger,
        classifier,
        config.billing.default_tenant_id,
    ));

    let addr = config.ingest_addr();
    let server = IngestServer::new(pipeline, config.ingest.clone());

    info!("✅ Services wired, starting ingestion listener");
    server.start(&addr).await?;
    Ok(())
}
