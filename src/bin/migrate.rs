use anyhow::Context;
use asset_ledger::{config, db};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(environment = %cfg.environment, "Starting database migration");

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("connecting to database")?;
    db::run_migrations(&pool).await.context("running migrations")?;
    db::close_pool(pool).await?;

    info!("Migration completed successfully");
    Ok(())
}
