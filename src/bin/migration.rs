use anyhow::Context;
use sea_orm_migration::MigratorTrait;
use toko_api::{config::AppConfig, db, migrator::Migrator};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(_) => {
            let url = std::env::var("DATABASE_URL")
                .context("set DATABASE_URL or provide a config file")?;
            AppConfig::new(url)
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let conn = db::establish_connection(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    info!("Running migrations");
    Migrator::up(&conn, None)
        .await
        .context("migration failed")?;
    info!("Migrations complete");

    Ok(())
}
