use tracing::info;

use folio_db::{documents, migrations, photos};
use folio_records::{Config, Records};

/// Bring the database schema up to date and make sure the image storage
/// directory exists. Safe to run repeatedly.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_migrate=debug,folio_db=debug,folio_records=debug,folio_storage=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        "Database: {}, image storage: {}, image limit: {} bytes",
        config.db_path.display(),
        config.storage_dir.display(),
        config.max_image_bytes
    );

    // Opening the database applies pending migrations
    let records = Records::open(&config).await?;

    let (version, document_count, photo_count) = records.db().with_conn(|conn| {
        Ok::<_, folio_db::DbError>((
            migrations::schema_version(conn)?,
            documents::count_documents(conn)?,
            photos::count_photos(conn)?,
        ))
    })?;
    let image_count = records.store().list_keys().await?.len();

    info!("Schema at v{}", version);
    info!(
        "{} documents, {} photos, {} stored images",
        document_count, photo_count, image_count
    );

    Ok(())
}
