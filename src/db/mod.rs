use anyhow::Result;
use sqlx::{Pool, Sqlite, migrate::MigrateDatabase, sqlite::SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

pub mod reference_store;
pub mod shipment_store;
pub mod user_store;

pub use reference_store::ReferenceStore;
pub use shipment_store::ShipmentStore;
pub use user_store::UserStore;

use crate::models::{NewShipment, ShipmentRecord};

pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool
pub async fn init_db_pool(database_url: &str) -> Result<DbPool> {
    ensure_parent_dir(database_url)?;

    // Create the database if it doesn't exist
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        Sqlite::create_database(database_url).await?;
        tracing::info!("Created database {}", database_url);
    }

    // Create connection pool
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    setup_database(&pool).await?;

    Ok(pool)
}

/// Apply pending migrations, then repair legacy rows
async fn setup_database(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    let split = split_legacy_multi_driver_rows(pool).await?;
    if split > 0 {
        tracing::info!("Split {} legacy multi-driver shipment rows", split);
    }

    Ok(())
}

/// Early versions stored one row per order with the drivers joined by commas.
/// Each such row becomes one row per driver; volume and money columns are
/// divided evenly. Returns the number of legacy rows replaced.
pub async fn split_legacy_multi_driver_rows(pool: &DbPool) -> Result<u64> {
    let mut tx = pool.begin().await?;

    let legacy: Vec<ShipmentRecord> = sqlx::query_as(&format!(
        "SELECT {} FROM shipments WHERE driver LIKE '%,%' ORDER BY id",
        shipment_store::COLUMNS
    ))
    .fetch_all(&mut *tx)
    .await?;

    let mut replaced = 0;
    for row in legacy {
        let drivers: Vec<&str> = row
            .driver
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();
        if drivers.is_empty() {
            tracing::warn!("Shipment {} has no usable driver name, left untouched", row.id);
            continue;
        }

        let parts = drivers.len() as f64;
        for driver in drivers {
            let part = NewShipment {
                batch_id: row.batch_id.clone(),
                shipped_on: row.shipped_on,
                shipped_at: row.shipped_at,
                plant: row.plant.clone(),
                object: row.object.clone(),
                grade: row.grade.clone(),
                driver: driver.to_string(),
                volume: row.volume / parts,
                price_per_unit: row.price_per_unit,
                total: row.total / parts,
                paid: row.paid / parts,
                debt: row.debt / parts,
                invoice: row.invoice.clone(),
                message_snapshot: row.message_snapshot.clone(),
                created_by: row.created_by.clone(),
            };
            shipment_store::insert_shipment(&mut *tx, &part).await?;
        }

        sqlx::query("DELETE FROM shipments WHERE id = ?")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        replaced += 1;
    }

    tx.commit().await?;
    Ok(replaced)
}

fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(())
}
