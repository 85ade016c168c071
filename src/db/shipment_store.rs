use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::DbPool,
    error::{AppError, Result},
    models::{NewShipment, ShipmentFilter, ShipmentRecord, ShipmentSummary, SummaryKey},
};

/// Columns of `shipments` in `ShipmentRecord` order
pub const COLUMNS: &str = "id, batch_id, shipped_on, shipped_at, plant, object, grade, driver, \
    volume, price_per_unit, total, paid, debt, invoice, message_snapshot, created_by";

/// Shipment log store for database operations
#[derive(Clone)]
pub struct ShipmentStore {
    pool: DbPool,
}

impl ShipmentStore {
    /// Create a new ShipmentStore with the provided database pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert all rows of one batch in a single transaction.
    /// Either every row is written or none is.
    pub async fn insert_batch(&self, shipments: &[NewShipment]) -> Result<Vec<ShipmentRecord>> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let mut saved = Vec::with_capacity(shipments.len());
        for shipment in shipments {
            let record = insert_shipment(&mut *tx, shipment)
                .await
                .map_err(AppError::Database)?;
            saved.push(record);
        }

        tx.commit().await.map_err(AppError::Database)?;
        tracing::info!("Stored {} shipments", saved.len());

        Ok(saved)
    }

    /// Records matching the filter, newest first
    pub async fn list(&self, filter: &ShipmentFilter) -> Result<Vec<ShipmentRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM shipments", COLUMNS));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY shipped_on DESC, shipped_at DESC, id DESC");

        let records = builder
            .build_query_as::<ShipmentRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(records)
    }

    /// Get a shipment by ID
    pub async fn get(&self, id: i64) -> Result<ShipmentRecord> {
        let record = sqlx::query_as::<_, ShipmentRecord>(&format!(
            "SELECT {} FROM shipments WHERE id = ?",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound(format!("Shipment {}", id)))?;

        Ok(record)
    }

    /// Write back the editable columns of an existing record
    pub async fn update(&self, record: &ShipmentRecord) -> Result<ShipmentRecord> {
        let result = sqlx::query(
            r#"
            UPDATE shipments
            SET plant = ?, object = ?, grade = ?, driver = ?, volume = ?,
                price_per_unit = ?, total = ?, paid = ?, debt = ?, invoice = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.plant)
        .bind(&record.object)
        .bind(&record.grade)
        .bind(&record.driver)
        .bind(record.volume)
        .bind(record.price_per_unit)
        .bind(record.total)
        .bind(record.paid)
        .bind(record.debt)
        .bind(&record.invoice)
        .bind(record.id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Shipment {}", record.id)));
        }

        self.get(record.id).await
    }

    /// Delete a shipment by ID
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM shipments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Shipment {}", id)));
        }

        Ok(())
    }

    /// Outbound text stored with the batch, if any row of it is left
    pub async fn batch_message(&self, batch_id: &str) -> Result<Option<String>> {
        let message: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT message_snapshot FROM shipments
            WHERE batch_id = ? AND message_snapshot IS NOT NULL
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(message.map(|(text,)| text))
    }

    /// Trips, volume and money grouped by driver, object, grade, day or site load
    pub async fn summarize(
        &self,
        key: SummaryKey,
        filter: &ShipmentFilter,
    ) -> Result<Vec<ShipmentSummary>> {
        let label = key.label_sql();
        let group = key.group_sql();
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {label} AS label, COUNT(*) AS trips, \
             TOTAL(volume) AS volume, TOTAL(total) AS total, \
             TOTAL(paid) AS paid, TOTAL(debt) AS debt \
             FROM shipments"
        ));
        push_filter(&mut builder, filter);
        builder.push(format!(" GROUP BY {group} ORDER BY {group}"));

        let summaries = builder
            .build_query_as::<ShipmentSummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(summaries)
    }
}

/// Insert one row on an open connection or transaction
pub async fn insert_shipment(
    conn: &mut SqliteConnection,
    shipment: &NewShipment,
) -> std::result::Result<ShipmentRecord, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO shipments (
            batch_id, shipped_on, shipped_at, plant, object, grade, driver, volume,
            price_per_unit, total, paid, debt, invoice, message_snapshot, created_by
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        COLUMNS
    );

    sqlx::query_as::<_, ShipmentRecord>(&sql)
        .bind(&shipment.batch_id)
        .bind(shipment.shipped_on)
        .bind(shipment.shipped_at)
        .bind(&shipment.plant)
        .bind(&shipment.object)
        .bind(&shipment.grade)
        .bind(&shipment.driver)
        .bind(shipment.volume)
        .bind(shipment.price_per_unit)
        .bind(shipment.total)
        .bind(shipment.paid)
        .bind(shipment.debt)
        .bind(&shipment.invoice)
        .bind(&shipment.message_snapshot)
        .bind(&shipment.created_by)
        .fetch_one(&mut *conn)
        .await
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ShipmentFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(from) = filter.from {
        builder.push(" AND shipped_on >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND shipped_on <= ").push_bind(to);
    }
    if let Some(driver) = non_blank(&filter.driver) {
        builder.push(" AND driver = ").push_bind(driver);
    }
    if let Some(object) = non_blank(&filter.object) {
        builder
            .push(" AND object LIKE ")
            .push_bind(format!("%{}%", escape_like(&object)))
            .push(" ESCAPE '\\'");
    }
    if let Some(grade) = non_blank(&filter.grade) {
        builder.push(" AND grade = ").push_bind(grade);
    }
    if let Some(plant) = non_blank(&filter.plant) {
        builder.push(" AND plant = ").push_bind(plant);
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
