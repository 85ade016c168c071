use crate::{
    db::DbPool,
    error::{AppError, Result},
    models::ReferenceKind,
    services::entry_service::ValidationError,
};

const MAX_NAME_LEN: usize = 100;

/// Drivers, grades and plants. Shipments keep plain names, so removing an
/// entry here never touches the log.
#[derive(Clone)]
pub struct ReferenceStore {
    pool: DbPool,
}

impl ReferenceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, kind: ReferenceKind) -> Result<Vec<String>> {
        let names: Vec<(String,)> =
            sqlx::query_as(&format!("SELECT name FROM {} ORDER BY name", kind.table_name()))
                .fetch_all(&self.pool)
                .await
                .map_err(AppError::Database)?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    pub async fn add(&self, kind: ReferenceKind, name: &str) -> Result<String> {
        let name = normalize_name(name)?;

        let lowered = name.to_lowercase();
        let existing = self.list(kind).await?;
        if existing.iter().any(|n| n.to_lowercase() == lowered) {
            return Err(AppError::Conflict(format!("{} {} already exists", kind.noun(), name)));
        }

        sqlx::query(&format!("INSERT INTO {} (name) VALUES (?)", kind.table_name()))
            .bind(&name)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict(format!("{} {} already exists", kind.noun(), name))
                }
                other => AppError::Database(other),
            })?;

        tracing::info!("Added {} {}", kind.noun(), name);
        Ok(name)
    }

    pub async fn remove(&self, kind: ReferenceKind, name: &str) -> Result<()> {
        let stored = self
            .find(kind, name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", kind.noun(), name.trim())))?;

        let result = sqlx::query(&format!("DELETE FROM {} WHERE name = ?", kind.table_name()))
            .bind(&stored)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {}", kind.noun(), name)));
        }

        tracing::info!("Removed {} {}", kind.noun(), stored);
        Ok(())
    }

    /// Stored spelling of `name`, matched case-insensitively
    pub async fn find(&self, kind: ReferenceKind, name: &str) -> Result<Option<String>> {
        let lowered = name.trim().to_lowercase();
        let found = self
            .list(kind)
            .await?
            .into_iter()
            .find(|stored| stored.to_lowercase() == lowered);

        Ok(found)
    }

    /// Returns the stored spelling, or a validation error naming the unknown value
    pub async fn ensure_known(&self, kind: ReferenceKind, name: &str) -> Result<String> {
        self.find(kind, name).await?.ok_or_else(|| {
            ValidationError::UnknownReference {
                kind: kind.noun(),
                name: name.trim().to_string(),
            }
            .into()
        })
    }
}

/// Trimmed, non-empty, bounded and comma-free.
/// Commas were the separator of legacy multi-driver rows.
pub fn normalize_name(name: &str) -> std::result::Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::InvalidName("name must not be empty".to_string()));
    }
    if name.contains(',') {
        return Err(ValidationError::InvalidName(format!("{} contains a comma", name)));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::InvalidName(format!(
            "name is longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
