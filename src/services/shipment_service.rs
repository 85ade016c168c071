use chrono::{Local, NaiveDateTime};

use crate::{
    db::{ReferenceStore, ShipmentStore},
    error::{AppError, Result},
    models::{
        BatchMessage, BatchReceipt, BatchRequest, ReferenceKind, ShipmentFilter, ShipmentPatch,
        ShipmentRecord, ShipmentSummary, SummaryKey,
    },
    services::{
        auth_service::Session,
        entry_service::{self, EntryContext, PrepaymentSplit},
        message_service,
    },
};

/// Batch entry, log reads and director edits on top of the stores
#[derive(Clone)]
pub struct ShipmentService {
    shipments: ShipmentStore,
    references: ReferenceStore,
    split: PrepaymentSplit,
    share_base_url: String,
}

impl ShipmentService {
    pub fn new(
        shipments: ShipmentStore,
        references: ReferenceStore,
        split: PrepaymentSplit,
        share_base_url: String,
    ) -> Self {
        Self {
            shipments,
            references,
            split,
            share_base_url,
        }
    }

    pub async fn submit_batch(
        &self,
        request: &BatchRequest,
        session: &Session,
        phone: Option<&str>,
    ) -> Result<BatchReceipt> {
        self.submit_batch_at(request, session, phone, Local::now().naive_local())
            .await
    }

    /// Validates against the reference sets, computes every row and writes
    /// them in one transaction. Nothing is stored when any step fails.
    pub async fn submit_batch_at(
        &self,
        request: &BatchRequest,
        session: &Session,
        phone: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<BatchReceipt> {
        let request = self.canonicalize(request).await?;
        let ctx = EntryContext {
            now,
            split: self.split,
            pricing_visible: session.can_see_prices(),
            created_by: Some(session.username.clone()),
        };
        let prepared = entry_service::prepare_batch(&request, &ctx)?;

        let share_link = message_service::share_link(&self.share_base_url, phone, &prepared.message)?;
        let records = self.shipments.insert_batch(&prepared.records).await?;

        tracing::info!(
            "Batch {} by {}: {} trucks to {}",
            prepared.batch_id,
            session.username,
            records.len(),
            request.object.trim()
        );

        Ok(BatchReceipt {
            batch_id: prepared.batch_id,
            records: mask_records(records, session),
            message: prepared.message,
            share_link,
        })
    }

    pub async fn list(&self, filter: &ShipmentFilter, session: &Session) -> Result<Vec<ShipmentRecord>> {
        let records = self.shipments.list(filter).await?;
        Ok(mask_records(records, session))
    }

    pub async fn get(&self, id: i64, session: &Session) -> Result<ShipmentRecord> {
        let record = self.shipments.get(id).await?;
        if session.can_see_prices() {
            Ok(record)
        } else {
            Ok(record.without_prices())
        }
    }

    /// Director only. Date and time of the record never change.
    pub async fn update(&self, id: i64, patch: ShipmentPatch, session: &Session) -> Result<ShipmentRecord> {
        session.authorize(|role| role.can_edit_log(), "edit shipments")?;

        let mut record = self.shipments.get(id).await?;

        let mut patch = patch;
        if let Some(grade) = non_blank(patch.grade.as_deref()) {
            patch.grade = Some(self.references.ensure_known(ReferenceKind::Grades, grade).await?);
        }
        if let Some(driver) = non_blank(patch.driver.as_deref()) {
            patch.driver = Some(self.references.ensure_known(ReferenceKind::Drivers, driver).await?);
        }
        if let Some(plant) = non_blank(patch.plant.as_deref()) {
            patch.plant = Some(self.references.ensure_known(ReferenceKind::Plants, plant).await?);
        }

        entry_service::apply_patch(&mut record, patch)?;
        let updated = self.shipments.update(&record).await?;
        tracing::info!("Shipment {} edited by {}", id, session.username);

        Ok(updated)
    }

    pub async fn delete(&self, id: i64, session: &Session) -> Result<()> {
        session.authorize(|role| role.can_edit_log(), "delete shipments")?;

        self.shipments.delete(id).await?;
        tracing::info!("Shipment {} deleted by {}", id, session.username);

        Ok(())
    }

    /// Re-share the stored text of an earlier batch
    pub async fn batch_message(&self, batch_id: &str, phone: Option<&str>) -> Result<BatchMessage> {
        let message = self
            .shipments
            .batch_message(batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Batch {}", batch_id)))?;
        let share_link = message_service::share_link(&self.share_base_url, phone, &message)?;

        Ok(BatchMessage {
            batch_id: batch_id.to_string(),
            message,
            share_link,
        })
    }

    pub async fn summarize(
        &self,
        key: SummaryKey,
        filter: &ShipmentFilter,
        session: &Session,
    ) -> Result<Vec<ShipmentSummary>> {
        let summaries = self.shipments.summarize(key, filter).await?;
        if session.can_see_prices() {
            Ok(summaries)
        } else {
            Ok(summaries.into_iter().map(ShipmentSummary::without_prices).collect())
        }
    }

    /// Swaps grade, plant and every loaded driver for their stored spelling so
    /// one name never splits into several report groups. Blank values are left
    /// for batch validation to reject.
    async fn canonicalize(&self, request: &BatchRequest) -> Result<BatchRequest> {
        let mut request = request.clone();

        if let Some(grade) = non_blank(Some(&request.grade)) {
            request.grade = self.references.ensure_known(ReferenceKind::Grades, grade).await?;
        }
        if let Some(plant) = non_blank(request.plant.as_deref()) {
            request.plant = Some(self.references.ensure_known(ReferenceKind::Plants, plant).await?);
        }
        for entry in &mut request.entries {
            if entry.volume.is_finite() && entry.volume > 0.0 {
                if let Some(driver) = non_blank(Some(&entry.driver)) {
                    entry.driver = self
                        .references
                        .ensure_known(ReferenceKind::Drivers, driver)
                        .await?;
                }
            }
        }

        Ok(request)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn mask_records(records: Vec<ShipmentRecord>, session: &Session) -> Vec<ShipmentRecord> {
    if session.can_see_prices() {
        records
    } else {
        records.into_iter().map(ShipmentRecord::without_prices).collect()
    }
}
