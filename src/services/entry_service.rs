use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{BatchRequest, NewShipment, ShipmentPatch, ShipmentRecord};
use crate::services::message_service::{self, MessageLine};

/// How a lump prepayment is spread over the trucks of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrepaymentSplit {
    /// `P / N` for every truck regardless of its volume.
    #[default]
    Even,
    /// `P * volume / total volume`.
    Proportional,
}

impl PrepaymentSplit {
    /// Returns one share per volume. All shares are zero when nothing was prepaid.
    /// Volumes must be positive.
    pub fn allocate(&self, prepaid_total: f64, volumes: &[f64]) -> Vec<f64> {
        if prepaid_total <= 0.0 || volumes.is_empty() {
            return vec![0.0; volumes.len()];
        }

        match self {
            PrepaymentSplit::Even => {
                let share = prepaid_total / volumes.len() as f64;
                vec![share; volumes.len()]
            }
            PrepaymentSplit::Proportional => {
                let volume_sum: f64 = volumes.iter().sum();
                volumes
                    .iter()
                    .map(|volume| prepaid_total * volume / volume_sum)
                    .collect()
            }
        }
    }
}

impl fmt::Display for PrepaymentSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepaymentSplit::Even => f.write_str("even"),
            PrepaymentSplit::Proportional => f.write_str("proportional"),
        }
    }
}

impl FromStr for PrepaymentSplit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "even" => Ok(PrepaymentSplit::Even),
            "proportional" => Ok(PrepaymentSplit::Proportional),
            other => Err(format!("unknown prepayment split: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Object must not be empty")]
    EmptyObject,
    #[error("Grade must not be empty")]
    EmptyGrade,
    #[error("Driver name must not be empty")]
    EmptyDriver,
    #[error("At least one driver needs a volume greater than zero")]
    NoVolume,
    #[error("Volume for {0} must be a non-negative number")]
    InvalidVolume(String),
    #[error("{0} must be a non-negative number")]
    InvalidAmount(&'static str),
    #[error("Unknown {kind}: {name}")]
    UnknownReference { kind: &'static str, name: String },
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Phone number must contain digits only")]
    InvalidPhone,
    #[error("Invalid share base url: {0}")]
    InvalidShareBase(String),
}

/// Everything about the submitting session the computation depends on.
#[derive(Debug, Clone)]
pub struct EntryContext {
    pub now: NaiveDateTime,
    pub split: PrepaymentSplit,
    pub pricing_visible: bool,
    pub created_by: Option<String>,
}

/// Rows ready for a single transactional insert, plus their shared message.
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub batch_id: String,
    pub records: Vec<NewShipment>,
    pub message: String,
}

/// Turns a submitted order into persistable records.
///
/// Entries with zero volume are dropped. Fails when the object is blank or no
/// entry has a positive volume; nothing is produced in that case.
pub fn prepare_batch(
    request: &BatchRequest,
    ctx: &EntryContext,
) -> Result<PreparedBatch, ValidationError> {
    let object = request.object.trim();
    if object.is_empty() {
        return Err(ValidationError::EmptyObject);
    }

    let grade = request.grade.trim();
    if grade.is_empty() {
        return Err(ValidationError::EmptyGrade);
    }

    let plant = non_blank(request.plant.as_deref());

    ensure_amount(request.unit_price, "unit_price")?;
    ensure_amount(request.prepaid_total, "prepaid_total")?;

    let mut qualifying = Vec::new();
    for entry in &request.entries {
        let driver = entry.driver.trim();
        if driver.is_empty() {
            return Err(ValidationError::EmptyDriver);
        }
        if !entry.volume.is_finite() || entry.volume < 0.0 {
            return Err(ValidationError::InvalidVolume(driver.to_string()));
        }
        if entry.volume > 0.0 {
            qualifying.push((driver, entry.volume, non_blank(entry.invoice.as_deref())));
        }
    }

    if qualifying.is_empty() {
        return Err(ValidationError::NoVolume);
    }

    let (unit_price, prepaid_total) = if ctx.pricing_visible {
        (request.unit_price, request.prepaid_total)
    } else {
        (0.0, 0.0)
    };

    let volumes: Vec<f64> = qualifying.iter().map(|(_, volume, _)| *volume).collect();
    let shares = ctx.split.allocate(prepaid_total, &volumes);

    let lines: Vec<MessageLine<'_>> = qualifying
        .iter()
        .map(|(driver, volume, invoice)| MessageLine {
            driver: *driver,
            volume: *volume,
            invoice: invoice.as_deref(),
        })
        .collect();
    let message = message_service::format_batch_message(object, grade, plant.as_deref(), &lines);

    let batch_id = Uuid::new_v4().to_string();
    let shipped_on = ctx.now.date();
    let shipped_at = ctx.now.time().with_nanosecond(0).unwrap_or(ctx.now.time());

    let records = qualifying
        .into_iter()
        .zip(shares)
        .map(|((driver, volume, invoice), paid)| {
            let total = volume * unit_price;
            NewShipment {
                batch_id: batch_id.clone(),
                shipped_on,
                shipped_at,
                plant: plant.clone(),
                object: object.to_string(),
                grade: grade.to_string(),
                driver: driver.to_string(),
                volume,
                price_per_unit: unit_price,
                total,
                paid,
                debt: total - paid,
                invoice,
                message_snapshot: Some(message.clone()),
                created_by: ctx.created_by.clone(),
            }
        })
        .collect();

    Ok(PreparedBatch {
        batch_id,
        records,
        message,
    })
}

/// Applies a director's edit and recomputes `total` and `debt`.
pub fn apply_patch(record: &mut ShipmentRecord, patch: ShipmentPatch) -> Result<(), ValidationError> {
    if let Some(object) = patch.object {
        let object = object.trim();
        if object.is_empty() {
            return Err(ValidationError::EmptyObject);
        }
        record.object = object.to_string();
    }
    if let Some(grade) = patch.grade {
        let grade = grade.trim();
        if grade.is_empty() {
            return Err(ValidationError::EmptyGrade);
        }
        record.grade = grade.to_string();
    }
    if let Some(driver) = patch.driver {
        let driver = driver.trim();
        if driver.is_empty() {
            return Err(ValidationError::EmptyDriver);
        }
        record.driver = driver.to_string();
    }
    if let Some(plant) = patch.plant {
        record.plant = non_blank(Some(&plant));
    }
    if let Some(invoice) = patch.invoice {
        record.invoice = non_blank(Some(&invoice));
    }
    if let Some(volume) = patch.volume {
        if !volume.is_finite() || volume <= 0.0 {
            return Err(ValidationError::InvalidVolume(record.driver.clone()));
        }
        record.volume = volume;
    }
    if let Some(price) = patch.price_per_unit {
        ensure_amount(price, "price_per_unit")?;
        record.price_per_unit = price;
    }
    if let Some(paid) = patch.paid {
        ensure_amount(paid, "paid")?;
        record.paid = paid;
    }

    record.total = record.volume * record.price_per_unit;
    record.debt = record.total - record.paid;
    Ok(())
}

fn ensure_amount(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidAmount(field))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchEntry;
    use chrono::{NaiveDate, NaiveTime};

    const EPS: f64 = 1e-6;

    fn ctx() -> EntryContext {
        EntryContext {
            now: NaiveDate::from_ymd_opt(2024, 5, 14)
                .unwrap()
                .and_hms_milli_opt(9, 41, 7, 250)
                .unwrap(),
            split: PrepaymentSplit::Even,
            pricing_visible: true,
            created_by: Some("buh".to_string()),
        }
    }

    fn entry(driver: &str, volume: f64, invoice: &str) -> BatchEntry {
        BatchEntry {
            driver: driver.to_string(),
            volume,
            invoice: Some(invoice.to_string()),
        }
    }

    fn site_a(prepaid_total: f64) -> BatchRequest {
        BatchRequest {
            object: "Site A".to_string(),
            grade: "M300".to_string(),
            plant: None,
            entries: vec![entry("Ivanov", 10.0, "INV-1"), entry("Petrov", 5.0, "INV-2")],
            unit_price: 5000.0,
            prepaid_total,
        }
    }

    #[test]
    fn test_even_split_scenario() {
        let batch = prepare_batch(&site_a(30000.0), &ctx()).unwrap();
        assert_eq!(batch.records.len(), 2);

        let ivanov = &batch.records[0];
        assert_eq!(ivanov.driver, "Ivanov");
        assert!((ivanov.total - 50000.0).abs() < EPS);
        assert!((ivanov.paid - 15000.0).abs() < EPS);
        assert!((ivanov.debt - 35000.0).abs() < EPS);
        assert_eq!(ivanov.invoice.as_deref(), Some("INV-1"));

        let petrov = &batch.records[1];
        assert!((petrov.total - 25000.0).abs() < EPS);
        assert!((petrov.paid - 15000.0).abs() < EPS);
        assert!((petrov.debt - 10000.0).abs() < EPS);
    }

    #[test]
    fn test_no_prepayment_means_full_debt() {
        let batch = prepare_batch(&site_a(0.0), &ctx()).unwrap();
        for record in &batch.records {
            assert_eq!(record.paid, 0.0);
            assert_eq!(record.debt, record.total);
        }
    }

    #[test]
    fn test_prepayment_shares_sum_to_total() {
        let mut request = site_a(1000.0);
        request.entries.push(entry("Sokolov", 7.5, "INV-3"));

        let batch = prepare_batch(&request, &ctx()).unwrap();
        let sum: f64 = batch.records.iter().map(|r| r.paid).sum();
        assert!((sum - 1000.0).abs() < EPS);
        for record in &batch.records {
            assert!((record.paid - 1000.0 / 3.0).abs() < EPS);
        }
    }

    #[test]
    fn test_proportional_split() {
        let mut context = ctx();
        context.split = PrepaymentSplit::Proportional;

        let batch = prepare_batch(&site_a(30000.0), &context).unwrap();
        assert!((batch.records[0].paid - 20000.0).abs() < EPS);
        assert!((batch.records[1].paid - 10000.0).abs() < EPS);
        let sum: f64 = batch.records.iter().map(|r| r.paid).sum();
        assert!((sum - 30000.0).abs() < EPS);
    }

    #[test]
    fn test_zero_volume_entries_are_dropped() {
        let mut request = site_a(30000.0);
        request.entries.push(entry("Sokolov", 0.0, "INV-3"));

        let batch = prepare_batch(&request, &ctx()).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert!(batch.records.iter().all(|r| r.driver != "Sokolov"));
        // only the two loaded trucks share the prepayment
        assert!((batch.records[0].paid - 15000.0).abs() < EPS);
        assert!(!batch.message.contains("Sokolov"));
    }

    #[test]
    fn test_empty_object_is_rejected() {
        let mut request = site_a(0.0);
        request.object = "   ".to_string();
        assert_eq!(
            prepare_batch(&request, &ctx()).unwrap_err(),
            ValidationError::EmptyObject
        );
    }

    #[test]
    fn test_all_zero_volumes_are_rejected() {
        let mut request = site_a(0.0);
        for e in &mut request.entries {
            e.volume = 0.0;
        }
        assert_eq!(
            prepare_batch(&request, &ctx()).unwrap_err(),
            ValidationError::NoVolume
        );

        request.entries.clear();
        assert_eq!(
            prepare_batch(&request, &ctx()).unwrap_err(),
            ValidationError::NoVolume
        );
    }

    #[test]
    fn test_negative_amounts_are_rejected() {
        let mut request = site_a(0.0);
        request.unit_price = -1.0;
        assert_eq!(
            prepare_batch(&request, &ctx()).unwrap_err(),
            ValidationError::InvalidAmount("unit_price")
        );

        let mut request = site_a(0.0);
        request.entries[1].volume = f64::NAN;
        assert_eq!(
            prepare_batch(&request, &ctx()).unwrap_err(),
            ValidationError::InvalidVolume("Petrov".to_string())
        );
    }

    #[test]
    fn test_hidden_pricing_zeroes_money() {
        let mut context = ctx();
        context.pricing_visible = false;

        let batch = prepare_batch(&site_a(30000.0), &context).unwrap();
        for record in &batch.records {
            assert_eq!(record.price_per_unit, 0.0);
            assert_eq!(record.total, 0.0);
            assert_eq!(record.paid, 0.0);
            assert_eq!(record.debt, 0.0);
        }
    }

    #[test]
    fn test_batch_shares_id_stamp_and_message() {
        let mut request = site_a(0.0);
        request.object = "  ЖК Астана ".to_string();
        request.plant = Some(" ".to_string());
        request.entries[0].invoice = Some("".to_string());

        let batch = prepare_batch(&request, &ctx()).unwrap();
        let first = &batch.records[0];
        assert_eq!(first.object, "ЖК Астана");
        assert_eq!(first.plant, None);
        assert_eq!(first.invoice, None);
        assert_eq!(first.shipped_on, NaiveDate::from_ymd_opt(2024, 5, 14).unwrap());
        assert_eq!(first.shipped_at, NaiveTime::from_hms_opt(9, 41, 7).unwrap());
        assert_eq!(first.created_by.as_deref(), Some("buh"));
        for record in &batch.records {
            assert_eq!(record.batch_id, batch.batch_id);
            assert_eq!(record.message_snapshot.as_deref(), Some(batch.message.as_str()));
        }
    }

    #[test]
    fn test_apply_patch_recomputes_totals() {
        let batch = prepare_batch(&site_a(30000.0), &ctx()).unwrap();
        let new = batch.records[0].clone();
        let mut record = ShipmentRecord {
            id: 1,
            batch_id: new.batch_id,
            shipped_on: new.shipped_on,
            shipped_at: new.shipped_at,
            plant: new.plant,
            object: new.object,
            grade: new.grade,
            driver: new.driver,
            volume: new.volume,
            price_per_unit: new.price_per_unit,
            total: new.total,
            paid: new.paid,
            debt: new.debt,
            invoice: new.invoice,
            message_snapshot: new.message_snapshot,
            created_by: new.created_by,
        };

        let patch = ShipmentPatch {
            volume: Some(8.0),
            paid: Some(40000.0),
            invoice: Some(String::new()),
            ..Default::default()
        };
        apply_patch(&mut record, patch).unwrap();
        assert!((record.total - 40000.0).abs() < EPS);
        assert!(record.debt.abs() < EPS);
        assert_eq!(record.invoice, None);

        let patch = ShipmentPatch {
            volume: Some(0.0),
            ..Default::default()
        };
        assert!(apply_patch(&mut record, patch).is_err());
    }

    #[test]
    fn test_split_parses_from_config_value() {
        assert_eq!("Even".parse::<PrepaymentSplit>().unwrap(), PrepaymentSplit::Even);
        assert_eq!(
            " proportional ".parse::<PrepaymentSplit>().unwrap(),
            PrepaymentSplit::Proportional
        );
        assert!("weighted".parse::<PrepaymentSplit>().is_err());
    }
}
