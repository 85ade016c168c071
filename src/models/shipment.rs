use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One truck-load delivered to a site, as stored in the `shipments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ShipmentRecord {
    pub id: i64,
    pub batch_id: String,
    pub shipped_on: NaiveDate,
    pub shipped_at: NaiveTime,
    pub plant: Option<String>,
    pub object: String,
    pub grade: String,
    pub driver: String,
    pub volume: f64,
    pub price_per_unit: f64,
    pub total: f64,
    pub paid: f64,
    pub debt: f64,
    pub invoice: Option<String>,
    pub message_snapshot: Option<String>,
    pub created_by: Option<String>,
}

impl ShipmentRecord {
    /// Zero every money column, for sessions without pricing visibility.
    pub fn without_prices(mut self) -> Self {
        self.price_per_unit = 0.0;
        self.total = 0.0;
        self.paid = 0.0;
        self.debt = 0.0;
        self
    }
}

/// A computed shipment that has not been written yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewShipment {
    pub batch_id: String,
    pub shipped_on: NaiveDate,
    pub shipped_at: NaiveTime,
    pub plant: Option<String>,
    pub object: String,
    pub grade: String,
    pub driver: String,
    pub volume: f64,
    pub price_per_unit: f64,
    pub total: f64,
    pub paid: f64,
    pub debt: f64,
    pub invoice: Option<String>,
    pub message_snapshot: Option<String>,
    pub created_by: Option<String>,
}

/// A submitted order: one site and grade, several trucks.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub object: String,
    pub grade: String,
    #[serde(default)]
    pub plant: Option<String>,
    pub entries: Vec<BatchEntry>,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub prepaid_total: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    pub driver: String,
    pub volume: f64,
    #[serde(default)]
    pub invoice: Option<String>,
}

/// Result of a successful batch submission
#[derive(Debug, Clone, Serialize)]
pub struct BatchReceipt {
    pub batch_id: String,
    pub records: Vec<ShipmentRecord>,
    pub message: String,
    pub share_link: String,
}

/// Stored outbound text of a batch plus a fresh deep link
#[derive(Debug, Clone, Serialize)]
pub struct BatchMessage {
    pub batch_id: String,
    pub message: String,
    pub share_link: String,
}

/// Query parameters accepted by the log, report and export endpoints.
/// Dates are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub driver: Option<String>,
    pub object: Option<String>,
    pub grade: Option<String>,
    pub plant: Option<String>,
}

/// Fields a director may change on an existing record.
/// `shipped_on`/`shipped_at` are never editable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentPatch {
    pub object: Option<String>,
    pub grade: Option<String>,
    /// An empty string clears the plant.
    pub plant: Option<String>,
    pub driver: Option<String>,
    pub volume: Option<f64>,
    pub price_per_unit: Option<f64>,
    pub paid: Option<f64>,
    /// An empty string clears the invoice.
    pub invoice: Option<String>,
}

/// What a summary is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKey {
    Driver,
    Object,
    Grade,
    Day,
    /// Loads per site and grade together, labelled `object / grade`
    ObjectGrade,
}

impl SummaryKey {
    /// SQL expression producing the group label
    pub fn label_sql(&self) -> &'static str {
        match self {
            SummaryKey::Driver => "driver",
            SummaryKey::Object => "object",
            SummaryKey::Grade => "grade",
            SummaryKey::Day => "CAST(shipped_on AS TEXT)",
            SummaryKey::ObjectGrade => "object || ' / ' || grade",
        }
    }

    pub fn group_sql(&self) -> &'static str {
        match self {
            SummaryKey::Driver => "driver",
            SummaryKey::Object => "object",
            SummaryKey::Grade => "grade",
            SummaryKey::Day => "shipped_on",
            SummaryKey::ObjectGrade => "object, grade",
        }
    }
}

/// Aggregated totals for one driver, object, grade or day.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ShipmentSummary {
    pub label: String,
    pub trips: i64,
    pub volume: f64,
    pub total: f64,
    pub paid: f64,
    pub debt: f64,
}

impl ShipmentSummary {
    pub fn without_prices(mut self) -> Self {
        self.total = 0.0;
        self.paid = 0.0;
        self.debt = 0.0;
        self
    }
}
