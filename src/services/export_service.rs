use chrono::NaiveDate;

use crate::models::ShipmentRecord;
use crate::services::message_service::format_volume;

/// Byte order mark so spreadsheet apps pick UTF-8 for the Cyrillic headers.
const UTF8_BOM: &str = "\u{feff}";
const DELIMITER: char = ',';

const HEADERS: [&str; 12] = [
    "Дата",
    "Время",
    "Завод",
    "Объект",
    "Марка",
    "Водитель",
    "Объем (м³)",
    "Цена за м³",
    "Сумма",
    "Оплачено",
    "Долг",
    "Накладная",
];

pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn export_filename(export_date: NaiveDate) -> String {
    format!("otchet_beton_{}.csv", export_date.format("%Y-%m-%d"))
}

/// One line per record, headers first, CRLF line endings.
pub fn shipments_to_csv(records: &[ShipmentRecord]) -> String {
    let mut out = String::from(UTF8_BOM);
    push_row(&mut out, HEADERS.iter().map(|h| h.to_string()));

    for record in records {
        push_row(
            &mut out,
            [
                record.shipped_on.format("%Y-%m-%d").to_string(),
                record.shipped_at.format("%H:%M").to_string(),
                record.plant.clone().unwrap_or_default(),
                record.object.clone(),
                record.grade.clone(),
                record.driver.clone(),
                format_volume(record.volume),
                format_volume(record.price_per_unit),
                format_volume(record.total),
                format_volume(record.paid),
                format_volume(record.debt),
                record.invoice.clone().unwrap_or_default(),
            ],
        );
    }

    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row: Vec<String> = fields
        .into_iter()
        .map(|field| escape_field(&field))
        .collect();
    out.push_str(&row.join(&DELIMITER.to_string()));
    out.push_str("\r\n");
}

fn escape_field(value: &str) -> String {
    if value.contains(DELIMITER) || value.contains('"') || value.contains('\n') || value.contains('\r') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}
