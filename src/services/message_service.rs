use url::Url;

use crate::services::entry_service::ValidationError;

const SEPARATOR: &str = "--------------------------";

/// One truck in the outbound summary
#[derive(Debug, Clone, Copy)]
pub struct MessageLine<'a> {
    pub driver: &'a str,
    pub volume: f64,
    pub invoice: Option<&'a str>,
}

/// Builds the group-chat summary for one order. Output depends only on the
/// arguments, so the same batch always yields the same text.
pub fn format_batch_message(
    object: &str,
    grade: &str,
    plant: Option<&str>,
    lines: &[MessageLine<'_>],
) -> String {
    let mut message = String::new();
    message.push_str("🏗 *ОТГРУЗКА БЕТОНА* 🏗\n");
    message.push_str(&format!("📍 *Объект:* {}\n", object));
    message.push_str(&format!("💎 *Марка:* {}\n", grade));
    if let Some(plant) = plant {
        message.push_str(&format!("🏭 *Завод:* {}\n", plant));
    }
    message.push_str(SEPARATOR);
    message.push('\n');

    for line in lines {
        message.push_str(&format!(
            "🚛 {}: *{} м³*",
            line.driver,
            format_volume(line.volume)
        ));
        if let Some(invoice) = line.invoice {
            message.push_str(&format!(" (№{})", invoice));
        }
        message.push('\n');
    }

    message.push_str(SEPARATOR);
    message.push('\n');
    message.push_str("✅ *Всем удачного рейса!*");
    message
}

const VOLUME_SCALE: f64 = 1_000_000.0;

/// Shortest decimal form: `10.0` -> `10`, `2.50` -> `2.5`, `0.004` -> `0.004`.
/// Rounded to six places so float noise never reaches the text.
pub fn format_volume(volume: f64) -> String {
    let rounded = (volume * VOLUME_SCALE).round() / VOLUME_SCALE;
    format!("{}", rounded)
}

/// Deep link that opens the messenger with `text` prefilled.
/// Without a phone the user picks the chat (usually the drivers' group).
pub fn share_link(base: &str, phone: Option<&str>, text: &str) -> Result<String, ValidationError> {
    let mut url = Url::parse(base)
        .map_err(|e| ValidationError::InvalidShareBase(e.to_string()))?;

    if let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) {
        let digits = phone.trim_start_matches('+');
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPhone);
        }
        url = url
            .join(digits)
            .map_err(|e| ValidationError::InvalidShareBase(e.to_string()))?;
    }

    url.query_pairs_mut().append_pair("text", text);
    Ok(url.to_string())
}
