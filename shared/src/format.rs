use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Human-readable area. Thresholds and units follow the labels users already
/// know from the existing viewer, including the km² label on the
/// thousands band.
pub fn format_area(area_sqm: f64) -> String {
    if area_sqm >= 10_000.0 {
        format!("{:.2} hectares", area_sqm / 10_000.0)
    } else if area_sqm >= 1_000.0 {
        format!("{:.2} km²", area_sqm / 1_000.0)
    } else {
        format!("{:.0} m²", area_sqm.round())
    }
}

pub fn format_distance(meters: f64) -> String {
    if meters >= 1_000.0 {
        format!("{:.2} km", meters / 1_000.0)
    } else {
        format!("{:.0} m", meters.round())
    }
}

/// Tanzanian shillings, whole units, comma thousands: `TZS 1,250,000`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}TZS {}", group_thousands(rounded.abs() as u64))
}

/// `1250000` -> `1,250,000`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Display a backend timestamp as a calendar date.
///
/// Accepts RFC 3339, naive ISO datetimes and bare `YYYY-MM-DD` dates. Anything
/// else is shown verbatim; blank input yields `None`.
pub fn format_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));
    Some(match date {
        Ok(d) => d.format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    })
}
