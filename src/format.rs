use chrono::NaiveDate;

/// Date representations accepted on input, tried in order. First match wins,
/// so unambiguous ISO forms sit ahead of the US slash forms.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
];

/// Return the canonical `YYYY-MM-DD` form when `value` parses as a date in
/// any of the accepted representations, otherwise the input unchanged.
/// Parse failure is a no-op, never an error.
pub fn normalize_date(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return value.to_string();
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    value.to_string()
}

/// Magnitude display policy for the numeric result columns: values with an
/// absolute value of 1000 or more switch to one-decimal scientific notation
/// (`1.5E+03`); everything else, including unparseable input, passes through
/// with the original string preserved.
pub fn format_magnitude(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return value.to_string();
    }
    let Ok(parsed) = trimmed.replace(',', "").parse::<f64>() else {
        return value.to_string();
    };
    if !parsed.is_finite() || parsed.abs() < 1000.0 {
        return value.to_string();
    }
    scientific_one_decimal(parsed)
}

/// `1500.0` -> `1.5E+03`, matching the classic printf `%.1E` rendering with
/// a signed, zero-padded two-digit exponent.
fn scientific_one_decimal(value: f64) -> String {
    let lower = format!("{:.1e}", value);
    let (mantissa, exponent) = match lower.split_once('e') {
        Some(parts) => parts,
        None => return lower,
    };
    let exp: i32 = exponent.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}E{}{:02}", mantissa, sign, exp.abs())
}
