//! Amount parsing and the synthetic amount token
//!
//! Recurring amounts (rent, memberships) are strong evidence for a tag even
//! when the description is empty, so both corpus rows and queries carry a
//! token that encodes the rounded amount.

/// Parse a bank amount string.
///
/// Accepts `,` or `.` as decimal separator. When both occur, the later one
/// is the decimal separator and the other groups thousands. Parentheses mean
/// a negative amount.
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .replace(['€', '$', ' ', '\u{a0}'], "")
        .replace('(', "-")
        .replace(')', "");

    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Token encoding "amount rounds to N".
///
/// Purely alphanumeric so it passes through the tokenizer unchanged.
pub fn amount_token(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < 0.0 {
        Some(format!("amtneg{}", (-rounded) as u64))
    } else {
        Some(format!("amt{}", rounded as u64))
    }
}

/// Parse and encode in one step
pub fn amount_token_from_str(s: &str) -> Option<String> {
    parse_amount(s).and_then(amount_token)
}
