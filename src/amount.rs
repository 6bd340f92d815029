//! Fixed-point rendering of raw base-unit amounts. Everything is done on the
//! decimal digits of the integer so there's no rounding whatever the size.

/// `raw` scaled down by `10^decimals`, keeping every fractional digit:
/// `format_amount(120, 6) == "0.000120"`.
pub(crate) fn format_amount(raw: u128, decimals: u32) -> String {
    let digits = raw.to_string();
    if decimals == 0 {
        return digits;
    }
    let decimals = decimals as usize;
    let digits = if digits.len() <= decimals {
        "0".repeat(decimals + 1 - digits.len()) + &digits
    } else {
        digits
    };
    let (int, frac) = digits.split_at(digits.len() - decimals);
    format!("{int}.{frac}")
}

/// Same as [`format_amount`] without trailing zeros, nor a dangling point:
/// `format_amount_trim(120, 6) == "0.00012"`, `format_amount_trim(10, 1) == "1"`.
pub(crate) fn format_amount_trim(raw: u128, decimals: u32) -> String {
    let text = format_amount(raw, decimals);
    if !text.contains('.') {
        return text;
    }
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
