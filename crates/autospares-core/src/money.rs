// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kenyan shilling formatting and parsing.

/// Formats an amount as a display string, e.g. `12500.0` -> `"KSh 12,500"`.
///
/// Whole amounts render without decimals; anything else keeps two places.
pub fn format_ksh(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let abs = rounded.abs();
    let whole = abs.trunc() as u64;
    let cents = ((abs - abs.trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if cents == 0 {
        format!("KSh {sign}{grouped}")
    } else {
        format!("KSh {sign}{grouped}.{cents:02}")
    }
}

/// Parses a display price such as `"KSh 5,000"` or `"5000.50"` into a number.
///
/// Returns `None` when no digits are present.
pub fn parse_ksh(display: &str) -> Option<f64> {
    let cleaned: String = display
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}
