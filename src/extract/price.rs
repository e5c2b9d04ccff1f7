// src/extract/price.rs

//! Guaraní price parsing.
//!
//! Pharmacy sites render prices with `.` as the thousands separator and no
//! decimal point ("Gs. 59.400" means 59400), prefixed with a currency glyph
//! that varies per site ("Gs.", "₲", "₲.").

/// Parse a locale-formatted Guaraní amount. Returns `None` rather than
/// erroring when the text has no usable digits.
pub fn parse_guarani(text: &str) -> Option<f64> {
    let cleaned = text
        .replace("Gs.", "")
        .replace("Gs", "")
        .replace('₲', "")
        .replace('*', "");

    // First run of digits with grouping marks, e.g. "59.400" or "1.234.567"
    let run: String = cleaned
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| c.is_ascii_digit())
        .collect();

    if run.is_empty() {
        return None;
    }
    run.parse::<u64>().ok().map(|n| n as f64)
}

/// Parse a percentage out of badge text like "-18% de descuento", or a bare
/// numeric value already cut out by a capture rule. Text with surrounding
/// words but no `%` sign is rejected, so amount lines ("Gs. 31.500") never
/// read as percentages.
pub fn parse_percent(text: &str) -> Option<f64> {
    match text.find('%') {
        Some(percent_at) => {
            let digits: String = text[..percent_at]
                .chars()
                .rev()
                .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            digits.parse::<f64>().ok()
        }
        None => text.trim().trim_start_matches('-').parse::<f64>().ok(),
    }
}

/// Round to two decimal places, standard rounding.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format an amount back into the source locale (dot thousands separators).
pub fn format_guarani(value: f64) -> String {
    let whole = value.round() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
