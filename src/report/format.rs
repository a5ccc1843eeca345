//! Number formatting for report output.

/// Format a number with fixed decimals and comma thousands separators.
///
/// Non-finite values render as `-`.
pub fn format_number(value: f64, decimal_places: usize) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }

    let rounded = format!("{:.prec$}", value, prec = decimal_places);
    add_thousands_separator(&rounded)
}

/// Add thousands separators to a numeric string.
fn add_thousands_separator(s: &str) -> String {
    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (s, None),
    };

    let negative = integer_part.starts_with('-');
    let digits: Vec<char> = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();
    let len = digits.len();

    let mut result = String::with_capacity(s.len() + len / 3 + 1);
    if negative && digits.iter().any(|&c| c != '0') {
        result.push('-');
    }

    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }

    result
}

/// Make text safe inside a Markdown table cell.
///
/// Pipes are escaped and line breaks collapse to spaces.
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
