//! Rendering of the patch size matrix.

use crate::estimator::PatchSizeMatrix;

const COLUMN_WIDTH: usize = 15;
const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Format a byte size with binary units and three significant digits.
///
/// ```
/// use apkdelta::report::human_file_size;
/// assert_eq!(human_file_size(0), "0B");
/// assert_eq!(human_file_size(1981633), "1.89MB");
/// ```
pub fn human_file_size(size: u64) -> String {
    if size == 0 {
        return "0B".to_string();
    }
    let power = ((63 - size.leading_zeros()) / 10) as usize;
    let value = size as f64 / 1024f64.powi(power as i32);
    let digits = if value >= 100.0 {
        format!("{value:.0}")
    } else if value >= 10.0 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    };
    let digits = if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits.as_str()
    };
    format!("{digits}{}", UNITS[power])
}

/// Append `text` left-aligned in a column of [`COLUMN_WIDTH`] characters.
/// Longer text is kept whole.
fn push_cell(out: &mut String, text: &str) {
    out.push_str(text);
    let pad = COLUMN_WIDTH.saturating_sub(text.chars().count());
    out.extend(std::iter::repeat_n(' ', pad));
}

/// Fixed-width table: one row per strategy, one column per compression.
pub fn render_table(matrix: &PatchSizeMatrix) -> String {
    let mut out = String::new();
    push_cell(&mut out, "");
    for compression in matrix.compressions() {
        push_cell(&mut out, &compression.display_name);
    }
    out.push('\n');

    for strategy in matrix.strategies() {
        push_cell(&mut out, &strategy.display_name);
        for compression in matrix.compressions() {
            let cell = matrix
                .get(&strategy.id, &compression.id)
                .map_or_else(|| "-".to_string(), human_file_size);
            push_cell(&mut out, &cell);
        }
        out.push('\n');
    }

    for failure in matrix.failures() {
        out.push_str(&format!("{}: FAILED ({})\n", failure.strategy, failure.reason));
    }
    out
}

/// CSV with exact byte counts: `strategy,<compression ids...>`.
pub fn render_csv(matrix: &PatchSizeMatrix) -> String {
    let mut out = String::from("strategy");
    for compression in matrix.compressions() {
        out.push(',');
        out.push_str(&compression.id);
    }
    out.push('\n');

    for strategy in matrix.strategies() {
        out.push_str(&strategy.id);
        for compression in matrix.compressions() {
            out.push(',');
            if let Some(size) = matrix.get(&strategy.id, &compression.id) {
                out.push_str(&size.to_string());
            }
        }
        out.push('\n');
    }
    out
}
