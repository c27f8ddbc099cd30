//! Within-group standardization of an attribute (sector neutralization).

use std::collections::HashMap;

use crate::ranking::table::CompanyTable;

/// Default grouping column.
pub const DEFAULT_GROUP_KEY: &str = crate::ranking::table::SECTOR;

/// Standardize `attribute` within each distinct value of `group_key`.
///
/// Uses the group mean and population standard deviation; a zero deviation
/// divides by 1.0 so a constant group centers to 0. Rows with a missing
/// attribute value or group stay missing.
///
/// Returns `None` if either column is absent.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn neutralize(
    table: &CompanyTable,
    attribute: &str,
    group_key: &str,
) -> Option<Vec<Option<f64>>> {
    let values = table.column(attribute)?.numeric_values();
    let groups = table.column(group_key)?;

    let mut members: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..table.len() {
        if let Some(group) = groups.text(row) {
            members.entry(group).or_default().push(row);
        }
    }

    let mut out = vec![None; values.len()];
    for rows in members.values() {
        let present: Vec<f64> = rows.iter().filter_map(|&r| values[r]).collect();
        let Some((mean, std)) = mean_and_std(&present) else {
            continue;
        };
        let divisor = if std == 0.0 { 1.0 } else { std };
        for &row in rows {
            out[row] = values[row].map(|x| (x - mean) / divisor);
        }
    }

    Some(out)
}

/// Mean and population standard deviation.
#[allow(clippy::cast_precision_loss)]
fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}
