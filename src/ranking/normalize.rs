//! Direction-aware min-max scaling of a single attribute column.

use crate::ranking::preference::Direction;

/// Value given to every row of a column that carries no information.
pub const NEUTRAL: f64 = 0.5;

/// Scale a column to `[0, 1]`, where 1 is the most desirable value.
///
/// Missing entries are imputed with the column median. Negative direction
/// negates values before scaling. Constant, all-missing, or non-finite
/// columns map to [`NEUTRAL`] for every row.
#[must_use]
pub fn normalize(values: &[Option<f64>], direction: Direction) -> Vec<f64> {
    let fill = median(values);
    let signed: Vec<Option<f64>> = values
        .iter()
        .map(|v| {
            v.or(fill).map(|x| match direction {
                Direction::Positive => x,
                Direction::Negative => -x,
            })
        })
        .collect();

    let (lo, hi) = signed
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });

    #[allow(clippy::float_cmp)]
    let degenerate = !lo.is_finite() || !hi.is_finite() || hi == lo;
    if degenerate {
        return vec![NEUTRAL; values.len()];
    }

    // Halved so that extremes near f64::MAX cannot overflow the range.
    let range = hi / 2.0 - lo / 2.0;
    if range <= 0.0 {
        return vec![NEUTRAL; values.len()];
    }
    signed
        .into_iter()
        .map(|x| x.map_or(NEUTRAL, |x| ((x / 2.0 - lo / 2.0) / range).clamp(0.0, 1.0)))
        .collect()
}

/// Median of the present values (mean of the middle pair for even counts).
#[must_use]
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some(f64::midpoint(present[mid - 1], present[mid]))
    } else {
        Some(present[mid])
    }
}
