//! Projection of a ranked table into a bounded, display/export-ready view.

use regex::Regex;
use serde::Serialize;

use crate::ranking::error::{RankingError, RankingResult};
use crate::ranking::preference::PreferenceSpec;
use crate::ranking::scorer::{RANK, RankedTable, SCORE_TOTAL};
use crate::ranking::table::{Cell, NAME, SECTOR, TICKER};

/// Columns shown to a user, in order, when present.
pub const SUMMARY_COLUMNS: [&str; 5] = [RANK, TICKER, NAME, SECTOR, SCORE_TOTAL];

/// Slug used when a spec has no attributes.
const EMPTY_SLUG: &str = "criteria";

/// A bounded slice of a ranked table with a fixed column order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct View {
    /// Column names.
    pub headers: Vec<String>,
    /// Rows, best first.
    pub rows: Vec<Vec<Cell>>,
}

impl View {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the view has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of one column, top to bottom.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// First `n` rows.
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Keep only the named columns that exist, in the given order.
    #[must_use]
    pub fn select(&self, columns: &[&str]) -> Self {
        let picked: Vec<usize> = columns
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        Self {
            headers: picked.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| picked.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Rows rendered exactly as they are written on export.
    #[must_use]
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }
}

/// Project the first `top_n` ranked rows with the display column order.
///
/// Order: rank, ticker, name, sector (if present), score_total, the
/// component columns, then every remaining column in table order.
///
/// # Errors
/// Returns `InvalidRequest` if `top_n` is zero.
pub fn project(ranked: &RankedTable, top_n: usize) -> RankingResult<View> {
    if top_n == 0 {
        return Err(RankingError::InvalidRequest("top_n must be >= 1".to_string()));
    }

    let mut headers: Vec<String> = SUMMARY_COLUMNS
        .iter()
        .filter(|c| **c != SECTOR || ranked.has_table_column(SECTOR))
        .map(|c| (*c).to_string())
        .collect();
    headers.extend(ranked.component_columns());
    for column in ranked.columns() {
        if !headers.contains(&column) {
            headers.push(column);
        }
    }

    let rows = ranked
        .order()
        .iter()
        .take(top_n)
        .map(|&row| headers.iter().map(|h| ranked.cell(row, h)).collect())
        .collect();

    Ok(View { headers, rows })
}

/// Deterministic file-name-safe description of a spec.
///
/// `{attribute}-{pos|neg}` joined by `_`; characters outside
/// `[A-Za-z0-9_.-]` collapse to `-`; truncated to `max_len` characters.
///
/// # Errors
/// Returns an error if the sanitizing pattern fails to compile.
pub fn criteria_slug(spec: &PreferenceSpec, max_len: usize) -> RankingResult<String> {
    let parts: Vec<String> = spec
        .iter()
        .map(|(attribute, pref)| format!("{attribute}-{}", pref.direction.short()))
        .collect();
    let slug = if parts.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        parts.join("_")
    };

    let unsafe_chars = Regex::new(r"[^A-Za-z0-9_.-]+")?;
    let slug = unsafe_chars.replace_all(&slug, "-");
    Ok(slug.chars().take(max_len).collect())
}

/// Export file name for a view of `rows` rows: `top{rows}_{slug}.csv`.
///
/// # Errors
/// Returns an error if the slug cannot be built.
pub fn export_file_name(spec: &PreferenceSpec, rows: usize, max_len: usize) -> RankingResult<String> {
    Ok(format!("top{rows}_{}.csv", criteria_slug(spec, max_len)?))
}

/// Criteria block, a GitHub-style table of the summary columns and an
/// export offer.
#[must_use]
pub fn render_markdown(view: &View, spec: &PreferenceSpec) -> String {
    let summary = view.select(&SUMMARY_COLUMNS);
    let criteria = if spec.is_empty() {
        "(no explicit criteria provided)".to_string()
    } else {
        spec.describe().join("\n")
    };

    let mut table = String::new();
    table.push_str(&format!("| {} |\n", summary.headers.join(" | ")));
    table.push_str(&format!(
        "|{}|\n",
        summary.headers.iter().map(|_| "---").collect::<Vec<_>>().join("|")
    ));
    for row in &summary.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Cell::Float(v) => format!("{v:.4}"),
                other => other.to_string().replace('|', "\\|"),
            })
            .collect();
        table.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    let shown = view.len();
    format!(
        "Here are the top {shown} companies for your criteria:\n\nCriteria:\n{criteria}\n\n{table}\nWant a CSV of the Top {shown}?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::preference::Direction;
    use crate::ranking::scorer::{ScoringOptions, score_and_rank};
    use crate::ranking::table::tests::table;

    fn ranked() -> RankedTable {
        let t = table(
            &["ticker", "name", "industry", "beta", "sector", "env_risk"],
            &[
                &["AAA", "Alpha", "Chips", "1.5", "Tech", "10"],
                &["BBB", "Bravo", "Grid", "0.5", "Utilities", "40"],
                &["CCC", "Charlie", "Oil", "1.0", "Energy", "25"],
            ],
        );
        let spec = PreferenceSpec::from_pairs([("beta", 1.0, Direction::Negative)]);
        score_and_rank(&t, &spec, &ScoringOptions::default()).unwrap()
    }

    #[test]
    fn test_project_column_order() {
        let view = project(&ranked(), 10).unwrap();
        assert_eq!(
            view.headers,
            vec![
                "rank", "ticker", "name", "sector", "score_total", "score__beta", "industry",
                "beta", "env_risk"
            ]
        );
        assert_eq!(view.len(), 3);
        assert_eq!(
            view.column("ticker").unwrap(),
            vec![
                &Cell::Text("BBB".to_string()),
                &Cell::Text("CCC".to_string()),
                &Cell::Text("AAA".to_string())
            ]
        );
    }

    #[test]
    fn test_project_bounds_rows() {
        let view = project(&ranked(), 2).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.rows[0][0], Cell::Int(1));
        assert!(matches!(project(&ranked(), 0), Err(RankingError::InvalidRequest(_))));
    }

    #[test]
    fn test_project_without_sector_column() {
        let t = table(&["ticker", "name", "beta"], &[&["A", "a", "1"]]);
        let spec = PreferenceSpec::from_pairs([("beta", 1.0, Direction::Positive)]);
        let ranked = score_and_rank(&t, &spec, &ScoringOptions::default()).unwrap();
        let view = project(&ranked, 5).unwrap();
        assert_eq!(view.headers, vec!["rank", "ticker", "name", "score_total", "score__beta", "beta"]);
    }

    #[test]
    fn test_criteria_slug() {
        let spec = PreferenceSpec::from_pairs([
            ("beta", 1.0, Direction::Negative),
            ("Market Cap ($)", 1.0, Direction::Positive),
        ]);
        assert_eq!(criteria_slug(&spec, 80).unwrap(), "beta-neg_Market-Cap--pos");
        assert_eq!(criteria_slug(&spec, 6).unwrap(), "beta-n");
        assert_eq!(criteria_slug(&PreferenceSpec::new(), 80).unwrap(), "criteria");
        assert_eq!(
            export_file_name(&spec, 15, 80).unwrap(),
            "top15_beta-neg_Market-Cap--pos.csv"
        );
    }

    #[test]
    fn test_render_markdown() {
        let spec = PreferenceSpec::from_pairs([("beta", 1.0, Direction::Negative)]);
        let view = project(&ranked(), 2).unwrap();
        let text = render_markdown(&view, &spec);

        assert!(text.starts_with("Here are the top 2 companies"));
        assert!(text.contains("- beta: prefers lower ↓"));
        assert!(text.contains("| rank | ticker | name | sector | score_total |"));
        assert!(text.contains("| 1 | BBB | Bravo | Utilities | 1.0000 |"));
        assert!(!text.contains("AAA"));
        assert!(text.ends_with("|\n\nWant a CSV of the Top 2?"));
    }
}
