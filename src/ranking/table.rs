//! Company table model and CSV loader.
//!
//! The table is read once per ranking request and never mutated by the
//! pipeline. Identifying columns (`ticker`, `name`, `sector`) are kept as text;
//! every other column is numeric when all of its non-missing cells parse.

use std::fmt;
use std::path::Path;

use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ranking::error::{RankingError, RankingResult};

/// Ticker column name.
pub const TICKER: &str = "ticker";
/// Company name column name.
pub const NAME: &str = "name";
/// Optional sector column name.
pub const SECTOR: &str = "sector";
/// Columns that are never used as scoring inputs.
pub const IDENTIFYING_COLUMNS: [&str; 3] = [TICKER, NAME, SECTOR];

/// Cell markers read as missing values.
const NA_MARKERS: [&str; 6] = ["", "na", "n/a", "nan", "null", "none"];

/// A single rendered table value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// Missing value.
    Missing,
    /// Integer value (ranks).
    Int(u64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// A column of the company table.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Every present cell parsed as a number.
    Numeric(Vec<Option<f64>>),
    /// Free text.
    Text(Vec<Option<String>>),
}

impl Column {
    /// Number of rows in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    /// Whether the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the column is numeric.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Values coerced to numbers; unparseable text becomes missing.
    #[must_use]
    pub fn numeric_values(&self) -> Vec<Option<f64>> {
        match self {
            Self::Numeric(values) => values.clone(),
            Self::Text(values) => values
                .iter()
                .map(|v| v.as_deref().and_then(parse_number))
                .collect(),
        }
    }

    /// Text value of a row, if present.
    #[must_use]
    pub fn text(&self, row: usize) -> Option<String> {
        match self {
            Self::Numeric(values) => values.get(row).copied().flatten().map(|v| v.to_string()),
            Self::Text(values) => values.get(row).cloned().flatten(),
        }
    }

    /// Cell at a row.
    #[must_use]
    pub fn cell(&self, row: usize) -> Cell {
        match self {
            Self::Numeric(values) => values
                .get(row)
                .copied()
                .flatten()
                .map_or(Cell::Missing, Cell::Float),
            Self::Text(values) => values
                .get(row)
                .cloned()
                .flatten()
                .map_or(Cell::Missing, Cell::Text),
        }
    }
}

/// Read-only table of companies keyed by ticker.
#[derive(Clone, Debug, PartialEq)]
pub struct CompanyTable {
    headers: Vec<String>,
    columns: Vec<Column>,
    rows: usize,
}

impl CompanyTable {
    /// Build a table from a header row and raw string rows.
    ///
    /// Short rows are padded with missing values.
    ///
    /// # Errors
    /// Returns `Schema` if `ticker` or `name` is absent, a header is
    /// duplicated, or a row has more fields than the header.
    pub fn from_records(headers: Vec<String>, rows: Vec<Vec<String>>) -> RankingResult<Self> {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();

        for required in [TICKER, NAME] {
            if !headers.iter().any(|h| h == required) {
                return Err(RankingError::Schema(
                    "table must include 'ticker' and 'name' columns".to_string(),
                ));
            }
        }

        for (idx, header) in headers.iter().enumerate() {
            if headers[..idx].contains(header) {
                return Err(RankingError::Schema(format!("duplicate column {header:?}")));
            }
        }

        let width = headers.len();
        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() > width {
                return Err(RankingError::Schema(format!(
                    "row {} has {} fields, expected {width}",
                    row_idx + 1,
                    row.len()
                )));
            }
            for (col_idx, values) in raw.iter_mut().enumerate() {
                let cell = row.get(col_idx).map_or("", |v| v.trim());
                values.push(if is_na(cell) {
                    None
                } else {
                    Some(cell.to_string())
                });
            }
        }

        let columns = headers
            .iter()
            .zip(raw)
            .map(|(header, values)| build_column(header, values))
            .collect();

        let table = Self {
            headers,
            columns,
            rows: rows.len(),
        };
        table.warn_on_duplicate_tickers();
        Ok(table)
    }

    /// Column names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of companies.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows
    }

    /// Whether the table has no companies.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|idx| &self.columns[idx])
    }

    /// Whether a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Numeric columns usable as scoring inputs, in file order.
    #[must_use]
    pub fn numeric_attributes(&self) -> Vec<String> {
        self.headers
            .iter()
            .zip(&self.columns)
            .filter(|(h, c)| c.is_numeric() && !IDENTIFYING_COLUMNS.contains(&h.as_str()))
            .map(|(h, _)| h.clone())
            .collect()
    }

    /// Ticker of a row (empty if missing).
    #[must_use]
    pub fn ticker(&self, row: usize) -> String {
        self.column(TICKER)
            .and_then(|c| c.text(row))
            .unwrap_or_default()
    }

    fn warn_on_duplicate_tickers(&self) {
        let mut seen = std::collections::HashSet::new();
        for row in 0..self.rows {
            let ticker = self.ticker(row);
            if !ticker.is_empty() && !seen.insert(ticker.clone()) {
                warn!("duplicate ticker {ticker} in company table");
            }
        }
    }
}

/// Load a company table from a CSV file with a header row.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid CSV, or lacks
/// the required columns.
pub async fn load_companies(path: impl AsRef<Path>) -> RankingResult<CompanyTable> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;

    let mut reader = csv_async::AsyncReaderBuilder::new()
        .flexible(true)
        .create_reader(bytes.as_slice());

    let headers: Vec<String> = reader.headers().await?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    let mut records = reader.records();
    while let Some(record) = records.next().await {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let table = CompanyTable::from_records(headers, rows)?;
    debug!(
        "Loaded {} companies with {} numeric attributes from {}",
        table.len(),
        table.numeric_attributes().len(),
        path.display()
    );
    Ok(table)
}

fn build_column(header: &str, values: Vec<Option<String>>) -> Column {
    match header {
        TICKER => Column::Text(
            values
                .into_iter()
                .map(|v| v.map(|t| t.to_uppercase()))
                .collect(),
        ),
        NAME | SECTOR => Column::Text(values),
        _ => {
            let parsed: Option<Vec<Option<f64>>> = values
                .iter()
                .map(|v| match v {
                    None => Some(None),
                    Some(text) => text.parse::<f64>().ok().map(|n| (!n.is_nan()).then_some(n)),
                })
                .collect();
            parsed.map_or(Column::Text(values), Column::Numeric)
        }
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

fn is_na(cell: &str) -> bool {
    NA_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn table(headers: &[&str], rows: &[&[&str]]) -> CompanyTable {
        CompanyTable::from_records(
            headers.iter().map(|h| (*h).to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let err = CompanyTable::from_records(
            vec!["ticker".to_string(), "beta".to_string()],
            vec![vec!["AAA".to_string(), "1.0".to_string()]],
        )
        .unwrap_err();
        assert!(matches!(err, RankingError::Schema(_)));
    }

    #[test]
    fn test_column_typing() {
        let t = table(
            &["ticker", "name", "sector", "beta", "industry", "esg_risk"],
            &[
                &["aaa", "Alpha", "Tech", "1.5", "Chips", ""],
                &["bbb", "Beta", "", "0.5", "Power", "12"],
            ],
        );

        assert_eq!(t.len(), 2);
        assert_eq!(t.ticker(0), "AAA");
        assert_eq!(t.numeric_attributes(), vec!["beta", "esg_risk"]);
        assert_eq!(
            t.column("esg_risk"),
            Some(&Column::Numeric(vec![None, Some(12.0)]))
        );
        assert_eq!(t.column("sector").unwrap().text(1), None);
        assert!(!t.column("industry").unwrap().is_numeric());
    }

    #[test]
    fn test_text_column_coerces_to_missing_numbers() {
        let t = table(&["ticker", "name", "mixed"], &[&["A", "a", "3"], &["B", "b", "x"]]);
        assert_eq!(
            t.column("mixed").unwrap().numeric_values(),
            vec![Some(3.0), None]
        );
    }

    #[test]
    fn test_short_rows_are_padded_long_rows_rejected() {
        let t = table(&["ticker", "name", "beta"], &[&["A", "a"]]);
        assert_eq!(t.column("beta").unwrap().cell(0), Cell::Missing);

        let err = CompanyTable::from_records(
            vec!["ticker".to_string(), "name".to_string()],
            vec![vec!["A".to_string(), "a".to_string(), "extra".to_string()]],
        )
        .unwrap_err();
        assert!(matches!(err, RankingError::Schema(_)));
    }

    #[tokio::test]
    async fn test_load_companies_from_csv() {
        let path = std::env::temp_dir().join(format!("companies-{}.csv", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "ticker,name,sector,beta\nmsft,Microsoft,Tech,0.9\nxom,Exxon,Energy,NaN\n")
            .await
            .unwrap();

        let t = load_companies(&path).await.unwrap();
        assert_eq!(t.ticker(0), "MSFT");
        assert_eq!(
            t.column("beta"),
            Some(&Column::Numeric(vec![Some(0.9), None]))
        );

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_load_companies_without_name_fails() {
        let path = std::env::temp_dir().join(format!("companies-{}.csv", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "ticker,beta\nA,1\n").await.unwrap();

        let err = load_companies(&path).await.unwrap_err();
        assert!(matches!(err, RankingError::Schema(_)));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
