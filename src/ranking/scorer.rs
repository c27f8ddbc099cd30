//! Weighted aggregation of normalized components and competition ranking.

use tracing::{debug, warn};

use crate::ranking::error::RankingResult;
use crate::ranking::neutralize::{DEFAULT_GROUP_KEY, neutralize};
use crate::ranking::normalize::normalize;
use crate::ranking::preference::{Direction, PreferenceSpec};
use crate::ranking::table::{Cell, Column, CompanyTable};

/// Aggregate score column name.
pub const SCORE_TOTAL: &str = "score_total";
/// Rank column name.
pub const RANK: &str = "rank";

/// Name of the per-attribute component column.
#[must_use]
pub fn component_column(attribute: &str) -> String {
    format!("score__{attribute}")
}

/// Name of the neutralized source column.
#[must_use]
pub fn neutralized_column(attribute: &str) -> String {
    format!("{attribute}__sector_z")
}

/// Options for a scoring pass.
#[derive(Clone, Debug)]
pub struct ScoringOptions {
    /// Standardize attributes within groups before normalization.
    pub sector_neutral: bool,
    /// Grouping column used when `sector_neutral` is set.
    pub group_key: String,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            sector_neutral: false,
            group_key: DEFAULT_GROUP_KEY.to_string(),
        }
    }
}

impl ScoringOptions {
    /// Options with sector neutralization switched on or off.
    #[must_use]
    pub fn sector_neutral(enabled: bool) -> Self {
        Self {
            sector_neutral: enabled,
            ..Self::default()
        }
    }
}

/// Normalized contribution of one attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    /// Attribute name.
    pub attribute: String,
    /// Weight after normalization.
    pub weight: f64,
    /// Direction applied.
    pub direction: Direction,
    /// Per-row values in `[0, 1]`, table order.
    pub values: Vec<f64>,
}

/// Result of scoring a table: scores, ranks, components and sorted order.
#[derive(Clone, Debug)]
pub struct RankedTable {
    table: CompanyTable,
    neutralized: Vec<(String, Vec<Option<f64>>)>,
    components: Vec<Component>,
    scores: Vec<f64>,
    ranks: Vec<u64>,
    order: Vec<usize>,
    skipped: Vec<String>,
}

impl RankedTable {
    /// Number of ranked companies.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether nothing was ranked.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Table row indices, best first.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Tickers, best first.
    #[must_use]
    pub fn tickers(&self) -> Vec<String> {
        self.order.iter().map(|&row| self.table.ticker(row)).collect()
    }

    /// Computed components in spec order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Spec attributes absent from the table.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Rank of a ticker.
    #[must_use]
    pub fn rank_of(&self, ticker: &str) -> Option<u64> {
        self.row_of(ticker).map(|row| self.ranks[row])
    }

    /// Aggregate score of a ticker.
    #[must_use]
    pub fn score_of(&self, ticker: &str) -> Option<f64> {
        self.row_of(ticker).map(|row| self.scores[row])
    }

    /// All column names: table columns, neutralized inputs, components,
    /// aggregate and rank.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.table.headers().to_vec();
        columns.extend(self.neutralized.iter().map(|(a, _)| neutralized_column(a)));
        columns.extend(self.component_columns());
        columns.push(SCORE_TOTAL.to_string());
        columns.push(RANK.to_string());
        columns
    }

    /// Component column names in spec order.
    #[must_use]
    pub fn component_columns(&self) -> Vec<String> {
        self.components
            .iter()
            .map(|c| component_column(&c.attribute))
            .collect()
    }

    /// Whether the underlying table has a column.
    #[must_use]
    pub fn has_table_column(&self, name: &str) -> bool {
        self.table.has_column(name)
    }

    /// Value of `column` for table row `row`.
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Cell {
        match column {
            SCORE_TOTAL => return Cell::Float(self.scores[row]),
            RANK => return Cell::Int(self.ranks[row]),
            _ => {}
        }
        if let Some(col) = self.table.column(column) {
            return col.cell(row);
        }
        if let Some(component) = self
            .components
            .iter()
            .find(|c| component_column(&c.attribute) == column)
        {
            return Cell::Float(component.values[row]);
        }
        self.neutralized
            .iter()
            .find(|(a, _)| neutralized_column(a) == column)
            .and_then(|(_, values)| values[row])
            .map_or(Cell::Missing, Cell::Float)
    }

    fn row_of(&self, ticker: &str) -> Option<usize> {
        let ticker = ticker.to_uppercase();
        (0..self.table.len()).find(|&row| self.table.ticker(row) == ticker)
    }
}

/// Score every company under `spec` and rank them.
///
/// Weights are normalized to sum to 1. Spec attributes absent from the table
/// are skipped; if none are present every score is 0.0 and every rank is 1.
///
/// # Errors
/// Returns `EmptySpec` if the spec has no attributes.
pub fn score_and_rank(
    table: &CompanyTable,
    spec: &PreferenceSpec,
    options: &ScoringOptions,
) -> RankingResult<RankedTable> {
    spec.ensure_non_empty()?;
    let spec = spec.normalized();

    let mut neutralized = Vec::new();
    if options.sector_neutral && table.has_column(&options.group_key) {
        for attribute in spec.attributes() {
            if let Some(values) = neutralize(table, attribute, &options.group_key) {
                neutralized.push((attribute.to_string(), values));
            }
        }
        debug!(
            "Neutralized {} attributes within {:?}",
            neutralized.len(),
            options.group_key
        );
    }

    let mut scores = vec![0.0; table.len()];
    let mut components = Vec::with_capacity(spec.len());
    let mut skipped = Vec::new();

    for (attribute, pref) in spec.iter() {
        let source = neutralized
            .iter()
            .find(|(a, _)| a == attribute)
            .map(|(_, values)| values.clone())
            .or_else(|| table.column(attribute).map(Column::numeric_values));

        let Some(source) = source else {
            warn!("Preference attribute {attribute:?} not in company table, skipping");
            skipped.push(attribute.to_string());
            continue;
        };

        let values = normalize(&source, pref.direction);
        for (score, value) in scores.iter_mut().zip(&values) {
            *score += pref.weight * value;
        }
        debug!(
            "Component {attribute}: weight {:.4}, direction {}",
            pref.weight, pref.direction
        );
        components.push(Component {
            attribute: attribute.to_string(),
            weight: pref.weight,
            direction: pref.direction,
            values,
        });
    }

    let ranks = competition_ranks(&scores);
    let mut order: Vec<usize> = (0..table.len()).collect();
    order.sort_by(|&a, &b| {
        ranks[a]
            .cmp(&ranks[b])
            .then_with(|| scores[b].total_cmp(&scores[a]))
    });

    debug!(
        "Ranked {} companies on {} components ({} skipped), top: {:?}",
        table.len(),
        components.len(),
        skipped.len(),
        order.first().map(|&row| table.ticker(row))
    );

    Ok(RankedTable {
        table: table.clone(),
        neutralized,
        components,
        scores,
        ranks,
        order,
        skipped,
    })
}

/// Minimum ("competition") ranks, descending: ties share a rank and the next
/// distinct score gets the count of strictly better entries plus one.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn competition_ranks(scores: &[f64]) -> Vec<u64> {
    let mut by_score: Vec<usize> = (0..scores.len()).collect();
    by_score.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut ranks = vec![0_u64; scores.len()];
    let mut current = 1_u64;
    for (pos, &row) in by_score.iter().enumerate() {
        if pos > 0 && scores[row] != scores[by_score[pos - 1]] {
            current = pos as u64 + 1;
        }
        ranks[row] = current;
    }
    ranks
}
