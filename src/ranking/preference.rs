//! Preference specification: attribute → (weight, direction).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ranking::error::{RankingError, RankingResult};

/// Which raw values of an attribute are desirable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Higher raw value is better.
    #[default]
    Positive,
    /// Lower raw value is better.
    Negative,
}

impl Direction {
    /// Parse an oracle direction string; anything unknown is `Positive`.
    #[must_use]
    pub fn coerce(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("negative") => Self::Negative,
            _ => Self::Positive,
        }
    }

    /// Short form used in export slugs.
    #[must_use]
    pub const fn short(self) -> &'static str {
        match self {
            Self::Positive => "pos",
            Self::Negative => "neg",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        })
    }
}

/// Weight and direction for one attribute.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    /// Non-negative weight.
    pub weight: f64,
    /// Desirable direction.
    pub direction: Direction,
}

impl Preference {
    /// Create a preference, clamping invalid weights to zero.
    #[must_use]
    pub fn new(weight: f64, direction: Direction) -> Self {
        let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        Self { weight, direction }
    }
}

/// Ordered mapping of attribute name to preference.
///
/// Order is the order attributes were listed in, which drives component
/// column order and export slugs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSpec {
    entries: Vec<(String, Preference)>,
}

impl PreferenceSpec {
    /// Create an empty spec.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a spec from `(attribute, weight, direction)` triples.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64, Direction)>,
        S: Into<String>,
    {
        let mut spec = Self::new();
        for (name, weight, direction) in pairs {
            spec.insert(name, Preference::new(weight, direction));
        }
        spec
    }

    /// Insert or replace an attribute, keeping its first position.
    pub fn insert(&mut self, attribute: impl Into<String>, preference: Preference) {
        let attribute = attribute.into();
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == attribute) {
            slot.1 = preference;
        } else {
            self.entries.push((attribute, preference));
        }
    }

    /// Preference for an attribute.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Preference> {
        self.entries
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, pref)| pref)
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Preference)> {
        self.entries.iter().map(|(name, pref)| (name.as_str(), pref))
    }

    /// Attribute names in order.
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the spec has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of raw weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, pref)| pref.weight).sum()
    }

    /// Fail fast on an empty spec.
    ///
    /// # Errors
    /// Returns `EmptySpec` if no attribute is present.
    pub fn ensure_non_empty(&self) -> RankingResult<()> {
        if self.is_empty() {
            return Err(RankingError::empty_spec());
        }
        Ok(())
    }

    /// Copy with weights scaled to sum to 1.
    ///
    /// A spec whose weights sum to zero is divided by 1.0 and keeps its zero
    /// weights. Weights whose sum overflows are first rescaled by the largest.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let total = self.total_weight();
        let scaled = if total.is_finite() {
            self.clone()
        } else {
            let max = self.entries.iter().map(|(_, pref)| pref.weight).fold(0.0, f64::max);
            self.divided_by(max)
        };
        let total = scaled.total_weight();
        scaled.divided_by(if total > 0.0 { total } else { 1.0 })
    }

    fn divided_by(&self, divisor: f64) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(name, pref)| {
                    (
                        name.clone(),
                        Preference::new(pref.weight / divisor, pref.direction),
                    )
                })
                .collect(),
        }
    }

    /// One readable line per attribute.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(name, pref)| {
                let (phrase, arrow) = match pref.direction {
                    Direction::Positive => ("prefers higher", "↑"),
                    Direction::Negative => ("prefers lower", "↓"),
                };
                format!("- {name}: {phrase} {arrow} (weight {:.2})", pref.weight)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_coercion() {
        assert_eq!(Direction::coerce(Some("NEGATIVE")), Direction::Negative);
        assert_eq!(Direction::coerce(Some(" positive ")), Direction::Positive);
        assert_eq!(Direction::coerce(Some("lower")), Direction::Positive);
        assert_eq!(Direction::coerce(None), Direction::Positive);
    }

    #[test]
    fn test_normalized_weights_sum_to_one() {
        let spec = PreferenceSpec::from_pairs([
            ("beta", 0.4, Direction::Negative),
            ("market_cap", 1.0, Direction::Positive),
            ("esg_risk", 2.6, Direction::Negative),
        ]);
        let normalized = spec.normalized();
        assert!((normalized.total_weight() - 1.0).abs() < 1e-12);
        assert!((normalized.get("beta").unwrap().weight - 0.1).abs() < 1e-12);
        assert_eq!(normalized.attributes(), vec!["beta", "market_cap", "esg_risk"]);
    }

    #[test]
    fn test_huge_weights_still_sum_to_one() {
        let spec = PreferenceSpec::from_pairs([
            ("a", 1e308, Direction::Positive),
            ("b", 1e308, Direction::Positive),
        ]);
        let normalized = spec.normalized();
        assert_eq!(normalized.total_weight(), 1.0);
        assert_eq!(normalized.get("a").unwrap().weight, 0.5);
    }

    #[test]
    fn test_zero_weights_stay_zero() {
        let spec = PreferenceSpec::from_pairs([("beta", 0.0, Direction::Negative)]);
        assert_eq!(spec.normalized().get("beta").unwrap().weight, 0.0);
    }

    #[test]
    fn test_negative_and_non_finite_weights_clamped() {
        assert_eq!(Preference::new(-3.0, Direction::Positive).weight, 0.0);
        assert_eq!(Preference::new(f64::NAN, Direction::Positive).weight, 0.0);
    }

    #[test]
    fn test_insert_keeps_first_position() {
        let mut spec = PreferenceSpec::from_pairs([
            ("a", 1.0, Direction::Positive),
            ("b", 1.0, Direction::Positive),
        ]);
        spec.insert("a", Preference::new(2.0, Direction::Negative));
        assert_eq!(spec.attributes(), vec!["a", "b"]);
        assert_eq!(spec.get("a").unwrap().direction, Direction::Negative);
    }

    #[test]
    fn test_empty_spec_fails_fast() {
        let err = PreferenceSpec::new().ensure_non_empty().unwrap_err();
        assert!(matches!(err, RankingError::EmptySpec(_)));
    }

    #[test]
    fn test_describe() {
        let spec = PreferenceSpec::from_pairs([("beta", 1.0, Direction::Negative)]);
        assert_eq!(spec.describe(), vec!["- beta: prefers lower ↓ (weight 1.00)"]);
    }
}
