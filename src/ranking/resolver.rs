//! Preference resolution: free-text request → validated [`PreferenceSpec`].
//!
//! Interpretation of the request is delegated to a [`PreferenceOracle`]
//! (normally an LLM). This module owns everything around that call: the
//! allowed attribute list and hints, tolerant JSON extraction, and the
//! sanitization rules that decide what survives.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::ranking::error::{RankingError, RankingResult};
use crate::ranking::preference::{Direction, Preference, PreferenceSpec};

/// Boxed future type for oracle calls.
pub type OracleFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// System prompt given to the oracle.
const SYSTEM_PROMPT: &str = r#"You translate an investor's request into a scoring spec over a table of companies.
- Only use the numeric columns listed by the user message.
- Pick the columns relevant to the request and give each a weight in [0,1]; weights need not sum to 1.
- For every chosen column set "direction": "positive" when higher is better, "negative" when lower is better.
- Risk-like columns default to "negative", growth and quality to "positive", unless the request says otherwise.
- Answer with strict JSON only: {"preferences": {"<column>": {"weight": <number>, "direction": "positive"|"negative"}}}
- Never include a column that is not in the allowed list."#;

/// A fully prepared oracle call.
#[derive(Clone, Debug, PartialEq)]
pub struct OracleRequest {
    /// Instructions for the oracle.
    pub system_prompt: String,
    /// Prompt carrying the allowed columns, hints and request text.
    pub user_prompt: String,
    /// Attributes the oracle may pick from.
    pub allowed: Vec<String>,
    /// Per-attribute direction hints.
    pub hints: Vec<(String, String)>,
    /// Original user request.
    pub request_text: String,
}

/// Trait abstraction over the free-text → preferences oracle.
pub trait PreferenceOracle: Send + Sync {
    /// Return the oracle's raw answer for `request`.
    ///
    /// # Errors
    /// Returns `Configuration` if the oracle is unreachable or misconfigured.
    fn complete<'a>(&'a self, request: &'a OracleRequest) -> OracleFuture<'a, RankingResult<String>>;
}

/// Short semantic hint for an attribute name.
#[must_use]
pub fn attribute_hint(attribute: &str) -> &'static str {
    let name = attribute.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

    if has(&["beta", "vol", "risk"]) {
        "Risk-related metric; lower is generally better."
    } else if has(&["cap", "mcap", "market"]) {
        "Size/scale; direction depends on user intent."
    } else if has(&["environment"]) {
        "Environmental risk/score; lower is generally better."
    } else if has(&["social", "divers"]) {
        "Social/diversity risk/score; lower is generally better."
    } else if has(&["governance"]) {
        "Governance risk/score; lower is generally better."
    } else if has(&["esg"]) {
        "Overall ESG risk/score; lower is generally better."
    } else {
        "Numeric feature; direction depends on user intent."
    }
}

/// Hints for every allowed attribute, in order.
#[must_use]
pub fn attribute_hints(allowed: &[String]) -> Vec<(String, String)> {
    allowed
        .iter()
        .map(|a| (a.clone(), attribute_hint(a).to_string()))
        .collect()
}

/// Build the oracle call for a request.
///
/// # Errors
/// Returns an error if the hint table cannot be serialized.
pub fn build_request(request_text: &str, allowed: &[String]) -> RankingResult<OracleRequest> {
    let hints = attribute_hints(allowed);
    let hint_table: Map<String, Value> = hints
        .iter()
        .map(|(a, h)| (a.clone(), Value::String(h.clone())))
        .collect();
    let hint_json = serde_json::to_string_pretty(&Value::Object(hint_table))?;

    let user_prompt = format!(
        "Allowed numeric columns (with short hints):\n{hint_json}\n\nUser request:\n{request_text}\n\nReturn ONLY the JSON object described."
    );

    Ok(OracleRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt,
        allowed: allowed.to_vec(),
        hints,
        request_text: request_text.to_string(),
    })
}

/// Extract the `preferences` object from an oracle answer.
///
/// Strict JSON is tried first; otherwise the first balanced `{...}` substring
/// that parses as an object is used.
///
/// # Errors
/// Returns `MalformedOracleResponse` if no object is found, or the object has
/// no `preferences` object.
pub fn parse_oracle_response(text: &str) -> RankingResult<Map<String, Value>> {
    let value = match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) => value,
        Err(_) => first_json_object(text).ok_or_else(|| {
            RankingError::MalformedOracleResponse("no JSON object in oracle answer".to_string())
        })?,
    };

    let Value::Object(mut root) = value else {
        return Err(RankingError::MalformedOracleResponse(
            "oracle answer is not a JSON object".to_string(),
        ));
    };

    match root.remove("preferences") {
        Some(Value::Object(preferences)) => Ok(preferences),
        Some(_) => Err(RankingError::MalformedOracleResponse(
            "'preferences' is not an object".to_string(),
        )),
        None => Err(RankingError::MalformedOracleResponse(
            "'preferences' key is missing".to_string(),
        )),
    }
}

/// Keep allowed attributes and coerce their weight and direction.
///
/// Unknown or missing directions become positive; missing, non-numeric or
/// non-finite weights become 0.0; negative weights clamp to 0.0.
#[must_use]
pub fn sanitize(preferences: &Map<String, Value>, allowed: &[String]) -> PreferenceSpec {
    let mut spec = PreferenceSpec::new();
    for (attribute, config) in preferences {
        if !allowed.iter().any(|a| a == attribute) {
            warn!("Oracle picked unknown attribute {attribute:?}, dropping");
            continue;
        }
        let Value::Object(config) = config else {
            warn!("Oracle entry for {attribute:?} is not an object, dropping");
            continue;
        };

        let direction = Direction::coerce(config.get("direction").and_then(Value::as_str));
        let weight = config.get("weight").map_or(0.0, coerce_weight);
        spec.insert(attribute.clone(), Preference::new(weight, direction));
    }
    spec
}

/// Resolves free-text requests into preference specs through an oracle.
#[derive(Clone)]
pub struct PreferenceResolver {
    oracle: Arc<dyn PreferenceOracle>,
}

impl PreferenceResolver {
    /// Create a resolver over an oracle.
    #[must_use]
    pub fn new(oracle: Arc<dyn PreferenceOracle>) -> Self {
        Self { oracle }
    }

    /// Resolve `request_text` against the `allowed` numeric attributes.
    ///
    /// # Errors
    /// Returns `Configuration` if the oracle call fails,
    /// `MalformedOracleResponse` if its answer has the wrong shape, and
    /// `EmptySpec` if no attribute survives sanitization.
    pub async fn resolve(&self, request_text: &str, allowed: &[String]) -> RankingResult<PreferenceSpec> {
        if allowed.is_empty() {
            return Err(RankingError::empty_spec());
        }

        let request = build_request(request_text, allowed)?;
        let answer = self.oracle.complete(&request).await?;
        debug!("Oracle answered {} chars", answer.len());

        let preferences = parse_oracle_response(&answer)?;
        let spec = sanitize(&preferences, allowed);
        spec.ensure_non_empty()?;

        info!("Resolved preferences: {:?}", spec.attributes());
        Ok(spec)
    }
}

fn coerce_weight(value: &Value) -> f64 {
    let weight = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    weight.filter(|w| w.is_finite()).unwrap_or(0.0)
}

fn first_json_object(text: &str) -> Option<Value> {
    text.match_indices('{').find_map(|(start, _)| {
        let len = balanced_object_len(&text[start..])?;
        match serde_json::from_str::<Value>(&text[start..start + len]) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        }
    })
}

/// Byte length of the brace-balanced prefix of `text` (which starts with `{`).
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}
