//! Preference-driven company ranking.
//!
//! A free-text request is resolved by an LLM oracle into a
//! [`PreferenceSpec`] over the table's numeric attributes; every attribute
//! is normalized onto `[0, 1]` in its preferred direction (optionally after
//! within-sector z-scoring) and the weighted sum ranks the companies.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod ids;
pub mod neutralize;
pub mod normalize;
pub mod preference;
pub mod resolver;
pub mod scorer;
pub mod session;
pub mod table;
pub mod view;

pub use config::{DataConfig, OracleConfig, OutputConfig, RankerConfig};
pub use engine::{Ranker, rank_with_spec};
pub use error::{RankingError, RankingResult};
pub use ids::{RankingId, SessionId};
pub use preference::{Direction, Preference, PreferenceSpec};
pub use resolver::{OracleFuture, OracleRequest, PreferenceOracle, PreferenceResolver};
pub use session::RankingSession;
pub use table::{Cell, CompanyTable, load_companies};
pub use view::{View, render_markdown};
