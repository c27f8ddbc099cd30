//! LLM-backed components.

pub mod ollama_oracle;

pub use ollama_oracle::OllamaPreferenceOracle;
