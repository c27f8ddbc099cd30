//! Preference oracle backed by an Ollama completion model through Rig.

use reqwest::Client as ReqwestClient;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::message::AssistantContent;
use rig::providers::ollama;
use tracing::debug;

use crate::ranking::config::OracleConfig;
use crate::ranking::error::{RankingError, RankingResult};
use crate::ranking::resolver::{OracleFuture, OracleRequest, PreferenceOracle};

/// Ollama-backed [`PreferenceOracle`].
pub struct OllamaPreferenceOracle {
    model: ollama::CompletionModel,
    model_name: String,
    temperature: f64,
    max_tokens: Option<u64>,
}

impl OllamaPreferenceOracle {
    /// Create an oracle from the completion model config.
    ///
    /// # Errors
    /// Returns `Configuration` if the Ollama client cannot be built.
    pub fn new(config: &OracleConfig) -> RankingResult<Self> {
        let builder = ollama::Client::<ReqwestClient>::builder().api_key(rig::client::Nothing);
        let builder = if let Some(base_url) = &config.base_url {
            builder.base_url(base_url)
        } else {
            builder
        };
        let client = builder
            .build()
            .map_err(|e| RankingError::Configuration(format!("ollama client: {e}")))?;
        let model = client.completion_model(config.model.clone());

        Ok(Self {
            model,
            model_name: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl PreferenceOracle for OllamaPreferenceOracle {
    fn complete<'a>(&'a self, request: &'a OracleRequest) -> OracleFuture<'a, RankingResult<String>> {
        Box::pin(async move {
            debug!(
                "Asking {} to map a request onto {} attributes",
                self.model_name,
                request.allowed.len()
            );

            let completion = self
                .model
                .completion_request(request.user_prompt.clone())
                .preamble(request.system_prompt.clone())
                .temperature(self.temperature)
                .max_tokens_opt(self.max_tokens)
                .build();

            let response = self.model.completion(completion).await.map_err(|e| {
                RankingError::Configuration(format!(
                    "preference oracle {} unavailable: {e}",
                    self.model_name
                ))
            })?;
            Ok(extract_text(&response.choice))
        })
    }
}

fn extract_text(choice: &rig::OneOrMany<AssistantContent>) -> String {
    let mut out = String::new();
    for content in choice.iter() {
        if let AssistantContent::Text(text) = content {
            out.push_str(&text.text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_creation() {
        let oracle = OllamaPreferenceOracle::new(&OracleConfig::default());
        assert!(oracle.is_ok());
    }

    #[test]
    fn test_oracle_with_custom_base_url() {
        let config = OracleConfig {
            base_url: Some("http://127.0.0.1:11434".to_string()),
            ..OracleConfig::default()
        };
        let oracle = OllamaPreferenceOracle::new(&config).unwrap();
        assert_eq!(oracle.model_name, config.model);
    }
}
