use sketchmatch_core::SearchOptions;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base address of the face service; every endpoint hangs off it.
    pub api_url: String,
    /// Transport timeout for a single request, in seconds.
    pub timeout_secs: u64,
    /// Default minimum similarity when no flag overrides it.
    pub min_similarity: f32,
    /// Default result cap when no flag overrides it.
    pub max_results: u32,
}

impl Config {
    /// Load configuration from `SKETCHMATCH_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_url: lookup("SKETCHMATCH_API_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout_secs: env_parse(&lookup, "SKETCHMATCH_TIMEOUT_SECS", 30),
            min_similarity: env_parse(&lookup, "SKETCHMATCH_MIN_SIMILARITY", 0.0),
            max_results: env_parse(&lookup, "SKETCHMATCH_MAX_RESULTS", 10),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Defaults overridden by whichever flags were given. Not validated here.
    pub fn search_options(&self, min_similarity: Option<f32>, max_results: Option<u32>) -> SearchOptions {
        SearchOptions::new(
            min_similarity.unwrap_or(self.min_similarity),
            max_results.unwrap_or(self.max_results),
        )
    }
}

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.search_options(None, None), SearchOptions::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = config_with(&[
            ("SKETCHMATCH_API_URL", "https://faces.example.org/api"),
            ("SKETCHMATCH_TIMEOUT_SECS", "five"),
            ("SKETCHMATCH_MIN_SIMILARITY", " 40 "),
            ("SKETCHMATCH_MAX_RESULTS", "25"),
        ]);
        assert_eq!(config.api_url, "https://faces.example.org/api");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.min_similarity, 40.0);
        assert_eq!(config.max_results, 25);
    }

    #[test]
    fn test_flags_beat_environment() {
        let config = config_with(&[("SKETCHMATCH_MAX_RESULTS", "25")]);
        let options = config.search_options(Some(70.0), None);
        assert_eq!(options, SearchOptions::new(70.0, 25));
    }
}
