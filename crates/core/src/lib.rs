pub mod advisor;
pub mod domain;
pub mod llm;
pub mod prompt;
pub mod results;
pub mod session;

pub mod config {
    use anyhow::Context;

    const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
    const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
    const DEFAULT_OPENAI_TEMPERATURE: f32 = 0.7;
    const DEFAULT_OPENAI_TIMEOUT_SECS: u64 = 60;
    // Single attempt unless configured otherwise.
    const DEFAULT_OPENAI_MAX_RETRIES: u32 = 0;
    const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 30 * 60;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub openai_api_key: Option<String>,
        pub openai_base_url: String,
        pub openai_model: String,
        pub openai_temperature: f32,
        pub openai_timeout_secs: u64,
        pub openai_max_retries: u32,
        pub session_idle_ttl_secs: u64,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                openai_api_key: None,
                openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                openai_model: DEFAULT_OPENAI_MODEL.to_string(),
                openai_temperature: DEFAULT_OPENAI_TEMPERATURE,
                openai_timeout_secs: DEFAULT_OPENAI_TIMEOUT_SECS,
                openai_max_retries: DEFAULT_OPENAI_MAX_RETRIES,
                session_idle_ttl_secs: DEFAULT_SESSION_IDLE_TTL_SECS,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();
            Ok(Self {
                openai_api_key: non_empty_var("OPENAI_API_KEY"),
                openai_base_url: non_empty_var("OPENAI_BASE_URL")
                    .unwrap_or(defaults.openai_base_url),
                openai_model: non_empty_var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
                openai_temperature: parsed_var("OPENAI_TEMPERATURE")
                    .unwrap_or(defaults.openai_temperature),
                openai_timeout_secs: parsed_var("OPENAI_TIMEOUT_SECS")
                    .unwrap_or(defaults.openai_timeout_secs),
                openai_max_retries: parsed_var("OPENAI_MAX_RETRIES")
                    .unwrap_or(defaults.openai_max_retries),
                session_idle_ttl_secs: parsed_var("SESSION_IDLE_TTL_SECS")
                    .unwrap_or(defaults.session_idle_ttl_secs),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
        non_empty_var(key).and_then(|s| s.parse::<T>().ok())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn defaults_match_single_attempt_policy() {
            let settings = Settings::default();
            assert_eq!(settings.openai_model, "gpt-4o-mini");
            assert_eq!(settings.openai_max_retries, 0);
            assert_eq!(settings.session_idle_ttl_secs, 1800);
            assert!((settings.openai_temperature - 0.7).abs() < f32::EPSILON);
        }

        #[test]
        fn missing_api_key_is_an_error() {
            let settings = Settings::default();
            let err = settings.require_openai_api_key().unwrap_err();
            assert!(err.to_string().contains("OPENAI_API_KEY"));
        }
    }
}
