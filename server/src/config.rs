use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub default_studio_slug: String,
    pub default_studio_name: String,
    pub cors_allowed_origins: Vec<String>,
    pub log_cache_ttl: Duration,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let default_studio_slug =
            std::env::var("DEFAULT_STUDIO_SLUG").unwrap_or_else(|_| "demo".into());
        let default_studio_name =
            std::env::var("DEFAULT_STUDIO_NAME").unwrap_or_else(|_| "Estudio Demo".into());

        let cors_allowed_origins = parse_origins(
            &std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
        );

        let log_cache_ttl = match std::env::var("LOG_CACHE_TTL_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("invalid LOG_CACHE_TTL_SECS {raw:?}"))?,
            ),
            Err(_) => Duration::from_secs(60),
        };

        Ok(Self {
            default_studio_slug,
            default_studio_name,
            cors_allowed_origins,
            log_cache_ttl,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_origins;

    #[test]
    fn origins_skip_blank_entries() {
        assert_eq!(
            parse_origins(" http://a.test, ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
