use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub exam: ExamConfig,
    pub server: ServerConfig,
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access token lifetime (seconds)
    pub access_ttl_seconds: u64,
    /// How often the expiration sweep runs (seconds)
    pub cleanup_interval_seconds: u64,
    /// Login key pair lifetime (seconds)
    pub login_key_ttl_seconds: u64,
    /// Refresh token lifetime (seconds)
    pub refresh_ttl_seconds: u64,
    /// HS256 signing secret for access-token claims
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: String,
    /// Sequential upstream requests issued per crawl round
    pub times_per_round: u32,
}

#[derive(Debug, Clone)]
pub struct ExamConfig {
    pub exam_time: String,
    pub exam_trust: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl_seconds: 3600,
            cleanup_interval_seconds: 60,
            login_key_ttl_seconds: 3600,
            refresh_ttl_seconds: 7 * 24 * 3600,
            secret: "secret".to_string(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            times_per_round: 60,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let secret = std::env::var("TOKEN_SECRET").unwrap_or_else(|_| "secret".to_string());

        let access_ttl = read_seconds("ACCESS_TOKEN_TTL", 3600);
        let refresh_ttl = read_seconds("REFRESH_TOKEN_TTL", 7 * 24 * 3600);
        let login_key_ttl = read_seconds("LOGIN_KEY_TTL", 3600);
        let cleanup_interval = read_seconds("CLEANUP_INTERVAL", 60);

        let base_url = std::env::var("UPSTREAM_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:9000".to_string());

        let times_per_round = std::env::var("CRAWL_TIMES_PER_ROUND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let exam_time = std::env::var("EXAM_TIME").unwrap_or_else(|_| default_exam_time());
        let exam_trust = std::env::var("EXAM_TRUST")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            tokens: TokenConfig {
                access_ttl_seconds: access_ttl,
                cleanup_interval_seconds: cleanup_interval,
                login_key_ttl_seconds: login_key_ttl,
                refresh_ttl_seconds: refresh_ttl,
                secret,
            },
            crawl: CrawlConfig {
                base_url,
                times_per_round,
            },
            exam: ExamConfig {
                exam_time,
                exam_trust,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.access_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "ACCESS_TOKEN_TTL cannot be 0".to_string(),
            ));
        }
        if self.tokens.refresh_ttl_seconds <= self.tokens.access_ttl_seconds {
            return Err(ConfigError::ValidationError(
                "REFRESH_TOKEN_TTL must exceed ACCESS_TOKEN_TTL".to_string(),
            ));
        }
        if self.crawl.times_per_round == 0 {
            return Err(ConfigError::ValidationError(
                "CRAWL_TIMES_PER_ROUND cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_seconds(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// The exam sits on May 15th; past that date, the next sitting is a year out.
fn default_exam_time() -> String {
    use chrono::Datelike;
    let today = chrono::Utc::now().date_naive();
    let year = match chrono::NaiveDate::from_ymd_opt(today.year(), 5, 15) {
        Some(exam_day) if today > exam_day => today.year() + 1,
        _ => today.year(),
    };
    format!("{year}-05-15")
}
