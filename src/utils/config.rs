use chrono::Duration;
use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide settings, built once at start-up and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub cors_origin: String,
    pub frontend_url: String,
    pub student_email_domain: String,
    pub student_id_prefix: String,
    pub token_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub mail: MailConfig,
    pub google: Option<GoogleConfig>,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from: String,
    pub relay_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = required("JWT_SECRET")?;

        let google = match (
            optional("GOOGLE_CLIENT_ID"),
            optional("GOOGLE_CLIENT_SECRET"),
            optional("GOOGLE_REDIRECT_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::Missing(
                    "GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET/GOOGLE_REDIRECT_URL",
                ))
            }
        };

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            jwt_secret,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            cors_origin: optional("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            student_email_domain: optional("STUDENT_EMAIL_DOMAIN")
                .unwrap_or_else(|| "hyderabad.bits-pilani.ac.in".to_string()),
            student_id_prefix: optional("STUDENT_ID_PREFIX").unwrap_or_else(|| "411".to_string()),
            token_ttl_minutes: parsed("TOKEN_TTL_MINUTES", 60)?,
            reset_token_ttl_minutes: parsed("RESET_TOKEN_TTL_MINUTES", 60)?,
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            mail: MailConfig {
                from: optional("MAIL_FROM")
                    .unwrap_or_else(|| "no-reply@internship-portal.local".to_string()),
                relay_url: optional("MAIL_RELAY_URL"),
            },
            google,
        })
    }

    /// Settings for tests and local tooling: in-memory storage, cheap hashing.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            cors_origin: "*".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            student_email_domain: "hyderabad.bits-pilani.ac.in".to_string(),
            student_id_prefix: "411".to_string(),
            token_ttl_minutes: 60,
            reset_token_ttl_minutes: 60,
            bcrypt_cost: 4,
            mail: MailConfig {
                from: "no-reply@internship-portal.local".to_string(),
                relay_url: None,
            },
            google: None,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.token_ttl_minutes)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::minutes(self.reset_token_ttl_minutes)
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
