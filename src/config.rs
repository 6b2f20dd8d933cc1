use std::fmt;
use thiserror::Error;

/// Default lifetime of an admin session, in seconds (30 days)
const DEFAULT_JWT_MAXAGE: i64 = 60 * 60 * 24 * 30;
const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// SMTP connection used for contact notifications
#[derive(Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    pub frontend_url: String,
    pub recaptcha_secret: Option<String>,
    pub recaptcha_verify_url: String,
    pub smtp: Option<SmtpConfig>,
    pub contact_email: String,
    pub partners_email: String,
    /// First admin account, created at start-up when no user exists yet
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ConfigError(pub String);

impl Config {
    /// Read the configuration from the process environment
    ///
    /// Panics on a missing required variable, like any other start-up failure.
    pub fn init() -> Config {
        match Config::from_lookup(|key| std::env::var(key).ok()) {
            Ok(config) => config,
            Err(err) => panic!("invalid configuration: {}", err),
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| ConfigError(format!("{key} must be set")));

        let app_env = match var("APP_ENV").as_deref() {
            Some("production") => AppEnv::Production,
            None | Some("development") => AppEnv::Development,
            Some(other) => return Err(ConfigError(format!("unknown APP_ENV `{other}`"))),
        };

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(ConfigError(format!("unknown STORE_BACKEND `{other}`"))),
        };

        let database_url = match store_backend {
            StoreBackend::Postgres => Some(required("DATABASE_URL")?),
            StoreBackend::Memory => var("DATABASE_URL"),
        };

        let recaptcha_secret = var("RECAPTCHA_SECRET_KEY");
        if app_env == AppEnv::Production && recaptcha_secret.is_none() {
            return Err(ConfigError(
                "RECAPTCHA_SECRET_KEY must be set when APP_ENV=production".to_string(),
            ));
        }

        let jwt_maxage = match var("JWT_MAXAGE") {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| ConfigError("JWT_MAXAGE must be a number of seconds".to_string()))?,
            None => DEFAULT_JWT_MAXAGE,
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError("PORT must be a valid port number".to_string()))?,
            None => 8000,
        };

        let smtp = match (var("SMTP_SERVER"), var("SMTP_USERNAME"), var("SMTP_PASSWORD")) {
            (Some(server), Some(username), Some(password)) => Some(SmtpConfig {
                server,
                port: var("SMTP_PORT")
                    .and_then(|raw| raw.parse::<u16>().ok())
                    .unwrap_or(587),
                username,
                password,
            }),
            _ => None,
        };

        let contact_email =
            var("CONTACT_EMAIL").unwrap_or_else(|| "contact@cliiink-reunion.re".to_string());
        let partners_email = var("PARTNERS_EMAIL").unwrap_or_else(|| contact_email.clone());

        Ok(Config {
            app_env,
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET_KEY")?,
            jwt_maxage,
            port,
            frontend_url: var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
            recaptcha_secret,
            recaptcha_verify_url: var("RECAPTCHA_VERIFY_URL")
                .unwrap_or_else(|| DEFAULT_RECAPTCHA_VERIFY_URL.to_string()),
            smtp,
            contact_email,
            partners_email,
            admin_email: var("ADMIN_EMAIL"),
            admin_password: var("ADMIN_PASSWORD"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/cliiink"), ("JWT_SECRET_KEY", "s")])
            .unwrap();
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.port, 8000);
        assert_eq!(config.jwt_maxage, DEFAULT_JWT_MAXAGE);
        assert!(config.recaptcha_secret.is_none());
        assert!(config.smtp.is_none());
        assert_eq!(config.partners_email, config.contact_email);
    }

    #[test]
    fn production_requires_a_verifier_secret() {
        let err = config(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://localhost/cliiink"),
            ("JWT_SECRET_KEY", "s"),
        ])
        .unwrap_err();
        assert!(err.0.contains("RECAPTCHA_SECRET_KEY"));
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config = config(&[("STORE_BACKEND", "memory"), ("JWT_SECRET_KEY", "s")]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn postgres_backend_needs_database_url() {
        let err = config(&[("JWT_SECRET_KEY", "s")]).unwrap_err();
        assert_eq!(err, ConfigError("DATABASE_URL must be set".to_string()));
    }
}
