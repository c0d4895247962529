use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub leeway_seconds: i64,
}

/// Argon2id cost parameters. The defaults land around 100ms per hash on
/// commodity hardware.
#[derive(Debug, Clone, Deserialize)]
pub struct HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// Admin account created at startup, if configured.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub hasher: HasherConfig,
    pub admin: Option<AdminSeed>,
}

/// Longest accepted token lifetime: one year.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 366;

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v.trim().parse::<T>().with_context(|| format!("{key}={v:?}")),
        None => Ok(default),
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        if self.ttl_minutes <= 0 || self.ttl_minutes > MAX_TTL_MINUTES {
            anyhow::bail!(
                "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {}",
                self.ttl_minutes
            );
        }
        if self.leeway_seconds < 0 {
            anyhow::bail!(
                "JWT_LEEWAY_SECONDS must not be negative, got {}",
                self.leeway_seconds
            );
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "gatekeeper".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "gatekeeper-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60 * 24)?,
            leeway_seconds: env_or("JWT_LEEWAY_SECONDS", 0)?,
        };
        jwt.validate()?;

        let defaults = HasherConfig::default();
        let hasher = HasherConfig {
            memory_kib: env_or("HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_or("HASH_ITERATIONS", defaults.iterations)?,
            parallelism: env_or("HASH_PARALLELISM", defaults.parallelism)?,
        };

        let admin = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminSeed {
                username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
                full_name: std::env::var("ADMIN_FULL_NAME").unwrap_or_default(),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
            jwt,
            hasher,
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(ttl_minutes: i64, leeway_seconds: i64) -> JwtConfig {
        JwtConfig {
            secret: "s".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes,
            leeway_seconds,
        }
    }

    #[test]
    fn unparseable_value_is_an_error_naming_the_key() {
        let err = parse_or::<i64>("JWT_TTL_MINUTES", Some("abc".into()), 60).unwrap_err();
        assert!(format!("{err:#}").contains("JWT_TTL_MINUTES"));
    }

    #[test]
    fn missing_value_uses_default() {
        assert_eq!(parse_or::<i64>("JWT_TTL_MINUTES", None, 60).unwrap(), 60);
        assert_eq!(parse_or::<u16>("APP_PORT", Some(" 9000 ".into()), 8080).unwrap(), 9000);
    }

    #[test]
    fn ttl_must_be_positive_and_bounded() {
        assert!(jwt(60, 0).validate().is_ok());
        assert!(jwt(0, 0).validate().is_err());
        assert!(jwt(-5, 0).validate().is_err());
        assert!(jwt(i64::MAX, 0).validate().is_err());
        assert!(jwt(60, -1).validate().is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut cfg = jwt(60, 0);
        cfg.secret.clear();
        assert!(cfg.validate().is_err());
    }
}
