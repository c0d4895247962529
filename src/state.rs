use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::auth::{dto::RegisterRequest, services::AuthService};
use crate::clock::SystemClock;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let auth = Arc::new(
            AuthService::from_config(&config, Arc::new(SystemClock))
                .context("build auth service")?,
        );

        if let Some(seed) = &config.admin {
            let admin = auth
                .provision_admin(RegisterRequest {
                    email: seed.email.clone(),
                    username: seed.username.clone(),
                    password: seed.password.clone(),
                    full_name: seed.full_name.clone(),
                })
                .await
                .context("provision admin account")?;
            info!(user_id = admin.id, email = %admin.email, "admin account provisioned");
        }

        Ok(Self { auth, config })
    }

    pub fn from_parts(auth: Arc<AuthService>, config: Arc<AppConfig>) -> Self {
        Self { auth, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{HasherConfig, JwtConfig};

        let auth = Arc::new(crate::auth::services::test_service(Arc::new(SystemClock)));
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60 * 24,
                leeway_seconds: 0,
            },
            hasher: HasherConfig {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            admin: None,
        });
        Self::from_parts(auth, config)
    }
}
