use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        claims::{Role, SessionClaim},
        dto::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
        guard::{self, Decision},
        jwt::TokenService,
        password::CredentialHasher,
        repo::{InMemoryUserStore, UserStore},
        repo_types::{NewUser, PublicUser, UserStats, UserUpdate},
    },
    clock::Clock,
    config::AppConfig,
    errors::{AppError, AppResult, HashingError, StoreError, TokenError},
};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are compared after trimming and lowercasing.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Everything the request layer may ask of the identity core.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    tokens: TokenService,
    // Verified against when the email is unknown, so both login failures
    // cost one Argon2 run.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        tokens: TokenService,
    ) -> Result<Self, HashingError> {
        let dummy_hash = hasher.hash("gatekeeper-unknown-account")?;
        Ok(Self {
            store,
            hasher,
            tokens,
            dummy_hash,
        })
    }

    /// In-memory store, Argon2 and JWT settings taken from `cfg`.
    pub fn from_config(cfg: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, HashingError> {
        let store = Arc::new(InMemoryUserStore::new(clock.clone())) as Arc<dyn UserStore>;
        let hasher = CredentialHasher::new(&cfg.hasher)?;
        let tokens = TokenService::new(&cfg.jwt, clock);
        Self::new(store, hasher, tokens)
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    async fn hash_blocking(&self, secret: String) -> Result<String, HashingError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| {
                error!(error = %e, "hashing task failed");
                HashingError(e.to_string())
            })?
    }

    async fn verify_blocking(&self, secret: String, hash: String) -> Result<bool, HashingError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&secret, &hash))
            .await
            .map_err(|e| {
                error!(error = %e, "verify task failed");
                HashingError(e.to_string())
            })
    }

    async fn create_account(&self, req: RegisterRequest, role: Role) -> AppResult<PublicUser> {
        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("invalid email".into()));
        }
        validate_username(&req.username)?;
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            warn!("password too short");
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = self.hash_blocking(req.password).await?;

        let user = self
            .store
            .create(NewUser {
                email,
                username: req.username,
                password_hash,
                full_name: req.full_name,
                role: Some(role),
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "registration rejected");
                AppError::from(e)
            })?;

        info!(user_id = user.id, email = %user.email, role = %user.role, "user registered");
        Ok(user.into())
    }

    /// Self-service signup. Always creates a `user` account.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register_user(&self, req: RegisterRequest) -> AppResult<PublicUser> {
        self.create_account(req, Role::User).await
    }

    /// Creates an `admin` account. Only called from process bootstrap.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn provision_admin(&self, req: RegisterRequest) -> AppResult<PublicUser> {
        self.create_account(req, Role::Admin).await
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, req))]
    pub async fn login(&self, req: LoginRequest) -> AppResult<LoginResponse> {
        let email = normalize_email(&req.email);

        let user = match self.store.get_by_email(&email).await {
            Ok(u) => Some(u),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());
        let ok = self.verify_blocking(req.password, hash).await?;

        let user = match user {
            Some(u) if ok => u,
            Some(u) => {
                warn!(user_id = u.id, "login invalid password");
                return Err(AppError::InvalidCredentials);
            }
            None => {
                warn!("login unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        let token = self.tokens.issue(user.id, &user.email, user.role).map_err(|e| {
            error!(error = %e, "jwt sign failed");
            AppError::from(e)
        })?;

        info!(user_id = user.id, "user logged in");
        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn get_profile(&self, user_id: u64) -> AppResult<PublicUser> {
        let user = self.store.get_by_id(user_id).await?;
        Ok(user.into())
    }

    #[instrument(skip(self, req))]
    pub async fn update_profile(
        &self,
        user_id: u64,
        req: UpdateProfileRequest,
    ) -> AppResult<PublicUser> {
        if let Some(username) = &req.username {
            validate_username(username)?;
        }
        let user = self
            .store
            .update(
                user_id,
                UserUpdate {
                    username: req.username,
                    full_name: req.full_name,
                },
            )
            .await
            .map_err(|e| {
                warn!(error = %e, "profile update rejected");
                AppError::from(e)
            })?;
        info!(user_id, "profile updated");
        Ok(user.into())
    }

    pub async fn list_users(&self) -> Vec<PublicUser> {
        self.store.list_all().await
    }

    pub async fn get_stats(&self) -> UserStats {
        self.store.stats().await
    }

    /// Validates a bearer token. Does not look the subject up in the store.
    pub fn authenticate(&self, token: &str) -> Result<SessionClaim, TokenError> {
        self.tokens.validate(token)
    }

    pub fn authorize(&self, claim: &SessionClaim, required: Role) -> Decision {
        guard::authorize(claim, required)
    }
}

#[cfg(test)]
pub(crate) fn test_service(clock: Arc<dyn Clock>) -> AuthService {
    use crate::config::JwtConfig;

    let store = Arc::new(InMemoryUserStore::new(clock.clone())) as Arc<dyn UserStore>;
    let tokens = TokenService::new(
        &JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60 * 24,
            leeway_seconds: 0,
        },
        clock,
    );
    AuthService::new(store, crate::auth::password::test_hasher(), tokens)
        .expect("service construction")
}
