use std::sync::Arc;

use jsonwebtoken::{crypto, decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::Duration;
use tracing::{debug, warn};

use crate::{
    auth::claims::{Role, SessionClaim},
    clock::Clock,
    config::JwtConfig,
    errors::{SigningError, TokenError},
};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and validates HS256 session tokens.
///
/// Validation is self-contained: a token stays valid until `exp` even if the
/// account behind it changes role or disappears afterwards.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    leeway: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
            leeway: Duration::seconds(cfg.leeway_seconds.max(0)),
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject_id: u64, email: &str, role: Role) -> Result<String, SigningError> {
        let now = self.clock.now();
        let exp = now + self.ttl;
        let claim = SessionClaim {
            subject_id,
            email: email.to_string(),
            role,
            issued_at: now.unix_timestamp(),
            expires_at: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(ALGORITHM), &claim, &self.encoding)
            .map_err(|e| SigningError(e.to_string()))?;
        debug!(user_id = subject_id, role = %role, "jwt signed");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaim, TokenError> {
        // Signature goes first: nothing in the token is interpreted until the
        // bytes are known to be ours.
        let (message, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        if signature.is_empty() {
            return Err(TokenError::Malformed);
        }

        match crypto::verify(signature, message.as_bytes(), &self.decoding, ALGORITHM) {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                warn!("jwt signature mismatch");
                return Err(TokenError::BadSignature);
            }
        }

        let segments_ok =
            message.split('.').count() == 2 && message.split('.').all(|s| !s.is_empty());
        if !segments_ok {
            return Err(TokenError::Malformed);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let claim = decode::<SessionClaim>(token, &self.decoding, &validation)
            .map_err(|e| {
                warn!(error = %e, "jwt claims rejected");
                TokenError::Malformed
            })?
            .claims;

        let now = self.clock.now().unix_timestamp();
        if now > claim.expires_at.saturating_add(self.leeway.whole_seconds()) {
            debug!(user_id = claim.subject_id, "jwt expired");
            return Err(TokenError::Expired);
        }

        debug!(user_id = claim.subject_id, role = %claim.role, "jwt verified");
        Ok(claim)
    }
}
