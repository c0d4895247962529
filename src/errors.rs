use std::fmt;

use thiserror::Error;

/// Which uniqueness constraint a write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Email,
    Username,
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictField::Email => f.write_str("email"),
            ConflictField::Username => f.write_str("username"),
        }
    }
}

/// Failures of the identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(ConflictField),
    #[error("user not found")]
    NotFound,
    #[error("credential hash is required")]
    MissingCredential,
}

/// Why a session token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Entropy or resource failure inside the password hasher.
#[derive(Debug, Error)]
#[error("credential hashing failed: {0}")]
pub struct HashingError(pub String);

/// Token could not be encoded.
#[derive(Debug, Error)]
#[error("failed to sign session token: {0}")]
pub struct SigningError(pub String);

/// Outcome kinds of the operations exposed to the request layer.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0} already exists")]
    Conflict(ConflictField),

    #[error("user not found")]
    NotFound,

    /// Unknown email and wrong secret both land here.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("missing bearer token")]
    MissingToken,

    #[error("insufficient role")]
    Forbidden,

    #[error(transparent)]
    Hashing(#[from] HashingError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(field) => AppError::Conflict(field),
            StoreError::NotFound => AppError::NotFound,
            StoreError::MissingCredential => {
                AppError::Hashing(HashingError("empty credential hash".into()))
            }
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
