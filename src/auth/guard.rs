use crate::auth::claims::{Role, SessionClaim};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Two-level gate: `Admin` needs exactly an admin claim, `User` admits any
/// validated claim.
pub fn authorize(claim: &SessionClaim, required: Role) -> Decision {
    let allowed = match required {
        Role::User => true,
        Role::Admin => claim.role == Role::Admin,
    };
    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}
