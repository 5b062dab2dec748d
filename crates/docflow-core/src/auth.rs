//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` is a principal id. Issuance belongs to
//! an external identity service sharing the secret; `issue` exists for that
//! service's tooling and for tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::models::Principal;
use crate::workflow::role::{self, Role};

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
        }
    }

    /// Sign a token for `principal_id` valid for `ttl`.
    pub fn issue(&self, principal_id: &str, ttl: chrono::Duration) -> Result<String, ServerError> {
        let now = chrono::Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| ServerError::BadRequest("Token lifetime out of range".into()))?;
        let claims = Claims {
            sub: principal_id.to_string(),
            exp: expires.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServerError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature, issuer and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, ServerError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| ServerError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// An authenticated principal and the role it acts under.
#[derive(Debug, Clone)]
pub struct Actor {
    pub principal: Principal,
    pub role: Role,
}

impl Actor {
    pub fn new(principal: Principal) -> Self {
        let role = role::resolve(&principal.groups);
        Self { principal, role }
    }

    pub fn id(&self) -> &str {
        &self.principal.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let verifier = TokenVerifier::new("secret", "docflow");
        let token = verifier.issue("u1", chrono::Duration::hours(1)).unwrap();
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.iss, "docflow");
    }

    #[test]
    fn test_wrong_secret_or_issuer_rejected() {
        let token = TokenVerifier::new("secret1", "docflow")
            .issue("u1", chrono::Duration::hours(1))
            .unwrap();
        let err = TokenVerifier::new("secret2", "docflow").verify(&token).unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));

        let err = TokenVerifier::new("secret1", "other").verify(&token).unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }

    #[test]
    fn test_issue_rejects_out_of_range_lifetime() {
        let verifier = TokenVerifier::new("secret", "docflow");
        let ttl = chrono::Duration::try_hours(1 << 40).unwrap();
        assert!(matches!(verifier.issue("u1", ttl), Err(ServerError::BadRequest(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new("secret", "docflow");
        // Past the default 60s leeway.
        let token = verifier.issue("u1", chrono::Duration::minutes(-5)).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_actor_resolves_role() {
        let mut principal = Principal::new("u1".into(), "user1".into(), None);
        principal.groups = vec!["ApproverGroup".into()];
        assert_eq!(Actor::new(principal).role, Role::Approver);
    }
}
