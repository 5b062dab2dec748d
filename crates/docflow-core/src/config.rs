//! Runtime settings shared by every Docflow front end.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// HS256 secret used to verify bearer tokens.
    pub jwt_secret: String,
    /// Expected `iss` claim.
    pub jwt_issuer: String,
    /// How long a request waits for a busy document before failing with
    /// `Conflict`.
    pub lock_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "docflow".to_string(),
            lock_timeout: Duration::from_millis(5000),
        }
    }
}
