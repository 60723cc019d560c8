use super::parse_env;
use std::env;

/// Verification settings for access tokens minted by the identity provider.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Expected `iss` claim; unchecked when unset.
    pub issuer: Option<String>,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway: u64,
    /// Lifetime of tokens minted locally by `encode_access_token`, in seconds.
    pub access_token_expiry: u64,
}

impl JwtConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;
        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }

        let issuer = env::var("JWT_ISSUER")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            secret,
            issuer,
            leeway: parse_env("JWT_LEEWAY_SECS", 30),
            access_token_expiry: parse_env("JWT_ACCESS_EXPIRATION", 900),
        })
    }
}
