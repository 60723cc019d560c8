use crate::config::jwt::JwtConfig;
use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static JWT_CONFIG: OnceLock<JwtConfig> = OnceLock::new();

/// Initialize JWT config. Must be called once at startup.
pub fn init_jwt_config(config: JwtConfig) -> Result<()> {
    JWT_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("JWT config already initialized"))?;
    Ok(())
}

fn get_config() -> Result<&'static JwtConfig> {
    JWT_CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("JWT config not initialized"))
}

/// Claims this subsystem reads from a bearer token. Roles are not trusted
/// from the token; they are loaded from the users table on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Claims {
    pub fn is_access_token(&self) -> bool {
        matches!(self.token_type.as_deref(), Some("access"))
    }

    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

fn validation(config: &JwtConfig) -> Validation {
    let mut validation = Validation::default();
    validation.leeway = config.leeway;
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }
    validation
}

/// Mint an access token for `user_id`. The identity provider owns issuance in
/// production; this exists for tooling and tests sharing the secret.
pub fn encode_access_token(user_id: i32) -> Result<String> {
    let config = get_config()?;
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + config.access_token_expiry as usize,
        iat: now,
        iss: config.issuer.clone(),
        token_type: Some("access".to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
}

pub fn decode_jwt(token: &str) -> Result<Claims> {
    let config = get_config()?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation(config),
    )
    .map(|data| data.claims)
    .map_err(|e| anyhow::anyhow!("Failed to decode JWT: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "a_very_long_secret_key_that_is_at_least_32_chars".to_string(),
            issuer: None,
            leeway: 0,
            access_token_expiry: 900,
        }
    }

    fn ensure_config() {
        INIT.call_once(|| {
            let _ = init_jwt_config(test_config());
        });
    }

    fn sign(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(test_config().secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn minted_token_verifies() {
        ensure_config();
        let token = encode_access_token(42).unwrap();
        let claims = decode_jwt(&token).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert!(claims.is_access_token());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_claims_are_not_access() {
        let claims = Claims {
            sub: "1".to_string(),
            exp: 0,
            iat: 0,
            iss: None,
            token_type: Some("refresh".to_string()),
        };
        assert!(!claims.is_access_token());
    }

    #[test]
    fn tampered_token_fails() {
        ensure_config();
        let token = encode_access_token(42).unwrap();
        let mut chars: Vec<char> = token.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(decode_jwt(&tampered).is_err());
    }

    #[test]
    fn expired_token_fails() {
        ensure_config();
        let now = chrono::Utc::now().timestamp() as usize;
        let token = sign(&Claims {
            sub: "42".to_string(),
            exp: now - 3600,
            iat: now - 7200,
            iss: None,
            token_type: Some("access".to_string()),
        });
        assert!(decode_jwt(&token).is_err());
    }

    #[test]
    fn issuer_is_enforced_when_configured() {
        let mut config = test_config();
        config.issuer = Some("identity.example".to_string());
        let now = chrono::Utc::now().timestamp() as usize;

        let foreign = sign(&Claims {
            sub: "7".to_string(),
            exp: now + 60,
            iat: now,
            iss: Some("elsewhere".to_string()),
            token_type: Some("access".to_string()),
        });
        let key = DecodingKey::from_secret(config.secret.as_bytes());
        assert!(decode::<Claims>(&foreign, &key, &validation(&config)).is_err());

        let ours = sign(&Claims {
            sub: "7".to_string(),
            exp: now + 60,
            iat: now,
            iss: Some("identity.example".to_string()),
            token_type: Some("access".to_string()),
        });
        assert!(decode::<Claims>(&ours, &key, &validation(&config)).is_ok());
    }

    #[test]
    fn non_numeric_subject_has_no_user_id() {
        let claims = Claims {
            sub: "abc".to_string(),
            exp: 0,
            iat: 0,
            iss: None,
            token_type: None,
        };
        assert_eq!(claims.user_id(), None);
    }
}
