use crate::config::jwt::JwtConfig;
use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static JWT_CONFIG: OnceLock<JwtConfig> = OnceLock::new();

const ACCESS: &str = "access";

/// Install the signing config. Must be called once at startup.
pub fn init_jwt_config(config: JwtConfig) -> Result<()> {
    JWT_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("JWT config already initialized"))
}

fn config() -> Result<&'static JwtConfig> {
    JWT_CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("JWT config not initialized"))
}

/// Tokens are minted by the platform's auth service with the numeric user id
/// as subject.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Claims {
    /// Tokens without a `token_type` claim count as access tokens.
    pub fn is_access(&self) -> bool {
        matches!(self.token_type.as_deref(), None | Some(ACCESS))
    }

    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// Mint an access token; used by operator tooling and the test suite.
pub fn encode_access_token(user_id: i32) -> Result<String> {
    let config = config()?;
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + config.access_token_expiry as usize,
        iat: now,
        token_type: Some(ACCESS.to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
}

pub fn decode_jwt(token: &str) -> Result<Claims> {
    let config = config()?;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| anyhow::anyhow!("Failed to decode JWT: {}", e))
}

/// The caller's user id, if `token` is a valid, unexpired access token.
pub fn caller_id(token: &str) -> Option<i32> {
    let claims = decode_jwt(token).ok()?;
    if !claims.is_access() {
        tracing::debug!("Rejected non-access token for subject {}", claims.sub);
        return None;
    }
    claims.user_id()
}
