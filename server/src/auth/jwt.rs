use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;

use crate::auth::middleware::Claims;

/// Resolve the token signing secret.
/// Uses the configured secret when present; otherwise a random 256-bit
/// secret that lives only as long as this process.
pub fn resolve_jwt_secret(configured: Option<&str>) -> Vec<u8> {
    match configured.map(str::trim).filter(|s| !s.is_empty()) {
        Some(secret) => secret.as_bytes().to_vec(),
        None => {
            tracing::warn!(
                "No jwt_secret configured; using a random per-process secret. Tokens will not survive a restart."
            );
            let key: [u8; 32] = rand::rng().random();
            key.to_vec()
        }
    }
}

/// Issue an access token for a user.
/// Claims: sub=user_id, email, iat, exp (iat + expiry_secs)
pub fn issue_access_token(
    secret: &[u8],
    user_id: &str,
    email: &str,
    expiry_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + expiry_secs,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Validate an access token and return its claims.
pub fn validate_access_token(
    secret: &[u8],
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?;
    Ok(token_data.claims)
}
