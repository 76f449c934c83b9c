use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Role, User};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub role: Role,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub fn issue_token(secret: &str, ttl_hours: i64, user: &User) -> Result<String, AppError> {
    let claims = Claims {
        sub: user.id,
        role: user.role,
        exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e}")))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: 7,
            name: "Test".to_string(),
            email: "t@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Driver,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = issue_token("secret", 1, &test_user()).unwrap();
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Driver);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token("secret", 1, &test_user()).unwrap();
        assert!(verify_token("other", &token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_token("secret", "not-a-token").is_err());
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }
}
