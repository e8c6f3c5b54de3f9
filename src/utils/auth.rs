use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i32, // user_id
    pub email: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

pub fn create_jwt(
    user_id: i32,
    email: &str,
    role: &str,
    secret: &str,
    ttl_hours: i64,
) -> Result<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(ttl_hours))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: user_id,
        email: email.to_owned(),
        role: role.to_owned(),
        exp: expiration as usize,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_cycle() {
        let secret = "test_secret";
        let token = create_jwt(42, "ana@example.com", "cliente", secret, 24).unwrap();
        let claims = validate_jwt(&token, secret).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.role, "cliente");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_jwt_wrong_secret_rejected() {
        let token = create_jwt(1, "a@b.c", "admin", "secret_a", 24).unwrap();
        assert!(validate_jwt(&token, "secret_b").is_err());
    }

    #[test]
    fn test_jwt_expired_rejected() {
        let token = create_jwt(1, "a@b.c", "admin", "secret", -2).unwrap();
        assert!(validate_jwt(&token, "secret").is_err());
    }
}
