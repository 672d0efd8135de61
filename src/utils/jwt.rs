use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::models::session::{CallerContext, Role};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// `None` when the token carries a role this service does not issue.
    pub fn caller(&self) -> Option<CallerContext> {
        match Role::parse(&self.role)? {
            Role::Student => Some(CallerContext::Student { id: self.sub }),
            Role::Employer => Some(CallerContext::Employer { id: self.sub }),
        }
    }
}

pub fn create_jwt(
    subject: i64,
    email: &str,
    role: Role,
    secret: &str,
    ttl: Duration,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject,
        email: email.to_string(),
        role: role.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_and_maps_to_caller() {
        let token =
            create_jwt(7, "hr@acme.io", Role::Employer, "secret", Duration::hours(1)).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "hr@acme.io");
        assert_eq!(claims.caller(), Some(CallerContext::Employer { id: 7 }));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_jwt(7, "a@b.io", Role::Student, "secret", Duration::hours(1)).unwrap();
        assert!(verify_jwt(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token =
            create_jwt(7, "a@b.io", Role::Student, "secret", Duration::minutes(-5)).unwrap();
        assert!(verify_jwt(&token, "secret").is_err());
    }

    #[test]
    fn unknown_role_has_no_caller() {
        let claims = Claims {
            sub: 1,
            email: "a@b.io".into(),
            role: "admin".into(),
            iat: 0,
            exp: 0,
        };
        assert_eq!(claims.caller(), None);
    }
}
