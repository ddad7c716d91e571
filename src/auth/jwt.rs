use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl UserClaims {
    pub fn new(user_id: uuid::Uuid, role: impl Into<String>, ttl: chrono::Duration) -> Self {
        let now = chrono::Utc::now();
        Self {
            sub: user_id.to_string(),
            role: role.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

pub fn generate_token<K: AsRef<[u8]>>(
    claims: UserClaims,
    key: K,
) -> jsonwebtoken::errors::Result<String> {
    let header = Header::default();
    let key = EncodingKey::from_secret(key.as_ref());

    let token = jsonwebtoken::encode(&header, &claims, &key)?;
    Ok(token)
}

pub fn process_token<K: AsRef<[u8]>>(
    token: &str,
    key: K,
) -> jsonwebtoken::errors::Result<TokenData<UserClaims>> {
    let validation = Validation::default();
    let key = DecodingKey::from_secret(key.as_ref());

    let claims = jsonwebtoken::decode::<UserClaims>(token, &key, &validation)?;
    Ok(claims)
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use jsonwebtoken::errors::ErrorKind;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn token_roundtrip_keeps_claims() {
        let id = Uuid::new_v4();
        let token = generate_token(UserClaims::new(id, "instructor", Duration::minutes(5)), "k").unwrap();
        let data = process_token(&token, "k").unwrap();
        assert_eq!(data.claims.sub, id.to_string());
        assert_eq!(data.claims.role, "instructor");
        assert!(data.claims.exp > data.claims.iat);
    }

    #[test]
    fn wrong_key_rejected() {
        let token =
            generate_token(UserClaims::new(Uuid::new_v4(), "student", Duration::minutes(5)), "a").unwrap();
        let err = process_token(&token, "b").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
    }

    #[test]
    fn expired_token_rejected() {
        // past the default 60s leeway
        let claims = UserClaims::new(Uuid::new_v4(), "student", Duration::minutes(-5));
        let token = generate_token(claims, "k").unwrap();
        let err = process_token(&token, "k").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }
}
