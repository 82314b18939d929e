use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::get_current_timestamp;

const BCRYPT_COST: u32 = 12;

/// Token payload. `exp` is a unix timestamp in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

pub fn sign_token(user_id: &str, secret: &str, expires_in_secs: i64) -> Result<String> {
    let claims = Claims {
        user_id: user_id.to_string(),
        exp: get_current_timestamp() + expires_in_secs,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Parses expiry strings of the shape "7d", "12h", "30m", "45s" or a raw
/// number of seconds into seconds.
pub fn parse_expiry(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(anyhow!("empty expiry string"));
    }

    if let Ok(secs) = raw.parse::<i64>() {
        return Ok(secs);
    }

    let unit = raw.chars().next_back().expect("checked non-empty");
    let amount: i64 = raw[..raw.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| anyhow!("invalid expiry string: {raw}"))?;

    match unit {
        's' => Ok(amount),
        'm' => Ok(amount * 60),
        'h' => Ok(amount * 60 * 60),
        'd' => Ok(amount * 24 * 60 * 60),
        _ => Err(anyhow!("invalid expiry unit: {unit}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() -> Result<()> {
        let hash = hash_password("hunter2")?;
        assert_ne!(hash, "hunter2");
        assert!(verify_password("hunter2", &hash)?);
        assert!(!verify_password("hunter3", &hash)?);
        Ok(())
    }

    #[test]
    fn token_roundtrip() -> Result<()> {
        let token = sign_token("7a9d2e0c-0000-0000-0000-000000000000", "secret", 3600)?;
        let claims = verify_token(&token, "secret")?;
        assert_eq!(claims.user_id, "7a9d2e0c-0000-0000-0000-000000000000");
        Ok(())
    }

    #[test]
    fn token_rejects_wrong_secret() -> Result<()> {
        let token = sign_token("user", "secret", 3600)?;
        assert!(verify_token(&token, "other-secret").is_err());
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> Result<()> {
        let token = sign_token("user", "secret", -3600)?;
        assert!(verify_token(&token, "secret").is_err());
        Ok(())
    }

    #[test]
    fn parses_expiry_strings() -> Result<()> {
        assert_eq!(parse_expiry("45s")?, 45);
        assert_eq!(parse_expiry("30m")?, 1800);
        assert_eq!(parse_expiry("12h")?, 43200);
        assert_eq!(parse_expiry("7d")?, 604800);
        assert_eq!(parse_expiry("3600")?, 3600);
        assert!(parse_expiry("").is_err());
        assert!(parse_expiry("7w").is_err());
        assert!(parse_expiry("abc").is_err());
        Ok(())
    }
}
