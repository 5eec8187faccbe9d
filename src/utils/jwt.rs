use crate::config::IdentityConfig;
use crate::error::{AppError, AppResult};
use crate::models::ExternalIdentity;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// 身份提供方令牌中的声明
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String, // external user id
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Verifies bearer tokens issued by the external identity provider.
#[derive(Clone)]
pub struct IdentityVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
    audience: Option<String>,
}

impl IdentityVerifier {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// 签发令牌（本地联调与测试使用，生产环境由身份提供方签发）
    pub fn sign(&self, identity: &ExternalIdentity, expires_in: i64) -> AppResult<String> {
        let now = Utc::now();
        let claims = IdentityClaims {
            sub: identity.external_id.clone(),
            email: Some(identity.email.clone()),
            given_name: identity.first_name.clone(),
            family_name: identity.last_name.clone(),
            picture: identity.image_url.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + Duration::seconds(expires_in)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify(&self, token: &str) -> AppResult<ExternalIdentity> {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<IdentityClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)?;

        if claims.sub.trim().is_empty() {
            return Err(AppError::AuthError("Identity token has no subject".to_string()));
        }
        let email = claims
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::AuthError("Identity token has no email".to_string()))?;

        Ok(ExternalIdentity {
            external_id: claims.sub,
            email,
            first_name: claims.given_name,
            last_name: claims.family_name,
            image_url: claims.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(issuer: Option<&str>) -> IdentityConfig {
        IdentityConfig {
            jwt_secret: "test-secret".to_string(),
            issuer: issuer.map(str::to_string),
            audience: None,
        }
    }

    fn identity() -> ExternalIdentity {
        ExternalIdentity {
            external_id: "idp|42".to_string(),
            email: "Anna@School.de".to_string(),
            first_name: Some("Anna".to_string()),
            last_name: None,
            image_url: None,
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let verifier = IdentityVerifier::new(&config(Some("https://idp.example")));
        let token = verifier.sign(&identity(), 60).unwrap();
        let verified = verifier.verify(&token).unwrap();
        assert_eq!(verified.external_id, "idp|42");
        assert_eq!(verified.email, "anna@school.de");
        assert_eq!(verified.first_name.as_deref(), Some("Anna"));
    }

    #[test]
    fn test_rejects_foreign_secret() {
        let issuer = IdentityVerifier::new(&config(None));
        let other = IdentityVerifier::new(&IdentityConfig {
            jwt_secret: "another-secret".to_string(),
            issuer: None,
            audience: None,
        });
        let token = issuer.sign(&identity(), 60).unwrap();
        assert!(matches!(other.verify(&token), Err(AppError::JwtError(_))));
    }

    #[test]
    fn test_rejects_expired_token() {
        let verifier = IdentityVerifier::new(&config(None));
        let token = verifier.sign(&identity(), -3600).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_rejects_missing_email() {
        let verifier = IdentityVerifier::new(&config(None));
        let mut id = identity();
        id.email = "  ".to_string();
        let token = verifier.sign(&id, 60).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AppError::AuthError(_))));
    }
}
