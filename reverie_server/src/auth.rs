//! Identity resolution.
//!
//! Callers present an HS256 JWT as a bearer token. Tokens are minted elsewhere; the server only verifies the
//! signature, expiry and issuer, and turns the claims into an engine [`Caller`].
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use jsonwebtoken::{decode, DecodingKey, Validation};
use log::*;
use reverie_engine::db_types::{Caller, Role};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The caller's e-mail
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub exp: i64,
    pub iss: String,
}

impl JwtClaims {
    pub fn caller(&self) -> Caller {
        Caller::new(&self.sub, &self.name, self.role)
    }
}

/// Claims are placed in the request extensions by the ACL middleware. Handlers on routes without that middleware
/// cannot extract them.
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
            warn!("💻️ No JWT claims found in request extensions");
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let mut validation = Validation::default();
        validation.set_issuer(&[&config.jwt_issuer]);
        Self { decoding_key, validation }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!("💻️ Access token rejected. {e}");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidToken | jsonwebtoken::errors::ErrorKind::Base64(_) => {
                    AuthError::PoorlyFormattedToken(e.to_string())
                },
                _ => AuthError::ValidationError(e.to_string()),
            }
        })?;
        Ok(data.claims)
    }

    /// Pulls the token out of an `Authorization: Bearer ...` header value.
    pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected a bearer token".into()))
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use reverie_common::Secret;

    use super::*;

    fn config() -> AuthConfig {
        AuthConfig { jwt_secret: Secret::new("a test secret".into()), jwt_issuer: "reverie".into() }
    }

    fn token(secret: &str, issuer: &str, exp: i64) -> String {
        let claims = JwtClaims {
            sub: "bob@reverie.test".into(),
            name: "Bob".into(),
            role: Role::Vendor,
            exp,
            iss: issuer.into(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_tokens_resolve_to_callers() {
        let verifier = TokenVerifier::new(&config());
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let claims = verifier.verify(&token("a test secret", "reverie", exp)).unwrap();
        assert_eq!(claims.caller(), Caller::new("bob@reverie.test", "Bob", Role::Vendor));
    }

    #[test]
    fn bad_tokens_are_rejected() {
        let verifier = TokenVerifier::new(&config());
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        assert!(verifier.verify(&token("another secret", "reverie", exp)).is_err());
        assert!(verifier.verify(&token("a test secret", "someone else", exp)).is_err());
        let expired = (Utc::now() - Duration::hours(1)).timestamp();
        assert!(verifier.verify(&token("a test secret", "reverie", expired)).is_err());
        assert!(matches!(verifier.verify("rubbish"), Err(AuthError::PoorlyFormattedToken(_))));
    }

    #[test]
    fn bearer_headers() {
        assert_eq!(TokenVerifier::bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(TokenVerifier::bearer_token(None), Err(AuthError::MissingToken)));
        assert!(TokenVerifier::bearer_token(Some("Basic abc")).is_err());
        assert!(TokenVerifier::bearer_token(Some("Bearer ")).is_err());
    }
}
