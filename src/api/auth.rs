// JWT issuance/validation and password hashing, plus the bearer-auth
// middleware guarding everything except the public endpoints.

use std::future::{ready, Ready};

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::models::TokenPair;
use crate::store::users::User;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

pub const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 86400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_type: i16,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.user_type == crate::store::users::USER_TYPE_ADMIN
    }
}

impl FromRequest for Claims {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Claims>()
                .cloned()
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("missing credentials")),
        )
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {e}"))?
        .to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn issue(user: &User, token_type: &str, ttl_secs: i64, secret: &str) -> Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        user_type: user.user_type,
        token_type: token_type.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    Ok(jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn issue_pair(user: &User, secret: &str) -> Result<TokenPair> {
    Ok(TokenPair {
        access: issue(user, TOKEN_TYPE_ACCESS, DEFAULT_ACCESS_TTL_SECS, secret)?,
        refresh: issue(user, TOKEN_TYPE_REFRESH, DEFAULT_REFRESH_TTL_SECS, secret)?,
    })
}

/// New access token carrying the same identity as a refresh token's claims.
pub fn issue_access_from(claims: &Claims, secret: &str) -> Result<String> {
    let now = Utc::now().timestamp();
    let access = Claims {
        token_type: TOKEN_TYPE_ACCESS.to_string(),
        iat: now,
        exp: now + DEFAULT_ACCESS_TTL_SECS,
        ..claims.clone()
    };
    Ok(jsonwebtoken::encode(
        &Header::default(),
        &access,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

// Endpoints reachable without a token.
const PUBLIC_PATHS: &[&str] = &[
    "",
    "/health",
    "/accounts/sign_up",
    "/accounts/log_in",
    "/accounts/token/refresh",
];

/// Bearer-auth middleware: validates the access token and stores its
/// claims in the request extensions for the handlers.
pub struct Auth {
    secret: String,
}

impl Auth {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Auth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        }))
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: String,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().trim_end_matches('/').to_string();
        if PUBLIC_PATHS.contains(&path.as_str()) {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        if let Some(token) = token {
            match decode_claims(token, &self.secret) {
                Ok(claims) if claims.token_type == TOKEN_TYPE_ACCESS => {
                    req.extensions_mut().insert(claims);
                    let fut = self.service.call(req);
                    return Box::pin(async move {
                        let res = fut.await?;
                        Ok(res.map_into_left_body())
                    });
                }
                _ => {}
            }
        }

        Box::pin(async move {
            let response = HttpResponse::Unauthorized()
                .json(serde_json::json!({
                    "success": false,
                    "error": "Invalid or missing authentication token"
                }))
                .map_into_right_body();
            Ok(req.into_response(response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::users::{USER_TYPE_ADMIN, USER_TYPE_NORMAL};

    fn user(user_type: i16) -> User {
        User {
            id: 7,
            email: "ref@example.com".to_string(),
            password_hash: String::new(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            user_type,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }

    #[test]
    fn token_pair_round_trip() {
        let pair = issue_pair(&user(USER_TYPE_NORMAL), "secret").unwrap();
        let access = decode_claims(&pair.access, "secret").unwrap();
        assert_eq!(access.sub, 7);
        assert_eq!(access.email, "ref@example.com");
        assert_eq!(access.token_type, TOKEN_TYPE_ACCESS);
        assert!(!access.is_admin());
        let refresh = decode_claims(&pair.refresh, "secret").unwrap();
        assert_eq!(refresh.token_type, TOKEN_TYPE_REFRESH);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let pair = issue_pair(&user(USER_TYPE_ADMIN), "secret").unwrap();
        assert!(decode_claims(&pair.access, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let stale = Claims {
            sub: 7,
            email: "ref@example.com".to_string(),
            first_name: None,
            last_name: None,
            user_type: USER_TYPE_NORMAL,
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &stale,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(decode_claims(&token, "secret").is_err());
    }

    #[test]
    fn refresh_claims_mint_access_token() {
        let pair = issue_pair(&user(USER_TYPE_ADMIN), "secret").unwrap();
        let refresh = decode_claims(&pair.refresh, "secret").unwrap();
        let access = issue_access_from(&refresh, "secret").unwrap();
        let claims = decode_claims(&access, "secret").unwrap();
        assert_eq!(claims.token_type, TOKEN_TYPE_ACCESS);
        assert_eq!(claims.sub, 7);
        assert!(claims.is_admin());
    }
}
