//! Bearer token authorization.
//!
//! Tokens are RS256 JWTs issued by the configured identity provider. Signing keys
//! come from the issuer's JWKS endpoint and are cached until a token presents an
//! unknown key id, at most once per [`MIN_KEY_REFRESH`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{
    decode, decode_header,
    errors::ErrorKind,
    jwk::{Jwk, JwkSet, KeyAlgorithm},
    Algorithm, DecodingKey, Validation,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::errors::AppError;

/// Permission strings granted by the identity provider.
pub mod permissions {
    pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
    pub const POST_DRINKS: &str = "post:drinks";
    pub const PATCH_DRINKS: &str = "patch:drinks";
    pub const DELETE_DRINKS: &str = "delete:drinks";
}

/// Shortest gap between two JWKS fetches.
pub const MIN_KEY_REFRESH: Duration = Duration::from_secs(30);

/// Claims read from a verified token.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

impl Claims {
    pub fn subject(&self) -> &str {
        self.sub.as_deref().unwrap_or("unknown")
    }
}

fn auth_error(status: StatusCode, code: &'static str, description: &'static str) -> AppError {
    AppError::Auth {
        status,
        code,
        description,
    }
}

fn malformed() -> AppError {
    auth_error(
        StatusCode::UNAUTHORIZED,
        "invalid_header",
        "Authorization malformed.",
    )
}

fn unparseable() -> AppError {
    auth_error(
        StatusCode::BAD_REQUEST,
        "invalid_header",
        "Unable to parse authentication token.",
    )
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers.get(header::AUTHORIZATION).ok_or_else(|| {
        auth_error(
            StatusCode::UNAUTHORIZED,
            "authorization_header_missing",
            "Authorization header is expected.",
        )
    })?;

    let value = value.to_str().map_err(|_| {
        auth_error(
            StatusCode::UNAUTHORIZED,
            "invalid_header",
            "Authorization header must be bearer token.",
        )
    })?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, ..] if scheme.eq_ignore_ascii_case("bearer") => match parts.as_slice() {
            [_] => Err(auth_error(
                StatusCode::UNAUTHORIZED,
                "invalid_header",
                "Token not found.",
            )),
            [_, token] => Ok(*token),
            _ => Err(auth_error(
                StatusCode::UNAUTHORIZED,
                "invalid_header",
                "Authorization header must be bearer token.",
            )),
        },
        _ => Err(auth_error(
            StatusCode::UNAUTHORIZED,
            "invalid_header",
            "Authorization header must start with \"Bearer\".",
        )),
    }
}

/// Ensure the verified claims carry `permission`.
pub fn check_permission(claims: &Claims, permission: &str) -> Result<(), AppError> {
    let granted = claims.permissions.as_ref().ok_or_else(|| {
        auth_error(
            StatusCode::BAD_REQUEST,
            "invalid_claims",
            "Permissions not included in JWT.",
        )
    })?;

    if !granted.iter().any(|p| p == permission) {
        return Err(auth_error(
            StatusCode::FORBIDDEN,
            "unauthorized",
            "Permission not found.",
        ));
    }
    Ok(())
}

/// Signing algorithm declared by a JWK.
fn signing_algorithm(alg: &KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

fn decode_error(err: jsonwebtoken::errors::Error) -> AppError {
    match err.kind() {
        ErrorKind::ExpiredSignature => auth_error(
            StatusCode::UNAUTHORIZED,
            "token_expired",
            "Token expired.",
        ),
        ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer | ErrorKind::MissingRequiredClaim(_) => {
            auth_error(
                StatusCode::UNAUTHORIZED,
                "invalid_claims",
                "Incorrect claims. Please, check the audience and issuer.",
            )
        }
        _ => {
            tracing::debug!("Token rejected: {}", err);
            unparseable()
        }
    }
}

#[derive(Default)]
struct KeyCache {
    set: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn find(&self, kid: &str) -> Option<Jwk> {
        self.set.as_ref().and_then(|set| set.find(kid)).cloned()
    }

    fn is_fresh(&self, min_refresh: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < min_refresh)
    }
}

/// Verifies bearer tokens against the issuer's published keys.
pub struct AuthGate {
    issuer: String,
    audience: String,
    jwks_url: String,
    client: reqwest::Client,
    keys: RwLock<KeyCache>,
    min_refresh: Duration,
}

impl AuthGate {
    pub fn new(issuer: String, audience: String, jwks_url: String) -> Self {
        Self {
            issuer,
            audience,
            jwks_url,
            client: reqwest::Client::new(),
            keys: RwLock::new(KeyCache::default()),
            min_refresh: MIN_KEY_REFRESH,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.issuer(),
            config.api_audience.clone(),
            config.jwks_url.clone(),
        )
    }

    /// Verify signature, expiry, issuer and audience, returning the claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let header = decode_header(token).map_err(|_| malformed())?;
        let kid = header.kid.ok_or_else(malformed)?;

        let jwk = self.find_key(&kid).await?;
        let algorithm = jwk
            .common
            .key_algorithm
            .as_ref()
            .and_then(signing_algorithm)
            .unwrap_or(Algorithm::RS256);
        if header.alg != algorithm {
            return Err(unparseable());
        }

        let key = DecodingKey::from_jwk(&jwk).map_err(|e| {
            tracing::warn!("Unusable signing key {}: {}", kid, e);
            unparseable()
        })?;

        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        let data = decode::<Claims>(token, &key, &validation).map_err(decode_error)?;
        Ok(data.claims)
    }

    async fn find_key(&self, kid: &str) -> Result<Jwk, AppError> {
        let not_found = || {
            auth_error(
                StatusCode::BAD_REQUEST,
                "invalid_header",
                "Unable to find the appropriate key.",
            )
        };

        {
            let cache = self.keys.read().await;
            if let Some(jwk) = cache.find(kid) {
                return Ok(jwk);
            }
            if cache.is_fresh(self.min_refresh) {
                return Err(not_found());
            }
        }

        // Unknown kid: the issuer may have rotated its keys.
        let mut cache = self.keys.write().await;
        if let Some(jwk) = cache.find(kid) {
            return Ok(jwk);
        }
        if cache.is_fresh(self.min_refresh) {
            return Err(not_found());
        }

        let set = self.fetch_keys().await?;
        cache.set = Some(set);
        cache.fetched_at = Some(Instant::now());

        cache.find(kid).ok_or_else(not_found)
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AppError> {
        let set = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Internal(format!("Failed to fetch JWKS: {}", e)))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid JWKS document: {}", e)))?;

        tracing::info!(
            "Fetched {} signing keys from {}",
            set.keys.len(),
            self.jwks_url
        );
        Ok(set)
    }
}

/// State for one permission-guarded route.
#[derive(Clone)]
pub struct PermissionGuard {
    gate: Arc<AuthGate>,
    permission: &'static str,
}

impl PermissionGuard {
    pub fn new(gate: Arc<AuthGate>, permission: &'static str) -> Self {
        Self { gate, permission }
    }

    async fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AppError> {
        let token = bearer_token(headers)?;
        let claims = self.gate.verify(token).await?;
        check_permission(&claims, self.permission)?;
        Ok(claims)
    }
}

/// Middleware rejecting requests whose token lacks the guard's permission.
/// On success the verified [`Claims`] are added to the request extensions.
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorized = guard.authorize(request.headers()).await;

    match authorized {
        Ok(claims) => {
            tracing::debug!("{} granted {}", claims.subject(), guard.permission);
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                "Rejected {} {}: {}",
                request.method(),
                request.uri().path(),
                e
            );
            e.into_response()
        }
    }
}
