//! Authentication for the storefront API.
//!
//! Bearer JWTs signed with the configured secret, argon2 password hashes,
//! and an extractor that turns the Authorization header into an [`AuthUser`]
//! for handlers. Admin-only routes check the role claim.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{user, User, UserModel, UserRole},
    errors::ServiceError,
    handlers::common::validate_input,
};

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub email: String,
    pub role: UserRole,
    pub jti: String, // Unique identifier for this token
    pub iat: i64,    // Issued at time
    pub exp: i64,    // Expiration time
    pub iss: String, // Issuer
    pub aud: String, // Audience
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Gate for admin-only handlers.
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Administrator access required".to_string(),
            ))
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Internal auth error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        (status, Json(body)).into_response()
    }
}

/// Issues and validates bearer tokens and backs the register/login routes.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Create a signed access token for the given user.
    pub fn generate_token(&self, user: &UserModel) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.config.access_token_expiration.as_secs() as i64,
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::InternalError(e.to_string()))
    }

    /// Decode and verify a bearer token, returning its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_audience(&[&self.config.jwt_audience]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
    }

    /// Register a new customer account and return it with a fresh token.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: String,
        password: String,
        full_name: String,
    ) -> Result<(UserModel, String), ServiceError> {
        let existing = User::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::InvalidOperation(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&password)?;
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            full_name: Set(full_name),
            role: Set(UserRole::Customer),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let user = user.insert(&*self.db).await?;

        let token = self
            .generate_token(&user)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        info!("Registered user: {}", user.id);
        Ok((user, token))
    }

    /// Verify credentials and return the account with a fresh token.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: String,
        password: String,
    ) -> Result<(UserModel, String), ServiceError> {
        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".to_string()))?;

        if !user.is_active {
            return Err(ServiceError::Unauthorized(
                "Account is deactivated".to_string(),
            ));
        }

        if !verify_password(&password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized(
                "Invalid credentials".to_string(),
            ));
        }

        let token = self
            .generate_token(&user)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        Ok((user, token))
    }
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::InternalError(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServiceError::InternalError(format!("Stored hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The auth service is injected into request extensions by a
        // middleware layer in main.
        let auth_service = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| {
                AuthError::InternalError("Auth service not available".to_string())
            })?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingAuth)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::MissingAuth)?
            .trim();

        let claims = auth_service.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::InvalidToken("Malformed subject claim".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

// Request/response DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserModel,
}

async fn register_handler(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let (user, token) = auth
        .register(payload.email, payload.password, payload.full_name)
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login_handler(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let (user, token) = auth.login(payload.email, payload.password).await?;

    Ok(Json(AuthResponse { token, user }))
}

/// Public register/login routes.
pub fn auth_routes() -> Router<Arc<AuthService>> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
}
