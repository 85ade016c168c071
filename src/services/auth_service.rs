use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::Serialize;

use crate::{
    config::Config,
    db::{UserStore, reference_store::normalize_name},
    error::{AppError, Result},
    models::{Claims, LoginRequest, LoginResponse, NewUser, Role, UserDto},
};

const MIN_PASSWORD_LEN: usize = 6;
const GENERATED_PASSWORD_LEN: usize = 16;
const SALT_LEN: usize = 16;

/// Verified against when the username is unknown so both failures cost one
/// argon2 run. Parses as a valid hash but matches no password.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Password login and signed session tokens
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    users: UserStore,
}

impl AuthService {
    pub fn new(secret: &str, token_ttl_hours: i64, users: UserStore) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::hours(token_ttl_hours),
            users,
        }
    }

    /// Unknown user and wrong password fail the same way
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let Some(user) = self.users.get_by_username(&request.username).await? else {
            verify_password(&request.password, DUMMY_HASH);
            return Err(AppError::Auth);
        };

        if !verify_password(&request.password, &user.password_hash) {
            tracing::debug!("Rejected password for {}", user.username);
            return Err(AppError::Auth);
        }

        let (token, expires_at) = self.issue_token(&user.username, user.role)?;
        tracing::info!("User {} logged in", user.username);

        Ok(LoginResponse {
            token,
            expires_at,
            username: user.username,
            role: user.role,
        })
    }

    pub fn issue_token(&self, username: &str, role: Role) -> Result<(String, DateTime<Utc>)> {
        self.issue_token_at(username, role, Utc::now())
    }

    pub fn issue_token_at(
        &self,
        username: &str,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>)> {
        let expires_at = issued_at + self.token_ttl;
        let claims = Claims {
            sub: username.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token creation failed: {}", e)))?;

        Ok((token, expires_at))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("session expired".to_string())
                }
                _ => AppError::Unauthorized("invalid token".to_string()),
            }
        })?;

        Ok(data.claims)
    }

    /// Resolves a bearer token to a live account. The role is read back from
    /// the database so a deleted account stops working immediately.
    pub async fn session(&self, token: &str) -> Result<Session> {
        let claims = self.validate_token(token)?;
        let user = self
            .users
            .get_by_username(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_string()))?;

        Ok(Session {
            username: user.username,
            role: user.role,
        })
    }

    pub async fn register(&self, new_user: &NewUser) -> Result<UserDto> {
        let username = normalize_name(&new_user.username)?;
        if new_user.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must have at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let hash = hash_password(&new_user.password)?;
        let user = self.users.create(&username, new_user.role, &hash).await?;
        Ok(user.into())
    }

    /// Creates the first admin account on an empty user table.
    /// Without a configured password a random one is generated and logged once.
    pub async fn ensure_admin(&self, config: &Config) -> Result<()> {
        if self.users.count().await? > 0 {
            return Ok(());
        }

        let password = match &config.admin_password {
            Some(password) => password.clone(),
            None => {
                let generated = generate_password();
                tracing::warn!(
                    "No ADMIN_PASSWORD set, created {} with password {}",
                    config.admin_username,
                    generated
                );
                generated
            }
        };

        self.register(&NewUser {
            username: config.admin_username.clone(),
            password,
            role: Role::Admin,
        })
        .await?;

        Ok(())
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt_bytes: [u8; SALT_LEN] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("salt encoding failed: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

fn generate_password() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Authenticated caller, extracted from `Authorization: Bearer <token>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn authorize(&self, allowed: fn(&Role) -> bool, action: &str) -> Result<()> {
        if allowed(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("{} may not {}", self.role, action)))
        }
    }

    pub fn can_see_prices(&self) -> bool {
        self.role.can_see_prices()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AuthService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth = AuthService::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        auth.session(token).await
    }
}
