use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::models::{Role, StudentData, UserData};
use crate::state::AppState;
use crate::store::email_taken;
use crate::{proceeds, profile, Error, Payload};

pub const TOKEN_LIFETIME_DAYS: i64 = 7;
const MIN_PASSWORD_CHARS: usize = 6;

/// Payload carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, Error> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Token as if it had been issued at `issued_at`.
    pub fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, Error> {
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// Extracts and verifies the bearer token of a request.
pub fn require_caller(headers: &HeaderMap, keys: &TokenKeys) -> Result<Claims, Error> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::unauthenticated("Unauthorized"))?;
    keys.verify(token)
}

/// Verified identity of the caller.
#[derive(Debug, Clone)]
pub struct Caller(pub Claims);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Error> {
        require_caller(&parts.headers, &state.keys).map(Caller)
    }
}

#[derive(Debug, Clone)]
pub enum AuthResult {
    Granted(UserData),
    RoleMismatch { expected: Role, actual: Role },
    MissingCompany,
}

impl AuthResult {
    pub fn into_result(self) -> Result<UserData, Error> {
        match self {
            AuthResult::Granted(user) => Ok(user),
            AuthResult::RoleMismatch { expected, .. } => Err(Error::forbidden(format!(
                "{} account required",
                capitalized(expected)
            ))),
            AuthResult::MissingCompany => Err(Error::forbidden("Company account required")),
        }
    }
}

fn capitalized(role: Role) -> &'static str {
    match role {
        Role::Student => "Student",
        Role::Company => "Company",
    }
}

/// Capability check run at the top of every role-scoped handler.
pub fn require_role(user: UserData, role: Role) -> AuthResult {
    if user.role != role {
        return AuthResult::RoleMismatch {
            expected: role,
            actual: user.role,
        };
    }
    if role == Role::Company && user.company_id.is_none() {
        return AuthResult::MissingCompany;
    }
    AuthResult::Granted(user)
}

pub async fn load_user(state: &AppState, caller: &Caller) -> Result<UserData, Error> {
    state
        .store
        .find_user(caller.0.user_id)
        .await?
        .ok_or_else(|| Error::not_found("User not found"))
}

/// The caller's own student record.
pub async fn require_student(state: &AppState, caller: &Caller) -> Result<StudentData, Error> {
    let user = require_role(load_user(state, caller).await?, Role::Student).into_result()?;
    state
        .store
        .find_student_by_user(user.id)
        .await?
        .ok_or_else(|| Error::not_found("Student profile not found"))
}

/// The id of the company the caller administers.
pub async fn require_company(state: &AppState, caller: &Caller) -> Result<Uuid, Error> {
    let user = require_role(load_user(state, caller).await?, Role::Company).into_result()?;
    user.company_id
        .ok_or_else(|| Error::forbidden("Company account required"))
}

pub fn hash_password(password: &str, rounds: u32) -> Result<String, Error> {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt)?;
    let params = Params {
        rounds,
        ..Params::default()
    };
    let hash = Pbkdf2.hash_password_customized(password.as_bytes(), None, None, params, &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(hash) => Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok(),
        Err(err) => {
            log::warn!("Stored password hash is unreadable: {}", err);
            false
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub company_name: Option<String>,
}

async fn user_view(state: &AppState, user: UserData) -> Result<UserView, Error> {
    let company_name = match user.company_id {
        Some(id) => state.store.find_company(id).await?.map(|c| c.name),
        None => None,
    };
    Ok(UserView {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        role: user.role,
        company_id: user.company_id,
        company_name,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterStudent {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub account_type: Option<String>,
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

pub async fn register_student(
    State(state): State<AppState>,
    body: Result<Json<RegisterStudent>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), Error> {
    let Json(body) = body?;
    let email = trimmed(body.email).to_lowercase();
    let password = trimmed(body.password);
    let first_name = trimmed(body.first_name);
    let last_name = trimmed(body.last_name);

    if email.is_empty() || password.is_empty() || first_name.is_empty() || last_name.is_empty() {
        return Err(Error::validation(
            "Email, password, first name and last name required",
        ));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(Error::validation("Password must be at least 6 characters"));
    }
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }

    let user = UserData {
        id: Uuid::new_v4(),
        email,
        password_hash: hash_password(&password, state.config.hash_rounds)?,
        first_name,
        last_name,
        role: Role::Student,
        company_id: None,
        created_at: Utc::now(),
    };
    state.store.insert_user(&user).await?;
    state.store.insert_student(&profile::new_student(&user)).await?;
    log::info!("Registered student account {}", user.id);

    let token = state.keys.issue(user.id, &user.email)?;
    let user = user_view(&state, user).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login_user(
    State(state): State<AppState>,
    body: Result<Json<LoginUser>, JsonRejection>,
) -> Payload<AuthResponse> {
    let Json(login) = body?;
    let email = trimmed(login.email).to_lowercase();
    let password = login.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(Error::validation("Email and password required"));
    }

    let user = match state.store.find_user_by_email(&email).await? {
        Some(user) => user,
        None => return Err(Error::InvalidCredentials),
    };
    if !verify_password(&password, &user.password_hash) {
        return Err(Error::InvalidCredentials);
    }

    let requested = match login.account_type.as_deref() {
        Some("company") => Role::Company,
        _ => Role::Student,
    };
    if user.role != requested {
        let message = match requested {
            Role::Company => "No company account found with this email. Use student login or contact support.",
            Role::Student => "This email is registered as a company account. Use company login instead.",
        };
        return Err(Error::RoleMismatch {
            message: message.to_string(),
        });
    }

    let token = state.keys.issue(user.id, &user.email)?;
    let user = user_view(&state, user).await?;
    proceeds(AuthResponse { token, user })
}

pub async fn current_user(State(state): State<AppState>, caller: Caller) -> Payload<UserView> {
    let user = load_user(&state, &caller).await?;
    proceeds(user_view(&state, user).await?)
}
