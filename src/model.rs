//! Data models for the form builder
//!
//! Stored records (users, projects, API keys, submissions) plus the
//! request/response payloads of the management API. Form definitions live in
//! [`crate::form`] and their elements in [`crate::element`].

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::element::FormElement;
use crate::error::AppError;

/// A registered user account as stored in the database.
///
/// Never serialized into API responses directly; see [`UserProfile`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password: &str) -> Result<Self, AppError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// The user shape returned by the API, without the password hash.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Generates an opaque bearer token for a login session.
pub fn generate_session_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

/// A project owning forms and API keys.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owning user; all child access is filtered through this
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(title: String, description: Option<String>, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A project-scoped API key guarding the public submission endpoint.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub project_id: String,
    pub name: String,
    /// The secret, generated once at creation and never regenerated.
    pub key: String,
    /// Origin hostnames allowed to submit with this key; empty means any.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn new(
        name: String,
        allowed_domains: Vec<String>,
        project_id: String,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id,
            name,
            key: generate_key_secret(),
            allowed_domains,
            is_active: true,
            last_used: None,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// Generates a key secret: the "zf_" prefix plus 64 random lowercase hex chars.
pub fn generate_key_secret() -> String {
    const HEX_CHARS: &[u8] = b"0123456789abcdef";
    let mut rng = rand::rng();
    let body: String = (0..64)
        .map(|_| HEX_CHARS[rng.random_range(0..HEX_CHARS.len())] as char)
        .collect();
    format!("zf_{body}")
}

/// Request metadata captured alongside an accepted submission.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Id of the API key that authorized the submission
    pub api_key: String,
    pub submitted_at: DateTime<Utc>,
}

/// An accepted form submission. Immutable once written.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    /// Submitted values keyed by form element id
    pub data: Map<String, Value>,
    pub metadata: SubmissionMetadata,
}

impl Submission {
    pub fn new(form_id: String, data: Map<String, Value>, metadata: SubmissionMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            form_id,
            data,
            metadata,
        }
    }
}

// ---- Request payloads ----

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: Option<String>,
}

/// Partial project update. Omitted or null fields keep their current value,
/// so a description can be changed but not cleared.
#[derive(Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormRequest {
    pub project_id: String,
    pub title: String,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub elements: Vec<FormElement>,
}

/// Partial form update. Omitted or null fields keep their current value;
/// `name` and `description` can be changed but not cleared.
#[derive(Deserialize)]
pub struct UpdateFormRequest {
    pub title: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub elements: Option<Vec<FormElement>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub allowed_domains: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Query parameters for paginated listings.
#[derive(Deserialize)]
pub struct ListParams {
    /// Page number, starts from 1 (default: 1)
    pub page: Option<usize>,
    /// Items per page, max 100 (default: 10)
    pub limit: Option<usize>,
}
