//! HTTP request handlers for project API keys
//!
//! Keys guard the public submission endpoint. The secret is generated once at
//! creation; updates may rename a key, change its domain allow-list or toggle
//! it active, but never touch the secret.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use redb::{ReadableDatabase, ReadableTable};
use serde_json::json;

use crate::database::{
    read_json, scan_json, AppState, TABLE_API_KEYS, TABLE_KEY_SECRETS, TABLE_PROJECTS,
};
use crate::error::AppError;
use crate::handler::owned_project;
use crate::middleware::AuthUser;
use crate::model::{generate_key_secret, ApiKey, CreateApiKeyRequest, UpdateApiKeyRequest};

/// Lists the keys of a project the caller owns.
pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let read_txn = state.db.begin_read()?;
    let projects = read_txn.open_table(TABLE_PROJECTS)?;
    owned_project(&projects, &project_id, &user_id)?;

    let api_keys = read_txn.open_table(TABLE_API_KEYS)?;
    let mut owned: Vec<ApiKey> = scan_json(&api_keys, |k: &ApiKey| {
        k.project_id == project_id && k.created_by == user_id
    })?;
    owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(owned))
}

/// Creates an API key scoped to a project the caller owns.
///
/// # Response
///
/// - **201 Created** - the key record, secret included (shown to the owner only)
/// - **404 Not Found** - project missing or not owned
pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(payload): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let mut api_key = ApiKey::new(
        payload.name,
        payload.allowed_domains,
        project_id,
        user_id.clone(),
    );

    let write_txn = state.db.begin_write()?;
    {
        let projects = write_txn.open_table(TABLE_PROJECTS)?;
        owned_project(&projects, &api_key.project_id, &user_id)?;

        let mut secrets = write_txn.open_table(TABLE_KEY_SECRETS)?;
        // Secrets are 256-bit random so a collision is vanishingly unlikely,
        // but the index is the uniqueness guarantee, so re-roll on a hit.
        while secrets.get(api_key.key.as_str())?.is_some() {
            api_key.key = generate_key_secret();
        }
        secrets.insert(api_key.key.as_str(), api_key.id.as_str())?;

        let mut api_keys = write_txn.open_table(TABLE_API_KEYS)?;
        api_keys.insert(
            api_key.id.as_str(),
            serde_json::to_string(&api_key)?.as_str(),
        )?;
    }
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(api_key)))
}

/// Updates a key's name, allow-list or active flag. The secret never changes.
pub async fn update_api_key(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let write_txn = state.db.begin_write()?;
    let api_key = {
        let mut api_keys = write_txn.open_table(TABLE_API_KEYS)?;
        let mut api_key = match read_json::<ApiKey, _>(&api_keys, &id)? {
            Some(key) if key.created_by == user_id => key,
            _ => return Err(AppError::not_found("API key not found")),
        };

        if let Some(name) = payload.name {
            api_key.name = name;
        }
        if let Some(allowed_domains) = payload.allowed_domains {
            api_key.allowed_domains = allowed_domains;
        }
        if let Some(is_active) = payload.is_active {
            api_key.is_active = is_active;
        }

        api_keys.insert(
            api_key.id.as_str(),
            serde_json::to_string(&api_key)?.as_str(),
        )?;
        api_key
    };
    write_txn.commit()?;

    Ok(Json(api_key))
}

pub async fn delete_api_key(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let write_txn = state.db.begin_write()?;
    {
        let mut api_keys = write_txn.open_table(TABLE_API_KEYS)?;
        let api_key = match read_json::<ApiKey, _>(&api_keys, &id)? {
            Some(key) if key.created_by == user_id => key,
            _ => return Err(AppError::not_found("API key not found")),
        };

        api_keys.remove(api_key.id.as_str())?;

        let mut secrets = write_txn.open_table(TABLE_KEY_SECRETS)?;
        secrets.remove(api_key.key.as_str())?;
    }
    write_txn.commit()?;

    Ok(Json(json!({ "message": "API key deleted successfully" })))
}
