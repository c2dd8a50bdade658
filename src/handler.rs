//! HTTP request handlers for accounts and projects
//!
//! Covers registration/login, the authenticated user's profile, and project
//! CRUD. Every management operation is filtered by the authenticated user's
//! ownership; a resource that exists but belongs to someone else answers 404
//! so its existence is never confirmed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use redb::{ReadableDatabase, ReadableTable};
use serde_json::json;

use crate::database::{
    prefix_range, read_json, scan_json, AppState, TABLE_API_KEYS, TABLE_FORMS,
    TABLE_FORM_ENDPOINTS, TABLE_KEY_SECRETS, TABLE_PROJECTS, TABLE_SESSIONS, TABLE_SUBMISSIONS,
    TABLE_USERS, TABLE_USER_EMAILS,
};
use crate::error::AppError;
use crate::form::Form;
use crate::middleware::AuthUser;
use crate::model::{
    generate_session_token, ApiKey, ChangePasswordRequest, CreateProjectRequest, LoginRequest,
    Project, RegisterRequest, UpdateProfileRequest, UpdateProjectRequest, User, UserProfile,
    hash_password,
};

/// Loads a project and verifies the caller owns it.
///
/// Non-owned projects are reported as missing, not forbidden.
pub(crate) fn owned_project<R>(
    projects: &R,
    project_id: &str,
    user_id: &str,
) -> Result<Project, AppError>
where
    R: ReadableTable<&'static str, &'static str>,
{
    match read_json::<Project, _>(projects, project_id)? {
        Some(project) if project.user_id == user_id => Ok(project),
        _ => Err(AppError::not_found("Project not found")),
    }
}

// ---- Auth ----

/// Creates a user account and an initial session.
///
/// # Response
///
/// - **201 Created** - `{token, user}` with the password hash omitted
/// - **409 Conflict** - email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let user = User::new(payload.name, email.clone(), &payload.password)?;
    let token = generate_session_token();

    let write_txn = state.db.begin_write()?;
    {
        let mut emails = write_txn.open_table(TABLE_USER_EMAILS)?;
        if emails.get(email.as_str())?.is_some() {
            return Err(AppError::conflict("Email already registered"));
        }
        emails.insert(email.as_str(), user.id.as_str())?;

        let mut users = write_txn.open_table(TABLE_USERS)?;
        users.insert(user.id.as_str(), serde_json::to_string(&user)?.as_str())?;

        let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
        sessions.insert(token.as_str(), user.id.as_str())?;
    }
    write_txn.commit()?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": UserProfile::from(&user) })),
    ))
}

/// Exchanges credentials for a session token.
///
/// Unknown email and wrong password produce the same 401 message.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = payload.email.trim().to_lowercase();

    let user = {
        let read_txn = state.db.begin_read()?;
        let emails = read_txn.open_table(TABLE_USER_EMAILS)?;
        let user_id = match emails.get(email.as_str())? {
            Some(guard) => guard.value().to_string(),
            None => return Err(AppError::unauthorized("Invalid email or password")),
        };
        let users = read_txn.open_table(TABLE_USERS)?;
        read_json::<User, _>(&users, &user_id)?
            .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?
    };

    if !user.verify_password(&payload.password) {
        return Err(AppError::unauthorized("Invalid email or password"));
    }

    let token = generate_session_token();
    let write_txn = state.db.begin_write()?;
    {
        let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
        sessions.insert(token.as_str(), user.id.as_str())?;
    }
    write_txn.commit()?;

    Ok(Json(
        json!({ "token": token, "user": UserProfile::from(&user) }),
    ))
}

// ---- Profile ----

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let read_txn = state.db.begin_read()?;
    let users = read_txn.open_table(TABLE_USERS)?;
    let user = read_json::<User, _>(&users, &user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserProfile::from(&user)))
}

/// Updates the caller's name and/or email.
///
/// An email change re-checks uniqueness and moves the email index entry in
/// the same transaction.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let write_txn = state.db.begin_write()?;
    let user = {
        let mut users = write_txn.open_table(TABLE_USERS)?;
        let mut user = read_json::<User, _>(&users, &user_id)?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if let Some(name) = payload.name {
            user.name = name;
        }
        if let Some(email) = payload.email {
            let email = email.trim().to_lowercase();
            if email != user.email {
                let mut emails = write_txn.open_table(TABLE_USER_EMAILS)?;
                if emails.get(email.as_str())?.is_some() {
                    return Err(AppError::conflict("Email already registered"));
                }
                emails.remove(user.email.as_str())?;
                emails.insert(email.as_str(), user.id.as_str())?;
                user.email = email;
            }
        }

        users.insert(user.id.as_str(), serde_json::to_string(&user)?.as_str())?;
        user
    };
    write_txn.commit()?;

    Ok(Json(UserProfile::from(&user)))
}

/// Changes the caller's password after verifying the current one.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.new_password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let write_txn = state.db.begin_write()?;
    {
        let mut users = write_txn.open_table(TABLE_USERS)?;
        let mut user = read_json::<User, _>(&users, &user_id)?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if !user.verify_password(&payload.current_password) {
            return Err(AppError::unauthorized("Current password is incorrect"));
        }

        user.password_hash = hash_password(&payload.new_password)?;
        users.insert(user.id.as_str(), serde_json::to_string(&user)?.as_str())?;
    }
    write_txn.commit()?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

// ---- Projects ----

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let read_txn = state.db.begin_read()?;
    let projects = read_txn.open_table(TABLE_PROJECTS)?;
    let mut owned: Vec<Project> = scan_json(&projects, |p: &Project| p.user_id == user_id)?;
    owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(owned))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }

    let project = Project::new(payload.title, payload.description, user_id);

    let write_txn = state.db.begin_write()?;
    {
        let mut projects = write_txn.open_table(TABLE_PROJECTS)?;
        projects.insert(
            project.id.as_str(),
            serde_json::to_string(&project)?.as_str(),
        )?;
    }
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let read_txn = state.db.begin_read()?;
    let projects = read_txn.open_table(TABLE_PROJECTS)?;
    let project = owned_project(&projects, &id, &user_id)?;
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let write_txn = state.db.begin_write()?;
    let project = {
        let mut projects = write_txn.open_table(TABLE_PROJECTS)?;
        let mut project = owned_project(&projects, &id, &user_id)?;

        if let Some(title) = payload.title {
            project.title = title;
        }
        if payload.description.is_some() {
            project.description = payload.description;
        }
        project.updated_at = Utc::now();

        projects.insert(
            project.id.as_str(),
            serde_json::to_string(&project)?.as_str(),
        )?;
        project
    };
    write_txn.commit()?;

    Ok(Json(project))
}

/// Deletes a project and everything under it: forms (with their endpoint
/// index entries and submissions) and API keys (with their secret index
/// entries), all in one transaction.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let write_txn = state.db.begin_write()?;
    {
        let mut projects = write_txn.open_table(TABLE_PROJECTS)?;
        owned_project(&projects, &id, &user_id)?;
        projects.remove(id.as_str())?;

        let mut forms = write_txn.open_table(TABLE_FORMS)?;
        let mut endpoints = write_txn.open_table(TABLE_FORM_ENDPOINTS)?;
        let mut submissions = write_txn.open_table(TABLE_SUBMISSIONS)?;

        let doomed_forms: Vec<Form> = scan_json(&forms, |f: &Form| f.project_id == id)?;
        for form in &doomed_forms {
            forms.remove(form.id.as_str())?;
            endpoints.remove(form.endpoint.as_str())?;

            let (start, end) = prefix_range(&form.id);
            let submission_keys: Vec<String> = submissions
                .range(start.as_str()..end.as_str())?
                .filter_map(|entry| entry.ok().map(|(key, _)| key.value().to_string()))
                .collect();
            for key in submission_keys {
                submissions.remove(key.as_str())?;
            }
        }

        let mut api_keys = write_txn.open_table(TABLE_API_KEYS)?;
        let mut secrets = write_txn.open_table(TABLE_KEY_SECRETS)?;

        let doomed_keys: Vec<ApiKey> = scan_json(&api_keys, |k: &ApiKey| k.project_id == id)?;
        for api_key in &doomed_keys {
            api_keys.remove(api_key.id.as_str())?;
            secrets.remove(api_key.key.as_str())?;
        }
    }
    write_txn.commit()?;

    Ok(Json(json!({ "message": "Project deleted successfully" })))
}
