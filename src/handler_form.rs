//! HTTP request handlers for form definitions and submission listings
//!
//! Forms are saved by full replacement: every save carries the complete
//! element list. The public endpoint slug is derived from the title and kept
//! globally unique through the endpoint index table; the uniqueness check and
//! the form write happen in the same transaction, so two concurrent saves
//! with colliding titles cannot both succeed.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use redb::{ReadableDatabase, ReadableTable};
use serde_json::json;

use crate::database::{
    prefix_range, read_json, scan_json, AppState, TABLE_FORMS, TABLE_FORM_ENDPOINTS,
    TABLE_PROJECTS, TABLE_SUBMISSIONS,
};
use crate::error::AppError;
use crate::form::{endpoint_slug, Form};
use crate::handler::owned_project;
use crate::middleware::AuthUser;
use crate::model::{CreateFormRequest, ListParams, Submission, UpdateFormRequest};

/// Loads a form and verifies the caller owns its project.
fn owned_form<R, P>(
    forms: &R,
    projects: &P,
    form_id: &str,
    user_id: &str,
) -> Result<Form, AppError>
where
    R: ReadableTable<&'static str, &'static str>,
    P: ReadableTable<&'static str, &'static str>,
{
    let form = read_json::<Form, _>(forms, form_id)?
        .ok_or_else(|| AppError::not_found("Form not found"))?;
    owned_project(projects, &form.project_id, user_id)?;
    Ok(form)
}

/// Creates a form inside a project the caller owns.
///
/// # Response
///
/// - **201 Created** - the stored form, endpoint slug included
/// - **404 Not Found** - project missing or not owned
/// - **409 Conflict** - another form already uses the derived endpoint
pub async fn create_form(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<CreateFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }

    let form = Form::new(
        payload.project_id,
        payload.title,
        payload.name,
        payload.description,
        payload.elements,
    );
    if form.endpoint.is_empty() {
        return Err(AppError::BadRequest(
            "Title must contain at least one letter or digit".to_string(),
        ));
    }

    let write_txn = state.db.begin_write()?;
    {
        let projects = write_txn.open_table(TABLE_PROJECTS)?;
        owned_project(&projects, &form.project_id, &user_id)?;

        let mut endpoints = write_txn.open_table(TABLE_FORM_ENDPOINTS)?;
        if endpoints.get(form.endpoint.as_str())?.is_some() {
            return Err(AppError::conflict("A form with this title already exists"));
        }
        endpoints.insert(form.endpoint.as_str(), form.id.as_str())?;

        let mut forms = write_txn.open_table(TABLE_FORMS)?;
        forms.insert(form.id.as_str(), serde_json::to_string(&form)?.as_str())?;
    }
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(form)))
}

/// Lists the forms of a project the caller owns.
pub async fn list_forms(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let read_txn = state.db.begin_read()?;
    let projects = read_txn.open_table(TABLE_PROJECTS)?;
    owned_project(&projects, &project_id, &user_id)?;

    let forms = read_txn.open_table(TABLE_FORMS)?;
    let mut owned: Vec<Form> = scan_json(&forms, |f: &Form| f.project_id == project_id)?;
    owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(owned))
}

pub async fn get_form(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let read_txn = state.db.begin_read()?;
    let forms = read_txn.open_table(TABLE_FORMS)?;
    let projects = read_txn.open_table(TABLE_PROJECTS)?;
    let form = owned_form(&forms, &projects, &id, &user_id)?;
    Ok(Json(form))
}

/// Updates a form; the element list is replaced wholesale when present.
///
/// The endpoint slug is regenerated only when the title actually changes, so
/// re-saving a form without renaming it never alters its public URL.
pub async fn update_form(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    let write_txn = state.db.begin_write()?;
    let form = {
        let projects = write_txn.open_table(TABLE_PROJECTS)?;
        let mut forms = write_txn.open_table(TABLE_FORMS)?;
        let mut form = owned_form(&forms, &projects, &id, &user_id)?;

        if let Some(title) = payload.title {
            if title != form.title {
                let endpoint = endpoint_slug(&title);
                if endpoint.is_empty() {
                    return Err(AppError::BadRequest(
                        "Title must contain at least one letter or digit".to_string(),
                    ));
                }
                if endpoint != form.endpoint {
                    let mut endpoints = write_txn.open_table(TABLE_FORM_ENDPOINTS)?;
                    if endpoints.get(endpoint.as_str())?.is_some() {
                        return Err(AppError::conflict(
                            "A form with this title already exists",
                        ));
                    }
                    endpoints.remove(form.endpoint.as_str())?;
                    endpoints.insert(endpoint.as_str(), form.id.as_str())?;
                    form.endpoint = endpoint;
                }
                form.title = title;
            }
        }
        if payload.name.is_some() {
            form.name = payload.name;
        }
        if payload.description.is_some() {
            form.description = payload.description;
        }
        if let Some(elements) = payload.elements {
            form.elements = elements;
        }
        form.updated_at = Utc::now();

        forms.insert(form.id.as_str(), serde_json::to_string(&form)?.as_str())?;
        form
    };
    write_txn.commit()?;

    Ok(Json(form))
}

/// Deletes a form along with its endpoint index entry and submissions.
pub async fn delete_form(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let write_txn = state.db.begin_write()?;
    {
        let projects = write_txn.open_table(TABLE_PROJECTS)?;
        let mut forms = write_txn.open_table(TABLE_FORMS)?;
        let form = owned_form(&forms, &projects, &id, &user_id)?;

        forms.remove(form.id.as_str())?;

        let mut endpoints = write_txn.open_table(TABLE_FORM_ENDPOINTS)?;
        endpoints.remove(form.endpoint.as_str())?;

        let mut submissions = write_txn.open_table(TABLE_SUBMISSIONS)?;
        let (start, end) = prefix_range(&form.id);
        let submission_keys: Vec<String> = submissions
            .range(start.as_str()..end.as_str())?
            .filter_map(|entry| entry.ok().map(|(key, _)| key.value().to_string()))
            .collect();
        for key in submission_keys {
            submissions.remove(key.as_str())?;
        }
    }
    write_txn.commit()?;

    Ok(Json(json!({ "message": "Form deleted successfully" })))
}

/// Lists a form's submissions, newest first, with pagination.
///
/// # Query Parameters
///
/// - `page` (optional) - Page number, starts from 1 (default: 1)
/// - `limit` (optional) - Items per page, max 100 (default: 10)
pub async fn list_submissions(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).min(100);
    let offset = (page - 1) * limit;

    let read_txn = state.db.begin_read()?;
    let forms = read_txn.open_table(TABLE_FORMS)?;
    let projects = read_txn.open_table(TABLE_PROJECTS)?;
    let form = owned_form(&forms, &projects, &id, &user_id)?;

    let submissions = read_txn.open_table(TABLE_SUBMISSIONS)?;
    let (start, end) = prefix_range(&form.id);
    let results: Vec<Submission> = submissions
        .range(start.as_str()..end.as_str())?
        .rev()
        .skip(offset)
        .take(limit)
        .filter_map(|entry| {
            entry
                .ok()
                .and_then(|(_, value)| serde_json::from_str::<Submission>(value.value()).ok())
        })
        .collect();

    Ok(Json(json!({
        "page": page,
        "limit": limit,
        "total_fetched": results.len(),
        "data": results
    })))
}
