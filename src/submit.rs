//! Public form submission endpoint
//!
//! `POST /submit/{endpoint}` is the only unauthenticated write path. The
//! request passes a series of hard gates, first failure wins:
//!
//! 1. `x-api-key` header present, else 401 (checked before the form is even
//!    looked up).
//! 2. The secret resolves to an active key, else 401. Unknown and inactive
//!    keys get the same response so key state is not leaked.
//! 3. If the key declares allowed domains, the Origin hostname must be one
//!    of them, else 403.
//! 4. The form at the endpoint slug must belong to the key's project,
//!    else 403.
//!
//! The payload is then validated against the form's element list; failures
//! come back as a 400 with the full per-field error list. Accepted payloads
//! are trimmed to the form's declared fields, persisted together with
//! request metadata, and the key's `lastUsed`
//! timestamp is refreshed in a background task that never delays or fails
//! the response.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::database::{
    read_json, AppState, TABLE_API_KEYS, TABLE_FORMS, TABLE_FORM_ENDPOINTS, TABLE_KEY_SECRETS,
    TABLE_SUBMISSIONS,
};
use crate::error::AppError;
use crate::form::Form;
use crate::model::{ApiKey, Submission, SubmissionMetadata};
use crate::validate::validate_submission;

pub async fn submit_form(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Json(mut payload): Json<Map<String, Value>>,
) -> Result<impl IntoResponse, AppError> {
    // Gate 1: key header must be present, before any lookup
    let secret = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::unauthorized("Missing API key"))?
        .to_string();

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let (api_key, form) = {
        let read_txn = state.db.begin_read()?;

        // Gate 2: secret must match an active key
        let secrets = read_txn.open_table(TABLE_KEY_SECRETS)?;
        let key_id = match secrets.get(secret.as_str())? {
            Some(guard) => guard.value().to_string(),
            None => return Err(AppError::unauthorized("Invalid API key")),
        };
        let api_keys = read_txn.open_table(TABLE_API_KEYS)?;
        let api_key = read_json::<ApiKey, _>(&api_keys, &key_id)?
            .filter(|key| key.is_active)
            .ok_or_else(|| AppError::unauthorized("Invalid API key"))?;

        // Gate 3: origin allow-list
        if !api_key.allowed_domains.is_empty() {
            let host = origin.as_deref().and_then(origin_host);
            let allowed = host
                .map(|host| {
                    api_key
                        .allowed_domains
                        .iter()
                        .any(|domain| domain.eq_ignore_ascii_case(host))
                })
                .unwrap_or(false);
            if !allowed {
                return Err(AppError::forbidden("Domain not allowed"));
            }
        }

        // Resolve the form by its endpoint slug
        let endpoints = read_txn.open_table(TABLE_FORM_ENDPOINTS)?;
        let form_id = match endpoints.get(endpoint.as_str())? {
            Some(guard) => guard.value().to_string(),
            None => return Err(AppError::not_found("Form not found")),
        };
        let forms = read_txn.open_table(TABLE_FORMS)?;
        let form = read_json::<Form, _>(&forms, &form_id)?
            .ok_or_else(|| AppError::not_found("Form not found"))?;

        // Gate 4: key and form must belong to the same project
        if form.project_id != api_key.project_id {
            return Err(AppError::forbidden("API key is not valid for this form"));
        }

        (api_key, form)
    };

    let errors = validate_submission(&form.elements, &payload);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    // Only values for declared input fields are stored; keys that match no
    // element are dropped rather than persisted verbatim
    let declared: HashSet<&str> = form
        .elements
        .iter()
        .filter(|element| !element.kind.is_layout())
        .map(|element| element.id.as_str())
        .collect();
    payload.retain(|key, _| declared.contains(key.as_str()));

    let metadata = SubmissionMetadata {
        ip: headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string()),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        origin,
        api_key: api_key.id.clone(),
        submitted_at: Utc::now(),
    };
    let submission = Submission::new(form.id.clone(), payload, metadata);

    let write_txn = state.db.begin_write()?;
    {
        let mut submissions = write_txn.open_table(TABLE_SUBMISSIONS)?;
        // Chronological composite key; the id suffix keeps same-microsecond
        // submissions from clobbering each other
        let storage_key = format!(
            "{}:{}:{}",
            submission.form_id,
            submission.metadata.submitted_at.timestamp_micros(),
            submission.id
        );
        submissions.insert(
            storage_key.as_str(),
            serde_json::to_string(&submission)?.as_str(),
        )?;
    }
    write_txn.commit()?;

    // Best-effort lastUsed refresh, off the response path
    touch_last_used(state.db.clone(), api_key.id.clone());

    Ok((StatusCode::CREATED, Json(submission)))
}

/// Updates a key's `lastUsed` timestamp in a background task.
///
/// Failures are logged and otherwise ignored; the submission has already
/// been accepted.
fn touch_last_used(db: Arc<Database>, key_id: String) {
    tokio::spawn(async move {
        let result = (|| -> Result<(), AppError> {
            let write_txn = db.begin_write()?;
            {
                let mut api_keys = write_txn.open_table(TABLE_API_KEYS)?;
                let record = match read_json::<ApiKey, _>(&api_keys, &key_id)? {
                    Some(mut key) => {
                        key.last_used = Some(Utc::now());
                        Some(key)
                    }
                    None => None,
                };
                if let Some(key) = record {
                    api_keys.insert(key.id.as_str(), serde_json::to_string(&key)?.as_str())?;
                }
            }
            write_txn.commit()?;
            Ok(())
        })();

        if let Err(err) = result {
            tracing::warn!(key = %key_id, "failed to update lastUsed: {err}");
        }
    });
}

/// Extracts the hostname from an Origin header value.
///
/// "https://forms.example.com:8443/" becomes "forms.example.com". Returns
/// `None` for values without a recognizable host.
fn origin_host(origin: &str) -> Option<&str> {
    let rest = origin.split_once("://").map(|(_, rest)| rest).unwrap_or(origin);
    let host = rest.split('/').next()?.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}
