//! Bearer-token authentication for the management API
//!
//! Every `/api` management route runs through [`auth_middleware`], which
//! resolves the `Authorization: Bearer <token>` header against the sessions
//! table and injects the owning user's id as an [`AuthUser`] extension.
//! Handlers then filter every lookup by that user id.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use redb::{ReadableDatabase, ReadableTable};

use crate::database::{read_json, AppState, TABLE_SESSIONS, TABLE_USERS};
use crate::error::AppError;
use crate::model::User;

/// The authenticated user's id, injected by [`auth_middleware`].
#[derive(Clone, Debug)]
pub struct AuthUser(pub String);

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("Missing or invalid authorization header"))?
        .to_string();

    // Scoped so the read transaction is released before the handler runs
    let user_id = {
        let read_txn = state.db.begin_read()?;
        let sessions = read_txn.open_table(TABLE_SESSIONS)?;
        let user_id = match sessions.get(token.as_str())? {
            Some(guard) => guard.value().to_string(),
            None => return Err(AppError::unauthorized("Invalid or expired session")),
        };

        // The session must still point at a live account
        let users = read_txn.open_table(TABLE_USERS)?;
        if read_json::<User, _>(&users, &user_id)?.is_none() {
            return Err(AppError::unauthorized("Invalid or expired session"));
        }
        user_id
    };

    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}
