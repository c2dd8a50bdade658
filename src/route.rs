//! Route definitions for the form builder API
//!
//! Maps all HTTP routes to their handlers. Management routes live under
//! `/api` behind the bearer-token middleware; registration, login and the
//! public submission endpoint stay open.

use axum::routing::{get, post, put};
use axum::{middleware, Router};

use crate::database::AppState;
use crate::handler::{
    change_password, create_project, delete_project, get_profile, get_project, list_projects,
    login, register, update_profile, update_project,
};
use crate::handler_form::{
    create_form, delete_form, get_form, list_forms, list_submissions, update_form,
};
use crate::handler_key::{create_api_key, delete_api_key, list_api_keys, update_api_key};
use crate::middleware::auth_middleware;
use crate::submit::submit_form;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `POST /submit/{endpoint}` - Public form submission (API-key gated)
/// - `POST /api/auth/register`, `POST /api/auth/login` - Account access
/// - `/api/projects`, `/api/forms`, `/api/projects/{id}/keys`, `/api/keys`,
///   `/api/users/me` - Owner-scoped management CRUD (bearer token required)
pub fn create_app(state: AppState) -> Router {
    // Management routes behind the session middleware; the auth routes are
    // added after the layer so they stay open
    let api_routes = Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/{id}/forms", get(list_forms))
        .route("/projects/{id}/keys", get(list_api_keys).post(create_api_key))
        .route("/forms", post(create_form))
        .route(
            "/forms/{id}",
            get(get_form).put(update_form).delete(delete_form),
        )
        .route("/forms/{id}/submissions", get(list_submissions))
        .route("/keys/{id}", put(update_api_key).delete(delete_api_key))
        .route("/users/me", get(get_profile).put(update_profile))
        .route("/users/me/password", put(change_password))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login));

    Router::new()
        // Public submission endpoint, guarded by the API key gate inside
        .route("/submit/{endpoint}", post(submit_form))
        // Mount management routes under /api
        .nest("/api", api_routes)
        // Inject the application state into all handlers
        .with_state(state)
}
