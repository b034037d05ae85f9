//! Admin API.
//!
//! Bearer-token protected routes for inspecting and driving the scheduler.
//! Used by `relay-cli`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::scheduler::ProcessingLoop;

#[derive(Clone)]
pub struct AdminState {
    pub processing: ProcessingLoop,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/conversations", get(get_conversations))
        .route("/admin/loop/start", post(start_loop))
        .route("/admin/loop/stop", post(stop_loop))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
