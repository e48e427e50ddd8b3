//! Request pipeline assembly.
//!
//! Static files are served first and never touch the session. Everything
//! else falls through to the dynamic application:
//!
//! ```text
//! session -> error pages -> upload -> CSRF -> flash -> hydration -> routes
//! ```

use axum::{
    Router,
    extract::{OriginalUri, Request},
    middleware::{from_fn, from_fn_with_state, map_request},
};
use tower::{Layer, ServiceBuilder};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::middleware::{
    attach_flash, create_session_layer, csrf_guard, handle_upload, hydrate_user,
    render_error_pages, request_span, stamp_request_id,
};
use crate::routes;
use crate::state::AppState;

/// Wrap `routes` in the full request pipeline.
///
/// The session store is a parameter so tests can run against an in-memory store.
pub fn with_pipeline<S>(routes: Router<AppState>, state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config().clone();

    // Layers run outermost-last: the session layer sees the request first.
    let dynamic = routes
        .layer(from_fn_with_state(state.clone(), hydrate_user))
        .layer(from_fn(attach_flash))
        .layer(from_fn(csrf_guard))
        .layer(from_fn_with_state(state.clone(), handle_upload))
        .layer(from_fn(render_error_pages))
        .layer(create_session_layer(store, &config))
        .with_state(state);

    let images = ServeDir::new(&config.image_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(map_request(restore_original_uri).layer(dynamic.clone()));
    let public = ServeDir::new(&config.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(dynamic);

    Router::new()
        .nest_service("/images", images)
        .fallback_service(public)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(from_fn(stamp_request_id))
                .layer(RequestBodyLimitLayer::new(config.max_upload_bytes)),
        )
}

/// Undo the prefix stripping of `nest_service` so a miss under `/images`
/// reaches the dynamic routes with its full path.
async fn restore_original_uri(mut request: Request) -> Request {
    if let Some(OriginalUri(uri)) = request.extensions().get::<OriginalUri>().cloned() {
        *request.uri_mut() = uri;
    }
    request
}

/// Build the shop router with all application routes.
pub fn build_router<S>(state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    with_pipeline(routes::routes(), state, store)
}
