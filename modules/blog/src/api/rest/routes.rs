use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};

use crate::api::fetch::FetchHandler;
use crate::api::rest::handlers;
use crate::api::ws;
use crate::config::BlogConfig;
use crate::domain::service::{CategoryService, PostService, UserService};

/// Everything a router needs from the module.
#[derive(Clone)]
pub struct ApiState {
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub categories: Arc<CategoryService>,
    pub fetch: Arc<FetchHandler>,
    pub config: BlogConfig,
}

/// Mount the blog API under `/api/v1` onto `router`.
pub fn register_routes(router: Router, state: ApiState) -> Router {
    let api = Router::new()
        .route("/entities/fetch", post(handlers::fetch_entities))
        .route("/list-config", get(handlers::list_config))
        .route("/ws", get(ws::ws_upgrade))
        .route("/users", post(handlers::create_user))
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/posts", post(handlers::create_post))
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/categories", post(handlers::create_category))
        .route(
            "/categories/{id}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .layer(Extension(state.users))
        .layer(Extension(state.posts))
        .layer(Extension(state.categories))
        .layer(Extension(state.fetch))
        .layer(Extension(state.config));

    router.nest("/api/v1", api)
}
