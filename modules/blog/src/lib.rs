//! Blog module: users, posts and categories behind one generic list/fetch
//! pipeline, served over REST and WebSocket.

pub mod api;
pub mod config;
pub mod contract;
pub mod domain;
pub mod infra;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;

pub use api::fetch::{FetchEntitiesRequest, FetchEntitiesResponse, FetchHandler};
pub use api::registry::{EntityFetcher, EntityRegistry};
pub use config::BlogConfig;
pub use domain::error::DomainError;
pub use infra::storage::migrations::Migrator;
pub use infra::storage::seed::seed_demo_data;

use api::rest::routes::{register_routes, ApiState};
use domain::service::{CategoryService, PostService, UserService};

/// Wired services of the module.
#[derive(Clone)]
pub struct Blog {
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub categories: Arc<CategoryService>,
    pub fetch: Arc<FetchHandler>,
    pub config: BlogConfig,
}

impl Blog {
    pub fn new(db: DatabaseConnection, config: BlogConfig) -> Self {
        let users = Arc::new(UserService::new(db.clone(), config.clone()));
        let posts = Arc::new(PostService::new(db.clone(), config.clone()));
        let categories = Arc::new(CategoryService::new(db, config.clone()));

        let registry = EntityRegistry::new()
            .register("users", users.clone() as Arc<dyn EntityFetcher>)
            .register("posts", posts.clone() as Arc<dyn EntityFetcher>)
            .register("categories", categories.clone() as Arc<dyn EntityFetcher>);

        Self {
            users,
            posts,
            categories,
            fetch: Arc::new(FetchHandler::new(registry, config.clone())),
            config,
        }
    }

    pub fn router(&self) -> Router {
        register_routes(
            Router::new(),
            ApiState {
                users: self.users.clone(),
                posts: self.posts.clone(),
                categories: self.categories.clone(),
                fetch: self.fetch.clone(),
                config: self.config.clone(),
            },
        )
    }
}
