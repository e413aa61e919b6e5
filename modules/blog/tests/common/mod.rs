#![allow(dead_code)]

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use blog::infra::storage::entity::{category, post, user};
use blog::{Blog, BlogConfig, Migrator};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub db: DatabaseConnection,
    pub blog: Blog,
    pub router: Router,
}

pub async fn setup() -> Result<TestApp> {
    setup_with(BlogConfig::default()).await
}

pub async fn setup_with(config: BlogConfig) -> Result<TestApp> {
    // one connection: each pooled connection would get its own in-memory database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await?;
    Migrator::up(&db, None).await?;

    let blog = Blog::new(db.clone(), config);
    let router = blog.router();
    Ok(TestApp { db, blog, router })
}

impl TestApp {
    pub async fn call(&self, req: Request<Body>) -> Result<(StatusCode, Value)> {
        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    pub async fn fetch(&self, body: Value) -> Result<(StatusCode, Value)> {
        self.call(json_request("POST", "/api/v1/entities/fetch", Some(body), None))
            .await
    }
}

pub fn json_request(method: &str, uri: &str, body: Option<Value>, actor: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(actor) = actor {
        builder = builder.header("x-user-id", actor.to_string());
    }
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

pub async fn insert_user(db: &DatabaseConnection, email: &str, name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    user::ActiveModel {
        id: Set(id),
        email: Set(email.to_string()),
        display_name: Set(name.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

pub async fn insert_category(db: &DatabaseConnection, name: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    category::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        description: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(id)
}

pub async fn insert_post(
    db: &DatabaseConnection,
    author_id: Uuid,
    category_id: Option<Uuid>,
    title: &str,
    created_at: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    post::ActiveModel {
        id: Set(id),
        title: Set(title.to_string()),
        content: Set(format!("Body of {title}")),
        published: Set(true),
        views: Set(0),
        author_id: Set(author_id),
        category_id: Set(category_id),
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
    .insert(db)
    .await?;
    Ok(id)
}

pub fn titles(body: &Value, entity: &str) -> Vec<String> {
    body["data"][entity]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|r| r["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
