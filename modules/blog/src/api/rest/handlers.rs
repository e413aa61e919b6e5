use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::dto::{
    CategoryDto, CreateCategoryReq, CreatePostReq, CreateUserReq, PostDto, UpdateCategoryReq,
    UpdatePostReq, UpdateUserReq, UserDto,
};
use crate::api::fetch::{FetchEntitiesResponse, FetchHandler};
use crate::api::rest::error::ApiError;
use crate::api::rest::extract::{ActingUser, JsonBody};
use crate::config::BlogConfig;
use crate::domain::service::{CategoryService, PostService, UserService};

type ApiResult<T> = Result<T, ApiError>;

/// `POST /entities/fetch`
pub async fn fetch_entities(
    Extension(handler): Extension<Arc<FetchHandler>>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<FetchEntitiesResponse>> {
    Ok(Json(handler.handle(body).await?))
}

/// Client-side list settings, so list views page and debounce like the server expects.
pub async fn list_config(Extension(config): Extension<BlogConfig>) -> Json<Value> {
    Json(serde_json::json!({
        "defaultPageSize": config.default_page_size,
        "maxPageSize": config.max_limit(),
        "searchDebounceMs": config.search_debounce_ms,
    }))
}

/* ---------- users ---------- */

pub async fn get_user(
    Extension(svc): Extension<Arc<UserService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserDto>> {
    info!("Getting user with id: {}", id);
    let user = svc.get_by_id(id).await.inspect_err(|e| error!("Failed to get user {}: {}", id, e))?;
    Ok(Json(user.into()))
}

pub async fn create_user(
    Extension(svc): Extension<Arc<UserService>>,
    JsonBody(req): JsonBody<CreateUserReq>,
) -> ApiResult<(StatusCode, Json<UserDto>)> {
    let user = svc
        .create(req.into())
        .await
        .inspect_err(|e| error!(code = %e.code(), "Failed to create user"))?;
    info!("Created user: {}", user.id);
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn update_user(
    Extension(svc): Extension<Arc<UserService>>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateUserReq>,
) -> ApiResult<Json<UserDto>> {
    info!("Updating user: {}", id);
    let user = svc
        .update(id, req.into())
        .await
        .inspect_err(|e| error!(code = %e.code(), "Failed to update user {}", id))?;
    Ok(Json(user.into()))
}

pub async fn delete_user(
    Extension(svc): Extension<Arc<UserService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    info!("Deleting user: {}", id);
    svc.delete(id)
        .await
        .inspect_err(|e| error!("Failed to delete user {}: {}", id, e))?;
    Ok(StatusCode::NO_CONTENT)
}

/* ---------- posts ---------- */

pub async fn get_post(
    Extension(svc): Extension<Arc<PostService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PostDto>> {
    info!("Getting post with id: {}", id);
    let post = svc.get_by_id(id).await.inspect_err(|e| error!("Failed to get post {}: {}", id, e))?;
    Ok(Json(post.into()))
}

pub async fn create_post(
    Extension(svc): Extension<Arc<PostService>>,
    ActingUser(actor): ActingUser,
    JsonBody(req): JsonBody<CreatePostReq>,
) -> ApiResult<(StatusCode, Json<PostDto>)> {
    info!("Creating post: {:?}", req.title);
    let post = svc
        .create(actor, req.into())
        .await
        .inspect_err(|e| error!("Failed to create post: {}", e))?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

pub async fn update_post(
    Extension(svc): Extension<Arc<PostService>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdatePostReq>,
) -> ApiResult<Json<PostDto>> {
    info!("Updating post {}", id);
    let post = svc
        .update(actor, id, req.into())
        .await
        .inspect_err(|e| error!("Failed to update post {}: {}", id, e))?;
    Ok(Json(post.into()))
}

pub async fn delete_post(
    Extension(svc): Extension<Arc<PostService>>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    info!("Deleting post: {}", id);
    svc.delete(actor, id)
        .await
        .inspect_err(|e| error!("Failed to delete post {}: {}", id, e))?;
    Ok(StatusCode::NO_CONTENT)
}

/* ---------- categories ---------- */

pub async fn get_category(
    Extension(svc): Extension<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CategoryDto>> {
    info!("Getting category with id: {}", id);
    let category = svc
        .get_by_id(id)
        .await
        .inspect_err(|e| error!("Failed to get category {}: {}", id, e))?;
    Ok(Json(category.into()))
}

pub async fn create_category(
    Extension(svc): Extension<Arc<CategoryService>>,
    JsonBody(req): JsonBody<CreateCategoryReq>,
) -> ApiResult<(StatusCode, Json<CategoryDto>)> {
    info!("Creating category: {:?}", req);
    let category = svc
        .create(req.into())
        .await
        .inspect_err(|e| error!("Failed to create category: {}", e))?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

pub async fn update_category(
    Extension(svc): Extension<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateCategoryReq>,
) -> ApiResult<Json<CategoryDto>> {
    info!("Updating category {} with: {:?}", id, req);
    let category = svc
        .update(id, req.into())
        .await
        .inspect_err(|e| error!("Failed to update category {}: {}", id, e))?;
    Ok(Json(category.into()))
}

pub async fn delete_category(
    Extension(svc): Extension<Arc<CategoryService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    info!("Deleting category: {}", id);
    svc.delete(id)
        .await
        .inspect_err(|e| error!("Failed to delete category {}: {}", id, e))?;
    Ok(StatusCode::NO_CONTENT)
}
