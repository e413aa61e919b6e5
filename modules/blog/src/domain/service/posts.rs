use std::sync::Arc;

use chrono::Utc;
use query_core::{build_predicate, PaginatedResult, QueryOptions};
use query_db::{run_paginated_fetch, ListSpec};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{validate_required, MAX_TITLE_LENGTH};
use crate::config::BlogConfig;
use crate::contract::model::{NewPost, Post, PostPatch, PostView};
use crate::domain::authorize::{ensure_author, require_actor, Actor};
use crate::domain::enrich::load_post_lookups;
use crate::domain::error::DomainError;
use crate::infra::storage::entity::{category, post, user};
use crate::infra::storage::lists;

#[derive(Clone)]
pub struct PostService {
    db: DatabaseConnection,
    list: Arc<ListSpec<post::Entity>>,
    config: BlogConfig,
}

impl PostService {
    pub fn new(db: DatabaseConnection, config: BlogConfig) -> Self {
        Self {
            db,
            list: Arc::new(lists::posts()),
            config,
        }
    }

    #[instrument(name = "blog.service.posts.get_all", skip(self, opts))]
    pub async fn get_all(
        &self,
        opts: &QueryOptions,
    ) -> Result<PaginatedResult<PostView>, DomainError> {
        let page = self.config.page_request(opts)?;
        let compiled = build_predicate(&opts.filter_or_default(), &self.list.fields, &self.list.search);

        let result = run_paginated_fetch(
            &self.db,
            post::Entity::find(),
            &compiled.predicate,
            opts.sort.as_ref(),
            page,
            &self.list,
        )
        .await?
        .map_items(Post::from);

        let lookups = load_post_lookups(&self.db, &result.data).await?;
        debug!(
            rows = result.data.len(),
            filtered_total = result.filtered_total,
            "listed posts"
        );
        Ok(result.map_items(|p| lookups.view(p)))
    }

    #[instrument(name = "blog.service.posts.get_by_id", skip(self), fields(post_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<PostView, DomainError> {
        let post = self.find(id).await?;
        let lookups = load_post_lookups(&self.db, std::slice::from_ref(&post)).await?;
        Ok(lookups.view(post))
    }

    #[instrument(name = "blog.service.posts.create", skip(self, new), fields(title = %new.title))]
    pub async fn create(&self, actor: Option<Actor>, new: NewPost) -> Result<PostView, DomainError> {
        info!("Creating post");

        let actor = require_actor(actor)?;
        validate_required("title", &new.title, MAX_TITLE_LENGTH)?;
        validate_required("content", &new.content, usize::MAX)?;
        if user::Entity::find_by_id(actor.user_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(DomainError::forbidden("the acting user does not exist"));
        }
        if let Some(category_id) = new.category_id {
            self.ensure_category(category_id).await?;
        }

        let now = Utc::now();
        let model = post::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(new.title.trim().to_string()),
            content: Set(new.content),
            published: Set(new.published),
            views: Set(0),
            author_id: Set(actor.user_id),
            category_id: Set(new.category_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(post_id = %model.id, "Created post");
        self.get_by_id(model.id).await
    }

    #[instrument(name = "blog.service.posts.update", skip(self, patch), fields(post_id = %id))]
    pub async fn update(
        &self,
        actor: Option<Actor>,
        id: Uuid,
        patch: PostPatch,
    ) -> Result<PostView, DomainError> {
        info!("Updating post");

        let current = self.find(id).await?;
        ensure_author(actor, &current)?;

        if let Some(title) = &patch.title {
            validate_required("title", title, MAX_TITLE_LENGTH)?;
        }
        if let Some(content) = &patch.content {
            validate_required("content", content, usize::MAX)?;
        }
        if let Some(Some(category_id)) = patch.category_id {
            self.ensure_category(category_id).await?;
        }

        let mut model = post::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(title) = patch.title {
            model.title = Set(title.trim().to_string());
        }
        if let Some(content) = patch.content {
            model.content = Set(content);
        }
        if let Some(published) = patch.published {
            model.published = Set(published);
        }
        if let Some(category_id) = patch.category_id {
            model.category_id = Set(category_id);
        }
        model.update(&self.db).await?;

        self.get_by_id(id).await
    }

    #[instrument(name = "blog.service.posts.delete", skip(self), fields(post_id = %id))]
    pub async fn delete(&self, actor: Option<Actor>, id: Uuid) -> Result<(), DomainError> {
        info!("Deleting post");

        let current = self.find(id).await?;
        ensure_author(actor, &current)?;

        let res = post::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(DomainError::not_found("Post", id));
        }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Post, DomainError> {
        post::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Post::from)
            .ok_or_else(|| DomainError::not_found("Post", id))
    }

    async fn ensure_category(&self, id: Uuid) -> Result<(), DomainError> {
        match category::Entity::find_by_id(id).one(&self.db).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::validation(
                "categoryId",
                format!("category {id} does not exist"),
            )),
        }
    }
}
