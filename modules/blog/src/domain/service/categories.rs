use std::sync::Arc;

use chrono::Utc;
use query_core::{build_predicate, PaginatedResult, QueryOptions};
use query_db::{run_paginated_fetch, ListSpec};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{validate_required, MAX_CATEGORY_NAME_LENGTH};
use crate::config::BlogConfig;
use crate::contract::model::{Category, CategoryPatch, NewCategory};
use crate::domain::error::DomainError;
use crate::infra::storage::entity::category;
use crate::infra::storage::lists;

#[derive(Clone)]
pub struct CategoryService {
    db: DatabaseConnection,
    list: Arc<ListSpec<category::Entity>>,
    config: BlogConfig,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection, config: BlogConfig) -> Self {
        Self {
            db,
            list: Arc::new(lists::categories()),
            config,
        }
    }

    #[instrument(name = "blog.service.categories.get_all", skip(self, opts))]
    pub async fn get_all(
        &self,
        opts: &QueryOptions,
    ) -> Result<PaginatedResult<Category>, DomainError> {
        let page = self.config.page_request(opts)?;
        let compiled = build_predicate(&opts.filter_or_default(), &self.list.fields, &self.list.search);

        let result = run_paginated_fetch(
            &self.db,
            category::Entity::find(),
            &compiled.predicate,
            opts.sort.as_ref(),
            page,
            &self.list,
        )
        .await?;

        debug!(rows = result.data.len(), "listed categories");
        Ok(result.map_items(Category::from))
    }

    #[instrument(name = "blog.service.categories.get_by_id", skip(self), fields(category_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Category, DomainError> {
        category::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Category::from)
            .ok_or_else(|| DomainError::not_found("Category", id))
    }

    #[instrument(name = "blog.service.categories.create", skip(self), fields(name = %new.name))]
    pub async fn create(&self, new: NewCategory) -> Result<Category, DomainError> {
        info!("Creating category");

        let name = new.name.trim().to_string();
        validate_required("name", &name, MAX_CATEGORY_NAME_LENGTH)?;
        if self.name_exists(&name).await? {
            return Err(DomainError::category_name_exists(name));
        }

        let now = Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(new.description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(model.into())
    }

    #[instrument(name = "blog.service.categories.update", skip(self, patch), fields(category_id = %id))]
    pub async fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Category, DomainError> {
        info!("Updating category");

        let current = self.get_by_id(id).await?;
        let mut model = category::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            validate_required("name", &name, MAX_CATEGORY_NAME_LENGTH)?;
            if name != current.name && self.name_exists(&name).await? {
                return Err(DomainError::category_name_exists(name));
            }
            model.name = Set(name);
        }
        if let Some(description) = patch.description {
            model.description = Set(description);
        }

        Ok(model.update(&self.db).await?.into())
    }

    /// Posts in the category keep existing without one.
    #[instrument(name = "blog.service.categories.delete", skip(self), fields(category_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        info!("Deleting category");
        let res = category::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(DomainError::not_found("Category", id));
        }
        Ok(())
    }

    async fn name_exists(&self, name: &str) -> Result<bool, DomainError> {
        let n = category::Entity::find()
            .filter(category::Column::Name.eq(name))
            .count(&self.db)
            .await?;
        Ok(n > 0)
    }
}
