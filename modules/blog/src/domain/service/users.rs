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

use super::{validate_email, validate_required, MAX_DISPLAY_NAME_LENGTH};
use crate::config::BlogConfig;
use crate::contract::model::{NewUser, User, UserPatch};
use crate::domain::error::DomainError;
use crate::infra::storage::entity::user;
use crate::infra::storage::lists;

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
    list: Arc<ListSpec<user::Entity>>,
    config: BlogConfig,
}

impl UserService {
    pub fn new(db: DatabaseConnection, config: BlogConfig) -> Self {
        Self {
            db,
            list: Arc::new(lists::users()),
            config,
        }
    }

    #[instrument(name = "blog.service.users.get_all", skip(self, opts))]
    pub async fn get_all(&self, opts: &QueryOptions) -> Result<PaginatedResult<User>, DomainError> {
        let page = self.config.page_request(opts)?;
        let compiled = build_predicate(&opts.filter_or_default(), &self.list.fields, &self.list.search);

        let result = run_paginated_fetch(
            &self.db,
            user::Entity::find(),
            &compiled.predicate,
            opts.sort.as_ref(),
            page,
            &self.list,
        )
        .await?;

        debug!(
            rows = result.data.len(),
            filtered_total = result.filtered_total,
            "listed users"
        );
        Ok(result.map_items(User::from))
    }

    #[instrument(name = "blog.service.users.get_by_id", skip(self), fields(user_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<User, DomainError> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(User::from)
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    #[instrument(name = "blog.service.users.create", skip(self, new_user))]
    pub async fn create(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        validate_email(&new_user.email)?;
        validate_required("displayName", &new_user.display_name, MAX_DISPLAY_NAME_LENGTH)?;
        if self.email_exists(&new_user.email).await? {
            return Err(DomainError::email_already_exists(new_user.email));
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(new_user.email),
            display_name: Set(new_user.display_name.trim().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(user_id = %model.id, "Created user");
        Ok(model.into())
    }

    #[instrument(name = "blog.service.users.update", skip(self, patch), fields(user_id = %id))]
    pub async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, DomainError> {
        info!("Updating user");

        if let Some(email) = &patch.email {
            validate_email(email)?;
        }
        if let Some(name) = &patch.display_name {
            validate_required("displayName", name, MAX_DISPLAY_NAME_LENGTH)?;
        }

        let current = self.get_by_id(id).await?;
        if let Some(email) = &patch.email {
            if email != &current.email && self.email_exists(email).await? {
                return Err(DomainError::email_already_exists(email.clone()));
            }
        }

        let mut model = user::ActiveModel {
            id: Set(id),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(email) = patch.email {
            model.email = Set(email);
        }
        if let Some(name) = patch.display_name {
            model.display_name = Set(name.trim().to_string());
        }

        Ok(model.update(&self.db).await?.into())
    }

    /// Removes the user's posts as well.
    #[instrument(name = "blog.service.users.delete", skip(self), fields(user_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        info!("Deleting user");
        let res = user::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(DomainError::not_found("User", id));
        }
        Ok(())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        let n = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await?;
        Ok(n > 0)
    }
}
