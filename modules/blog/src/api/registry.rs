//! Entity-type token → list operation. A new listable entity is one `register` call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use query_core::{PaginatedResult, QueryOptions};
use serde::Serialize;
use serde_json::Value;

use crate::api::dto::{CategoryDto, PostDto, UserDto};
use crate::domain::error::DomainError;
use crate::domain::service::{CategoryService, PostService, UserService};

/// Produces one page of an entity's rows in wire form.
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    async fn fetch(&self, opts: &QueryOptions) -> Result<PaginatedResult<Value>, DomainError>;
}

fn to_wire<T: Serialize>(page: PaginatedResult<T>) -> Result<PaginatedResult<Value>, DomainError> {
    let data = page
        .data
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DomainError::internal(format!("failed to serialize rows: {e}")))?;
    Ok(PaginatedResult {
        data,
        total: page.total,
        filtered_total: page.filtered_total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages,
    })
}

#[async_trait]
impl EntityFetcher for UserService {
    async fn fetch(&self, opts: &QueryOptions) -> Result<PaginatedResult<Value>, DomainError> {
        to_wire(self.get_all(opts).await?.map_items(UserDto::from))
    }
}

#[async_trait]
impl EntityFetcher for PostService {
    async fn fetch(&self, opts: &QueryOptions) -> Result<PaginatedResult<Value>, DomainError> {
        to_wire(self.get_all(opts).await?.map_items(PostDto::from))
    }
}

#[async_trait]
impl EntityFetcher for CategoryService {
    async fn fetch(&self, opts: &QueryOptions) -> Result<PaginatedResult<Value>, DomainError> {
        to_wire(self.get_all(opts).await?.map_items(CategoryDto::from))
    }
}

#[derive(Clone, Default)]
pub struct EntityRegistry {
    fetchers: HashMap<String, Arc<dyn EntityFetcher>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, entity_type: impl Into<String>, fetcher: Arc<dyn EntityFetcher>) -> Self {
        self.fetchers.insert(entity_type.into(), fetcher);
        self
    }

    pub fn get(&self, entity_type: &str) -> Option<&Arc<dyn EntityFetcher>> {
        self.fetchers.get(entity_type)
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.fetchers.contains_key(entity_type)
    }

    /// Registered tokens, sorted.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.fetchers.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }
}
