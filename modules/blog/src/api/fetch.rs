//! Transport-independent "fetch entities" boundary.
//!
//! A request is validated completely (entity type, window, filter shape) before
//! any service runs. Per-column compilation problems are not boundary errors:
//! the predicate builder drops them and logs.

use std::sync::Arc;

use query_core::{
    ErrorBody, FilterOptions, FilterValue, PageRequest, Pagination, QueryError, QueryOptions,
    SortOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, Span};

use crate::api::registry::EntityRegistry;
use crate::config::BlogConfig;

const GLOBAL_SEARCH: &str = "globalSearch";

/// `{ entityType, filterOptions?, sort?, page?, limit? }`. The `QueryOptions`
/// spelling (`pagination`, `filter`) is accepted too; the flat fields win.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFetchRequest {
    entity_type: Option<Value>,
    filter_options: Option<Value>,
    filter: Option<Value>,
    sort: Option<Value>,
    page: Option<Value>,
    limit: Option<Value>,
    pagination: Option<RawPagination>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPagination {
    page: Option<Value>,
    limit: Option<Value>,
}

/// A request that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchEntitiesRequest {
    pub entity_type: String,
    pub options: QueryOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchEntitiesResponse {
    /// A single key, the requested entity type, holding the rows.
    pub data: Map<String, Value>,
    pub total: u64,
    pub filtered_total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

// 2^63; `i64::MAX as f64` rounds up to it, so the upper bound is exclusive
const I64_RANGE_END: f64 = 9_223_372_036_854_775_808.0;

fn integer(name: &str, v: Option<Value>) -> Result<Option<i64>, QueryError> {
    let not_integer = || QueryError::InvalidRequest(format!("{name} must be an integer"));
    let Some(Value::Number(n)) = v else {
        return match v {
            None | Some(Value::Null) => Ok(None),
            Some(_) => Err(not_integer()),
        };
    };
    if let Some(i) = n.as_i64() {
        return Ok(Some(i));
    }
    if n.is_u64() {
        return Err(QueryError::InvalidRequest(format!("{name} is out of range")));
    }
    match n.as_f64() {
        Some(f) if f.fract() != 0.0 || !f.is_finite() => Err(not_integer()),
        Some(f) if f >= -I64_RANGE_END && f < I64_RANGE_END => Ok(Some(f as i64)),
        Some(_) => Err(QueryError::InvalidRequest(format!("{name} is out of range"))),
        None => Err(not_integer()),
    }
}

fn has_nested_object(v: &Value) -> bool {
    match v {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(|i| matches!(i, Value::Object(_) | Value::Array(_))),
        _ => false,
    }
}

/// Shape-check a raw `filterOptions` object.
pub fn parse_filter_options(raw: Value, max_search_len: usize) -> Result<FilterOptions, QueryError> {
    let Value::Object(entries) = raw else {
        return Err(QueryError::InvalidFilter(
            "filterOptions must be an object".into(),
        ));
    };

    let mut out = FilterOptions::new();
    for (key, value) in entries {
        if key == GLOBAL_SEARCH {
            match value {
                Value::Null => {}
                Value::String(s) if s.chars().count() > max_search_len => {
                    return Err(QueryError::InvalidFilterValue {
                        column: GLOBAL_SEARCH.into(),
                        reason: format!("longer than {max_search_len} characters"),
                    });
                }
                Value::String(s) => out.global_search = Some(s),
                _ => {
                    return Err(QueryError::InvalidFilter(
                        "globalSearch must be a string".into(),
                    ))
                }
            }
            continue;
        }

        if value.is_null() {
            continue;
        }
        if !value.is_object() {
            return Err(QueryError::InvalidFilter(format!(
                "filter for '{key}' must be an object with an operator"
            )));
        }
        let filter: FilterValue = serde_json::from_value(value)
            .map_err(|e| QueryError::InvalidFilter(format!("filter for '{key}': {e}")))?;
        if has_nested_object(&filter.value)
            || filter.value2.as_ref().is_some_and(has_nested_object)
        {
            return Err(QueryError::InvalidFilterValue {
                column: key,
                reason: "values must be scalars or arrays of scalars".into(),
            });
        }
        out.columns.insert(key, filter);
    }
    Ok(out)
}

impl FetchEntitiesRequest {
    /// Validate a raw payload against the registry and the configured window limits.
    pub fn parse(raw: Value, registry: &EntityRegistry, config: &BlogConfig) -> Result<Self, QueryError> {
        if !raw.is_object() {
            return Err(QueryError::InvalidRequest(
                "request must be a JSON object".into(),
            ));
        }
        let req: RawFetchRequest = serde_json::from_value(raw)
            .map_err(|e| QueryError::InvalidRequest(e.to_string()))?;

        let entity_type = match req.entity_type {
            Some(Value::String(t)) if registry.contains(&t) => t,
            Some(Value::String(t)) => return Err(QueryError::InvalidEntityType(t)),
            Some(other) => return Err(QueryError::InvalidEntityType(other.to_string())),
            None => return Err(QueryError::InvalidEntityType(String::new())),
        };

        let nested = req.pagination.unwrap_or_default();
        let page = match integer("page", req.page)? {
            Some(p) => Some(p),
            None => integer("pagination.page", nested.page)?,
        };
        let limit = match integer("limit", req.limit)? {
            Some(l) => Some(l),
            None => integer("pagination.limit", nested.limit)?,
        };
        let page = page.unwrap_or(0);
        let limit = limit.unwrap_or(i64::from(config.default_page_size));
        PageRequest::with_max(page, limit, config.max_limit())?;

        let filter = match req.filter_options.or(req.filter) {
            None | Some(Value::Null) => None,
            Some(raw) => Some(parse_filter_options(raw, config.max_search_length)?),
        };

        let sort = match req.sort {
            None | Some(Value::Null) => None,
            Some(raw) => Some(serde_json::from_value::<SortOptions>(raw).map_err(|_| {
                QueryError::InvalidRequest("sort must map field paths to 'asc' or 'desc'".into())
            })?),
        };

        Ok(Self {
            entity_type,
            options: QueryOptions {
                pagination: Some(Pagination { page, limit }),
                sort,
                filter,
            },
        })
    }
}

/// The one operation every transport calls: one request in, one response out.
#[derive(Clone)]
pub struct FetchHandler {
    registry: Arc<EntityRegistry>,
    config: BlogConfig,
}

impl FetchHandler {
    pub fn new(registry: EntityRegistry, config: BlogConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    #[instrument(name = "blog.fetch_entities", skip_all, fields(entity_type = tracing::field::Empty))]
    pub async fn handle(&self, raw: Value) -> Result<FetchEntitiesResponse, ErrorBody> {
        let req = FetchEntitiesRequest::parse(raw, &self.registry, &self.config).map_err(|e| {
            info!(code = %e.code(), error = %e, "rejected fetch request");
            e.into_body()
        })?;
        Span::current().record("entity_type", req.entity_type.as_str());

        let Some(fetcher) = self.registry.get(&req.entity_type) else {
            return Err(QueryError::InvalidEntityType(req.entity_type).into_body());
        };

        let page = fetcher
            .fetch(&req.options)
            .await
            .map_err(|e| e.to_body())?;

        debug!(
            rows = page.data.len(),
            total = page.total,
            filtered_total = page.filtered_total,
            "fetched entities"
        );

        let mut data = Map::new();
        data.insert(req.entity_type, Value::Array(page.data));
        Ok(FetchEntitiesResponse {
            data,
            total: page.total,
            filtered_total: page.filtered_total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::api::registry::EntityFetcher;
    use async_trait::async_trait;
    use query_core::{ErrorCode, FilterOperator, PaginatedResult};
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl EntityFetcher for Echo {
        async fn fetch(&self, opts: &QueryOptions) -> Result<PaginatedResult<Value>, DomainError> {
            let page = PageRequest::new(0, 10)?;
            Ok(PaginatedResult::new(
                vec![serde_json::to_value(opts).unwrap_or_default()],
                1,
                1,
                page,
            ))
        }
    }

    fn registry() -> EntityRegistry {
        EntityRegistry::new().register("posts", Arc::new(Echo))
    }

    fn parse(raw: Value) -> Result<FetchEntitiesRequest, QueryError> {
        FetchEntitiesRequest::parse(raw, &registry(), &BlogConfig::default())
    }

    #[test]
    fn defaults_apply() {
        let req = parse(json!({ "entityType": "posts" })).unwrap();
        assert_eq!(req.options.pagination, Some(Pagination { page: 0, limit: 10 }));
        assert!(req.options.filter.is_none());
        assert!(req.options.sort.is_none());
    }

    #[test]
    fn unknown_entity_type() {
        for raw in [
            json!({ "entityType": "comments" }),
            json!({ "entityType": 5 }),
            json!({}),
        ] {
            assert_eq!(parse(raw).unwrap_err().code(), ErrorCode::InvalidEntityType);
        }
    }

    #[test]
    fn pagination_bounds_are_rejected() {
        for raw in [
            json!({ "entityType": "posts", "limit": 0 }),
            json!({ "entityType": "posts", "limit": 101 }),
            json!({ "entityType": "posts", "page": -1 }),
            json!({ "entityType": "posts", "pagination": { "page": 0, "limit": 500 } }),
        ] {
            assert_eq!(parse(raw).unwrap_err().code(), ErrorCode::InvalidPagination);
        }
        assert_eq!(
            parse(json!({ "entityType": "posts", "page": "2" })).unwrap_err().code(),
            ErrorCode::InvalidRequest
        );
    }

    #[test]
    fn offsets_beyond_the_database_range_are_rejected() {
        let huge_page = json!({ "entityType": "posts", "page": 1_000_000_000_000_000_000_i64, "limit": 10 });
        assert_eq!(parse(huge_page).unwrap_err().code(), ErrorCode::InvalidPagination);

        for raw in [
            json!({ "entityType": "posts", "page": 1e300 }),
            json!({ "entityType": "posts", "page": u64::MAX }),
            json!({ "entityType": "posts", "limit": -1e19 }),
        ] {
            assert_eq!(parse(raw).unwrap_err().code(), ErrorCode::InvalidRequest);
        }

        let req = parse(json!({ "entityType": "posts", "page": 3.0, "limit": 20.0 })).unwrap();
        assert_eq!(req.options.pagination, Some(Pagination { page: 3, limit: 20 }));
        assert_eq!(
            parse(json!({ "entityType": "posts", "page": 1.5 })).unwrap_err().code(),
            ErrorCode::InvalidRequest
        );
    }

    #[tokio::test]
    async fn oversized_page_gets_an_error_reply() {
        let handler = FetchHandler::new(registry(), BlogConfig::default());
        let body = handler
            .handle(json!({ "entityType": "posts", "page": i64::MAX / 5, "limit": 10 }))
            .await
            .unwrap_err();
        assert_eq!(body.code, ErrorCode::InvalidPagination);
    }

    #[test]
    fn flat_fields_win_over_query_options_spelling() {
        let req = parse(json!({
            "entityType": "posts",
            "page": 2,
            "pagination": { "page": 5, "limit": 20 },
            "filterOptions": { "title": { "operator": "contains", "value": "cat" } },
            "filter": { "title": { "operator": "equals", "value": "dog" } },
            "sort": { "title": "asc" }
        }))
        .unwrap();
        assert_eq!(req.options.pagination, Some(Pagination { page: 2, limit: 20 }));
        let filter = req.options.filter.unwrap();
        assert_eq!(
            filter.columns["title"],
            FilterValue::new(FilterOperator::Contains, "cat")
        );
        assert_eq!(req.options.sort.unwrap().keys()[0].field, "title");
    }

    #[test]
    fn malformed_filters() {
        let bad_shape = json!({ "entityType": "posts", "filterOptions": ["title"] });
        assert_eq!(parse(bad_shape).unwrap_err().code(), ErrorCode::InvalidFilter);

        let no_operator = json!({ "entityType": "posts", "filterOptions": { "title": { "value": "x" } } });
        assert_eq!(parse(no_operator).unwrap_err().code(), ErrorCode::InvalidFilter);

        let bare = json!({ "entityType": "posts", "filterOptions": { "title": "cat" } });
        assert_eq!(parse(bare).unwrap_err().code(), ErrorCode::InvalidFilter);

        let nested = json!({
            "entityType": "posts",
            "filterOptions": { "title": { "operator": "equals", "value": { "$ne": 1 } } }
        });
        let err = parse(nested).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidFilterValue);

        let long = json!({
            "entityType": "posts",
            "filterOptions": { "globalSearch": "x".repeat(201) }
        });
        assert_eq!(parse(long).unwrap_err().code(), ErrorCode::InvalidFilterValue);
    }

    #[test]
    fn unknown_operators_pass_the_boundary() {
        let req = parse(json!({
            "entityType": "posts",
            "filterOptions": { "title": { "operator": "regex", "value": ".*" }, "globalSearch": null }
        }))
        .unwrap();
        let filter = req.options.filter.unwrap();
        assert_eq!(filter.columns["title"].operator, "regex");
        assert_eq!(filter.global_search, None);
    }

    #[test]
    fn bad_sort_direction() {
        let raw = json!({ "entityType": "posts", "sort": { "title": "up" } });
        assert_eq!(parse(raw).unwrap_err().code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn response_is_keyed_by_entity_type() {
        let handler = FetchHandler::new(registry(), BlogConfig::default());
        let res = handler
            .handle(json!({ "entityType": "posts", "limit": 5 }))
            .await
            .unwrap();
        let v = serde_json::to_value(&res).unwrap();
        assert_eq!(v["data"]["posts"][0]["pagination"]["limit"], 5);
        assert_eq!(v["filteredTotal"], 1);
        assert_eq!(v["totalPages"], 1);

        let err = handler.handle(json!("posts")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }
}
