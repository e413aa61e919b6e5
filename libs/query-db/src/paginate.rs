//! Paginated fetch executor: one windowed select plus two counts, joined.

use query_core::{
    build_predicate, ErrorCode, PageRequest, PaginatedResult, Predicate, QueryError,
    QueryOptions, SearchConfig, SortDir, SortOptions,
};
use sea_orm::sea_query::Order;
use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::field_map::{joins_for, Field, FieldMap, Join};
use crate::lower::{lower_filter, CaseFold};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

impl FetchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            FetchError::Query(e) => e.code(),
            FetchError::Db(_) => ErrorCode::DatabaseError,
        }
    }
}

/// How one entity is listed: its filter/sort allow-list, the fields behind the
/// global search, and the ordering used when a request does not ask for one.
#[derive(Clone)]
pub struct ListSpec<E: EntityTrait> {
    pub fields: FieldMap<E>,
    pub search: SearchConfig,
    pub default_sort: SortOptions,
    /// Unique field appended to every ordering so offset pages never overlap.
    pub tiebreaker: String,
}

impl<E: EntityTrait> ListSpec<E> {
    pub fn new(fields: FieldMap<E>) -> Self {
        Self {
            fields,
            search: SearchConfig::none(),
            default_sort: SortOptions::new().then("createdAt", SortDir::Desc),
            tiebreaker: "id".to_string(),
        }
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_default_sort(mut self, sort: SortOptions) -> Self {
        self.default_sort = sort;
        self
    }

    pub fn with_tiebreaker(mut self, path: impl Into<String>) -> Self {
        self.tiebreaker = path.into();
        self
    }
}

fn order(dir: SortDir) -> Order {
    match dir {
        SortDir::Asc => Order::Asc,
        SortDir::Desc => Order::Desc,
    }
}

/// Resolve sort keys through the allow-list. Unknown paths are dropped; when none
/// survive the entity default applies. The tiebreaker always closes the ordering.
pub fn resolve_sort<'a, E: EntityTrait>(
    requested: Option<&SortOptions>,
    list: &'a ListSpec<E>,
) -> Vec<(&'a Field, SortDir)> {
    let pick = |sort: &SortOptions| -> Vec<(&'a Field, SortDir)> {
        sort.keys()
            .iter()
            .filter_map(|k| match list.fields.get(&k.field) {
                Some(f) => Some((f, k.dir)),
                None => {
                    warn!(field = %k.field, "dropping sort on unknown field");
                    None
                }
            })
            .collect()
    };

    let mut out = requested.map(pick).unwrap_or_default();
    if out.is_empty() {
        out = pick(&list.default_sort);
    }

    if let Some(tb) = list.fields.get(&list.tiebreaker) {
        if !out.iter().any(|(f, _)| f.path == tb.path) {
            out.push((tb, SortDir::Asc));
        }
    }
    out
}

fn with_joins<E: EntityTrait>(mut select: Select<E>, joins: &[Join]) -> Select<E> {
    for j in joins {
        select = select.join(JoinType::LeftJoin, (j.relation)());
    }
    select
}

/// Run a compiled predicate against `base`: rows for the requested window, the
/// baseline count of `base` and the filtered count, issued concurrently.
pub async fn run_paginated_fetch<C, E>(
    conn: &C,
    base: Select<E>,
    predicate: &Predicate,
    sort: Option<&SortOptions>,
    page: PageRequest,
    list: &ListSpec<E>,
) -> Result<PaginatedResult<E::Model>, FetchError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    let fold = CaseFold::for_backend(conn.get_database_backend());
    let lowered = lower_filter(predicate, &list.fields, fold);
    let keys = resolve_sort(sort, list);

    let mut sort_joins = joins_for(&list.fields, keys.iter().map(|(f, _)| f.path.as_str()));
    sort_joins.retain(|j| !lowered.joins.iter().any(|have| have.name == j.name));

    let filtered = with_joins(base.clone(), &lowered.joins).filter(lowered.condition);

    let mut rows = with_joins(filtered.clone(), &sort_joins);
    for (f, dir) in &keys {
        rows = rows.order_by(f.expr(), order(*dir));
    }
    let rows = rows.offset(page.skip()).limit(page.limit());

    debug!(
        skip = page.skip(),
        limit = page.limit(),
        joins = lowered.joins.len() + sort_joins.len(),
        "running paginated fetch"
    );

    let (data, total, filtered_total) =
        tokio::try_join!(rows.all(conn), base.count(conn), filtered.count(conn))?;

    Ok(PaginatedResult::new(data, total, filtered_total, page))
}

/// Validate paging, compile the filter and run the fetch.
pub async fn paginate<C, E>(
    conn: &C,
    base: Select<E>,
    opts: &QueryOptions,
    list: &ListSpec<E>,
) -> Result<PaginatedResult<E::Model>, FetchError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    let page = opts.page_request()?;
    let compiled = build_predicate(&opts.filter_or_default(), &list.fields, &list.search);
    run_paginated_fetch(conn, base, &compiled.predicate, opts.sort.as_ref(), page, list).await
}
