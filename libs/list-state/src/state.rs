//! View-local paging/sorting/filter state and its `QueryOptions` projection.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use query_core::{
    FilterOptions, FilterValue, PageRequest, PaginatedResult, Pagination, QueryError,
    QueryOptions, SortDir, SortOptions, DEFAULT_LIMIT,
};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ColumnFilterConfig;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ListStateError {
    #[error("column '{0}' has no filter configuration")]
    UnknownColumn(String),

    #[error("operator '{operator}' is not offered for column '{column}'")]
    UnsupportedOperator { column: String, operator: String },

    #[error(transparent)]
    Pagination(#[from] QueryError),
}

/// Sort entry as the table reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSort {
    pub column_id: String,
    pub descending: bool,
}

/// Outcome of a filter edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterChange {
    Applied,
    /// The column is locked; state is unchanged.
    Locked,
}

#[derive(Clone, Debug)]
pub struct ListState<T> {
    configs: BTreeMap<String, ColumnFilterConfig>,
    sort_fields: HashMap<String, String>,
    sorting: Vec<ColumnSort>,
    global_filter_text: String,
    debounced_global_filter_text: String,
    search_deadline: Option<Instant>,
    debounce: Duration,
    column_filters: BTreeMap<String, FilterValue>,
    page: u64,
    page_size: u64,
    last_result: Option<PaginatedResult<T>>,
}

impl<T> ListState<T> {
    /// Column filters are seeded from each config's default value.
    pub fn new<I, S>(configs: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnFilterConfig)>,
        S: Into<String>,
    {
        let configs: BTreeMap<String, ColumnFilterConfig> =
            configs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let column_filters = defaults(&configs, |_| true);
        Self {
            configs,
            sort_fields: HashMap::new(),
            sorting: Vec::new(),
            global_filter_text: String::new(),
            debounced_global_filter_text: String::new(),
            search_deadline: None,
            debounce: SEARCH_DEBOUNCE,
            column_filters,
            page: 0,
            page_size: DEFAULT_LIMIT as u64,
            last_result: None,
        }
    }

    /// Sort requests on `column_id` are sent as `server_field`.
    pub fn with_sort_field(mut self, column_id: impl Into<String>, server_field: impl Into<String>) -> Self {
        self.sort_fields.insert(column_id.into(), server_field.into());
        self
    }

    pub fn with_initial_sort(mut self, column_id: impl Into<String>, dir: SortDir) -> Self {
        self.sorting = vec![ColumnSort {
            column_id: column_id.into(),
            descending: dir == SortDir::Desc,
        }];
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Result<Self, ListStateError> {
        self.set_page_size(page_size)?;
        Ok(self)
    }

    /* ---------- sorting ---------- */

    /// Sort by a single column, or clear sorting with `None`.
    pub fn set_sort(&mut self, column_id: &str, dir: Option<SortDir>) {
        self.sorting.clear();
        self.add_sort(column_id, dir);
    }

    /// Add or replace one sort key, keeping the others; `None` removes the key.
    pub fn add_sort(&mut self, column_id: &str, dir: Option<SortDir>) {
        self.sorting.retain(|s| s.column_id != column_id);
        if let Some(dir) = dir {
            self.sorting.push(ColumnSort {
                column_id: column_id.to_string(),
                descending: dir == SortDir::Desc,
            });
        }
        self.page = 0;
    }

    pub fn sorting(&self) -> &[ColumnSort] {
        &self.sorting
    }

    /* ---------- global search ---------- */

    /// Record typed search text; it takes effect once `debounce` passes without
    /// another call.
    pub fn set_global_filter_text(&mut self, text: impl Into<String>, now: Instant) {
        self.global_filter_text = text.into();
        self.search_deadline = Some(now + self.debounce);
    }

    /// When the pending search text is due at `now`, settle it.
    /// Returns true when the effective search changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.search_deadline {
            Some(deadline) if now >= deadline => {
                self.search_deadline = None;
                self.apply_search(self.global_filter_text.clone())
            }
            _ => false,
        }
    }

    /// Settle search text that has already been debounced elsewhere.
    pub fn apply_search(&mut self, text: String) -> bool {
        self.global_filter_text.clone_from(&text);
        self.search_deadline = None;
        if text == self.debounced_global_filter_text {
            return false;
        }
        debug!(search = %text, "search settled");
        self.debounced_global_filter_text = text;
        self.page = 0;
        true
    }

    /// When a pending search will settle, if any.
    pub fn search_deadline(&self) -> Option<Instant> {
        self.search_deadline
    }

    pub fn global_filter_text(&self) -> &str {
        &self.global_filter_text
    }

    pub fn debounced_global_filter_text(&self) -> &str {
        &self.debounced_global_filter_text
    }

    /* ---------- column filters ---------- */

    /// Set (`Some`) or remove (`None` or an empty value) a column filter.
    ///
    /// Locked columns ignore every edit, whoever makes it.
    pub fn set_column_filter(
        &mut self,
        column_id: &str,
        value: Option<FilterValue>,
    ) -> Result<FilterChange, ListStateError> {
        let cfg = self
            .configs
            .get(column_id)
            .ok_or_else(|| ListStateError::UnknownColumn(column_id.to_string()))?;

        if cfg.immutable {
            debug!(column = column_id, "ignoring edit of locked filter");
            return Ok(FilterChange::Locked);
        }

        match value.filter(|v| !v.is_empty()) {
            Some(v) => {
                let supported = v.parsed_operator().is_some_and(|op| cfg.allows(op));
                if !supported {
                    return Err(ListStateError::UnsupportedOperator {
                        column: column_id.to_string(),
                        operator: v.operator,
                    });
                }
                self.column_filters.insert(column_id.to_string(), v);
            }
            None => {
                self.column_filters.remove(column_id);
            }
        }
        self.page = 0;
        Ok(FilterChange::Applied)
    }

    /// Drop search text and every column filter except locked ones.
    pub fn clear_all_filters(&mut self) {
        self.global_filter_text.clear();
        self.debounced_global_filter_text.clear();
        self.search_deadline = None;
        self.column_filters = defaults(&self.configs, |c| c.immutable);
        self.page = 0;
    }

    pub fn column_filter(&self, column_id: &str) -> Option<&FilterValue> {
        self.column_filters.get(column_id)
    }

    pub fn filter_config(&self, column_id: &str) -> Option<&ColumnFilterConfig> {
        self.configs.get(column_id)
    }

    pub fn is_locked(&self, column_id: &str) -> bool {
        self.configs.get(column_id).is_some_and(|c| c.immutable)
    }

    /// Filters the user applied: unlocked non-empty column filters plus the search.
    pub fn active_filters_count(&self) -> usize {
        let columns = self
            .column_filters
            .iter()
            .filter(|(id, v)| !v.is_empty() && !self.is_locked(id))
            .count();
        let search = usize::from(!self.global_filter_text.trim().is_empty());
        columns + search
    }

    /* ---------- paging ---------- */

    pub fn set_page(&mut self, page: u64) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, page_size: u64) -> Result<(), ListStateError> {
        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
        PageRequest::new(0, limit)?;
        self.page_size = page_size;
        self.page = 0;
        Ok(())
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /* ---------- request / response ---------- */

    pub fn to_query_options(&self) -> QueryOptions {
        let sort = self.sorting.iter().fold(SortOptions::new(), |acc, s| {
            let field = self
                .sort_fields
                .get(&s.column_id)
                .cloned()
                .unwrap_or_else(|| s.column_id.clone());
            let dir = if s.descending { SortDir::Desc } else { SortDir::Asc };
            acc.then(field, dir)
        });

        let search = self.debounced_global_filter_text.trim();
        let filter = FilterOptions {
            global_search: (!search.is_empty()).then(|| search.to_string()),
            columns: self
                .column_filters
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        QueryOptions {
            pagination: Some(Pagination {
                page: i64::try_from(self.page).unwrap_or(i64::MAX),
                limit: i64::try_from(self.page_size).unwrap_or(i64::MAX),
            }),
            sort: (!sort.is_empty()).then_some(sort),
            filter: Some(filter),
        }
    }

    /// Keep `result` only if it answers the state's current options. Responses to
    /// superseded requests are discarded.
    pub fn accept_result(&mut self, requested: &QueryOptions, result: PaginatedResult<T>) -> bool {
        if *requested != self.to_query_options() {
            debug!("discarding stale list response");
            return false;
        }
        self.last_result = Some(result);
        true
    }

    pub fn result(&self) -> Option<&PaginatedResult<T>> {
        self.last_result.as_ref()
    }

    pub fn page_count(&self) -> u64 {
        self.last_result.as_ref().map_or(0, |r| r.total_pages)
    }

    pub fn can_previous(&self) -> bool {
        self.page > 0
    }

    pub fn can_next(&self) -> bool {
        self.page + 1 < self.page_count()
    }
}

fn defaults(
    configs: &BTreeMap<String, ColumnFilterConfig>,
    keep: impl Fn(&ColumnFilterConfig) -> bool,
) -> BTreeMap<String, FilterValue> {
    configs
        .iter()
        .filter(|(_, c)| keep(c))
        .filter_map(|(id, c)| c.default_value.clone().map(|v| (id.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_core::FilterOperator;

    fn state() -> ListState<u32> {
        ListState::new([
            ("title", ColumnFilterConfig::text()),
            ("createdAt", ColumnFilterConfig::date()),
        ])
    }

    #[test]
    fn sort_change_resets_page() {
        let mut s = state();
        s.set_page(4);
        s.set_sort("title", Some(SortDir::Asc));
        assert_eq!(s.page(), 0);

        s.set_page(2);
        s.add_sort("createdAt", Some(SortDir::Desc));
        assert_eq!(s.page(), 0);
        assert_eq!(s.sorting().len(), 2);
    }

    #[test]
    fn page_size_change_resets_page_and_is_validated() {
        let mut s = state();
        s.set_page(3);
        s.set_page_size(25).unwrap();
        assert_eq!((s.page(), s.page_size()), (0, 25));

        s.set_page(1);
        assert!(s.set_page_size(0).is_err());
        assert!(s.set_page_size(101).is_err());
        assert_eq!((s.page(), s.page_size()), (1, 25));
    }

    #[test]
    fn unsupported_operator_is_rejected() {
        let mut s = state();
        let err = s
            .set_column_filter("createdAt", Some(FilterValue::new(FilterOperator::Contains, "x")))
            .unwrap_err();
        assert!(matches!(err, ListStateError::UnsupportedOperator { .. }));
        assert!(s.column_filter("createdAt").is_none());

        let err = s
            .set_column_filter("nope", Some(FilterValue::new(FilterOperator::Equals, "x")))
            .unwrap_err();
        assert_eq!(err, ListStateError::UnknownColumn("nope".into()));
    }

    #[test]
    fn empty_value_removes_the_filter() {
        let mut s = state();
        s.set_column_filter("title", Some(FilterValue::new(FilterOperator::Contains, "cat")))
            .unwrap();
        assert_eq!(s.active_filters_count(), 1);
        s.set_column_filter("title", Some(FilterValue::new(FilterOperator::Contains, "")))
            .unwrap();
        assert!(s.column_filter("title").is_none());
        assert_eq!(s.active_filters_count(), 0);
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut s = state();
        let first = s.to_query_options();
        s.set_page(1);
        let second = s.to_query_options();

        let page = PageRequest::new(1, 10).unwrap();
        assert!(s.accept_result(&second, PaginatedResult::new(vec![1, 2], 30, 30, page)));
        let stale = PageRequest::new(0, 10).unwrap();
        assert!(!s.accept_result(&first, PaginatedResult::new(vec![9], 30, 30, stale)));

        assert_eq!(s.result().map(|r| r.data.clone()), Some(vec![1, 2]));
        assert_eq!(s.page_count(), 3);
        assert!(s.can_next() && s.can_previous());
    }
}
