use query_core::{PageRequest, QueryError, QueryOptions, DEFAULT_LIMIT, MAX_LIMIT};
use serde::{Deserialize, Serialize};

/// Settings read from `modules.blog`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlogConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Can only lower the global ceiling of 100.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Quiet period list views wait after the last keystroke before searching.
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default)]
    pub seed_demo_data: bool,
    #[serde(default = "default_max_search_length")]
    pub max_search_length: usize,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            search_debounce_ms: default_search_debounce_ms(),
            seed_demo_data: false,
            max_search_length: default_max_search_length(),
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_LIMIT as u32
}

fn default_max_page_size() -> u32 {
    MAX_LIMIT as u32
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_max_search_length() -> usize {
    200
}

impl BlogConfig {
    pub fn max_limit(&self) -> u64 {
        u64::from(self.max_page_size).min(MAX_LIMIT)
    }

    /// Validated window for `opts`; a missing `pagination` means the first page at
    /// the default size.
    pub fn page_request(&self, opts: &QueryOptions) -> Result<PageRequest, QueryError> {
        let (page, limit) = match opts.pagination {
            Some(p) => (p.page, p.limit),
            None => (0, i64::from(self.default_page_size)),
        };
        PageRequest::with_max(page, limit, self.max_limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_core::Pagination;

    #[test]
    fn defaults_and_unknown_keys() {
        let cfg: BlogConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.default_page_size, 10);
        assert_eq!(cfg.max_page_size, 100);
        assert_eq!(cfg.search_debounce_ms, 300);
        assert!(!cfg.seed_demo_data);

        let bad = serde_json::json!({ "page_size": 5 });
        assert!(serde_json::from_value::<BlogConfig>(bad).is_err());
    }

    #[test]
    fn max_page_size_only_lowers_the_ceiling() {
        let cfg = BlogConfig {
            max_page_size: 500,
            ..Default::default()
        };
        assert_eq!(cfg.max_limit(), 100);

        let cfg = BlogConfig {
            max_page_size: 20,
            ..Default::default()
        };
        let opts = QueryOptions {
            pagination: Some(Pagination { page: 0, limit: 25 }),
            ..Default::default()
        };
        assert!(matches!(
            cfg.page_request(&opts),
            Err(QueryError::InvalidPagination { max: 20, .. })
        ));
        let page = cfg.page_request(&QueryOptions::default()).unwrap();
        assert_eq!((page.page(), page.limit()), (0, 10));
    }
}
