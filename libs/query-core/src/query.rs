use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::QueryError;
use crate::filter::FilterOptions;

pub const DEFAULT_PAGE: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn reverse(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

impl SortKey {
    pub fn new(field: impl Into<String>, dir: SortDir) -> Self {
        Self {
            field: field.into(),
            dir,
        }
    }
}

/// `{ fieldPath: "asc" | "desc" }`, with key order preserved as sort priority.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SortOptions(pub Vec<SortKey>);

impl SortOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, field: impl Into<String>, dir: SortDir) -> Self {
        self.push(field, dir);
        self
    }

    /// Add a key, replacing an earlier key on the same field.
    pub fn push(&mut self, field: impl Into<String>, dir: SortDir) {
        let field = field.into();
        self.0.retain(|k| k.field != field);
        self.0.push(SortKey { field, dir });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }
}

impl Serialize for SortOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for k in &self.0 {
            map.serialize_entry(&k.field, &k.dir)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SortOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SortVisitor;

        impl<'de> Visitor<'de> for SortVisitor {
            type Value = SortOptions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field path to \"asc\" or \"desc\"")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = SortOptions::new();
                while let Some((field, dir)) = access.next_entry::<String, SortDir>()? {
                    out.push(field, dir);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(SortVisitor)
    }
}

/// Raw paging input; signed so that negative values can be reported instead of
/// failing deserialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn validate(self) -> Result<PageRequest, QueryError> {
        PageRequest::new(self.page, self.limit)
    }
}

/// Validated, 0-based page coordinates: `page >= 0`, `1 <= limit <= 100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Result<Self, QueryError> {
        Self::with_max(page, limit, MAX_LIMIT)
    }

    /// Validate against a lower ceiling than the global one.
    pub fn with_max(page: i64, limit: i64, max: u64) -> Result<Self, QueryError> {
        let max = max.clamp(1, MAX_LIMIT);
        let err = || QueryError::InvalidPagination { page, limit, max };
        // the row offset must fit the signed 64-bit OFFSET a database binds
        page.checked_mul(limit).ok_or_else(err)?;
        let page = u64::try_from(page).map_err(|_| err())?;
        let limit = u64::try_from(limit).map_err(|_| err())?;
        if limit == 0 || limit > max {
            return Err(err());
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Row offset; never above `i64::MAX` for a validated request.
    pub fn skip(&self) -> u64 {
        self.page * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            limit: DEFAULT_LIMIT as u64,
        }
    }
}

/// Everything a list view sends per fetch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterOptions>,
}

impl QueryOptions {
    pub fn page_request(&self) -> Result<PageRequest, QueryError> {
        self.pagination.unwrap_or_default().validate()
    }

    pub fn filter_or_default(&self) -> FilterOptions {
        self.filter.clone().unwrap_or_default()
    }
}
