//! SeaORM backend for `query-core`: field allow-lists, predicate lowering and the
//! paginated fetch executor.

pub mod field_map;
pub mod lower;
pub mod paginate;

pub use field_map::{joins_for, Field, FieldKind, FieldMap, Join};
pub use lower::{
    coerce, like_pattern, lower_filter, predicate_to_condition, CaseFold, LowerError, LoweredFilter,
};
pub use paginate::{paginate, resolve_sort, run_paginated_fetch, FetchError, ListSpec};
