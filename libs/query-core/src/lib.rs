//! Query vocabulary shared by list views and servers: filters, sorting, paging,
//! the compiled predicate tree and the paginated result envelope.
//!
//! Storage adapters consume [`Predicate`]; nothing here touches a database.

pub mod builder;
pub mod date;
pub mod error;
pub mod filter;
pub mod page;
pub mod predicate;
pub mod query;

pub use builder::{
    build_predicate, compile_column, CompiledFilter, FieldResolver, FieldTable, ResolvedField,
    SearchConfig,
};
pub use error::{ErrorBody, ErrorCode, ErrorEnvelope, FilterError, QueryError};
pub use filter::{
    DateFilter, FilterOperator, FilterOptions, FilterType, FilterValue, NumberFilter, Scalar,
    TextOp, TypedFilter,
};
pub use page::{total_pages, PaginatedResult};
pub use predicate::{merge_conditions, Bound, CompareOp, LikeMode, Predicate};
pub use query::{
    PageRequest, Pagination, QueryOptions, SortDir, SortKey, SortOptions, DEFAULT_LIMIT,
    MAX_LIMIT,
};
