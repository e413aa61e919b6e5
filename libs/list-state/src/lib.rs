//! Client-side list view state: turns paging, sorting, search and column filter
//! interactions into the `QueryOptions` sent with each fetch.

pub mod config;
pub mod debounce;
pub mod state;

pub use config::{ColumnFilterConfig, LookupOption};
pub use debounce::{spawn_debouncer, SearchInput};
pub use state::{ColumnSort, FilterChange, ListState, ListStateError, SEARCH_DEBOUNCE};
