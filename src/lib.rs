/// OpsGrid - Table Engine for Operations Dashboards
///
/// Filter, sort, dedupe, group and export JSON rows fetched from a backend,
/// and produce bounded page snapshots for a chat/analysis endpoint. The
/// transformations are pure functions over [`Record`] slices; [`TableView`]
/// composes them with a fetch lifecycle for one dashboard table.

pub mod value;
pub mod record;
pub mod key;
pub mod filter;
pub mod sort;
pub mod dedupe;
pub mod group;
pub mod export;
pub mod snapshot;
pub mod pages;
pub mod fetch;
pub mod view;
pub mod config;
pub mod error;

pub use value::{CellValue, NumericTotal};
pub use record::{column_union, Record};
pub use key::KeyBuilder;
pub use filter::{distinct_values, filter_all_columns, filter_any_column, filter_equals, ColumnFilters};
pub use sort::{locale_compare, sort_records, SortOrder, SortState};
pub use dedupe::{dedupe, DUPLICATE_COUNT_FIELD};
pub use group::{group, Aggregate, GroupedResult, UNKNOWN_GROUP};
pub use export::{export_filename, to_csv, to_csv_expanded, CsvExport, DownloadTarget, Downloads, ExpandedLayout, ExpandedRow};
pub use snapshot::{summarize, summarize_with, PageDataExtractor, PageSnapshot, PageType, Projection, SnapshotBuilder};
pub use fetch::{Delivery, FetchState, FetchTicket, FetchTracker};
pub use view::{display_lines, DisplayLine, Expansion, TableView};
pub use config::ApiConfig;
pub use error::{ApiError, ConfigError, ExportError, SnapshotError};

// Backend and chat client - only when client feature is enabled
#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub mod messages;
#[cfg(feature = "client")]
pub mod chat;

#[cfg(feature = "client")]
pub use client::{join_pair, BackendClient, PairOutcome};
#[cfg(feature = "client")]
pub use chat::{ChatSession, ConversationLog};
