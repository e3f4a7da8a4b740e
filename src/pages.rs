/// Page-data extractors for the dashboard views
///
/// Each struct holds the live state of one view and implements
/// [`PageDataExtractor`] with the caps that view uses. Verbose fields
/// (`details`, `callStack`, `arguments`, raw XML) stay in local state and are
/// never projected.

use crate::error::SnapshotError;
use crate::filter::{distinct_values, filter_all_columns, filter_any_column, filter_equals, ColumnFilters, MATCH_ALL};
use crate::record::Record;
use crate::snapshot::{PageDataExtractor, PageType, Projection, SnapshotBuilder};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;

pub const ERROR_SAMPLE_CAP: usize = 30;
pub const QUEUE_SAMPLE_CAP: usize = 3;
pub const QUEUE_ITEM_CAP: usize = 5;
pub const QUEUE_ERROR_TEXT_CHARS: usize = 100;
pub const SERVICE_SAMPLE_CAP: usize = 5;
pub const ZIP_SAMPLE_CAP: usize = 10;
pub const ROUTE_LIST_CAP: usize = 20;
pub const HEADER_CAP: usize = 50;
pub const ROW_SAMPLE_CAP: usize = 20;
pub const CELL_TEXT_CHARS: usize = 80;

pub const SERVER_COLUMN: &str = "serverName";
pub const MACHINE_COLUMN: &str = "machineId";
pub const RESOURCE_COLUMN: &str = "resourceName";

/// Display labels for CLS queue keys; unknown keys label themselves
pub const QUEUE_LABELS: &[(&str, &str)] = &[
    ("rate", "Rate Queue"),
    ("2nd rate", "2nd Rate Queue"),
    ("rerate", "Rerate Queue"),
    ("manifest", "Manifest Queue"),
    ("remanifest", "Remanifest Queue"),
    ("release", "Release Queue"),
];

pub fn queue_label(key: &str) -> &str {
    QUEUE_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
        .unwrap_or(key)
}

// ============================================================================
// Database errors
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct DatabaseErrorsPage {
    pub days: u32,
    pub errors: Vec<Record>,
    /// `queryMeta` exactly as the backend returned it
    pub query_meta: Option<JsonValue>,
    pub filter_text: String,
    /// Server dropdown; `"all"` shows every server
    pub server_filter: String,
    pub selected_error: Option<Record>,
}

impl DatabaseErrorsPage {
    pub fn new(days: u32) -> Self {
        Self {
            days,
            server_filter: MATCH_ALL.to_string(),
            ..Self::default()
        }
    }

    /// Rows the table currently shows: server dropdown, then free text
    pub fn filtered_errors(&self) -> Vec<Record> {
        let by_server = filter_equals(&self.errors, SERVER_COLUMN, &self.server_filter);
        filter_any_column(&by_server, &self.filter_text, None).into_owned()
    }

    fn meta_servers(&self) -> Result<JsonValue, SnapshotError> {
        let servers = match &self.query_meta {
            Some(meta) => meta.get("servers").cloned().unwrap_or(JsonValue::Null),
            None => JsonValue::Null,
        };
        match servers {
            JsonValue::Null => Ok(json!([])),
            JsonValue::Array(_) => Ok(servers),
            _ => Err(SnapshotError::InvalidShape {
                field: "queryMeta.servers".to_string(),
                expected: "an array",
            }),
        }
    }
}

impl PageDataExtractor for DatabaseErrorsPage {
    fn page_type(&self) -> PageType {
        PageType::DatabaseErrors
    }

    fn extract(&self, snapshot: &mut SnapshotBuilder) -> Result<(), SnapshotError> {
        let filtered = self.filtered_errors();
        let row = Projection::new().fields([SERVER_COLUMN, MACHINE_COLUMN, RESOURCE_COLUMN, "userId", "loggedOnLocal"]);
        let selected = Projection::new().fields([SERVER_COLUMN, MACHINE_COLUMN, RESOURCE_COLUMN]);

        snapshot
            .scalar("days", self.days)
            .scalar("totalErrors", self.errors.len())
            .scalar("filteredErrorsCount", filtered.len())
            .scalar("uniqueMachinesCount", distinct_values(&self.errors, MACHINE_COLUMN).len())
            .scalar("uniqueResourcesCount", distinct_values(&self.errors, RESOURCE_COLUMN).len())
            .records("errors", &filtered, ERROR_SAMPLE_CAP, &row)
            .record("selectedError", self.selected_error.as_ref(), &selected);

        snapshot.object("filters", |f| {
            f.scalar("filterText", self.filter_text.as_str())
                .scalar("serverFilter", self.server_filter.as_str());
            Ok(())
        })?;

        let servers = self.meta_servers()?;
        snapshot.scalar("servers", servers.clone());
        match &self.query_meta {
            Some(meta) => {
                snapshot.object("queryMeta", |m| {
                    m.scalar("totalErrors", meta.get("totalErrors").cloned().unwrap_or(JsonValue::Null))
                        .scalar("servers", servers)
                        .scalar("queriedAt", meta.get("queriedAt").cloned().unwrap_or(JsonValue::Null));
                    Ok(())
                })?;
            }
            None => {
                snapshot.scalar("queryMeta", JsonValue::Null);
            }
        }
        Ok(())
    }
}

// ============================================================================
// CLS queue status
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    #[serde(default)]
    pub query_time_ms: Option<u64>,
    #[serde(default)]
    pub total_stuck: u64,
    #[serde(default)]
    pub counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub queues: BTreeMap<String, Vec<Record>>,
}

#[derive(Debug, Clone, Default)]
pub struct QueueStatusPage {
    pub data: Option<QueueStatus>,
    pub error: Option<String>,
    pub is_loading: bool,
}

impl QueueStatusPage {
    fn write(&self, snapshot: &mut SnapshotBuilder) {
        let item = Projection::new()
            .fields(["orderNumber", "whId", "route"])
            .text("errorText", QUEUE_ERROR_TEXT_CHARS);

        let data = self.data.as_ref();
        snapshot
            .scalar("totalStuck", data.map(|d| d.total_stuck).unwrap_or(0))
            .scalar("queryTimeMs", data.and_then(|d| d.query_time_ms))
            .scalar("counts", data.map(|d| json!(d.counts)).unwrap_or_else(|| json!({})))
            .scalar("queuesCount", data.map(|d| d.queues.len()).unwrap_or(0))
            .list(
                "sampleQueues",
                data.into_iter().flat_map(|d| d.queues.iter()),
                QUEUE_SAMPLE_CAP,
                |(key, items)| {
                    let mut queue = SnapshotBuilder::new();
                    queue
                        .scalar("queueName", queue_label(key))
                        .scalar("queueType", key.as_str())
                        .scalar("count", items.len())
                        .records("sampleItems", items, QUEUE_ITEM_CAP, &item);
                    queue.into_json()
                },
            )
            .scalar("error", self.error.clone())
            .scalar("isLoading", self.is_loading);
    }
}

impl PageDataExtractor for QueueStatusPage {
    fn page_type(&self) -> PageType {
        PageType::ClsManagement
    }

    fn extract(&self, snapshot: &mut SnapshotBuilder) -> Result<(), SnapshotError> {
        self.write(snapshot);
        Ok(())
    }
}

// ============================================================================
// Saturday delivery
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaturdayDelivery {
    #[serde(default)]
    pub total_rate_orders: u64,
    #[serde(default)]
    pub origins_checked: u64,
    #[serde(default)]
    pub total_saturday_flags: u64,
    #[serde(default)]
    pub query_time_ms: Option<u64>,
    #[serde(default)]
    pub grouped_by_service: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SaturdayDeliveryPage {
    pub data: Option<SaturdayDelivery>,
    pub error: Option<String>,
    pub is_loading: bool,
}

impl SaturdayDeliveryPage {
    fn write(&self, snapshot: &mut SnapshotBuilder) {
        let data = self.data.as_ref();
        snapshot
            .scalar("totalRateOrders", data.map(|d| d.total_rate_orders).unwrap_or(0))
            .scalar("originsChecked", data.map(|d| d.origins_checked).unwrap_or(0))
            .scalar("totalSaturdayFlags", data.map(|d| d.total_saturday_flags).unwrap_or(0))
            .scalar("queryTimeMs", data.and_then(|d| d.query_time_ms))
            .scalar("servicesCount", data.map(|d| d.grouped_by_service.len()).unwrap_or(0))
            .list(
                "sampleServices",
                data.into_iter().flat_map(|d| d.grouped_by_service.iter()),
                SERVICE_SAMPLE_CAP,
                |(service, zips)| {
                    json!({
                        "serviceName": service,
                        "zipCount": zips.len(),
                        "sampleZips": zips.iter().take(ZIP_SAMPLE_CAP).collect::<Vec<_>>(),
                    })
                },
            )
            .scalar("error", self.error.clone())
            .scalar("isLoading", self.is_loading)
            .scalar("message", data.and_then(|d| d.message.clone()));
    }
}

impl PageDataExtractor for SaturdayDeliveryPage {
    fn page_type(&self) -> PageType {
        PageType::ClsManagement
    }

    fn extract(&self, snapshot: &mut SnapshotBuilder) -> Result<(), SnapshotError> {
        self.write(snapshot);
        Ok(())
    }
}

/// The CLS management page hosts both panels; its snapshot nests them
#[derive(Debug, Clone, Default)]
pub struct ClsManagementPage {
    pub queue_status: QueueStatusPage,
    pub saturday_delivery: SaturdayDeliveryPage,
}

impl PageDataExtractor for ClsManagementPage {
    fn page_type(&self) -> PageType {
        PageType::ClsManagement
    }

    fn extract(&self, snapshot: &mut SnapshotBuilder) -> Result<(), SnapshotError> {
        snapshot.object("queueStatus", |q| {
            self.queue_status.write(q);
            Ok(())
        })?;
        snapshot.object("saturdayDelivery", |s| {
            self.saturday_delivery.write(s);
            Ok(())
        })?;
        Ok(())
    }
}

// ============================================================================
// SRM routes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteContent {
    pub route_name: String,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Record>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub column_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SrmRoutePage {
    /// Route listing: `routeName`, `fileName`, `fileSize`, `lastModified`, `rowCount`
    pub routes: Vec<Record>,
    pub selected_route: Option<String>,
    pub content: Option<RouteContent>,
    pub content_search: String,
    pub column_filters: ColumnFilters,
}

impl SrmRoutePage {
    /// Column filters (AND) and then the content search (OR). The content
    /// search is trimmed, unlike the table-wide searches.
    pub fn visible_rows(&self) -> Vec<Record> {
        match &self.content {
            Some(content) => {
                let by_column = filter_all_columns(&content.rows, &self.column_filters);
                filter_any_column(&by_column, self.content_search.trim(), None).into_owned()
            }
            None => Vec::new(),
        }
    }
}

impl PageDataExtractor for SrmRoutePage {
    fn page_type(&self) -> PageType {
        PageType::SrmDownload
    }

    fn extract(&self, snapshot: &mut SnapshotBuilder) -> Result<(), SnapshotError> {
        let listing = Projection::new().fields(["routeName", "rowCount", "lastModified"]);
        snapshot
            .scalar("routeCount", self.routes.len())
            .records("routes", &self.routes, ROUTE_LIST_CAP, &listing)
            .scalar("selectedRoute", self.selected_route.clone());

        let Some(content) = &self.content else {
            snapshot.scalar("routeContent", JsonValue::Null);
            return Ok(());
        };
        if content.route_name.is_empty() {
            return Err(SnapshotError::MissingField("routeContent.routeName".to_string()));
        }

        let visible = self.visible_rows();
        let mut cells = Projection::new();
        for header in content.headers.iter().take(HEADER_CAP) {
            cells = cells.text(header.clone(), CELL_TEXT_CHARS);
        }

        snapshot.object("routeContent", |c| {
            c.scalar("routeName", content.route_name.as_str())
                .scalar("rowCount", content.row_count)
                .scalar("columnCount", content.column_count)
                .list("headers", content.headers.iter(), HEADER_CAP, |h| json!(h))
                .scalar("visibleRowCount", visible.len())
                .records("sampleRows", &visible, ROW_SAMPLE_CAP, &cells);
            Ok(())
        })?;

        let column_filters: BTreeMap<&str, String> = self.column_filters.active().collect();
        snapshot.object("filters", |f| {
            f.scalar("contentSearch", self.content_search.as_str())
                .scalar("columnFilters", json!(column_filters));
            Ok(())
        })?;
        Ok(())
    }
}
