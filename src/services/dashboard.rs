//! Dashboard assembly: KPI row and chart panels from engine states.
//!
//! Two fallback ladders drive everything. The KPI row prefers the business
//! summary, then smart-analytics KPIs, then raw dataset facts. The chart
//! grid prefers the four business charts, then the smart charts, then a
//! dataset overview panel. A missing or failed source degrades one rung,
//! never the whole view.

use std::sync::Arc;

use serde::Serialize;

use crate::charts::{to_chart_model, ChartData, ChartModel, ChartOptions};
use crate::client::ApiClient;
use crate::kpi::{derive_business_kpis, smart_kpi_slots, KpiSources};
use crate::query::{ChartResponse, QueryData, QueryEngine, QueryKey, QueryName, QueryState};
use crate::types::{Dataset, DateRange, KpiSlot, SmartDashboard, SummaryReport};
use crate::util::fmt_count;

/// Result type for a full dashboard load.
#[derive(Debug, Serialize)]
#[allow(clippy::large_enum_variant)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DashboardResult {
    Success { data: DashboardData },
    Empty { message: String },
    Error { message: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub kpis: Vec<KpiSlot>,
    pub charts: Vec<ChartPanel>,
    pub active_dataset: Option<Dataset>,
    pub exports: Vec<ExportLink>,
}

/// One entry in the export row; the browser downloads these directly.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLink {
    pub label: String,
    pub url: String,
}

/// One chart slot in the grid.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPanel {
    pub title: String,
    #[serde(flatten)]
    pub view: ChartView,
}

/// Render state of a chart slot. `Loading` only while a fetch is in flight;
/// a resolved-but-empty result is `NoData`, which renders the explicit
/// affordance instead of a skeleton.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ChartView {
    Loading,
    NoData {
        message: String,
    },
    Ready {
        model: ChartModel,
        narrative: Option<String>,
        ai_error: Option<String>,
    },
}

/// Slots shown while analytics loading is still paused.
pub fn get_started_slots(dataset_count: usize) -> Vec<KpiSlot> {
    use crate::types::Trend;
    vec![
        KpiSlot::new("Total Files", dataset_count.to_string(), Trend::None),
        KpiSlot::new("Status", "No Data", Trend::None),
        KpiSlot::new("Ready", "Upload Files", Trend::None),
        KpiSlot::new("Action", "Get Started", Trend::None),
    ]
}

fn dataset_fact_slots(dataset: &Dataset) -> Vec<KpiSlot> {
    use crate::types::Trend;
    vec![
        KpiSlot::new("File", dataset.original_filename.clone(), Trend::None),
        KpiSlot::new(
            "Rows",
            dataset.row_count.map(fmt_count).unwrap_or_else(|| "?".to_string()),
            Trend::None,
        ),
        KpiSlot::new("Columns", dataset.columns.len().to_string(), Trend::None),
        KpiSlot::new(
            "Uploaded",
            dataset.upload_timestamp.clone().unwrap_or_default(),
            Trend::None,
        ),
    ]
}

fn kpi_value(state: &QueryState) -> Option<f64> {
    state.data().and_then(QueryData::as_kpi).and_then(|k| k.value)
}

fn chart_panel(title: &str, state: &QueryState, options: ChartOptions) -> ChartPanel {
    let view = match state {
        QueryState::Pending => ChartView::Loading,
        QueryState::Idle => ChartView::NoData {
            message: "Load analytics to see this chart.".to_string(),
        },
        QueryState::Error(e) => ChartView::NoData {
            message: e.user_message(),
        },
        QueryState::Success(data) => match data.as_chart() {
            Some(ChartResponse {
                data: Some(chart), narrative, ai_error,
            }) => {
                let model = to_chart_model(chart, &options);
                if model.has_data() {
                    ChartView::Ready {
                        model,
                        narrative: narrative.clone(),
                        ai_error: ai_error.clone(),
                    }
                } else {
                    ChartView::NoData {
                        message: "No data for the selected range.".to_string(),
                    }
                }
            }
            _ => ChartView::NoData {
                message: "No data for the selected range.".to_string(),
            },
        },
    };
    ChartPanel {
        title: title.to_string(),
        view,
    }
}

fn smart_chart_panels(smart: &SmartDashboard) -> Vec<ChartPanel> {
    smart
        .charts
        .iter()
        .map(|chart| {
            let view = match ChartData::from_smart_chart(chart) {
                Some(data) => {
                    let options = ChartOptions {
                        x_label: chart.x_label.clone(),
                        y_label: chart.y_label.clone(),
                        series_label: None,
                    };
                    let model = to_chart_model(&data, &options);
                    if model.has_data() {
                        ChartView::Ready {
                            model,
                            narrative: chart.insight.clone(),
                            ai_error: None,
                        }
                    } else {
                        ChartView::NoData {
                            message: "No data for the selected range.".to_string(),
                        }
                    }
                }
                None => ChartView::NoData {
                    message: chart
                        .description
                        .clone()
                        .or_else(|| chart.insight.clone())
                        .unwrap_or_else(|| "Unsupported chart type.".to_string()),
                },
            };
            ChartPanel {
                title: chart.title.clone(),
                view,
            }
        })
        .collect()
}

fn dataset_overview_panel(dataset: &Dataset) -> ChartPanel {
    let rows = dataset
        .row_count
        .map(fmt_count)
        .unwrap_or_else(|| "?".to_string());
    ChartPanel {
        title: "Dataset Overview".to_string(),
        view: ChartView::NoData {
            message: format!("{} rows across {} columns.", rows, dataset.columns.len()),
        },
    }
}

pub struct DashboardService {
    client: Arc<ApiClient>,
    engine: Arc<QueryEngine>,
}

impl DashboardService {
    pub fn new(client: Arc<ApiClient>, engine: Arc<QueryEngine>) -> Self {
        Self { client, engine }
    }

    pub fn engine(&self) -> &Arc<QueryEngine> {
        &self.engine
    }

    /// Assemble the dashboard for a date range. Only a failed dataset
    /// listing is a hard error; everything else degrades per ladder.
    pub async fn load(&self, range: &DateRange) -> DashboardResult {
        self.engine
            .consume_auto_load_handoff(self.client.session().store());

        let datasets_state = self
            .engine
            .query(QueryKey::unscoped(QueryName::Datasets))
            .await;
        let datasets: Vec<Dataset> = match &datasets_state {
            QueryState::Error(e) => {
                return DashboardResult::Error {
                    message: e.user_message(),
                }
            }
            state => state
                .data()
                .and_then(QueryData::as_datasets)
                .map(<[Dataset]>::to_vec)
                .unwrap_or_default(),
        };
        if datasets.is_empty() {
            return DashboardResult::Empty {
                message: "Upload a dataset to get started.".to_string(),
            };
        }
        let active = datasets[0].clone();
        let exports = self.export_row(range);

        // Analytics loading still paused: no summary/smart/KPI reads, no
        // active-dataset display, just the get-started row and a prompt.
        if !self.engine.auto_load_enabled() {
            return DashboardResult::Success {
                data: DashboardData {
                    kpis: get_started_slots(datasets.len()),
                    charts: vec![ChartPanel {
                        title: "Analytics".to_string(),
                        view: ChartView::NoData {
                            message: "Load analytics to see your charts.".to_string(),
                        },
                    }],
                    active_dataset: None,
                    exports,
                },
            };
        }

        let summary_state = self
            .engine
            .query(QueryKey::new(QueryName::Summary, range.clone(), None))
            .await;
        let summary = summary_state
            .data()
            .and_then(QueryData::as_summary)
            .cloned();

        let smart_state = self
            .engine
            .query(QueryKey::new(
                QueryName::SmartDashboard,
                range.clone(),
                Some(active.table_name.clone()),
            ))
            .await;
        let smart = smart_state.data().and_then(QueryData::as_smart).cloned();

        // KPI aggregates are keyed by the active table: a different upload
        // is a different cache line, not a refresh of the old one.
        let table = Some(active.table_name.clone());
        let sales = kpi_value(
            &self
                .engine
                .query(QueryKey::new(QueryName::SalesKpi, range.clone(), table.clone()))
                .await,
        );
        let purchases = kpi_value(
            &self
                .engine
                .query(QueryKey::new(
                    QueryName::PurchasesKpi,
                    range.clone(),
                    table.clone(),
                ))
                .await,
        );
        let quantity = kpi_value(
            &self
                .engine
                .query(QueryKey::new(QueryName::QuantityKpi, range.clone(), table))
                .await,
        );

        let kpis = self.kpi_row(summary.as_ref(), smart.as_ref(), sales, purchases, quantity, &active);
        let charts = self
            .chart_grid(range, summary.as_ref(), smart.as_ref(), &active)
            .await;

        DashboardResult::Success {
            data: DashboardData {
                kpis,
                charts,
                active_dataset: Some(active),
                exports,
            },
        }
    }

    /// The five download links the dashboard always offers, scoped to the
    /// current range.
    fn export_row(&self, range: &DateRange) -> Vec<ExportLink> {
        [
            ("Summary CSV", self.client.export_summary_url(range)),
            ("By product CSV", self.client.export_by_product_url(range)),
            ("By region CSV", self.client.export_by_region_url(range)),
            ("By customer CSV", self.client.export_by_customer_url(range)),
            ("Download all (zip)", self.client.export_all_zip_url(range)),
        ]
        .into_iter()
        .filter_map(|(label, url)| {
            url.ok().map(|url| ExportLink {
                label: label.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
    }

    fn kpi_row(
        &self,
        summary: Option<&SummaryReport>,
        smart: Option<&SmartDashboard>,
        sales: Option<f64>,
        purchases: Option<f64>,
        quantity: Option<f64>,
        active: &Dataset,
    ) -> Vec<KpiSlot> {
        if summary.is_some_and(SummaryReport::has_business_data) {
            return derive_business_kpis(&KpiSources {
                summary,
                smart,
                sales_aggregate: sales,
                purchases_aggregate: purchases,
                quantity_aggregate: quantity,
            });
        }
        if let Some(smart) = smart {
            let slots = smart_kpi_slots(smart);
            if !slots.is_empty() {
                return slots;
            }
        }
        dataset_fact_slots(active)
    }

    async fn chart_grid(
        &self,
        range: &DateRange,
        summary: Option<&SummaryReport>,
        smart: Option<&SmartDashboard>,
        active: &Dataset,
    ) -> Vec<ChartPanel> {
        if summary.is_some_and(SummaryReport::has_business_data) {
            let mut panels = Vec::with_capacity(4);
            for (name, title, options) in [
                (
                    QueryName::SalesChart,
                    "Sales Over Time",
                    ChartOptions::labeled("Date", "Sales"),
                ),
                (
                    QueryName::ProfitChart,
                    "Most Profitable Products",
                    ChartOptions::labeled("Product", "Profit"),
                ),
                (
                    QueryName::RegionChart,
                    "Sales by Region",
                    ChartOptions::labeled("Region", "Amount"),
                ),
                (
                    QueryName::CustomerChart,
                    "Sales by Customer",
                    ChartOptions::labeled("Customer", "Amount"),
                ),
            ] {
                let state = self
                    .engine
                    .query(QueryKey::new(name, range.clone(), None))
                    .await;
                panels.push(chart_panel(title, &state, options));
            }
            return panels;
        }
        if let Some(smart) = smart {
            let panels = smart_chart_panels(smart);
            if !panels.is_empty() {
                return panels;
            }
        }
        vec![dataset_overview_panel(active)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::query::QueryFetcher;
    use crate::session::Session;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    /// Scripted fetcher: business summary with sales charts, or a smart-only
    /// dataset, or no datasets at all. Records every key it is asked for.
    #[derive(Default)]
    struct FakeBackend {
        datasets: Vec<Dataset>,
        summary: Option<SummaryReport>,
        smart: Option<SmartDashboard>,
        seen: parking_lot::Mutex<Vec<QueryKey>>,
    }

    #[async_trait]
    impl QueryFetcher for FakeBackend {
        async fn fetch(&self, key: &QueryKey) -> Result<QueryData, ApiError> {
            self.seen.lock().push(key.clone());
            match key.name {
                QueryName::Datasets => Ok(QueryData::Datasets(self.datasets.clone())),
                QueryName::Summary => self
                    .summary
                    .clone()
                    .map(QueryData::Summary)
                    .ok_or(ApiError::Server {
                        message: "no summary".to_string(),
                    }),
                QueryName::SmartDashboard => self
                    .smart
                    .clone()
                    .map(QueryData::Smart)
                    .ok_or(ApiError::Server {
                        message: "no smart analytics".to_string(),
                    }),
                QueryName::SalesKpi | QueryName::PurchasesKpi | QueryName::QuantityKpi => {
                    Ok(QueryData::Kpi(crate::types::KpiValue {
                        value: Some(100.0),
                        ..Default::default()
                    }))
                }
                _ => Ok(QueryData::Chart(ChartResponse {
                    data: Some(ChartData::Timeseries(crate::charts::TimeseriesData {
                        dates: vec!["2024-01-01".to_string()],
                        amounts: vec![Some(5.0)],
                    })),
                    narrative: Some("steady".to_string()),
                    ai_error: None,
                })),
            }
        }
    }

    fn service(backend: Arc<FakeBackend>) -> DashboardService {
        let _ = env_logger::builder().is_test(true).try_init();
        let session = Arc::new(Session::new(Arc::new(MemoryStore::new())));
        let client =
            Arc::new(ApiClient::from_base_url("http://127.0.0.1:8000/", session).unwrap());
        let engine = Arc::new(QueryEngine::new(backend));
        engine.enable_auto_load();
        DashboardService::new(client, engine)
    }

    fn dataset() -> Dataset {
        Dataset {
            table_name: "data_1".to_string(),
            original_filename: "sales.csv".to_string(),
            row_count: Some(1200),
            columns: vec!["date".to_string(), "amount".to_string()],
            ..Default::default()
        }
    }

    fn business_summary() -> SummaryReport {
        SummaryReport {
            total_sales: Some(5000.0),
            total_purchases: Some(2000.0),
            profit: Some(3000.0),
            total_quantity: Some(42.0),
        }
    }

    #[tokio::test]
    async fn test_empty_when_no_datasets() {
        let svc = service(Arc::new(FakeBackend::default()));
        match svc.load(&DateRange::all_time()).await {
            DashboardResult::Empty { .. } => {}
            other => panic!("expected empty, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_business_summary_drives_kpis_and_charts() {
        let svc = service(Arc::new(FakeBackend {
            datasets: vec![dataset()],
            summary: Some(business_summary()),
            ..Default::default()
        }));
        let result = svc.load(&DateRange::all_time()).await;
        let data = match result {
            DashboardResult::Success { data } => data,
            other => panic!("expected success, got {:?}", other),
        };
        assert_eq!(data.kpis.len(), 4);
        let sales = data.kpis.iter().find(|s| s.title == "Sales").unwrap();
        assert_eq!(sales.value, "$5,000.00");
        assert_eq!(data.charts.len(), 4);
        assert!(data
            .charts
            .iter()
            .all(|p| matches!(p.view, ChartView::Ready { .. })));
        let labels: Vec<&str> = data.exports.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Summary CSV",
                "By product CSV",
                "By region CSV",
                "By customer CSV",
                "Download all (zip)",
            ]
        );
        assert!(data.exports[0].url.contains("/export/summary"));
        assert!(data.exports[4].url.contains("/export/all.zip"));
    }

    #[tokio::test]
    async fn test_smart_fallback_when_summary_missing() {
        let smart: SmartDashboard = serde_json::from_value(json!({
            "kpis": [
                {"title": "Total Records", "value": 1200},
                {"title": "Revenue", "value": "9,000"}
            ],
            "charts": [
                {"title": "Revenue Trend", "type": "line",
                 "data": [{"x": "2024-01", "y": 10.0}]}
            ]
        }))
        .unwrap();
        let svc = service(Arc::new(FakeBackend {
            datasets: vec![dataset()],
            smart: Some(smart),
            ..Default::default()
        }));
        let data = match svc.load(&DateRange::all_time()).await {
            DashboardResult::Success { data } => data,
            other => panic!("expected success, got {:?}", other),
        };
        assert_eq!(data.kpis[0].title, "Total Records");
        assert_eq!(data.charts.len(), 1);
        assert_eq!(data.charts[0].title, "Revenue Trend");
        assert!(matches!(data.charts[0].view, ChartView::Ready { .. }));
    }

    #[tokio::test]
    async fn test_dataset_facts_when_no_analytics_available() {
        let svc = service(Arc::new(FakeBackend {
            datasets: vec![dataset()],
            ..Default::default()
        }));
        let data = match svc.load(&DateRange::all_time()).await {
            DashboardResult::Success { data } => data,
            other => panic!("expected success, got {:?}", other),
        };
        assert_eq!(data.kpis[0].title, "File");
        assert_eq!(data.kpis[0].value, "sales.csv");
        assert_eq!(data.kpis[1].value, "1,200");
        assert_eq!(data.charts.len(), 1);
        assert_eq!(data.charts[0].title, "Dataset Overview");
    }

    #[tokio::test]
    async fn test_gate_off_shows_get_started_row() {
        let _ = env_logger::builder().is_test(true).try_init();
        let session = Arc::new(Session::new(Arc::new(MemoryStore::new())));
        let client =
            Arc::new(ApiClient::from_base_url("http://127.0.0.1:8000/", session).unwrap());
        let backend = Arc::new(FakeBackend {
            datasets: vec![dataset()],
            summary: Some(business_summary()),
            ..Default::default()
        });
        let engine = Arc::new(QueryEngine::new(backend.clone()));
        // auto-load deliberately left off
        let svc = DashboardService::new(client, engine);
        let data = match svc.load(&DateRange::all_time()).await {
            DashboardResult::Success { data } => data,
            other => panic!("expected success, got {:?}", other),
        };
        // summary data exists on the backend but must not be surfaced
        let titles: Vec<&str> = data.kpis.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Total Files", "Status", "Ready", "Action"]);
        assert_eq!(data.kpis[0].value, "1");
        assert_eq!(data.kpis[1].value, "No Data");
        assert_eq!(data.charts.len(), 1);
        assert_eq!(data.charts[0].title, "Analytics");
        assert!(matches!(data.charts[0].view, ChartView::NoData { .. }));
        assert!(data.active_dataset.is_none());
        // export row is offered regardless of the gate
        assert_eq!(data.exports.len(), 5);
        // nothing beyond the dataset listing was fetched
        let seen = backend.seen.lock();
        assert!(seen.iter().all(|k| k.name == QueryName::Datasets));
    }

    #[tokio::test]
    async fn test_kpi_queries_keyed_by_active_table() {
        let backend = Arc::new(FakeBackend {
            datasets: vec![dataset()],
            summary: Some(business_summary()),
            ..Default::default()
        });
        let svc = service(backend.clone());
        match svc.load(&DateRange::all_time()).await {
            DashboardResult::Success { .. } => {}
            other => panic!("expected success, got {:?}", other),
        }
        let seen = backend.seen.lock();
        for name in [
            QueryName::SmartDashboard,
            QueryName::SalesKpi,
            QueryName::PurchasesKpi,
            QueryName::QuantityKpi,
        ] {
            let key = seen
                .iter()
                .find(|k| k.name == name)
                .unwrap_or_else(|| panic!("{:?} never fetched", name));
            assert_eq!(key.dataset.as_deref(), Some("data_1"));
        }
    }
}
