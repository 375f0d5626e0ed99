//! Shared data model: date ranges, backend payload types, and the view-model
//! primitives (KPI slots, trends) built from them.
//!
//! Backend payloads are decoded leniently: every field carries
//! `#[serde(default)]` so a partially-present response never fails to parse.
//! View-model types serialize camelCase for frontend consumption.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Error from a rejected date-range edit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("start date cannot be after end date")]
pub struct DateRangeError;

/// Inclusive date filter. `None` on either side means unbounded.
///
/// The invariant `start <= end` is enforced at edit time: a violating edit is
/// rejected and the prior range retained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, DateRangeError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(DateRangeError);
            }
        }
        Ok(Self { start, end })
    }

    /// Unbounded range ("all time").
    pub fn all_time() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// Set the start date; rejected (prior value retained) if it would pass
    /// the end date.
    pub fn set_start(&mut self, start: Option<NaiveDate>) -> Result<(), DateRangeError> {
        if let (Some(s), Some(e)) = (start, self.end) {
            if s > e {
                return Err(DateRangeError);
            }
        }
        self.start = start;
        Ok(())
    }

    /// Set the end date; rejected (prior value retained) if it would precede
    /// the start date.
    pub fn set_end(&mut self, end: Option<NaiveDate>) -> Result<(), DateRangeError> {
        if let (Some(s), Some(e)) = (self.start, end) {
            if e < s {
                return Err(DateRangeError);
            }
        }
        self.end = end;
        Ok(())
    }

    /// `start_date`/`end_date` pairs for a query string, omitting unbounded
    /// sides.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(s) = self.start {
            params.push(("start_date", s.format("%Y-%m-%d").to_string()));
        }
        if let Some(e) = self.end {
            params.push(("end_date", e.format("%Y-%m-%d").to_string()));
        }
        params
    }

    pub fn start_param(&self) -> Option<String> {
        self.start.map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn end_param(&self) -> Option<String> {
        self.end.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

// ---------------------------------------------------------------------------
// Query identity helpers shared with the orchestration layer
// ---------------------------------------------------------------------------

/// Canned chart queries served by `GET /ai/query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartQuery {
    SalesOverTime,
    MostProfitableProduct,
    ByRegion,
    ByCustomer,
}

impl ChartQuery {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartQuery::SalesOverTime => "sales_over_time",
            ChartQuery::MostProfitableProduct => "most_profitable_product",
            ChartQuery::ByRegion => "by_region",
            ChartQuery::ByCustomer => "by_customer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sales_over_time" => Some(ChartQuery::SalesOverTime),
            "most_profitable_product" => Some(ChartQuery::MostProfitableProduct),
            "by_region" => Some(ChartQuery::ByRegion),
            "by_customer" => Some(ChartQuery::ByCustomer),
            _ => None,
        }
    }
}

/// Deterministic KPI aggregates computed via `POST /analytics/kpi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KpiMetric {
    /// sum_amount filtered to type = sale
    TotalSales,
    /// sum_amount filtered to type = purchase
    TotalPurchases,
    /// sum_quantity, unfiltered
    TotalQuantity,
}

// ---------------------------------------------------------------------------
// Backend payloads
// ---------------------------------------------------------------------------

/// Metadata for an uploaded dataset. Owned by the backend; the "active"
/// dataset is simply the head of the list (newest upload first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub column_types: Option<serde_json::Value>,
    #[serde(default)]
    pub upload_timestamp: Option<String>,
    #[serde(default)]
    pub sample_data: Option<serde_json::Value>,
}

/// Authoritative business summary from `GET /reports/summary`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    #[serde(default)]
    pub total_sales: Option<f64>,
    #[serde(default)]
    pub total_purchases: Option<f64>,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub total_quantity: Option<f64>,
}

impl SummaryReport {
    /// The dashboard treats a summary as "business data" only when it has at
    /// least one monetary total.
    pub fn has_business_data(&self) -> bool {
        self.total_sales.is_some() || self.total_purchases.is_some()
    }
}

/// Single aggregate from `POST /analytics/kpi`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiValue {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub metric: Option<String>,
}

/// Trend direction on a KPI card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Positive,
    Negative,
    #[default]
    None,
}

/// A heuristic KPI from the smart-dashboard endpoint. Values arrive as either
/// numbers or pre-formatted strings, so they stay as raw JSON scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartKpi {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub trend: Option<Trend>,
}

/// One lenient data point inside a smart chart: the backend varies between
/// `x`/`date`/`label`/`name`/`category` for the axis and `y`/`value` for the
/// magnitude depending on which heuristic produced the chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartPoint {
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl SmartPoint {
    pub fn axis_label(&self) -> String {
        self.x
            .clone()
            .or_else(|| self.date.clone())
            .or_else(|| self.label.clone())
            .or_else(|| self.name.clone())
            .or_else(|| self.category.clone())
            .unwrap_or_default()
    }

    pub fn magnitude(&self) -> f64 {
        self.y.or(self.value).unwrap_or(0.0)
    }
}

/// Heuristic chart description from the smart-dashboard endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartChart {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub chart_type: String,
    #[serde(default)]
    pub data: Vec<SmartPoint>,
    #[serde(default, alias = "xLabel")]
    pub x_label: Option<String>,
    #[serde(default, alias = "yLabel")]
    pub y_label: Option<String>,
    #[serde(default)]
    pub insight: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Full response from `POST /analytics/smart-dashboard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartDashboard {
    #[serde(default)]
    pub kpis: Vec<SmartKpi>,
    #[serde(default)]
    pub charts: Vec<SmartChart>,
    #[serde(default)]
    pub data_summary: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Auth / upload / transactions / user
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Response from the auth endpoints. The legacy `POST /auth/token` route
/// returns `token`; the enhanced routes return `access_token`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_minutes: Option<i64>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

impl AuthResponse {
    pub fn credential_token(&self) -> Option<&str> {
        self.access_token.as_deref().or(self.token.as_deref())
    }
}

/// What `POST /upload` hands back after parsing the file server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub rows_inserted: Option<u64>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub sample_data: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "type")]
    pub tx_type: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub returned: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionTotals {
    #[serde(default)]
    pub page_amount: Option<f64>,
    #[serde(default)]
    pub global_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub totals: TransactionTotals,
}

/// Distinct filter values from `GET /meta/distincts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distincts {
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub customers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
}

/// Partial profile update; absent fields stay untouched server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub feedback_type: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub cogs: Option<f64>,
    #[serde(default)]
    pub gross_profit: Option<f64>,
    #[serde(default)]
    pub operating_expenses: Option<f64>,
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub narrative: Option<String>,
    #[serde(default)]
    pub ai_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(default)]
    pub assets: Option<serde_json::Value>,
    #[serde(default)]
    pub liabilities: Option<serde_json::Value>,
    #[serde(default)]
    pub equity: Option<serde_json::Value>,
    #[serde(default)]
    pub narrative: Option<String>,
    #[serde(default)]
    pub ai_error: Option<String>,
}

// ---------------------------------------------------------------------------
// AI responses
// ---------------------------------------------------------------------------

/// Generated dashboard layout from `POST /ai/dashboard_config`. The config and
/// the error are independent: a degraded provider can still return a usable
/// config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfigResponse {
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub ai_error: Option<String>,
}

/// Provider health from `GET /ai/test`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiStatus {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

// ---------------------------------------------------------------------------
// View-model primitives
// ---------------------------------------------------------------------------

/// Placeholder shown when no source can fill a KPI slot.
pub const KPI_PLACEHOLDER: &str = "—";

/// One KPI card: a title, a display-ready value, and an optional trend arrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSlot {
    pub title: String,
    pub value: String,
    pub trend: Trend,
}

impl KpiSlot {
    pub fn new(title: impl Into<String>, value: impl Into<String>, trend: Trend) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            trend,
        }
    }

    pub fn placeholder(title: impl Into<String>) -> Self {
        Self::new(title, KPI_PLACEHOLDER, Trend::None)
    }
}

/// Render a lenient JSON scalar (smart KPI values arrive as numbers or
/// pre-formatted strings) for display.
pub fn scalar_to_display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => KPI_PLACEHOLDER.to_string(),
        other => other.to_string(),
    }
}
