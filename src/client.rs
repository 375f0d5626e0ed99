//! HTTP client for the analytics backend.
//!
//! One method per endpoint, all funneled through a single execute path that
//! attaches the session credential, categorizes failures into [`ApiError`],
//! and decodes success bodies leniently. The credential scheme is chosen per
//! request from whatever the session currently holds, so signing in mid-flow
//! switches subsequent requests without rebuilding the client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{multipart, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::charts::{CategoryPoint, ChartData, TimeseriesData};
use crate::error::{ApiError, ApiResult, FieldError, GENERIC_FAILURE};
use crate::query::ChartResponse;
use crate::session::{Credential, Session};
use crate::types::{
    AiStatus, AuthResponse, BalanceSheet, ChartQuery, DashboardConfigResponse, Dataset,
    DateRange, Distincts, FeedbackRequest, IncomeStatement, KpiMetric, KpiValue, ProfileUpdate,
    SmartDashboard, SummaryReport, TransactionPage, UploadReceipt, UserProfile,
};

/// Local development backend.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Request/response shapes specific to the wire
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct DatasetsEnvelope {
    #[serde(default)]
    datasets: Vec<Dataset>,
}

#[derive(Debug, Default, Deserialize)]
struct ActivitiesEnvelope {
    #[serde(default)]
    activities: Vec<crate::types::Activity>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationsEnvelope {
    #[serde(default)]
    notifications: Vec<crate::types::Notification>,
}

/// Grouped aggregate from `POST /analytics/query`: label/value rows ordered
/// by descending value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsBreakdown {
    #[serde(default)]
    pub items: Vec<CategoryPoint>,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub group_by: Option<String>,
}

/// Free-form AI answer from `/ai/query` and `/ai/nl_query`. The `data` shape
/// depends on the resolved query, so it stays raw until classified.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiAnswer {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub narrative: Option<String>,
    #[serde(default)]
    pub ai_error: Option<String>,
}

/// One `{field, op, value}` row filter accepted by the analytics endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsFilter {
    pub field: String,
    pub op: String,
    pub value: serde_json::Value,
}

impl AnalyticsFilter {
    pub fn eq(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            op: "=".to_string(),
            value: serde_json::Value::String(value.to_string()),
        }
    }
}

/// Filters and paging for the transactions table view.
#[derive(Debug, Clone)]
pub struct TransactionFilters {
    pub range: DateRange,
    pub product: Option<String>,
    pub region: Option<String>,
    pub customer: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for TransactionFilters {
    fn default() -> Self {
        Self {
            range: DateRange::default(),
            product: None,
            region: None,
            customer: None,
            search: None,
            sort_by: None,
            sort_dir: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl TransactionFilters {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = self.range.query_params();
        for (name, value) in [
            ("product", &self.product),
            ("region", &self.region),
            ("customer", &self.customer),
            ("search", &self.search),
            ("sort_by", &self.sort_by),
            ("sort_dir", &self.sort_dir),
        ] {
            if let Some(v) = value {
                params.push((name, v.clone()));
            }
        }
        params.push(("limit", self.limit.to_string()));
        params.push(("offset", self.offset.to_string()));
        params
    }
}

/// Body for `POST /analytics/kpi` covering the three deterministic KPIs.
fn kpi_body(metric: KpiMetric, range: &DateRange) -> serde_json::Value {
    let (name, filters) = match metric {
        KpiMetric::TotalSales => ("sum_amount", vec![AnalyticsFilter::eq("type", "sale")]),
        KpiMetric::TotalPurchases => ("sum_amount", vec![AnalyticsFilter::eq("type", "purchase")]),
        KpiMetric::TotalQuantity => ("sum_quantity", Vec::new()),
    };
    json!({
        "metric": name,
        "filters": filters,
        "start_date": range.start_param(),
        "end_date": range.end_param(),
    })
}

/// Categorize a non-2xx response. Pure so the mapping stays unit-testable.
pub fn error_for(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized;
    }
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

    if status == StatusCode::UNPROCESSABLE_ENTITY {
        // FastAPI-style detail: [{loc: [...], msg: "..."}]
        let items = parsed
            .as_ref()
            .and_then(|v| v.get("detail"))
            .and_then(|d| d.as_array());
        if let Some(items) = items {
            let fields: Vec<FieldError> = items
                .iter()
                .map(|item| FieldError {
                    field: item
                        .get("loc")
                        .and_then(|l| l.as_array())
                        .and_then(|l| l.last())
                        .and_then(|f| f.as_str())
                        .unwrap_or("body")
                        .to_string(),
                    message: item
                        .get("msg")
                        .and_then(|m| m.as_str())
                        .unwrap_or(GENERIC_FAILURE)
                        .to_string(),
                })
                .collect();
            if !fields.is_empty() {
                return ApiError::Validation(fields);
            }
        }
    }

    let message = parsed
        .as_ref()
        .and_then(|v| {
            v.get("detail")
                .and_then(|d| d.as_str())
                .or_else(|| v.get("message").and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_FAILURE.to_string());
    ApiError::Server { message }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(base_url: Url, session: Arc<Session>) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn from_base_url(base_url: &str, session: Arc<Session>) -> ApiResult<Self> {
        let url = Url::parse(base_url).map_err(|e| ApiError::Network(e.to_string()))?;
        Self::new(url, session)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Network(format!("bad endpoint {}: {}", path, e)))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.credential() {
            Some(Credential::Bearer(token)) => builder.bearer_auth(token),
            Some(Credential::ApiKey(key)) => builder.header("X-API-Key", key),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(error_for(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        log::debug!("GET {}", path);
        self.execute(self.http.get(url).query(params)).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        log::debug!("POST {}", path);
        self.execute(self.http.post(url).json(body)).await
    }

    // -- auth ---------------------------------------------------------------

    /// Sign in and install the returned credential on the session.
    pub async fn signin(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let auth: AuthResponse = self
            .post_json(
                "auth/signin",
                &json!({ "email": email, "password": password }),
            )
            .await?;
        if let Some(token) = auth.credential_token() {
            self.session.set_token(token);
        }
        Ok(auth)
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> ApiResult<AuthResponse> {
        let auth: AuthResponse = self
            .post_json(
                "auth/signup",
                &json!({
                    "email": email,
                    "password": password,
                    "username": username,
                    "first_name": first_name,
                    "last_name": last_name,
                }),
            )
            .await?;
        if let Some(token) = auth.credential_token() {
            self.session.set_token(token);
        }
        Ok(auth)
    }

    /// Legacy opaque-key route; the returned `token` has no dots, so later
    /// requests carry it as `X-API-Key`.
    pub async fn legacy_token(&self, username: &str, password: &str) -> ApiResult<AuthResponse> {
        let auth: AuthResponse = self
            .post_json(
                "auth/token",
                &json!({ "username": username, "password": password }),
            )
            .await?;
        if let Some(token) = auth.credential_token() {
            self.session.set_token(token);
        }
        Ok(auth)
    }

    /// Local-only: the backend keeps no session state.
    pub fn signout(&self) {
        self.session.clear_token();
    }

    // -- datasets -----------------------------------------------------------

    /// Newest upload first; index 0 is the active dataset.
    pub async fn list_datasets(&self) -> ApiResult<Vec<Dataset>> {
        let envelope: DatasetsEnvelope = self.get_json("datasets", &[]).await?;
        Ok(envelope.datasets)
    }

    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<UploadReceipt> {
        let url = self.endpoint("upload")?;
        log::info!("uploading {} ({} bytes)", file_name, bytes.len());
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        self.execute(self.http.post(url).multipart(form)).await
    }

    // -- reports ------------------------------------------------------------

    pub async fn report_summary(&self, range: &DateRange) -> ApiResult<SummaryReport> {
        self.get_json("reports/summary", &range.query_params()).await
    }

    pub async fn income_statement(&self, range: &DateRange) -> ApiResult<IncomeStatement> {
        self.get_json("reports/income-statement", &range.query_params())
            .await
    }

    pub async fn balance_sheet(&self, range: &DateRange) -> ApiResult<BalanceSheet> {
        self.get_json("reports/balance-sheet", &range.query_params())
            .await
    }

    // -- analytics ----------------------------------------------------------

    pub async fn analytics_kpi(&self, metric: KpiMetric, range: &DateRange) -> ApiResult<KpiValue> {
        self.post_json("analytics/kpi", &kpi_body(metric, range))
            .await
    }

    pub async fn analytics_breakdown(
        &self,
        group_by: &str,
        metric: &str,
        range: &DateRange,
        top_n: Option<u32>,
    ) -> ApiResult<AnalyticsBreakdown> {
        self.post_json(
            "analytics/query",
            &json!({
                "group_by": group_by,
                "metric": metric,
                "start_date": range.start_param(),
                "end_date": range.end_param(),
                "top_n": top_n,
            }),
        )
        .await
    }

    pub async fn analytics_timeseries(
        &self,
        metric: &str,
        range: &DateRange,
    ) -> ApiResult<TimeseriesData> {
        self.post_json(
            "analytics/timeseries",
            &json!({
                "metric": metric,
                "start_date": range.start_param(),
                "end_date": range.end_param(),
            }),
        )
        .await
    }

    pub async fn smart_dashboard(
        &self,
        table_name: &str,
        range: &DateRange,
    ) -> ApiResult<SmartDashboard> {
        self.post_json(
            "analytics/smart-dashboard",
            &json!({
                "table_name": table_name,
                "start_date": range.start_param(),
                "end_date": range.end_param(),
            }),
        )
        .await
    }

    // -- AI -----------------------------------------------------------------

    /// Run a canned chart query and classify its payload at the boundary.
    pub async fn ai_chart(&self, query: ChartQuery, range: &DateRange) -> ApiResult<ChartResponse> {
        let mut params = vec![("query", query.as_str().to_string())];
        params.extend(range.query_params());
        let answer: AiAnswer = self.get_json("ai/query", &params).await?;
        Ok(ChartResponse {
            data: ChartData::from_ai_payload(query, answer.data),
            narrative: answer.narrative,
            ai_error: answer.ai_error,
        })
    }

    pub async fn nl_query(&self, prompt: &str, range: &DateRange) -> ApiResult<AiAnswer> {
        self.post_json(
            "ai/nl_query",
            &json!({
                "prompt": prompt,
                "start_date": range.start_param(),
                "end_date": range.end_param(),
            }),
        )
        .await
    }

    pub async fn dashboard_config(&self, prompt: &str) -> ApiResult<DashboardConfigResponse> {
        self.post_json("ai/dashboard_config", &json!({ "prompt": prompt }))
            .await
    }

    pub async fn ai_status(&self) -> ApiResult<AiStatus> {
        self.get_json("ai/test", &[]).await
    }

    // -- transactions and metadata -------------------------------------------

    pub async fn transactions(&self, filters: &TransactionFilters) -> ApiResult<TransactionPage> {
        self.get_json("transactions", &filters.query_params()).await
    }

    pub async fn distincts(&self) -> ApiResult<Distincts> {
        self.get_json("meta/distincts", &[]).await
    }

    /// Link for the CSV export of the current transactions view; the browser
    /// downloads it directly, outside this client.
    pub fn export_transactions_url(&self, filters: &TransactionFilters) -> ApiResult<Url> {
        let mut url = self.endpoint("export/transactions")?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in filters.query_params() {
                // paging does not apply to a full export
                if name == "limit" || name == "offset" {
                    continue;
                }
                pairs.append_pair(name, &value);
            }
        }
        Ok(url)
    }

    pub fn template_csv_url(&self) -> ApiResult<Url> {
        self.endpoint("template/csv")
    }

    fn ranged_export_url(&self, path: &str, range: &DateRange) -> ApiResult<Url> {
        let mut url = self.endpoint(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in range.query_params() {
                pairs.append_pair(name, &value);
            }
        }
        Ok(url)
    }

    pub fn export_summary_url(&self, range: &DateRange) -> ApiResult<Url> {
        self.ranged_export_url("export/summary", range)
    }

    pub fn export_by_product_url(&self, range: &DateRange) -> ApiResult<Url> {
        self.ranged_export_url("export/by_product", range)
    }

    pub fn export_by_region_url(&self, range: &DateRange) -> ApiResult<Url> {
        self.ranged_export_url("export/by_region", range)
    }

    pub fn export_by_customer_url(&self, range: &DateRange) -> ApiResult<Url> {
        self.ranged_export_url("export/by_customer", range)
    }

    /// Link for the full-archive download, scoped to the same range as the
    /// CSV exports.
    pub fn export_all_zip_url(&self, range: &DateRange) -> ApiResult<Url> {
        self.ranged_export_url("export/all.zip", range)
    }

    // -- user ---------------------------------------------------------------

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        self.get_json("user/profile", &[]).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<UserProfile> {
        let url = self.endpoint("user/profile")?;
        log::debug!("PATCH user/profile");
        self.execute(self.http.patch(url).json(update)).await
    }

    pub async fn activities(&self, limit: u32) -> ApiResult<Vec<crate::types::Activity>> {
        let envelope: ActivitiesEnvelope = self
            .get_json("user/activities", &[("limit", limit.to_string())])
            .await?;
        Ok(envelope.activities)
    }

    pub async fn notifications(&self) -> ApiResult<Vec<crate::types::Notification>> {
        let envelope: NotificationsEnvelope = self.get_json("user/notifications", &[]).await?;
        Ok(envelope.notifications)
    }

    pub async fn mark_notification_read(&self, id: i64) -> ApiResult<serde_json::Value> {
        let url = self.endpoint(&format!("user/notifications/{}/read", id))?;
        self.execute(self.http.patch(url)).await
    }

    pub async fn mark_all_notifications_read(&self) -> ApiResult<serde_json::Value> {
        let url = self.endpoint("user/notifications/mark-all-read")?;
        self.execute(self.http.patch(url)).await
    }

    pub async fn send_feedback(&self, feedback: &FeedbackRequest) -> ApiResult<serde_json::Value> {
        self.post_json("user/feedback", feedback).await
    }

    // -- admin ---------------------------------------------------------------

    /// Wipe all uploaded data server-side.
    pub async fn admin_reset(&self) -> ApiResult<serde_json::Value> {
        self.post_json("admin/reset", &json!({})).await
    }
}
