//! View composition: turns engine states and client responses into
//! render-ready structures. No rendering, no routing.

pub mod dashboard;
pub mod datasets;
pub mod designer;
pub mod transactions;

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::query::{QueryData, QueryFetcher, QueryKey, QueryName};
use crate::types::{ChartQuery, KpiMetric};

/// Production fetcher: dispatches each query key to the HTTP client.
pub struct ApiFetcher {
    client: Arc<ApiClient>,
}

impl ApiFetcher {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryFetcher for ApiFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<QueryData, ApiError> {
        match key.name {
            QueryName::Summary => self
                .client
                .report_summary(&key.range)
                .await
                .map(QueryData::Summary),
            QueryName::Datasets => self.client.list_datasets().await.map(QueryData::Datasets),
            QueryName::SmartDashboard => {
                let table = key.dataset.as_deref().ok_or_else(|| ApiError::Server {
                    message: "table_name is required".to_string(),
                })?;
                self.client
                    .smart_dashboard(table, &key.range)
                    .await
                    .map(QueryData::Smart)
            }
            QueryName::SalesChart => self
                .client
                .ai_chart(ChartQuery::SalesOverTime, &key.range)
                .await
                .map(QueryData::Chart),
            QueryName::ProfitChart => self
                .client
                .ai_chart(ChartQuery::MostProfitableProduct, &key.range)
                .await
                .map(QueryData::Chart),
            QueryName::RegionChart => self
                .client
                .ai_chart(ChartQuery::ByRegion, &key.range)
                .await
                .map(QueryData::Chart),
            QueryName::CustomerChart => self
                .client
                .ai_chart(ChartQuery::ByCustomer, &key.range)
                .await
                .map(QueryData::Chart),
            QueryName::SalesKpi => self
                .client
                .analytics_kpi(KpiMetric::TotalSales, &key.range)
                .await
                .map(QueryData::Kpi),
            QueryName::PurchasesKpi => self
                .client
                .analytics_kpi(KpiMetric::TotalPurchases, &key.range)
                .await
                .map(QueryData::Kpi),
            QueryName::QuantityKpi => self
                .client
                .analytics_kpi(KpiMetric::TotalQuantity, &key.range)
                .await
                .map(QueryData::Kpi),
        }
    }
}
