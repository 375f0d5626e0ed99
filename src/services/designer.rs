//! AI designer flows: natural-language questions and generated dashboard
//! layouts, each recorded to its history list.

use std::sync::Arc;

use serde::Serialize;

use crate::charts::{to_chart_model, ChartData, ChartModel, ChartOptions};
use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::history::{ChatRecord, DashboardRecord, HistoryEntry, HistoryStore};
use crate::types::{ChartQuery, DashboardConfigResponse, DateRange};

/// Render-ready answer to a natural-language question. The answer text and
/// `ai_error` are independent: a degraded provider can still chart the data.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NlAnswer {
    pub narrative: Option<String>,
    pub ai_error: Option<String>,
    pub chart_type: Option<String>,
    pub model: Option<ChartModel>,
}

pub struct DesignerService {
    client: Arc<ApiClient>,
    history: HistoryStore,
}

impl DesignerService {
    pub fn new(client: Arc<ApiClient>, history: HistoryStore) -> Self {
        Self { client, history }
    }

    /// Ask a free-form question; the backend resolves it to one of the canned
    /// queries when it can, and the payload is charted accordingly.
    pub async fn ask(&self, prompt: &str, range: &DateRange) -> ApiResult<NlAnswer> {
        let answer = self.client.nl_query(prompt, range).await?;
        let resolved = answer.query.as_deref().and_then(ChartQuery::from_name);
        let model = resolved
            .and_then(|q| ChartData::from_ai_payload(q, answer.data))
            .map(|data| to_chart_model(&data, &ChartOptions::default()));

        self.history.add_chat(ChatRecord {
            query: prompt.to_string(),
            answer: answer.narrative.clone(),
            ai_error: answer.ai_error.clone(),
            chart_type: resolved.map(|q| q.as_str().to_string()),
        });

        Ok(NlAnswer {
            narrative: answer.narrative,
            ai_error: answer.ai_error,
            chart_type: resolved.map(|q| q.as_str().to_string()),
            model,
        })
    }

    /// Generate a dashboard layout from a prompt. A usable config is saved
    /// even when it arrives alongside an advisory `ai_error`.
    pub async fn generate(
        &self,
        name: &str,
        prompt: &str,
    ) -> ApiResult<DashboardConfigResponse> {
        let response = self.client.dashboard_config(prompt).await?;
        if response.config.is_some() {
            self.history.add_dashboard(DashboardRecord {
                name: name.to_string(),
                prompt: prompt.to_string(),
                config: response.config.clone(),
            });
        } else {
            log::info!("dashboard config generation returned no config");
        }
        Ok(response)
    }

    pub fn chat_history(&self) -> Vec<HistoryEntry<ChatRecord>> {
        self.history.chat()
    }

    pub fn clear_chat_history(&self) {
        self.history.clear_chat();
    }

    pub fn saved_dashboards(&self) -> Vec<HistoryEntry<DashboardRecord>> {
        self.history.dashboards()
    }

    pub fn remove_saved_dashboard(&self, id: &str) -> Vec<HistoryEntry<DashboardRecord>> {
        self.history.remove_dashboard(id)
    }
}
