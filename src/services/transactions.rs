//! Transactions browsing: filtered, paged listing plus the distinct values
//! that populate the filter dropdowns.

use std::sync::Arc;

use serde::Serialize;

use crate::client::{ApiClient, TransactionFilters};
use crate::error::ApiResult;
use crate::types::{Distincts, Pagination, TransactionPage};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsView {
    pub page: TransactionPage,
    pub filter_options: Distincts,
    pub export_csv: Option<String>,
}

/// Whether another page exists past this one.
pub fn has_more(pagination: &Pagination) -> bool {
    u64::from(pagination.offset) + pagination.returned < pagination.total
}

pub struct TransactionsService {
    client: Arc<ApiClient>,
}

impl TransactionsService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Load one page. A failed distincts lookup degrades to empty dropdowns
    /// rather than blocking the table.
    pub async fn browse(&self, filters: &TransactionFilters) -> ApiResult<TransactionsView> {
        let page = self.client.transactions(filters).await?;
        let filter_options = match self.client.distincts().await {
            Ok(d) => d,
            Err(e) => {
                log::warn!("distincts unavailable: {}", e);
                Distincts::default()
            }
        };
        let export_csv = self
            .client
            .export_transactions_url(filters)
            .map(|u| u.to_string())
            .ok();
        Ok(TransactionsView {
            page,
            filter_options,
            export_csv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more_pagination() {
        let mid = Pagination {
            limit: 50,
            offset: 0,
            total: 120,
            returned: 50,
        };
        assert!(has_more(&mid));

        let last = Pagination {
            limit: 50,
            offset: 100,
            total: 120,
            returned: 20,
        };
        assert!(!has_more(&last));

        let empty = Pagination::default();
        assert!(!has_more(&empty));
    }
}
