//! Chart adapters: backend response shapes into one uniform series model.
//!
//! The shape of a chart payload is decided once, at the fetch boundary, by
//! tagging it as a `ChartData` variant. Everything downstream consumes the
//! uniform `ChartModel` and never re-inspects raw JSON. Missing numeric
//! values coerce to 0 for display only; the source payload is never mutated.

use serde::{Deserialize, Serialize};

use crate::types::{ChartQuery, SmartChart};

// ---------------------------------------------------------------------------
// Tagged payload variants
// ---------------------------------------------------------------------------

/// Time series as parallel date/amount arrays. The canned `sales_over_time`
/// query calls the second array `amounts`; `/analytics/timeseries` calls it
/// `values`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesData {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default, alias = "values")]
    pub amounts: Vec<Option<f64>>,
}

/// One labeled magnitude from a grouped aggregate (`by_region`,
/// `by_customer`, `/analytics/query`). The backend keeps the group column's
/// original name, so label and value both fall back to the first matching
/// field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPoint {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CategoryPoint {
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        for key in ["name", "category", "x"] {
            if let Some(serde_json::Value::String(s)) = self.extra.get(key) {
                return s.clone();
            }
        }
        self.extra
            .values()
            .find_map(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn magnitude(&self) -> f64 {
        if let Some(v) = self.value {
            return v;
        }
        if let Some(v) = self.extra.get("y").and_then(|v| v.as_f64()) {
            return v;
        }
        self.extra
            .values()
            .find_map(serde_json::Value::as_f64)
            .unwrap_or(0.0)
    }
}

/// One product's signed profit from `most_profitable_product`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductProfit {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub profit: Option<f64>,
}

/// A chart payload, tagged by shape at the fetch boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartData {
    Timeseries(TimeseriesData),
    Categorical { points: Vec<CategoryPoint> },
    Ranked { points: Vec<ProductProfit> },
}

impl ChartData {
    /// Classify the raw `data` field of an `/ai/query` response by the query
    /// that produced it. Returns `None` when the payload does not match the
    /// expected shape (logged, not fatal).
    pub fn from_ai_payload(query: ChartQuery, payload: serde_json::Value) -> Option<ChartData> {
        if payload.is_null() {
            return None;
        }
        let result = match query {
            ChartQuery::SalesOverTime => {
                serde_json::from_value::<TimeseriesData>(payload).map(ChartData::Timeseries)
            }
            ChartQuery::MostProfitableProduct => {
                serde_json::from_value::<Vec<ProductProfit>>(payload)
                    .map(|points| ChartData::Ranked { points })
            }
            ChartQuery::ByRegion | ChartQuery::ByCustomer => {
                serde_json::from_value::<Vec<CategoryPoint>>(payload)
                    .map(|points| ChartData::Categorical { points })
            }
        };
        match result {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("Unusable {} payload: {}", query.as_str(), e);
                None
            }
        }
    }

    /// Convert a smart-dashboard chart into a tagged payload by its declared
    /// type. Unknown types yield `None` and the view shows the chart's
    /// description instead.
    pub fn from_smart_chart(chart: &SmartChart) -> Option<ChartData> {
        match chart.chart_type.as_str() {
            "line" => Some(ChartData::Timeseries(TimeseriesData {
                dates: chart.data.iter().map(|p| p.axis_label()).collect(),
                amounts: chart.data.iter().map(|p| Some(p.magnitude())).collect(),
            })),
            "bar" => Some(ChartData::Ranked {
                points: chart
                    .data
                    .iter()
                    .map(|p| ProductProfit {
                        product: Some(p.axis_label()),
                        profit: Some(p.magnitude()),
                    })
                    .collect(),
            }),
            "pie" => Some(ChartData::Categorical {
                points: chart
                    .data
                    .iter()
                    .map(|p| CategoryPoint {
                        label: Some(p.axis_label()),
                        value: Some(p.magnitude()),
                        extra: serde_json::Map::new(),
                    })
                    .collect(),
            }),
            other => {
                log::debug!("Unknown smart chart type '{}', skipping", other);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Uniform model
// ---------------------------------------------------------------------------

/// Axis labels and series naming passed through to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub series_label: Option<String>,
}

impl ChartOptions {
    pub fn labeled(x: &str, y: &str) -> Self {
        Self {
            x_label: Some(x.to_string()),
            y_label: Some(y.to_string()),
            series_label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// Chart-library-agnostic model: one label per x position, one or more
/// aligned value series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartModel {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    #[serde(default)]
    pub options: ChartOptions,
}

impl ChartModel {
    /// True when there is anything worth drawing. Empty and all-zero series
    /// both render the explicit "no data" affordance, distinct from a
    /// loading skeleton.
    pub fn has_data(&self) -> bool {
        !self.labels.is_empty()
            && self
                .series
                .iter()
                .any(|s| s.values.iter().any(|v| *v != 0.0))
    }
}

/// Map a tagged payload into the uniform model, order-preserved.
pub fn to_chart_model(data: &ChartData, options: &ChartOptions) -> ChartModel {
    let series_label = |fallback: &str| {
        options
            .series_label
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    };

    match data {
        ChartData::Timeseries(ts) => ChartModel {
            labels: ts.dates.clone(),
            series: vec![Series {
                label: series_label("Amount"),
                values: ts.amounts.iter().map(|a| a.unwrap_or(0.0)).collect(),
            }],
            options: options.clone(),
        },
        ChartData::Categorical { points } => ChartModel {
            labels: points.iter().map(CategoryPoint::display_label).collect(),
            series: vec![Series {
                label: series_label("Value"),
                values: points.iter().map(CategoryPoint::magnitude).collect(),
            }],
            options: options.clone(),
        },
        ChartData::Ranked { points } => ChartModel {
            labels: points
                .iter()
                .map(|p| p.product.clone().unwrap_or_default())
                .collect(),
            series: vec![Series {
                label: series_label("Profit"),
                values: points.iter().map(|p| p.profit.unwrap_or(0.0)).collect(),
            }],
            options: options.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timeseries_preserves_length_and_order() {
        let data = ChartData::Timeseries(TimeseriesData {
            dates: vec!["2024-01-01".into(), "2024-01-02".into(), "2024-01-03".into()],
            amounts: vec![Some(10.0), None, Some(30.0)],
        });
        let model = to_chart_model(&data, &ChartOptions::labeled("Date", "Sales"));
        assert_eq!(model.labels.len(), 3);
        assert_eq!(model.labels[0], "2024-01-01");
        assert_eq!(model.labels[2], "2024-01-03");
        // null coerces to 0 for display
        assert_eq!(model.series[0].values, vec![10.0, 0.0, 30.0]);
        assert!(model.has_data());
    }

    #[test]
    fn test_categorical_falls_back_to_first_fields() {
        // grouped aggregates keep the group column's original name
        let points: Vec<CategoryPoint> = serde_json::from_value(json!([
            {"region": "EU", "amount": 500.0},
            {"region": "NA", "amount": 700.0}
        ]))
        .unwrap();
        let data = ChartData::Categorical { points };
        let model = to_chart_model(&data, &ChartOptions::default());
        assert_eq!(model.labels, vec!["EU", "NA"]);
        assert_eq!(model.series[0].values, vec![500.0, 700.0]);
    }

    #[test]
    fn test_ranked_preserves_backend_ordering() {
        let data = ChartData::Ranked {
            points: vec![
                ProductProfit {
                    product: Some("Widget".into()),
                    profit: Some(900.0),
                },
                ProductProfit {
                    product: Some("Gadget".into()),
                    profit: Some(-50.0),
                },
            ],
        };
        let model = to_chart_model(&data, &ChartOptions::labeled("Product", "Profit"));
        assert_eq!(model.labels, vec!["Widget", "Gadget"]);
        assert_eq!(model.series[0].values, vec![900.0, -50.0]);
    }

    #[test]
    fn test_all_zero_series_is_not_data() {
        let data = ChartData::Categorical {
            points: serde_json::from_value(json!([
                {"label": "A", "value": 0.0},
                {"label": "B", "value": 0.0}
            ]))
            .unwrap(),
        };
        let model = to_chart_model(&data, &ChartOptions::default());
        assert!(!model.has_data());

        let empty = to_chart_model(
            &ChartData::Categorical { points: Vec::new() },
            &ChartOptions::default(),
        );
        assert!(!empty.has_data());
    }

    #[test]
    fn test_ai_payload_classification() {
        let ts = ChartData::from_ai_payload(
            ChartQuery::SalesOverTime,
            json!({"dates": ["2024-01-01"], "amounts": [12.0]}),
        )
        .unwrap();
        assert!(matches!(ts, ChartData::Timeseries(_)));

        let ranked = ChartData::from_ai_payload(
            ChartQuery::MostProfitableProduct,
            json!([{"product": "Widget", "profit": 10.0}]),
        )
        .unwrap();
        assert!(matches!(ranked, ChartData::Ranked { .. }));

        let cat = ChartData::from_ai_payload(
            ChartQuery::ByRegion,
            json!([{"region": "EU", "amount": 5.0}]),
        )
        .unwrap();
        assert!(matches!(cat, ChartData::Categorical { .. }));

        assert!(ChartData::from_ai_payload(ChartQuery::ByRegion, json!(null)).is_none());
    }

    #[test]
    fn test_smart_chart_conversion_by_declared_type() {
        let chart: SmartChart = serde_json::from_value(json!({
            "title": "Revenue Over Time",
            "type": "line",
            "data": [
                {"x": "2024-01", "y": 100.0},
                {"x": "2024-02", "y": 150.0}
            ]
        }))
        .unwrap();
        let data = ChartData::from_smart_chart(&chart).unwrap();
        let model = to_chart_model(&data, &ChartOptions::default());
        assert_eq!(model.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(model.series[0].values, vec![100.0, 150.0]);

        let unknown: SmartChart =
            serde_json::from_value(json!({"title": "t", "type": "scatter", "data": []})).unwrap();
        assert!(ChartData::from_smart_chart(&unknown).is_none());
    }
}
