//! KPI derivation: one displayed value per slot from up to three optional
//! sources, resolved by strict precedence.
//!
//! Precedence per slot: authoritative summary field, then the directly
//! computed aggregate, then a keyword-matched smart-analytics KPI, then the
//! placeholder. The keyword match is deliberately lenient (substring against
//! lowercased titles); the backend's smart titles are free-form and this
//! layer preserves that best-effort behavior rather than tightening it.

use crate::types::{scalar_to_display, KpiSlot, SmartDashboard, SmartKpi, Trend, KPI_PLACEHOLDER};
use crate::util::{fmt_count, fmt_currency};

pub const QUANTITY_KEYWORDS: &[&str] = &["quantity", "qty", "units"];
pub const SALES_KEYWORDS: &[&str] = &["total sales", "sales", "revenue", "amount"];
pub const PURCHASES_KEYWORDS: &[&str] = &["purchase", "purchases", "cost", "expenses"];
pub const PROFIT_KEYWORDS: &[&str] = &["profit"];
pub const LOSS_KEYWORDS: &[&str] = &["loss"];

/// The optional inputs feeding one dashboard's KPI row.
#[derive(Debug, Clone, Copy, Default)]
pub struct KpiSources<'a> {
    /// Authoritative business summary, when the backend has a fixed schema.
    pub summary: Option<&'a crate::types::SummaryReport>,
    /// Heuristic KPI set derived from an arbitrary uploaded dataset.
    pub smart: Option<&'a SmartDashboard>,
    /// Deterministic aggregates from `/analytics/kpi`, present only when the
    /// corresponding request succeeded.
    pub sales_aggregate: Option<f64>,
    pub purchases_aggregate: Option<f64>,
    pub quantity_aggregate: Option<f64>,
}

/// First smart KPI whose lowercased title contains any of the keywords.
pub fn find_smart_kpi<'a>(
    smart: Option<&'a SmartDashboard>,
    keywords: &[&str],
) -> Option<&'a SmartKpi> {
    let kpis = &smart?.kpis;
    kpis.iter().find(|kpi| {
        let title = kpi.title.to_lowercase();
        keywords.iter().any(|kw| title.contains(kw))
    })
}

fn smart_value(kpi: &SmartKpi) -> String {
    kpi.value
        .as_ref()
        .map(scalar_to_display)
        .unwrap_or_else(|| KPI_PLACEHOLDER.to_string())
}

fn smart_trend(kpi: &SmartKpi) -> Trend {
    kpi.trend.unwrap_or(Trend::None)
}

fn fmt_plain_number(value: f64) -> String {
    if value >= 0.0 && value.fract() == 0.0 {
        fmt_count(value as u64)
    } else {
        format!("{}", value)
    }
}

/// Derive the four business KPI slots (Quantity, Sales, Purchases,
/// Profit/Loss).
///
/// Profit never double-counts: a present signed summary `profit` produces one
/// combined slot carrying both value and trend, and any smart profit/loss
/// KPIs are suppressed. Trend arrows appear only when the winning source
/// states a sign.
pub fn derive_business_kpis(sources: &KpiSources) -> Vec<KpiSlot> {
    let mut slots = Vec::with_capacity(5);

    // Quantity
    let quantity_summary = sources.summary.and_then(|s| s.total_quantity);
    let slot = if let Some(q) = quantity_summary {
        KpiSlot::new("Quantity", fmt_plain_number(q), Trend::None)
    } else if let Some(q) = sources.quantity_aggregate {
        KpiSlot::new("Quantity", fmt_plain_number(q), Trend::None)
    } else if let Some(kpi) = find_smart_kpi(sources.smart, QUANTITY_KEYWORDS) {
        KpiSlot::new("Quantity", smart_value(kpi), smart_trend(kpi))
    } else {
        KpiSlot::placeholder("Quantity")
    };
    slots.push(slot);

    // Sales: only the summary states a sign, so it alone sets the arrow
    let slot = if let Some(total) = sources.summary.and_then(|s| s.total_sales) {
        let trend = if total >= 0.0 {
            Trend::Positive
        } else {
            Trend::None
        };
        KpiSlot::new("Sales", fmt_currency(total), trend)
    } else if let Some(total) = sources.sales_aggregate {
        KpiSlot::new("Sales", fmt_currency(total), Trend::None)
    } else if let Some(kpi) = find_smart_kpi(sources.smart, SALES_KEYWORDS) {
        KpiSlot::new("Sales", smart_value(kpi), smart_trend(kpi))
    } else {
        KpiSlot::placeholder("Sales")
    };
    slots.push(slot);

    // Purchases
    let slot = if let Some(total) = sources.summary.and_then(|s| s.total_purchases) {
        KpiSlot::new("Purchases", fmt_currency(total), Trend::None)
    } else if let Some(total) = sources.purchases_aggregate {
        KpiSlot::new("Purchases", fmt_currency(total), Trend::None)
    } else if let Some(kpi) = find_smart_kpi(sources.smart, PURCHASES_KEYWORDS) {
        KpiSlot::new("Purchases", smart_value(kpi), smart_trend(kpi))
    } else {
        KpiSlot::placeholder("Purchases")
    };
    slots.push(slot);

    // Profit / loss
    if let Some(profit) = sources.summary.and_then(|s| s.profit) {
        let trend = if profit >= 0.0 {
            Trend::Positive
        } else {
            Trend::Negative
        };
        slots.push(KpiSlot::new("Profit / (Loss)", fmt_currency(profit), trend));
    } else {
        let profit_kpi = find_smart_kpi(sources.smart, PROFIT_KEYWORDS);
        let loss_kpi = find_smart_kpi(sources.smart, LOSS_KEYWORDS)
            .filter(|kpi| !kpi.title.to_lowercase().contains("profit"));
        match (profit_kpi, loss_kpi) {
            (None, None) => slots.push(KpiSlot::placeholder("Profit")),
            (profit, loss) => {
                if let Some(kpi) = profit {
                    slots.push(KpiSlot::new("Profit", smart_value(kpi), smart_trend(kpi)));
                }
                if let Some(kpi) = loss {
                    slots.push(KpiSlot::new("Loss", smart_value(kpi), smart_trend(kpi)));
                }
            }
        }
    }

    slots
}

/// First four smart KPIs as display slots, for the smart-analytics fallback
/// row.
pub fn smart_kpi_slots(smart: &SmartDashboard) -> Vec<KpiSlot> {
    smart
        .kpis
        .iter()
        .take(4)
        .map(|kpi| KpiSlot::new(kpi.title.clone(), smart_value(kpi), smart_trend(kpi)))
        .collect()
}
