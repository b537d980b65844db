use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use marketplace_widgets::dashboard::{
    DashboardPanel, DashboardStats, ORDER_MODEL, PRODUCT_MODEL, VENDOR_MODEL,
};
use marketplace_widgets::services::{
    ActionService, AggregateRow, DataService, Domain, WindowAction,
};

/// Canned backend that records every query and can be told to fail the
/// n-th call.
struct ScriptedData {
    calls: Mutex<Vec<String>>,
    fail_at: Option<usize>,
    revenue_rows: Mutex<Vec<AggregateRow>>,
    count_offset: Mutex<u32>,
}

impl ScriptedData {
    fn new() -> Self {
        let mut row = Map::new();
        row.insert("amount_total".to_string(), json!(12845.5));
        Self {
            calls: Mutex::new(Vec::new()),
            fail_at: None,
            revenue_rows: Mutex::new(vec![AggregateRow(row)]),
            count_offset: Mutex::new(0),
        }
    }

    fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::new()
        }
    }

    fn with_revenue_rows(rows: Vec<AggregateRow>) -> Self {
        let scripted = Self::new();
        *scripted.revenue_rows.lock().unwrap() = rows;
        scripted
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn bump_counts(&self, by: u32) {
        *self.count_offset.lock().unwrap() += by;
    }

    fn record(&self, description: String) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(description);
        if self.fail_at == Some(index) {
            bail!("backend unreachable");
        }
        Ok(())
    }
}

impl DataService for ScriptedData {
    fn search_count(&self, model: &str, domain: &Domain) -> Result<u32> {
        self.record(format!("search_count {model} {domain}"))?;
        let base = match model {
            VENDOR_MODEL => 12,
            PRODUCT_MODEL => 87,
            ORDER_MODEL => 5,
            _ => 0,
        };
        Ok(base + *self.count_offset.lock().unwrap())
    }

    fn read_group(
        &self,
        model: &str,
        domain: &Domain,
        aggregates: &[&str],
        group_by: &[&str],
    ) -> Result<Vec<AggregateRow>> {
        self.record(format!(
            "read_group {model} {domain} {aggregates:?} {group_by:?}"
        ))?;
        Ok(self.revenue_rows.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct RecordingActions {
    actions: Mutex<Vec<Value>>,
}

impl RecordingActions {
    fn seen(&self) -> Vec<Value> {
        self.actions.lock().unwrap().clone()
    }
}

impl ActionService for RecordingActions {
    fn do_action(&self, action: &WindowAction) {
        self.actions.lock().unwrap().push(action.to_json());
    }
}

fn panel_with(data: Arc<ScriptedData>) -> DashboardPanel {
    DashboardPanel::new(data, Arc::new(RecordingActions::default()))
}

#[test]
fn load_populates_the_live_statistics() {
    let data = Arc::new(ScriptedData::new());
    let mut panel = panel_with(data.clone());
    assert!(panel.loading());

    panel.load();
    assert!(!panel.loading());

    let stats = panel.stats();
    assert_eq!(stats.active_vendors, 12);
    assert_eq!(stats.published_products, 87);
    assert_eq!(stats.total_revenue, Decimal::new(128_455, 1));
    assert_eq!(stats.pending_orders, 5);
    // Declared but not computed by any query.
    assert_eq!(stats.total_vendors, 0);
    assert_eq!(stats.total_products, 0);
    assert_eq!(stats.total_orders, 0);
    assert_eq!(stats.pending_commissions, 0);
}

#[test]
fn queries_run_in_a_fixed_order() {
    let data = Arc::new(ScriptedData::new());
    let mut panel = panel_with(data.clone());
    panel.load();

    assert_eq!(
        data.calls(),
        vec![
            "search_count marketplace.vendor [state = approved]",
            "search_count marketplace.product [state = published]",
            "read_group marketplace.order [state != cancelled] [\"amount_total:sum\"] []",
            "search_count marketplace.order [state = confirmed]",
        ]
    );
}

#[test]
fn failure_on_the_first_query_leaves_stats_untouched() {
    let data = Arc::new(ScriptedData::failing_at(0));
    let mut panel = panel_with(data.clone());
    panel.load();

    assert!(!panel.loading());
    assert_eq!(data.calls().len(), 1);
    assert_eq!(panel.stats(), &DashboardStats::default());
}

#[test]
fn failure_mid_sequence_keeps_the_numbers_already_fetched() {
    let data = Arc::new(ScriptedData::failing_at(2));
    let mut panel = panel_with(data.clone());
    panel.load();

    assert!(!panel.loading());
    assert_eq!(data.calls().len(), 3);
    let stats = panel.stats();
    assert_eq!(stats.active_vendors, 12);
    assert_eq!(stats.published_products, 87);
    assert_eq!(stats.total_revenue, Decimal::ZERO);
    assert_eq!(stats.pending_orders, 0);
}

#[test]
fn revenue_defaults_to_zero_without_aggregate_rows() {
    let data = Arc::new(ScriptedData::with_revenue_rows(Vec::new()));
    let mut panel = panel_with(data);
    panel.load();
    assert_eq!(panel.stats().total_revenue, Decimal::ZERO);

    // A row where no order matched carries a null sum.
    let mut row = Map::new();
    row.insert("amount_total".to_string(), Value::Null);
    let data = Arc::new(ScriptedData::with_revenue_rows(vec![AggregateRow(row)]));
    let mut panel = panel_with(data);
    panel.load();
    assert_eq!(panel.stats().total_revenue, Decimal::ZERO);
}

#[test]
fn reload_refreshes_from_the_service() {
    let data = Arc::new(ScriptedData::new());
    let mut panel = panel_with(data.clone());
    panel.load();
    assert_eq!(panel.stats().active_vendors, 12);

    data.bump_counts(100);
    panel.load();
    assert_eq!(panel.stats().active_vendors, 112);
    assert_eq!(panel.stats().pending_orders, 105);
    assert_eq!(data.calls().len(), 8);
}

#[test]
fn tiles_render_the_formatted_values() {
    let data = Arc::new(ScriptedData::new());
    let mut panel = panel_with(data);
    panel.load();

    let tiles = panel.tiles();
    let rendered: Vec<(&str, &str)> = tiles
        .iter()
        .map(|tile| (tile.label, tile.value.as_str()))
        .collect();
    assert_eq!(
        rendered,
        vec![
            ("Active Vendors", "12"),
            ("Published Products", "87"),
            ("Total Revenue", "12845.5"),
            ("Pending Orders", "5"),
        ]
    );
}

#[test]
fn tile_shortcuts_raise_the_documented_actions() {
    let actions = Arc::new(RecordingActions::default());
    let panel = DashboardPanel::new(Arc::new(ScriptedData::new()), actions.clone());

    panel.open_vendors();
    panel.open_products();
    panel.open_orders();

    assert_eq!(
        actions.seen(),
        vec![
            json!({
                "type": "ir.actions.act_window",
                "res_model": "marketplace.vendor",
                "views": [[false, "list"], [false, "form"]],
                "domain": [["state", "=", "approved"]],
            }),
            json!({
                "type": "ir.actions.act_window",
                "res_model": "marketplace.product",
                "views": [[false, "kanban"], [false, "list"], [false, "form"]],
                "domain": [["state", "=", "published"]],
            }),
            json!({
                "type": "ir.actions.act_window",
                "res_model": "marketplace.order",
                "views": [[false, "list"], [false, "form"]],
            }),
        ]
    );
}
