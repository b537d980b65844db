//! Marketplace overview panel: four live statistics plus shortcuts into the
//! backend record views.

use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;

use crate::services::{ActionService, DataService, Domain, ViewMode, WindowAction};

pub const VENDOR_MODEL: &str = "marketplace.vendor";
pub const PRODUCT_MODEL: &str = "marketplace.product";
pub const ORDER_MODEL: &str = "marketplace.order";

/// Snapshot of the numbers the panel shows. The `total_*` and commission
/// counters exist in the reporting contract but are not computed by any
/// query yet, so they always read zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_vendors: u32,
    pub active_vendors: u32,
    pub total_products: u32,
    pub published_products: u32,
    pub total_orders: u32,
    pub total_revenue: Decimal,
    pub pending_orders: u32,
    pub pending_commissions: u32,
}

/// One rendered tile: a caption and its formatted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatTile {
    pub label: &'static str,
    pub value: String,
}

pub struct DashboardPanel {
    data: Arc<dyn DataService>,
    actions: Arc<dyn ActionService>,
    stats: DashboardStats,
    loading: bool,
}

impl DashboardPanel {
    /// A fresh panel is in the loading state until [`Self::load`] ran.
    pub fn new(data: Arc<dyn DataService>, actions: Arc<dyn ActionService>) -> Self {
        Self {
            data,
            actions,
            stats: DashboardStats::default(),
            loading: true,
        }
    }

    pub fn stats(&self) -> &DashboardStats {
        &self.stats
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Runs the four statistics queries in order. The first failing query
    /// aborts the refresh: later statistics keep their previous values and
    /// the error goes to the log, but the panel still leaves the loading
    /// state so stale numbers are shown over no numbers.
    pub fn load(&mut self) {
        if let Err(error) = self.fetch_stats() {
            tracing::error!(%error, "dashboard statistics refresh failed");
        }
        self.loading = false;
    }

    fn fetch_stats(&mut self) -> Result<()> {
        self.stats.active_vendors = self
            .data
            .search_count(VENDOR_MODEL, &Domain::new().field_eq("state", "approved"))?;
        self.stats.published_products = self
            .data
            .search_count(PRODUCT_MODEL, &Domain::new().field_eq("state", "published"))?;

        let rows = self.data.read_group(
            ORDER_MODEL,
            &Domain::new().field_ne("state", "cancelled"),
            &["amount_total:sum"],
            &[],
        )?;
        self.stats.total_revenue = rows
            .first()
            .and_then(|row| row.decimal("amount_total"))
            .unwrap_or_default();

        self.stats.pending_orders = self
            .data
            .search_count(ORDER_MODEL, &Domain::new().field_eq("state", "confirmed"))?;
        Ok(())
    }

    /// Tiles in display order, for whatever shell renders the panel.
    pub fn tiles(&self) -> [StatTile; 4] {
        [
            StatTile {
                label: "Active Vendors",
                value: self.stats.active_vendors.to_string(),
            },
            StatTile {
                label: "Published Products",
                value: self.stats.published_products.to_string(),
            },
            StatTile {
                label: "Total Revenue",
                value: self.stats.total_revenue.to_string(),
            },
            StatTile {
                label: "Pending Orders",
                value: self.stats.pending_orders.to_string(),
            },
        ]
    }

    /// Opens the approved vendors in a list view.
    pub fn open_vendors(&self) {
        self.actions.do_action(
            &WindowAction::new(VENDOR_MODEL, &[ViewMode::List, ViewMode::Form])
                .with_domain(Domain::new().field_eq("state", "approved")),
        );
    }

    /// Opens the published products, kanban first.
    pub fn open_products(&self) {
        self.actions.do_action(
            &WindowAction::new(
                PRODUCT_MODEL,
                &[ViewMode::Kanban, ViewMode::List, ViewMode::Form],
            )
            .with_domain(Domain::new().field_eq("state", "published")),
        );
    }

    /// Opens the order list unfiltered, cancelled orders included.
    pub fn open_orders(&self) {
        self.actions
            .do_action(&WindowAction::new(ORDER_MODEL, &[ViewMode::List, ViewMode::Form]));
    }
}
