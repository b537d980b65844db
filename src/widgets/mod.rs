//! Storefront widgets and the registry that binds them to page markup.
//!
//! A widget class is a page selector plus a constructor; mounting walks the
//! registry and starts one instance per matching element. Adding a widget
//! means writing the type and registering it in
//! [`WidgetRegistry::with_defaults`].

pub mod cart;
pub mod filter;
pub mod rating;
pub mod tracking;

pub use cart::AddToCartWidget;
pub use filter::ProductFilterWidget;
pub use rating::RatingWidget;
pub use tracking::OrderTrackingWidget;

use anyhow::Result;

use crate::dom::NodeId;
use crate::runtime::{PageEvent, WidgetCtx};
use crate::selector::Selector;
use crate::services::{CartCallId, CartUpdateResponse};

/// Distinguishes the timers of one widget instance from each other.
/// Values are private to the widget that schedules them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(pub u32);

/// Lifecycle hooks of a mounted widget. All callbacks run on the page loop;
/// the default impls ignore the event so widgets override only what they
/// react to.
pub trait PageWidget {
    /// Runs once right after the widget is attached to its root element.
    fn on_mount(&mut self, _ctx: &mut WidgetCtx<'_>) {}

    /// A user interaction landed inside this widget's root.
    fn on_event(&mut self, _event: &PageEvent, _ctx: &mut WidgetCtx<'_>) {}

    /// A timer armed through [`WidgetCtx::schedule`] came due.
    fn on_timer(&mut self, _timer: TimerToken, _ctx: &mut WidgetCtx<'_>) {}

    /// A cart submission made by this widget finished.
    fn on_remote_result(
        &mut self,
        _call: CartCallId,
        _outcome: Result<CartUpdateResponse>,
        _ctx: &mut WidgetCtx<'_>,
    ) {
    }

    /// Runs once before the widget is dropped on page teardown.
    fn on_unmount(&mut self, _ctx: &mut WidgetCtx<'_>) {}
}

type WidgetCtor = fn(NodeId) -> Box<dyn PageWidget>;

/// One registered widget class.
pub struct WidgetEntry {
    name: &'static str,
    selector: &'static Selector,
    ctor: WidgetCtor,
}

impl WidgetEntry {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn selector(&self) -> &Selector {
        self.selector
    }

    pub fn build(&self, root: NodeId) -> Box<dyn PageWidget> {
        (self.ctor)(root)
    }
}

/// Registry of widget classes, scanned in registration order at mount time.
#[derive(Default)]
pub struct WidgetRegistry {
    entries: Vec<WidgetEntry>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in storefront widgets.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("product_filter", ProductFilterWidget::page_selector(), |_root| {
            Box::new(ProductFilterWidget::new())
        });
        registry.register("add_to_cart", AddToCartWidget::page_selector(), |root| {
            Box::new(AddToCartWidget::new(root))
        });
        registry.register("product_rating", RatingWidget::page_selector(), |root| {
            Box::new(RatingWidget::new(root))
        });
        registry.register("order_tracking", OrderTrackingWidget::page_selector(), |root| {
            Box::new(OrderTrackingWidget::new(root))
        });
        registry
    }

    pub fn register(
        &mut self,
        name: &'static str,
        selector: &'static Selector,
        ctor: WidgetCtor,
    ) {
        self.entries.push(WidgetEntry {
            name,
            selector,
            ctor,
        });
    }

    pub fn entries(&self) -> &[WidgetEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }
}
