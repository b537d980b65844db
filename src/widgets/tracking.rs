//! Order tracking strip: marks progress steps according to the order state
//! carried on the container element.

use once_cell::sync::Lazy;

use crate::dom::{Document, NodeId};
use crate::runtime::WidgetCtx;
use crate::selector::Selector;

use super::PageWidget;

/// Fulfilment pipeline in display order. Cancelled orders are not part of
/// the strip; an unknown or missing state leaves every step unmarked.
pub const ORDER_STATES: [&str; 6] = [
    "draft",
    "confirmed",
    "processing",
    "shipped",
    "delivered",
    "done",
];

pub const CLASS_ACTIVE: &str = "active";
pub const CLASS_COMPLETED: &str = "completed";

static ROOT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".o_marketplace_order_tracking").expect("tracking root selector"));
static STEP: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".o_tracking_step").expect("tracking step selector"));

/// Position of `state` in the pipeline, `None` for states outside it.
pub fn step_index(state: &str) -> Option<usize> {
    ORDER_STATES.iter().position(|known| *known == state)
}

pub struct OrderTrackingWidget {
    root: NodeId,
}

impl OrderTrackingWidget {
    pub fn new(root: NodeId) -> Self {
        Self { root }
    }

    pub fn page_selector() -> &'static Selector {
        &ROOT
    }

    fn paint(&self, doc: &mut Document) {
        let current = doc.data(self.root, "order-state").and_then(step_index);
        if current.is_none() {
            tracing::debug!("order tracking without a known order state");
        }
        for (index, step) in doc.query_within(self.root, &STEP).into_iter().enumerate() {
            let active = current.map_or(false, |c| index <= c);
            let completed = current.map_or(false, |c| index < c);
            doc.toggle_class(step, CLASS_ACTIVE, active);
            doc.toggle_class(step, CLASS_COMPLETED, completed);
        }
    }
}

impl PageWidget for OrderTrackingWidget {
    fn on_mount(&mut self, ctx: &mut WidgetCtx<'_>) {
        self.paint(ctx.doc);
    }
}
