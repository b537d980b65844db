//! Add-to-cart button: submits the update, reflects the outcome on the
//! button and the cart badge, then returns to idle after a fixed delay.
//!
//! The state machine, not the disabled attribute, is what blocks repeat
//! submissions: clicks are ignored in every state but [`CartButtonState::Idle`],
//! so a submission in flight or a feedback phase cannot start another call.

use anyhow::Result;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::dom::{Document, NodeId};
use crate::runtime::{EventKind, PageEvent, WidgetCtx};
use crate::schedule::TimerHandle;
use crate::selector::Selector;
use crate::services::{CartCallId, CartUpdateRequest, CartUpdateResponse};

use super::{PageWidget, TimerToken};

/// How long success or failure feedback stays on the button.
pub const RESET_DELAY: Duration = Duration::from_millis(2000);

pub const LABEL_BUSY: &str = "Adding...";
pub const LABEL_DONE: &str = "Added!";
pub const LABEL_ERROR: &str = "Error";
pub const LABEL_IDLE: &str = "Add to Cart";

pub const CLASS_SUCCESS: &str = "btn-success";
pub const CLASS_FAILURE: &str = "btn-danger";

const RESET_TIMER: TimerToken = TimerToken(1);

static ROOT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".o_marketplace_add_to_cart").expect("cart button selector"));
static PRODUCT_CARD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".o_product_card").expect("product card selector"));
static QUANTITY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input[name=\"quantity\"]").expect("quantity selector"));
static CART_BADGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".o_cart_quantity").expect("cart badge selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CartButtonState {
    Idle,
    Submitting,
    Success,
    Failure,
}

pub struct AddToCartWidget {
    root: NodeId,
    state: CartButtonState,
    call: Option<CartCallId>,
    reset: Option<TimerHandle>,
}

impl AddToCartWidget {
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            state: CartButtonState::Idle,
            call: None,
            reset: None,
        }
    }

    pub fn page_selector() -> &'static Selector {
        &ROOT
    }

    fn submit(&mut self, ctx: &mut WidgetCtx<'_>) {
        let product_id = ctx
            .doc
            .data(self.root, "product-id")
            .and_then(|raw| raw.trim().parse::<u64>().ok());
        let product_id = match product_id {
            Some(id) => id,
            None => {
                tracing::error!("add-to-cart button without a usable product id");
                self.show_failure(ctx);
                return;
            }
        };
        let add_qty = read_quantity(ctx.doc, self.root);

        self.state = CartButtonState::Submitting;
        ctx.doc.set_attr(self.root, "disabled", "disabled");
        ctx.doc.set_text(self.root, LABEL_BUSY);
        let request = CartUpdateRequest {
            product_id,
            add_qty,
        };
        let call = ctx.submit_cart_update(&request);
        self.call = Some(call);
        tracing::debug!(call, product_id, add_qty, "cart update submitted");
    }

    fn show_success(&mut self, quantity: u32, ctx: &mut WidgetCtx<'_>) {
        for badge in ctx.doc.query_all(&CART_BADGE) {
            ctx.doc.set_text(badge, &quantity.to_string());
        }
        ctx.doc.set_text(self.root, LABEL_DONE);
        ctx.doc.add_class(self.root, CLASS_SUCCESS);
        self.state = CartButtonState::Success;
        self.arm_reset(ctx);
    }

    fn show_failure(&mut self, ctx: &mut WidgetCtx<'_>) {
        ctx.doc.set_attr(self.root, "disabled", "disabled");
        ctx.doc.set_text(self.root, LABEL_ERROR);
        ctx.doc.add_class(self.root, CLASS_FAILURE);
        self.state = CartButtonState::Failure;
        self.arm_reset(ctx);
    }

    fn arm_reset(&mut self, ctx: &mut WidgetCtx<'_>) {
        if let Some(handle) = self.reset.take() {
            ctx.cancel(handle);
        }
        self.reset = Some(ctx.schedule(RESET_DELAY, RESET_TIMER));
    }
}

impl PageWidget for AddToCartWidget {
    fn on_event(&mut self, event: &PageEvent, ctx: &mut WidgetCtx<'_>) {
        if event.kind != EventKind::Click || event.target != self.root {
            return;
        }
        if self.state != CartButtonState::Idle {
            tracing::debug!(state = ?self.state, "click ignored while busy");
            return;
        }
        self.submit(ctx);
    }

    fn on_remote_result(
        &mut self,
        call: CartCallId,
        outcome: Result<CartUpdateResponse>,
        ctx: &mut WidgetCtx<'_>,
    ) {
        if self.call != Some(call) {
            tracing::debug!(call, "stale cart completion ignored");
            return;
        }
        self.call = None;
        match outcome {
            Ok(response) => match response.cart_quantity {
                Some(quantity) if quantity > 0 => self.show_success(quantity, ctx),
                _ => {
                    tracing::error!(call, "cart update reply carried no cart quantity");
                    self.show_failure(ctx);
                }
            },
            Err(error) => {
                tracing::error!(call, %error, "cart update failed");
                self.show_failure(ctx);
            }
        }
    }

    fn on_timer(&mut self, timer: TimerToken, ctx: &mut WidgetCtx<'_>) {
        if timer != RESET_TIMER {
            return;
        }
        self.reset = None;
        self.state = CartButtonState::Idle;
        ctx.doc.set_text(self.root, LABEL_IDLE);
        ctx.doc.remove_class(self.root, CLASS_SUCCESS);
        ctx.doc.remove_class(self.root, CLASS_FAILURE);
        ctx.doc.remove_attr(self.root, "disabled");
    }

    fn on_unmount(&mut self, ctx: &mut WidgetCtx<'_>) {
        if let Some(handle) = self.reset.take() {
            ctx.cancel(handle);
        }
    }
}

/// Reads the quantity input of the surrounding product card. Missing input,
/// blank value or garbage all fall back to 1; an explicit number is taken
/// as-is.
fn read_quantity(doc: &Document, button: NodeId) -> u32 {
    let input = doc
        .closest(button, &PRODUCT_CARD)
        .and_then(|card| doc.query_within(card, &QUANTITY).into_iter().next());
    let raw = input
        .and_then(|node| doc.attr(node, "value"))
        .map(str::trim)
        .unwrap_or("");
    if raw.is_empty() {
        return 1;
    }
    raw.parse().unwrap_or(1)
}
