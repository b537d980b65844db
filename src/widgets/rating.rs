//! Star rating input: clicking star N stores N in the hidden form field and
//! repaints the row so the first N stars are filled.

use once_cell::sync::Lazy;

use crate::dom::{Document, NodeId};
use crate::runtime::{EventKind, PageEvent, WidgetCtx};
use crate::selector::Selector;

use super::PageWidget;

pub const CLASS_FILLED: &str = "fa-star";
pub const CLASS_EMPTY: &str = "fa-star-o";

static ROOT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".o_marketplace_rating").expect("rating root selector"));
static STAR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".o_rating_star").expect("star selector"));
static FIELD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input[name=\"rating\"]").expect("rating field selector"));

pub struct RatingWidget {
    root: NodeId,
}

impl RatingWidget {
    pub fn new(root: NodeId) -> Self {
        Self { root }
    }

    pub fn page_selector() -> &'static Selector {
        &ROOT
    }

    /// Repaints every star from `rating`, or from the stored field value
    /// when no explicit rating is given.
    fn paint(&self, doc: &mut Document, rating: Option<u32>) {
        let rating = rating.unwrap_or_else(|| self.stored_rating(doc));
        for (index, star) in doc.query_within(self.root, &STAR).into_iter().enumerate() {
            let filled = (index as u32) < rating;
            doc.toggle_class(star, CLASS_FILLED, filled);
            doc.toggle_class(star, CLASS_EMPTY, !filled);
        }
    }

    fn stored_rating(&self, doc: &Document) -> u32 {
        doc.query_within(self.root, &FIELD)
            .into_iter()
            .next()
            .and_then(|field| doc.attr(field, "value"))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

impl PageWidget for RatingWidget {
    fn on_mount(&mut self, ctx: &mut WidgetCtx<'_>) {
        // Reflect a rating already present in the form, e.g. when editing
        // an existing review.
        self.paint(ctx.doc, None);
    }

    fn on_event(&mut self, event: &PageEvent, ctx: &mut WidgetCtx<'_>) {
        if event.kind != EventKind::Click || !ctx.doc.matches(event.target, &STAR) {
            return;
        }
        let rating = match ctx
            .doc
            .data(event.target, "rating")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
        {
            Some(rating) => rating,
            None => {
                tracing::warn!("rating star without a numeric data-rating");
                return;
            }
        };
        if let Some(field) = ctx.doc.query_within(self.root, &FIELD).into_iter().next() {
            ctx.doc.set_attr(field, "value", &rating.to_string());
        }
        self.paint(ctx.doc, Some(rating));
    }
}
