//! Product filter bar: two selects and a debounced search box.
//!
//! Category and sort changes navigate immediately; search keystrokes are
//! held for [`SEARCH_DEBOUNCE`] and only the last value reaches the URL.

use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

use crate::runtime::{EventKind, PageEvent, WidgetCtx};
use crate::schedule::TimerHandle;
use crate::selector::Selector;

use super::{PageWidget, TimerToken};

/// Quiet period after the last keystroke before the search navigates.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

const DEBOUNCE_TIMER: TimerToken = TimerToken(1);

static ROOT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".o_marketplace_product_filter").expect("filter root selector"));
static CATEGORY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("select[name=\"category\"]").expect("category selector"));
static SORT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("select[name=\"sort\"]").expect("sort selector"));
static SEARCH: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input[name=\"search\"]").expect("search selector"));

pub struct ProductFilterWidget {
    debounce: Option<TimerHandle>,
    pending_search: Option<String>,
}

impl ProductFilterWidget {
    pub fn new() -> Self {
        Self {
            debounce: None,
            pending_search: None,
        }
    }

    pub fn page_selector() -> &'static Selector {
        &ROOT
    }

    fn navigate_with(&self, ctx: &mut WidgetCtx<'_>, param: &str, value: &str) {
        let target = rewrite_query(ctx.doc.location(), param, value);
        tracing::debug!(param, value, %target, "product filter navigating");
        ctx.navigate(&target);
    }
}

impl PageWidget for ProductFilterWidget {
    fn on_event(&mut self, event: &PageEvent, ctx: &mut WidgetCtx<'_>) {
        match event.kind {
            EventKind::Change if ctx.doc.matches(event.target, &CATEGORY) => {
                let value = ctx.doc.attr(event.target, "value").unwrap_or("").to_string();
                self.navigate_with(ctx, "category", &value);
            }
            EventKind::Change if ctx.doc.matches(event.target, &SORT) => {
                let value = ctx.doc.attr(event.target, "value").unwrap_or("").to_string();
                self.navigate_with(ctx, "sort", &value);
            }
            EventKind::Input if ctx.doc.matches(event.target, &SEARCH) => {
                if let Some(handle) = self.debounce.take() {
                    ctx.cancel(handle);
                }
                let value = ctx.doc.attr(event.target, "value").unwrap_or("").to_string();
                self.pending_search = Some(value);
                self.debounce = Some(ctx.schedule(SEARCH_DEBOUNCE, DEBOUNCE_TIMER));
            }
            _ => {}
        }
    }

    fn on_timer(&mut self, timer: TimerToken, ctx: &mut WidgetCtx<'_>) {
        if timer != DEBOUNCE_TIMER {
            return;
        }
        self.debounce = None;
        if let Some(search) = self.pending_search.take() {
            self.navigate_with(ctx, "search", &search);
        }
    }

    fn on_unmount(&mut self, ctx: &mut WidgetCtx<'_>) {
        if let Some(handle) = self.debounce.take() {
            ctx.cancel(handle);
        }
        self.pending_search = None;
    }
}

impl Default for ProductFilterWidget {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns `current` with the query parameter `param` set to `value`, or
/// removed when `value` is empty. The first existing occurrence keeps its
/// position; duplicates are dropped; other parameters are untouched.
pub fn rewrite_query(current: &Url, param: &str, value: &str) -> Url {
    let pairs: Vec<(String, String)> = current
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut out: Vec<(String, String)> = Vec::with_capacity(pairs.len() + 1);
    let mut replaced = false;
    for (key, val) in pairs {
        if key == param {
            if !value.is_empty() && !replaced {
                out.push((key, value.to_string()));
                replaced = true;
            }
        } else {
            out.push((key, val));
        }
    }
    if !value.is_empty() && !replaced {
        out.push((param.to_string(), value.to_string()));
    }

    let mut url = current.clone();
    if out.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(out.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn sets_a_new_parameter() {
        let out = rewrite_query(&url("https://market.example/shop"), "category", "5");
        assert_eq!(out.as_str(), "https://market.example/shop?category=5");
    }

    #[test]
    fn replaces_in_place_and_keeps_neighbours() {
        let out = rewrite_query(
            &url("https://market.example/shop?category=2&sort=newest"),
            "category",
            "7",
        );
        assert_eq!(
            out.as_str(),
            "https://market.example/shop?category=7&sort=newest"
        );
    }

    #[test]
    fn empty_value_removes_the_parameter() {
        let out = rewrite_query(
            &url("https://market.example/shop?category=2&sort=newest"),
            "category",
            "",
        );
        assert_eq!(out.as_str(), "https://market.example/shop?sort=newest");
    }

    #[test]
    fn removing_the_last_parameter_clears_the_query() {
        let out = rewrite_query(&url("https://market.example/shop?search=a"), "search", "");
        assert_eq!(out.as_str(), "https://market.example/shop");
    }

    #[test]
    fn duplicate_occurrences_collapse_to_one() {
        let out = rewrite_query(
            &url("https://market.example/shop?sort=a&category=1&sort=b"),
            "sort",
            "c",
        );
        assert_eq!(out.as_str(), "https://market.example/shop?sort=c&category=1");
    }

    #[test]
    fn values_are_percent_encoded() {
        let out = rewrite_query(&url("https://market.example/shop"), "search", "blue lamp");
        assert_eq!(out.as_str(), "https://market.example/shop?search=blue+lamp");
    }
}
