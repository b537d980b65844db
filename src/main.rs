//! Headless demo: builds the sample storefront page, mounts the widgets
//! and walks through the interactions the marketplace front end supports,
//! logging what changes on the page. Runs entirely offline against canned
//! services.

use std::collections::HashSet;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map};
use url::Url;

use marketplace_widgets::dashboard::{DashboardPanel, ORDER_MODEL, PRODUCT_MODEL, VENDOR_MODEL};
use marketplace_widgets::dom::{Document, NodeId};
use marketplace_widgets::logging;
use marketplace_widgets::runtime::{PageRuntime, PageServices};
use marketplace_widgets::selector::Selector;
use marketplace_widgets::services::{
    AggregateRow, CartCallId, CartCompletion, CartTransport, CartUpdateRequest,
    CartUpdateResponse, DataService, Domain, LoggingActionService, LoggingNavigator,
};
use marketplace_widgets::settings::Settings;
use marketplace_widgets::widgets::cart::RESET_DELAY;
use marketplace_widgets::widgets::filter::SEARCH_DEBOUNCE;
use marketplace_widgets::widgets::tracking::ORDER_STATES;
use marketplace_widgets::widgets::WidgetRegistry;

fn main() -> Result<()> {
    let settings = Settings::load("settings.json")?;
    logging::init(settings.debug_logging);

    run_dashboard()?;
    run_storefront(&settings)?;
    Ok(())
}

/// Loads the overview panel from canned statistics and fires the tile
/// shortcuts, which end up in the log as act-window requests.
fn run_dashboard() -> Result<()> {
    tracing::info!("--- marketplace dashboard ---");
    let mut panel = DashboardPanel::new(Arc::new(CannedStats), Arc::new(LoggingActionService));
    panel.load();
    for tile in panel.tiles() {
        tracing::info!("{:>10}  {}", tile.value, tile.label);
    }
    panel.open_vendors();
    panel.open_products();
    panel.open_orders();
    Ok(())
}

fn run_storefront(settings: &Settings) -> Result<()> {
    tracing::info!("--- storefront page ---");
    let doc = build_storefront(settings.shop_url());
    let (transport, completions) = DemoCartTransport::new(&[77]);
    let mut page = PageRuntime::new(
        doc,
        PageServices {
            cart: Arc::new(transport),
            navigator: Arc::new(LoggingNavigator),
        },
    );
    let mounted = page.mount_all(&WidgetRegistry::with_defaults());
    tracing::info!(mounted, "storefront widgets mounted");

    // Debounced search: two quick keystrokes, one navigation.
    let search = query_one(&page, "input[name=\"search\"]")?;
    page.input_value(search, "la");
    page.advance(Duration::from_millis(200));
    page.input_value(search, "lamp");
    page.advance(SEARCH_DEBOUNCE);

    // Select changes navigate immediately.
    let category = query_one(&page, "select[name=\"category\"]")?;
    page.change_value(category, "3");

    let buttons = query_all(&page, ".o_marketplace_add_to_cart")?;
    let in_stock = *buttons.first().context("first cart button missing")?;
    let sold_out = *buttons.get(1).context("second cart button missing")?;
    let badge = query_one(&page, ".o_cart_quantity")?;

    // Successful add: quantity 2 from the card input, badge follows.
    page.click(in_stock);
    deliver_completions(&mut page, &completions);
    tracing::info!(
        button = page.document().text(in_stock),
        badge = page.document().text(badge),
        "after adding the first product"
    );
    page.advance(RESET_DELAY);
    tracing::info!(button = page.document().text(in_stock), "after the reset delay");

    // Failed add: the second product is out of stock.
    page.click(sold_out);
    deliver_completions(&mut page, &completions);
    tracing::info!(
        button = page.document().text(sold_out),
        badge = page.document().text(badge),
        "after trying the sold-out product"
    );
    page.advance(RESET_DELAY);

    // Review rating: click the fourth star.
    let stars = query_all(&page, ".o_rating_star")?;
    let fourth = *stars.get(3).context("fourth star missing")?;
    page.click(fourth);
    let field = query_one(&page, "input[name=\"rating\"]")?;
    tracing::info!(
        rating = page.document().attr(field, "value").unwrap_or("-"),
        stars = %star_row(page.document(), &stars),
        "after picking a rating"
    );

    // Order tracking strip, painted at mount time.
    for step in query_all(&page, ".o_tracking_step")? {
        tracing::info!(
            step = page.document().text(step),
            classes = %classes_of(page.document(), step),
            "tracking step"
        );
    }

    page.unmount_all();
    tracing::info!("storefront page torn down");
    Ok(())
}

/// Sample page covering every widget, the way the marketplace shop
/// templates lay them out.
fn build_storefront(location: Url) -> Document {
    let mut doc = Document::new(location);
    let root = doc.root();

    let nav = doc.create_element(root, "nav");
    let badge = doc.create_element(nav, "span");
    doc.add_class(badge, "o_cart_quantity");
    doc.set_text(badge, "0");

    let filter = doc.create_element(root, "form");
    doc.add_class(filter, "o_marketplace_product_filter");
    let category = doc.create_element(filter, "select");
    doc.set_attr(category, "name", "category");
    let sort = doc.create_element(filter, "select");
    doc.set_attr(sort, "name", "sort");
    let search = doc.create_element(filter, "input");
    doc.set_attr(search, "name", "search");
    doc.set_attr(search, "placeholder", "Search products...");

    add_product_card(&mut doc, 31, Some("2"));
    add_product_card(&mut doc, 77, None);

    let rating = doc.create_element(root, "div");
    doc.add_class(rating, "o_marketplace_rating");
    let field = doc.create_element(rating, "input");
    doc.set_attr(field, "name", "rating");
    doc.set_attr(field, "type", "hidden");
    doc.set_attr(field, "value", "0");
    for value in 1..=5 {
        let star = doc.create_element(rating, "span");
        doc.add_class(star, "o_rating_star");
        doc.set_attr(star, "data-rating", &value.to_string());
    }

    let tracking = doc.create_element(root, "div");
    doc.add_class(tracking, "o_marketplace_order_tracking");
    doc.set_attr(tracking, "data-order-state", "processing");
    for state in ORDER_STATES {
        let step = doc.create_element(tracking, "div");
        doc.add_class(step, "o_tracking_step");
        doc.set_text(step, state);
    }

    doc
}

fn add_product_card(doc: &mut Document, product_id: u64, quantity: Option<&str>) {
    let card = doc.create_element(doc.root(), "div");
    doc.add_class(card, "o_product_card");
    if let Some(quantity) = quantity {
        let input = doc.create_element(card, "input");
        doc.set_attr(input, "name", "quantity");
        doc.set_attr(input, "value", quantity);
    }
    let button = doc.create_element(card, "button");
    doc.add_class(button, "o_marketplace_add_to_cart");
    doc.add_class(button, "btn");
    doc.set_attr(button, "data-product-id", &product_id.to_string());
    doc.set_text(button, "Add to Cart");
}

fn query_one(page: &PageRuntime, selector: &str) -> Result<NodeId> {
    let selector = Selector::parse(selector)?;
    page.document()
        .query(&selector)
        .ok_or_else(|| anyhow!("no element matches {selector:?}"))
}

fn query_all(page: &PageRuntime, selector: &str) -> Result<Vec<NodeId>> {
    let selector = Selector::parse(selector)?;
    Ok(page.document().query_all(&selector))
}

fn deliver_completions(page: &mut PageRuntime, completions: &Receiver<CartCompletion>) {
    while let Ok((call, outcome)) = completions.try_recv() {
        page.complete_cart_call(call, outcome);
    }
}

fn classes_of(doc: &Document, node: NodeId) -> String {
    doc.classes(node).collect::<Vec<_>>().join(" ")
}

/// Compact picture of the star row, `*` for filled and `.` for empty.
fn star_row(doc: &Document, stars: &[NodeId]) -> String {
    stars
        .iter()
        .map(|star| {
            if doc.has_class(*star, "fa-star") {
                '*'
            } else {
                '.'
            }
        })
        .collect()
}

/// Fixed dashboard numbers, in place of a live backend.
struct CannedStats;

impl DataService for CannedStats {
    fn search_count(&self, model: &str, domain: &Domain) -> Result<u32> {
        let count = match model {
            VENDOR_MODEL => 12,
            PRODUCT_MODEL => 87,
            ORDER_MODEL => 5,
            _ => 0,
        };
        tracing::debug!(model, %domain, count, "canned search_count");
        Ok(count)
    }

    fn read_group(
        &self,
        _model: &str,
        _domain: &Domain,
        _aggregates: &[&str],
        _group_by: &[&str],
    ) -> Result<Vec<AggregateRow>> {
        let mut row = Map::new();
        row.insert("amount_total".to_string(), json!(48_250.75));
        Ok(vec![AggregateRow(row)])
    }
}

/// Cart transport with a stock list: known products accumulate into a
/// running total, sold-out ones fail. Completions arrive on the returned
/// channel, which the demo drains between interactions.
struct DemoCartTransport {
    // Sender is not Sync; the mutex makes the transport shareable.
    completions: Mutex<Sender<CartCompletion>>,
    cart_total: Mutex<u32>,
    sold_out: HashSet<u64>,
}

impl DemoCartTransport {
    fn new(sold_out: &[u64]) -> (Self, Receiver<CartCompletion>) {
        let (tx, rx) = channel();
        (
            Self {
                completions: Mutex::new(tx),
                cart_total: Mutex::new(0),
                sold_out: sold_out.iter().copied().collect(),
            },
            rx,
        )
    }
}

impl CartTransport for DemoCartTransport {
    fn submit(&self, call: CartCallId, request: &CartUpdateRequest) {
        let outcome = if self.sold_out.contains(&request.product_id) {
            Err(anyhow!("product {} is out of stock", request.product_id))
        } else {
            let mut total = self.cart_total.lock().unwrap();
            *total += request.add_qty;
            Ok(CartUpdateResponse {
                cart_quantity: Some(*total),
            })
        };
        let _ = self.completions.lock().unwrap().send((call, outcome));
    }
}
