use std::sync::Arc;

use url::Url;

use marketplace_widgets::dom::{Document, NodeId};
use marketplace_widgets::runtime::{PageRuntime, PageServices};
use marketplace_widgets::services::{CartCallId, CartTransport, CartUpdateRequest, Navigator};
use marketplace_widgets::widgets::WidgetRegistry;

#[derive(Default)]
struct NullCart;

impl CartTransport for NullCart {
    fn submit(&self, _call: CartCallId, _request: &CartUpdateRequest) {}
}

#[derive(Default)]
struct NullNavigator;

impl Navigator for NullNavigator {
    fn navigate(&self, _url: &Url) {}
}

struct RatingBlock {
    field: NodeId,
    stars: Vec<NodeId>,
}

fn add_rating(doc: &mut Document, initial: &str) -> RatingBlock {
    let root = doc.create_element(doc.root(), "div");
    doc.add_class(root, "o_marketplace_rating");
    let field = doc.create_element(root, "input");
    doc.set_attr(field, "name", "rating");
    doc.set_attr(field, "value", initial);
    let mut stars = Vec::new();
    for value in 1..=5 {
        let star = doc.create_element(root, "span");
        doc.add_class(star, "o_rating_star");
        doc.add_class(star, "fa");
        doc.set_attr(star, "data-rating", &value.to_string());
        stars.push(star);
    }
    RatingBlock { field, stars }
}

fn mount(doc: Document) -> PageRuntime {
    let mut page = PageRuntime::new(
        doc,
        PageServices {
            cart: Arc::new(NullCart),
            navigator: Arc::new(NullNavigator),
        },
    );
    page.mount_all(&WidgetRegistry::with_defaults());
    page
}

fn fill_pattern(page: &PageRuntime, stars: &[NodeId]) -> String {
    stars
        .iter()
        .map(|star| {
            let filled = page.document().has_class(*star, "fa-star");
            let empty = page.document().has_class(*star, "fa-star-o");
            match (filled, empty) {
                (true, false) => '*',
                (false, true) => '.',
                _ => '?',
            }
        })
        .collect()
}

#[test]
fn mount_paints_the_stored_rating() {
    let mut doc = Document::new(Url::parse("https://market.example/shop").unwrap());
    let block = add_rating(&mut doc, "3");
    let page = mount(doc);
    assert_eq!(fill_pattern(&page, &block.stars), "***..");
}

#[test]
fn mount_with_no_rating_leaves_all_stars_empty() {
    let mut doc = Document::new(Url::parse("https://market.example/shop").unwrap());
    let block = add_rating(&mut doc, "0");
    let page = mount(doc);
    assert_eq!(fill_pattern(&page, &block.stars), ".....");
}

#[test]
fn clicking_a_star_stores_and_paints_the_rating() {
    let mut doc = Document::new(Url::parse("https://market.example/shop").unwrap());
    let block = add_rating(&mut doc, "0");
    let mut page = mount(doc);

    page.click(block.stars[4]);
    assert_eq!(page.document().attr(block.field, "value"), Some("5"));
    assert_eq!(fill_pattern(&page, &block.stars), "*****");
}

#[test]
fn lowering_the_rating_empties_the_tail() {
    let mut doc = Document::new(Url::parse("https://market.example/shop").unwrap());
    let block = add_rating(&mut doc, "0");
    let mut page = mount(doc);

    page.click(block.stars[4]);
    page.click(block.stars[1]);
    assert_eq!(page.document().attr(block.field, "value"), Some("2"));
    assert_eq!(fill_pattern(&page, &block.stars), "**...");
}

#[test]
fn star_without_a_numeric_rating_changes_nothing() {
    let mut doc = Document::new(Url::parse("https://market.example/shop").unwrap());
    let block = add_rating(&mut doc, "1");
    let broken = block.stars[3];
    doc.set_attr(broken, "data-rating", "four");
    let mut page = mount(doc);

    page.click(broken);
    assert_eq!(page.document().attr(block.field, "value"), Some("1"));
    assert_eq!(fill_pattern(&page, &block.stars), "*....");
}

#[test]
fn rating_blocks_do_not_interfere() {
    let mut doc = Document::new(Url::parse("https://market.example/shop").unwrap());
    let first = add_rating(&mut doc, "0");
    let second = add_rating(&mut doc, "0");
    let mut page = mount(doc);

    page.click(first.stars[2]);
    assert_eq!(page.document().attr(first.field, "value"), Some("3"));
    assert_eq!(page.document().attr(second.field, "value"), Some("0"));
    assert_eq!(fill_pattern(&page, &second.stars), ".....");
}
