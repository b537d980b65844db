//! Backend seams the widgets and the dashboard talk through.
//!
//! Production code wires these traits to the JSON-RPC clients in
//! [`crate::rpc`]; tests plug in recording fakes.

use std::fmt;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

/// Comparison operators the marketplace domains use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
}

impl CmpOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
        }
    }
}

/// One `(field, op, value)` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainLeaf {
    pub field: String,
    pub op: CmpOp,
    pub value: String,
}

/// Conjunction of leaf conditions; an empty domain matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domain {
    leaves: Vec<DomainLeaf>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, field: &str, value: &str) -> Self {
        self.leaves.push(DomainLeaf {
            field: field.to_string(),
            op: CmpOp::Eq,
            value: value.to_string(),
        });
        self
    }

    pub fn field_ne(mut self, field: &str, value: &str) -> Self {
        self.leaves.push(DomainLeaf {
            field: field.to_string(),
            op: CmpOp::Ne,
            value: value.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaves(&self) -> &[DomainLeaf] {
        &self.leaves
    }

    /// Wire form: a list of `[field, op, value]` triples.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.leaves
                .iter()
                .map(|leaf| json!([leaf.field, leaf.op.as_str(), leaf.value]))
                .collect(),
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, leaf) in self.leaves.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {} {}", leaf.field, leaf.op.as_str(), leaf.value)?;
        }
        write!(f, "]")
    }
}

/// View modes an act-window request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    List,
    Form,
    Kanban,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Form => "form",
            ViewMode::Kanban => "kanban",
        }
    }
}

/// Request to open a backend list/form view, optionally filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowAction {
    pub res_model: String,
    pub views: Vec<ViewMode>,
    pub domain: Option<Domain>,
}

impl WindowAction {
    pub fn new(res_model: &str, views: &[ViewMode]) -> Self {
        Self {
            res_model: res_model.to_string(),
            views: views.to_vec(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Wire form of the action descriptor. View ids are never pinned, so
    /// every view entry is `[false, mode]`.
    pub fn to_json(&self) -> Value {
        let views: Vec<Value> = self
            .views
            .iter()
            .map(|mode| json!([false, mode.as_str()]))
            .collect();
        let mut action = Map::new();
        action.insert("type".to_string(), json!("ir.actions.act_window"));
        action.insert("res_model".to_string(), json!(self.res_model));
        action.insert("views".to_string(), Value::Array(views));
        if let Some(domain) = &self.domain {
            action.insert("domain".to_string(), domain.to_json());
        }
        Value::Object(action)
    }
}

/// One row of a grouped aggregate query.
#[derive(Debug, Clone, Default)]
pub struct AggregateRow(pub Map<String, Value>);

impl AggregateRow {
    /// Reads `field` as a decimal amount; `None` when the field is missing,
    /// null or not numeric.
    pub fn decimal(&self, field: &str) -> Option<Decimal> {
        let value = self.0.get(field)?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Read-only record queries against the backend.
pub trait DataService: Send + Sync {
    fn search_count(&self, model: &str, domain: &Domain) -> Result<u32>;

    /// Grouped aggregation. `aggregates` uses `field:agg` specs such as
    /// `amount_total:sum`; with an empty `group_by` the backend returns a
    /// single row aggregating everything the domain matched.
    fn read_group(
        &self,
        model: &str,
        domain: &Domain,
        aggregates: &[&str],
        group_by: &[&str],
    ) -> Result<Vec<AggregateRow>>;
}

/// Sink for act-window requests raised by dashboard tiles.
pub trait ActionService: Send + Sync {
    fn do_action(&self, action: &WindowAction);
}

/// Sink for full-page navigations requested by the product filter.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

/// Correlation id for one in-flight cart submission.
pub type CartCallId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartUpdateRequest {
    pub product_id: u64,
    pub add_qty: u32,
}

/// Cart endpoint reply. A missing or zero `cart_quantity` counts as a
/// failed add even when the transport itself succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CartUpdateResponse {
    #[serde(default)]
    pub cart_quantity: Option<u32>,
}

/// Outcome of one cart submission, delivered back to the page loop.
pub type CartCompletion = (CartCallId, Result<CartUpdateResponse>);

/// Asynchronous cart submissions. `submit` must not block the page loop;
/// completions come back through whatever channel the transport was built
/// with and are fed to [`crate::runtime::PageRuntime::complete_cart_call`].
pub trait CartTransport: Send + Sync {
    fn submit(&self, call: CartCallId, request: &CartUpdateRequest);
}

/// Action sink that only records the request in the log. Useful headless,
/// where there is no view layer to hand the action to.
#[derive(Debug, Default)]
pub struct LoggingActionService;

impl ActionService for LoggingActionService {
    fn do_action(&self, action: &WindowAction) {
        let views: Vec<&str> = action.views.iter().map(|mode| mode.as_str()).collect();
        match &action.domain {
            Some(domain) => tracing::info!(
                model = %action.res_model,
                views = ?views,
                %domain,
                "act-window requested"
            ),
            None => tracing::info!(
                model = %action.res_model,
                views = ?views,
                "act-window requested"
            ),
        }
    }
}

/// Navigation sink that records the target URL in the log.
#[derive(Debug, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, url: &Url) {
        tracing::info!(%url, "page navigation requested");
    }
}
