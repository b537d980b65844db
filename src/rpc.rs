//! JSON-RPC 2.0 clients for the marketplace backend.
//!
//! Two endpoints matter here: `call_kw` model methods for the dashboard
//! queries and the cart update route for the storefront. Both speak the
//! same envelope, `{"jsonrpc": "2.0", "method": "call", "params": ..}`,
//! with the payload under `result` and server faults under `error`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use url::Url;

use crate::services::{
    AggregateRow, CartCallId, CartCompletion, CartTransport, CartUpdateRequest,
    CartUpdateResponse, DataService, Domain,
};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);
const RPC_USER_AGENT: &str = "marketplace-widgets/0.1";

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(RPC_TIMEOUT)
        .user_agent(RPC_USER_AGENT)
        .build()
        .context("failed to build http client")
}

fn envelope(params: Value, id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "call",
        "params": params,
        "id": id,
    })
}

fn call_kw_params(model: &str, method: &str, args: Value) -> Value {
    json!({
        "model": model,
        "method": method,
        "args": args,
        "kwargs": {},
    })
}

/// Unwraps a JSON-RPC reply into its `result`, mapping `error` members to
/// an `Err` with the server's message.
fn unwrap_reply(payload: Value) -> Result<Value> {
    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown server error");
        bail!("backend error: {message}");
    }
    payload
        .get("result")
        .cloned()
        .context("rpc reply without a result member")
}

fn post_rpc(http: &Client, url: Url, body: &Value) -> Result<Value> {
    let response = http
        .post(url.clone())
        .header(CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(body)?)
        .send()
        .with_context(|| format!("request to {url} failed"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("{url} returned {status}");
    }
    let text = response.text().context("failed to read rpc reply")?;
    let payload: Value =
        serde_json::from_str(&text).context("rpc reply is not valid json")?;
    unwrap_reply(payload)
}

/// Blocking `call_kw` client for the dashboard queries.
pub struct JsonRpcData {
    http: Client,
    base: Url,
    next_id: AtomicU64,
}

impl JsonRpcData {
    pub fn new(base: Url) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            base,
            next_id: AtomicU64::new(1),
        })
    }

    fn call_kw(&self, model: &str, method: &str, args: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = self
            .base
            .join(&format!("/web/dataset/call_kw/{model}/{method}"))
            .context("invalid call_kw url")?;
        let body = envelope(call_kw_params(model, method, args), id);
        post_rpc(&self.http, url, &body)
    }
}

impl DataService for JsonRpcData {
    fn search_count(&self, model: &str, domain: &Domain) -> Result<u32> {
        let result = self.call_kw(model, "search_count", json!([domain.to_json()]))?;
        let count = result
            .as_u64()
            .with_context(|| format!("search_count on {model} returned a non-count"))?;
        u32::try_from(count).with_context(|| format!("search_count on {model} overflowed"))
    }

    fn read_group(
        &self,
        model: &str,
        domain: &Domain,
        aggregates: &[&str],
        group_by: &[&str],
    ) -> Result<Vec<AggregateRow>> {
        let result = self.call_kw(
            model,
            "read_group",
            json!([domain.to_json(), aggregates, group_by]),
        )?;
        let rows = result
            .as_array()
            .with_context(|| format!("read_group on {model} returned a non-list"))?;
        rows.iter()
            .map(|row| {
                row.as_object()
                    .cloned()
                    .map(AggregateRow)
                    .with_context(|| format!("read_group row on {model} is not an object"))
            })
            .collect()
    }
}

/// Cart transport that posts to the shop cart route from a worker thread
/// and reports completions over an mpsc channel. The page loop drains the
/// receiver and feeds each completion to
/// [`crate::runtime::PageRuntime::complete_cart_call`].
pub struct HttpCartTransport {
    http: Client,
    endpoint: Url,
    // Sender is not Sync; the mutex makes the transport shareable.
    completions: Mutex<Sender<CartCompletion>>,
}

impl HttpCartTransport {
    pub fn new(base: Url) -> Result<(Self, Receiver<CartCompletion>)> {
        let endpoint = base
            .join("/shop/cart/update_json")
            .context("invalid cart endpoint url")?;
        let (tx, rx) = channel();
        Ok((
            Self {
                http: http_client()?,
                endpoint,
                completions: Mutex::new(tx),
            },
            rx,
        ))
    }

    fn perform(
        http: &Client,
        endpoint: &Url,
        request: &CartUpdateRequest,
        call: CartCallId,
    ) -> Result<CartUpdateResponse> {
        let params = serde_json::to_value(request)?;
        let body = envelope(params, call);
        let result = post_rpc(http, endpoint.clone(), &body)?;
        serde_json::from_value(result).context("malformed cart update reply")
    }
}

impl CartTransport for HttpCartTransport {
    fn submit(&self, call: CartCallId, request: &CartUpdateRequest) {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let request = request.clone();
        let completions = self.completions.lock().unwrap().clone();
        thread::spawn(move || {
            let outcome = Self::perform(&http, &endpoint, &request, call);
            if completions.send((call, outcome)).is_err() {
                tracing::warn!(call, "cart completion dropped, page loop is gone");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_matches_the_wire_contract() {
        let body = envelope(json!({"product_id": 7, "add_qty": 2}), 4);
        assert_eq!(
            body,
            json!({
                "jsonrpc": "2.0",
                "method": "call",
                "params": {"product_id": 7, "add_qty": 2},
                "id": 4,
            })
        );
    }

    #[test]
    fn call_kw_params_wrap_model_and_method() {
        let domain = Domain::new().field_eq("state", "approved");
        let params = call_kw_params(
            "marketplace.vendor",
            "search_count",
            json!([domain.to_json()]),
        );
        assert_eq!(
            params,
            json!({
                "model": "marketplace.vendor",
                "method": "search_count",
                "args": [[["state", "=", "approved"]]],
                "kwargs": {},
            })
        );
    }

    #[test]
    fn unwrap_reply_extracts_result() {
        let result = unwrap_reply(json!({"jsonrpc": "2.0", "result": 17, "id": 1})).unwrap();
        assert_eq!(result, json!(17));
    }

    #[test]
    fn unwrap_reply_surfaces_server_errors() {
        let err = unwrap_reply(json!({
            "jsonrpc": "2.0",
            "error": {"code": 200, "message": "Odoo Server Error"},
            "id": 1,
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Odoo Server Error"));

        let missing = unwrap_reply(json!({"jsonrpc": "2.0", "id": 1}));
        assert!(missing.is_err());
    }

    #[test]
    fn cart_request_serializes_for_the_shop_route() {
        let request = CartUpdateRequest {
            product_id: 42,
            add_qty: 3,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"product_id": 42, "add_qty": 3})
        );
    }
}
