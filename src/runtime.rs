//! Single-threaded page loop: owns the document, the widget instances, the
//! timer queue and the table of in-flight cart calls.
//!
//! Everything a widget does happens inside one of its lifecycle callbacks,
//! on the loop's thread. Cart transports run elsewhere and hand their
//! results back through [`PageRuntime::complete_cart_call`], so widget code
//! never needs locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use slab::Slab;
use url::Url;

use crate::dom::{Document, NodeId};
use crate::schedule::{Scheduler, TimerHandle};
use crate::services::{CartCallId, CartTransport, CartUpdateRequest, CartUpdateResponse, Navigator};
use crate::widgets::{PageWidget, TimerToken, WidgetRegistry};

/// User interactions the page loop understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    /// Value edited; fires on every keystroke of a text control.
    Input,
    /// Committed value change, as selects report it.
    Change,
}

/// One interaction aimed at a concrete element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEvent {
    pub kind: EventKind,
    pub target: NodeId,
}

/// External sinks shared by every widget on the page.
pub struct PageServices {
    pub cart: Arc<dyn CartTransport>,
    pub navigator: Arc<dyn Navigator>,
}

struct Mounted {
    name: &'static str,
    root: NodeId,
    widget: Box<dyn PageWidget>,
}

/// What a widget may touch during a callback: the document, its own timers,
/// and the page services.
pub struct WidgetCtx<'a> {
    pub doc: &'a mut Document,
    scheduler: &'a mut Scheduler<(usize, TimerToken)>,
    services: &'a PageServices,
    pending_calls: &'a mut HashMap<CartCallId, usize>,
    next_call: &'a mut CartCallId,
    key: usize,
}

impl WidgetCtx<'_> {
    /// Arms a timer owned by the calling widget. The token comes back via
    /// [`PageWidget::on_timer`] once the virtual clock reaches the deadline.
    pub fn schedule(&mut self, after: Duration, timer: TimerToken) -> TimerHandle {
        self.scheduler.schedule(after, (self.key, timer))
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.scheduler.cancel(handle)
    }

    pub fn navigate(&mut self, url: &Url) {
        self.services.navigator.navigate(url);
    }

    /// Hands a cart update to the transport and registers the calling widget
    /// for the completion callback.
    pub fn submit_cart_update(&mut self, request: &CartUpdateRequest) -> CartCallId {
        let call = *self.next_call;
        *self.next_call += 1;
        self.pending_calls.insert(call, self.key);
        self.services.cart.submit(call, request);
        call
    }
}

pub struct PageRuntime {
    doc: Document,
    scheduler: Scheduler<(usize, TimerToken)>,
    widgets: Slab<Mounted>,
    pending_calls: HashMap<CartCallId, usize>,
    next_call: CartCallId,
    services: PageServices,
}

impl PageRuntime {
    pub fn new(doc: Document, services: PageServices) -> Self {
        Self {
            doc,
            scheduler: Scheduler::new(),
            widgets: Slab::new(),
            pending_calls: HashMap::new(),
            next_call: 1,
            services,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Current virtual time of the page clock.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn pending_cart_calls(&self) -> usize {
        self.pending_calls.len()
    }

    /// Instantiates one widget per element matching a registry entry and
    /// runs the mount hooks. Returns how many widgets were started.
    pub fn mount_all(&mut self, registry: &WidgetRegistry) -> usize {
        let mut mounted = 0;
        for entry in registry.entries() {
            let roots = self.doc.query_all(entry.selector());
            for root in roots {
                let key = self.widgets.insert(Mounted {
                    name: entry.name(),
                    root,
                    widget: entry.build(root),
                });
                tracing::debug!(widget = entry.name(), "widget mounted");
                self.with_ctx(key, |widget, ctx| widget.on_mount(ctx));
                mounted += 1;
            }
        }
        mounted
    }

    /// Routes `event` to every widget whose root contains the target.
    pub fn dispatch(&mut self, event: PageEvent) {
        let doc = &self.doc;
        let keys: Vec<usize> = self
            .widgets
            .iter()
            .filter(|(_, mounted)| doc.contains(mounted.root, event.target))
            .map(|(key, _)| key)
            .collect();
        for key in keys {
            self.with_ctx(key, |widget, ctx| widget.on_event(&event, ctx));
        }
    }

    /// Clicks `target`.
    pub fn click(&mut self, target: NodeId) {
        self.dispatch(PageEvent {
            kind: EventKind::Click,
            target,
        });
    }

    /// Types into a text control: stores the value, then fires `input`.
    pub fn input_value(&mut self, target: NodeId, value: &str) {
        self.doc.set_attr(target, "value", value);
        self.dispatch(PageEvent {
            kind: EventKind::Input,
            target,
        });
    }

    /// Commits a new control value, then fires `change`.
    pub fn change_value(&mut self, target: NodeId, value: &str) {
        self.doc.set_attr(target, "value", value);
        self.dispatch(PageEvent {
            kind: EventKind::Change,
            target,
        });
    }

    /// Advances the virtual clock, delivering every timer that comes due to
    /// its owning widget in deadline order.
    pub fn advance(&mut self, by: Duration) {
        for (key, timer) in self.scheduler.advance(by) {
            self.with_ctx(key, |widget, ctx| widget.on_timer(timer, ctx));
        }
    }

    /// Delivers the outcome of a cart submission to the widget that made it.
    /// Completions for unknown calls (say, from a widget unmounted in the
    /// meantime) are logged and dropped.
    pub fn complete_cart_call(
        &mut self,
        call: CartCallId,
        outcome: anyhow::Result<CartUpdateResponse>,
    ) {
        match self.pending_calls.remove(&call) {
            Some(key) => {
                self.with_ctx(key, move |widget, ctx| {
                    widget.on_remote_result(call, outcome, ctx)
                });
            }
            None => tracing::warn!(call, "completion for unknown cart call dropped"),
        }
    }

    /// Unmounts every widget, cancelling its timers and forgetting its
    /// in-flight calls.
    pub fn unmount_all(&mut self) {
        let keys: Vec<usize> = self.widgets.iter().map(|(key, _)| key).collect();
        for key in keys {
            self.unmount(key);
        }
    }

    fn unmount(&mut self, key: usize) {
        self.with_ctx(key, |widget, ctx| widget.on_unmount(ctx));
        // Widgets cancel their own timers on unmount; this sweep catches
        // anything they missed so no callback outlives its owner.
        let leaked = self.scheduler.cancel_where(|(owner, _)| *owner == key);
        self.pending_calls.retain(|_, owner| *owner != key);
        if let Some(mounted) = self.widgets.try_remove(key) {
            if leaked > 0 {
                tracing::debug!(widget = mounted.name, leaked, "cancelled leftover timers");
            }
        }
    }

    fn with_ctx(&mut self, key: usize, f: impl FnOnce(&mut dyn PageWidget, &mut WidgetCtx<'_>)) {
        let PageRuntime {
            doc,
            scheduler,
            widgets,
            pending_calls,
            next_call,
            services,
        } = self;
        if let Some(mounted) = widgets.get_mut(key) {
            let mut ctx = WidgetCtx {
                doc,
                scheduler,
                services,
                pending_calls,
                next_call,
                key,
            };
            f(mounted.widget.as_mut(), &mut ctx);
        }
    }
}
