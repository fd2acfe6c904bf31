//! In-memory capture of the spans belonging to each request.
//!
//! [`RequestTraceLayer`] records every closed span that carries a
//! [`REQUEST_ID_FIELD`], either set directly or inherited from a parent span,
//! into a bounded [`RequestTraceStore`]. The server uses it to show how a
//! single `/generate` call spent its time.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use serde::Serialize;
use tracing::{Id, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// The span field that ties spans to a request.
pub const REQUEST_ID_FIELD: &str = "request.id";

/// Requests kept by [`RequestTraceStore::default`].
pub const DEFAULT_TRACE_CAPACITY: usize = 256;

/// A captured, closed span.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    pub target: String,
    /// Unix time in nanoseconds.
    pub start_time: u128,
    /// Unix time in nanoseconds.
    pub end_time: u128,
    pub attributes: HashMap<String, serde_json::Value>,
}

impl SpanRecord {
    pub fn duration_nanos(&self) -> u128 {
        self.end_time.saturating_sub(self.start_time)
    }
}

#[derive(Debug, Default)]
struct Traces {
    spans: HashMap<String, Vec<SpanRecord>>,
    /// Request ids, oldest first.
    order: VecDeque<String>,
}

/// Spans grouped by request id, keeping only the most recent requests.
#[derive(Debug)]
pub struct RequestTraceStore {
    capacity: usize,
    traces: RwLock<Traces>,
}

impl Default for RequestTraceStore {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_CAPACITY)
    }
}

impl RequestTraceStore {
    /// Create a store that keeps at most `capacity` requests (at least one).
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), traces: RwLock::new(Traces::default()) }
    }

    /// The spans recorded for `request_id`, in the order they closed.
    pub fn get_trace(&self, request_id: &str) -> Option<Vec<SpanRecord>> {
        self.traces.read().ok()?.spans.get(request_id).cloned()
    }

    /// Number of requests currently held.
    pub fn len(&self) -> usize {
        self.traces.read().map(|t| t.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record(&self, request_id: &str, span: SpanRecord) {
        let Ok(mut traces) = self.traces.write() else {
            return;
        };
        if let Some(spans) = traces.spans.get_mut(request_id) {
            spans.push(span);
            return;
        }

        while traces.order.len() >= self.capacity {
            if let Some(oldest) = traces.order.pop_front() {
                traces.spans.remove(&oldest);
            }
        }
        traces.order.push_back(request_id.to_string());
        traces.spans.insert(request_id.to_string(), vec![span]);
    }
}

/// A tracing layer that captures request-scoped spans in memory.
pub struct RequestTraceLayer {
    store: Arc<RequestTraceStore>,
}

impl RequestTraceLayer {
    pub fn new(store: Arc<RequestTraceStore>) -> Self {
        Self { store }
    }
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

struct StartTime(u128);

fn unix_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

impl<S> Layer<S> for RequestTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        // Child spans inherit the request id.
        if !fields.contains_key(REQUEST_ID_FIELD) {
            if let Some(parent) = span.parent() {
                if let Some(value) = parent
                    .extensions()
                    .get::<SpanFields>()
                    .and_then(|f| f.0.get(REQUEST_ID_FIELD).cloned())
                {
                    fields.insert(REQUEST_ID_FIELD.to_string(), value);
                }
            }
        }

        let mut extensions = span.extensions_mut();
        extensions.insert(StartTime(unix_nanos()));
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else {
            return;
        };
        let extensions = span.extensions();
        let Some(fields) = extensions.get::<SpanFields>() else {
            return;
        };
        let Some(request_id) =
            fields.0.get(REQUEST_ID_FIELD).and_then(|v| v.as_str()).map(str::to_string)
        else {
            return;
        };

        let metadata = span.metadata();
        let record = SpanRecord {
            span_id: format!("{:016x}", id.into_u64()),
            parent_span_id: span.parent().map(|p| format!("{:016x}", p.id().into_u64())),
            name: metadata.name().to_string(),
            target: metadata.target().to_string(),
            start_time: extensions.get::<StartTime>().map(|s| s.0).unwrap_or(0),
            end_time: unix_nanos(),
            attributes: fields.0.clone(),
        };
        self.store.record(&request_id, record);
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
