//! Tracker facade.
//!
//! Observe-classify-extract-enqueue in one call. The tracker owns a
//! [`BufferedWriter`] and never surfaces sink trouble to the caller:
//! recording is fire and forget, with delivery handled in the
//! background.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::classify::{classify, classify_jsonrpc, tool_http_equivalent};
use crate::config::TrackerConfig;
use crate::event::{Event, Transport};
use crate::extract::extract;
use crate::sink::Sink;
use crate::writer::{BufferedWriter, WriterConfig};

const REDACTED: &str = "[REDACTED]";

/// One observed HTTP exchange, built up before recording.
#[derive(Debug, Clone, Default)]
pub struct HttpExchange {
    pub method: String,
    pub status_code: u16,
    pub url: String,
    pub path: String,
    pub request_body: Option<Value>,
    pub response_body: Option<Value>,
    pub latency_ms: Option<f64>,
    pub headers: Vec<(String, String)>,
}

impl HttpExchange {
    pub fn new(method: impl Into<String>, status_code: u16) -> Self {
        Self {
            method: method.into(),
            status_code,
            ..Self::default()
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Explicit path, overriding whatever the URL carries.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn request_body(mut self, body: Value) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn response_body(mut self, body: Value) -> Self {
        self.response_body = Some(body);
        self
    }

    pub fn latency_ms(mut self, latency: f64) -> Self {
        self.latency_ms = Some(latency);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into().to_lowercase(), value.into()));
        self
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One observed JSON-RPC tool call (MCP or A2A transport).
#[derive(Debug, Clone)]
pub struct RpcCall {
    pub tool_name: String,
    pub transport: Transport,
    pub status_code: u16,
    pub response_body: Option<Value>,
    pub latency_ms: Option<f64>,
    pub merchant_host: String,
}

impl RpcCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            transport: Transport::Mcp,
            status_code: 200,
            response_body: None,
            latency_ms: None,
            merchant_host: String::new(),
        }
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn response_body(mut self, body: Value) -> Self {
        self.response_body = Some(body);
        self
    }

    pub fn latency_ms(mut self, latency: f64) -> Self {
        self.latency_ms = Some(latency);
        self
    }

    pub fn merchant_host(mut self, host: impl Into<String>) -> Self {
        self.merchant_host = host.into();
        self
    }
}

pub struct Tracker {
    app_name: String,
    redact_pii: bool,
    pii_fields: HashSet<String>,
    custom_metadata_json: Option<String>,
    writer: BufferedWriter,
}

impl Tracker {
    pub fn new(sink: Arc<dyn Sink>, config: TrackerConfig) -> Self {
        let writer = BufferedWriter::new(
            sink,
            WriterConfig {
                table: config.table,
                batch_size: config.batch_size,
                max_buffer_size: config.max_buffer_size,
                auto_create_table: config.auto_create_table,
            },
        );
        Self {
            app_name: config.app_name,
            redact_pii: config.redact_pii,
            pii_fields: config
                .pii_fields
                .into_iter()
                .map(|f| f.to_lowercase())
                .collect(),
            custom_metadata_json: config
                .custom_metadata
                .and_then(|m| serde_json::to_string(&m).ok()),
            writer,
        }
    }

    /// Record one HTTP exchange. Returns the event that was enqueued.
    pub async fn record_http(&self, exchange: HttpExchange) -> Event {
        let parsed = Url::parse(&exchange.url).ok();
        let path = if exchange.path.is_empty() {
            parsed
                .as_ref()
                .map(|u| u.path().to_owned())
                .unwrap_or_default()
        } else {
            exchange.path.clone()
        };
        let merchant_host = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or_default()
            .to_owned();

        let event_type = classify(
            &exchange.method,
            &path,
            exchange.status_code,
            exchange.response_body.as_ref(),
            exchange.request_body.as_ref(),
        );

        let mut event = Event::new(event_type);
        event.app_name = self.app_name.clone();
        event.merchant_host = merchant_host;
        event.http_method = exchange.method.to_uppercase();
        event.http_path = path.clone();
        event.http_status_code = (exchange.status_code != 0).then_some(exchange.status_code);
        event.latency_ms = exchange.latency_ms;
        if let Some(v) = exchange.header_value("ucp-agent") {
            event.platform_profile_url = v.to_owned();
        }
        if let Some(v) = exchange.header_value("idempotency-key") {
            event.idempotency_key = v.to_owned();
        }
        if let Some(v) = exchange.header_value("request-id") {
            event.request_id = v.to_owned();
        }

        // Webhook deliveries carry their payload in the request; every
        // other operation answers with the interesting body.
        let body = if path.contains("/webhook") && exchange.request_body.is_some() {
            exchange.request_body.as_ref()
        } else {
            exchange
                .response_body
                .as_ref()
                .or(exchange.request_body.as_ref())
        };
        self.apply_body(&mut event, body);

        event.custom_metadata_json = self.custom_metadata_json.clone();
        self.writer.enqueue(event.to_row()).await;
        event
    }

    /// Record one JSON-RPC tool call. Returns the event that was
    /// enqueued.
    pub async fn record_jsonrpc(&self, call: RpcCall) -> Event {
        let event_type =
            classify_jsonrpc(&call.tool_name, call.status_code, call.response_body.as_ref());
        let (method, path) = tool_http_equivalent(&call.tool_name).unwrap_or(("", ""));

        let mut event = Event::new(event_type);
        event.app_name = self.app_name.clone();
        event.merchant_host = call.merchant_host;
        event.transport = call.transport;
        event.http_method = method.to_owned();
        event.http_path = path.to_owned();
        event.http_status_code = (call.status_code != 0).then_some(call.status_code);
        event.latency_ms = call.latency_ms;

        self.apply_body(&mut event, call.response_body.as_ref());

        event.custom_metadata_json = self.custom_metadata_json.clone();
        self.writer.enqueue(event.to_row()).await;
        event
    }

    /// Enqueue a pre-built event as-is.
    pub async fn record_event(&self, event: &Event) {
        self.writer.enqueue(event.to_row()).await;
    }

    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Drain background flushes and deliver everything still buffered.
    pub async fn close(&self) {
        self.writer.close().await;
    }

    fn apply_body(&self, event: &mut Event, body: Option<&Value>) {
        let Some(body) = body.filter(|b| b.is_object()) else {
            return;
        };
        if self.redact_pii {
            let clean = redact(body, &self.pii_fields);
            event.apply(extract(&clean));
        } else {
            event.apply(extract(body));
        }
    }
}

/// Replace every value whose key is on the deny list, at any depth.
/// Matching is case-insensitive.
pub fn redact(value: &Value, deny: &HashSet<String>) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if deny.contains(&k.to_lowercase()) {
                    out.insert(k.clone(), Value::String(REDACTED.to_owned()));
                } else {
                    out.insert(k.clone(), redact(v, deny));
                }
            }
            Value::Object(out)
        }
        Value::Array(list) => Value::Array(list.iter().map(|v| redact(v, deny)).collect()),
        other => other.clone(),
    }
}
