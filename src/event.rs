//! Core data model.
//!
//! An [`Event`] is one classified commerce operation, flattened into the
//! row shape the warehouse sink stores. Unused fields stay `None` and are
//! dropped from the serialized row, so absence (not null) is the wire
//! representation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::extract::Fields;
use crate::sink::Row;

// ---------------------------------------------------------------------------
// Event type
// ---------------------------------------------------------------------------

/// Semantic commerce event types, aligned with UCP capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Checkout lifecycle (REST operations on /checkout-sessions)
    CheckoutSessionCreated,
    CheckoutSessionGet,
    CheckoutSessionUpdated,
    CheckoutSessionCompleted,
    CheckoutSessionCanceled,
    CheckoutEscalation,

    // Cart lifecycle (REST operations on /carts)
    CartCreated,
    CartGet,
    CartUpdated,
    CartCanceled,

    // Order lifecycle (webhook-driven in UCP)
    OrderCreated,
    OrderUpdated,
    OrderShipped,
    OrderDelivered,
    OrderReturned,
    OrderCanceled,

    // Identity linking (OAuth 2.0)
    IdentityLinkInitiated,
    IdentityLinkCompleted,
    IdentityLinkRevoked,

    // Payment
    PaymentHandlerNegotiated,
    PaymentInstrumentSelected,
    PaymentCompleted,
    PaymentFailed,

    // Discovery & capability negotiation
    ProfileDiscovered,
    CapabilityNegotiated,

    // Generic HTTP-level fallbacks
    Request,
    Error,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::CheckoutSessionCreated => "checkout_session_created",
            EventType::CheckoutSessionGet => "checkout_session_get",
            EventType::CheckoutSessionUpdated => "checkout_session_updated",
            EventType::CheckoutSessionCompleted => "checkout_session_completed",
            EventType::CheckoutSessionCanceled => "checkout_session_canceled",
            EventType::CheckoutEscalation => "checkout_escalation",
            EventType::CartCreated => "cart_created",
            EventType::CartGet => "cart_get",
            EventType::CartUpdated => "cart_updated",
            EventType::CartCanceled => "cart_canceled",
            EventType::OrderCreated => "order_created",
            EventType::OrderUpdated => "order_updated",
            EventType::OrderShipped => "order_shipped",
            EventType::OrderDelivered => "order_delivered",
            EventType::OrderReturned => "order_returned",
            EventType::OrderCanceled => "order_canceled",
            EventType::IdentityLinkInitiated => "identity_link_initiated",
            EventType::IdentityLinkCompleted => "identity_link_completed",
            EventType::IdentityLinkRevoked => "identity_link_revoked",
            EventType::PaymentHandlerNegotiated => "payment_handler_negotiated",
            EventType::PaymentInstrumentSelected => "payment_instrument_selected",
            EventType::PaymentCompleted => "payment_completed",
            EventType::PaymentFailed => "payment_failed",
            EventType::ProfileDiscovered => "profile_discovered",
            EventType::CapabilityNegotiated => "capability_negotiated",
            EventType::Request => "request",
            EventType::Error => "error",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Checkout status
// ---------------------------------------------------------------------------

/// Checkout session statuses (protocol state machine).
///
/// The extractor records whichever of these strings appears in a body;
/// it does not validate transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Incomplete,
    RequiresEscalation,
    ReadyForComplete,
    CompleteInProgress,
    Completed,
    Canceled,
}

impl CheckoutStatus {
    /// Parse a status string, returning `None` for anything outside the
    /// fixed checkout vocabulary (e.g. order statuses like "shipped").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incomplete" => Some(CheckoutStatus::Incomplete),
            "requires_escalation" => Some(CheckoutStatus::RequiresEscalation),
            "ready_for_complete" => Some(CheckoutStatus::ReadyForComplete),
            "complete_in_progress" => Some(CheckoutStatus::CompleteInProgress),
            "completed" => Some(CheckoutStatus::Completed),
            "canceled" => Some(CheckoutStatus::Canceled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutStatus::Incomplete => "incomplete",
            CheckoutStatus::RequiresEscalation => "requires_escalation",
            CheckoutStatus::ReadyForComplete => "ready_for_complete",
            CheckoutStatus::CompleteInProgress => "complete_in_progress",
            CheckoutStatus::Completed => "completed",
            CheckoutStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Wire mechanism that carried a classified operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Rest,
    Mcp,
    A2a,
    Embedded,
}

impl Transport {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rest" => Some(Transport::Rest),
            "mcp" => Some(Transport::Mcp),
            "a2a" => Some(Transport::A2a),
            "embedded" => Some(Transport::Embedded),
            _ => None,
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Transport::Rest => "rest",
            Transport::Mcp => "mcp",
            Transport::A2a => "a2a",
            Transport::Embedded => "embedded",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Event record
// ---------------------------------------------------------------------------

/// One commerce analytics event row destined for the warehouse sink.
///
/// Fields are a superset covering all UCP capabilities; a given event
/// populates only the slice that applies to it.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    // --- identity ---
    pub event_id: String,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,

    // --- context ---
    pub app_name: String,
    /// Business endpoint host.
    pub merchant_host: String,
    /// UCP-Agent header value.
    pub platform_profile_url: String,
    pub transport: Transport,

    // --- HTTP ---
    pub http_method: String,
    pub http_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
    pub idempotency_key: String,
    pub request_id: String,

    // --- checkout / order identity ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,

    // --- financial (minor currency units, one field per total type) ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_discount_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfillment_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<i64>,

    // --- line items ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_item_count: Option<i64>,

    // --- payment ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_handler_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_instrument_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_brand: Option<String>,

    // --- capabilities & extensions ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ucp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions_json: Option<String>,

    // --- identity linking ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_scope: Option<String>,

    // --- fulfillment ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfillment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfillment_destination_country: Option<String>,

    // --- discount extension ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_codes_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_applied_json: Option<String>,

    // --- checkout metadata ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_url: Option<String>,

    // --- order ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink_url: Option<String>,

    // --- messages / errors ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_json: Option<String>,

    // --- performance ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,

    // --- custom ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_metadata_json: Option<String>,
}

impl Event {
    /// Create an event of the given type with a fresh id and timestamp.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now(),
            app_name: String::new(),
            merchant_host: String::new(),
            platform_profile_url: String::new(),
            transport: Transport::Rest,
            http_method: String::new(),
            http_path: String::new(),
            http_status_code: None,
            idempotency_key: String::new(),
            request_id: String::new(),
            checkout_session_id: None,
            checkout_status: None,
            order_id: None,
            currency: None,
            items_discount_amount: None,
            subtotal_amount: None,
            discount_amount: None,
            fulfillment_amount: None,
            tax_amount: None,
            fee_amount: None,
            total_amount: None,
            line_items_json: None,
            line_item_count: None,
            payment_handler_id: None,
            payment_instrument_type: None,
            payment_brand: None,
            ucp_version: None,
            capabilities_json: None,
            extensions_json: None,
            identity_provider: None,
            identity_scope: None,
            fulfillment_type: None,
            fulfillment_destination_country: None,
            discount_codes_json: None,
            discount_applied_json: None,
            expires_at: None,
            continue_url: None,
            permalink_url: None,
            error_code: None,
            error_message: None,
            error_severity: None,
            messages_json: None,
            latency_ms: None,
            custom_metadata_json: None,
        }
    }

    /// Merge extracted fields onto this event.
    ///
    /// Explicit field-by-field merge: only the fields the extractor can
    /// produce exist on [`Fields`], so unknown keys cannot leak in. A
    /// `None` never overwrites a value set earlier.
    pub fn apply(&mut self, fields: Fields) {
        if let Some(v) = fields.checkout_session_id {
            self.checkout_session_id = Some(v);
        }
        if let Some(v) = fields.checkout_status {
            self.checkout_status = Some(v);
        }
        if let Some(v) = fields.order_id {
            self.order_id = Some(v);
        }
        if let Some(v) = fields.currency {
            self.currency = Some(v);
        }
        if let Some(v) = fields.items_discount_amount {
            self.items_discount_amount = Some(v);
        }
        if let Some(v) = fields.subtotal_amount {
            self.subtotal_amount = Some(v);
        }
        if let Some(v) = fields.discount_amount {
            self.discount_amount = Some(v);
        }
        if let Some(v) = fields.fulfillment_amount {
            self.fulfillment_amount = Some(v);
        }
        if let Some(v) = fields.tax_amount {
            self.tax_amount = Some(v);
        }
        if let Some(v) = fields.fee_amount {
            self.fee_amount = Some(v);
        }
        if let Some(v) = fields.total_amount {
            self.total_amount = Some(v);
        }
        if let Some(v) = fields.line_items_json {
            self.line_items_json = Some(v);
        }
        if let Some(v) = fields.line_item_count {
            self.line_item_count = Some(v);
        }
        if let Some(v) = fields.payment_handler_id {
            self.payment_handler_id = Some(v);
        }
        if let Some(v) = fields.payment_instrument_type {
            self.payment_instrument_type = Some(v);
        }
        if let Some(v) = fields.payment_brand {
            self.payment_brand = Some(v);
        }
        if let Some(v) = fields.ucp_version {
            self.ucp_version = Some(v);
        }
        if let Some(v) = fields.capabilities_json {
            self.capabilities_json = Some(v);
        }
        if let Some(v) = fields.identity_provider {
            self.identity_provider = Some(v);
        }
        if let Some(v) = fields.identity_scope {
            self.identity_scope = Some(v);
        }
        if let Some(v) = fields.fulfillment_type {
            self.fulfillment_type = Some(v);
        }
        if let Some(v) = fields.fulfillment_destination_country {
            self.fulfillment_destination_country = Some(v);
        }
        if let Some(v) = fields.discount_codes_json {
            self.discount_codes_json = Some(v);
        }
        if let Some(v) = fields.discount_applied_json {
            self.discount_applied_json = Some(v);
        }
        if let Some(v) = fields.expires_at {
            self.expires_at = Some(v);
        }
        if let Some(v) = fields.continue_url {
            self.continue_url = Some(v);
        }
        if let Some(v) = fields.permalink_url {
            self.permalink_url = Some(v);
        }
        if let Some(v) = fields.error_code {
            self.error_code = Some(v);
        }
        if let Some(v) = fields.error_message {
            self.error_message = Some(v);
        }
        if let Some(v) = fields.error_severity {
            self.error_severity = Some(v);
        }
        if let Some(v) = fields.messages_json {
            self.messages_json = Some(v);
        }
    }

    /// Serialize to the sink row shape. `None` fields are absent, not null.
    pub fn to_row(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => Row::new(),
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new(EventType::Request)
    }
}
