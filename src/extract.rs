//! Field extraction.
//!
//! Pulls analytics fields out of an arbitrary JSON body. Extraction is
//! heuristic by design: bodies from different operations and different
//! merchant implementations vary in shape, so each rule tolerates the
//! field being absent or oddly typed and simply moves on.

use serde_json::Value;

use crate::event::CheckoutStatus;

/// Typed set of fields the extractor can recover from a body.
///
/// Applied onto an [`crate::event::Event`] via
/// [`crate::event::Event::apply`]; a `None` here never clobbers a value
/// already on the event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pub checkout_session_id: Option<String>,
    pub checkout_status: Option<String>,
    pub order_id: Option<String>,
    pub permalink_url: Option<String>,
    pub currency: Option<String>,
    pub items_discount_amount: Option<i64>,
    pub subtotal_amount: Option<i64>,
    pub discount_amount: Option<i64>,
    pub fulfillment_amount: Option<i64>,
    pub tax_amount: Option<i64>,
    pub fee_amount: Option<i64>,
    pub total_amount: Option<i64>,
    pub line_items_json: Option<String>,
    pub line_item_count: Option<i64>,
    pub payment_handler_id: Option<String>,
    pub payment_instrument_type: Option<String>,
    pub payment_brand: Option<String>,
    pub ucp_version: Option<String>,
    pub capabilities_json: Option<String>,
    pub identity_provider: Option<String>,
    pub identity_scope: Option<String>,
    pub fulfillment_type: Option<String>,
    pub fulfillment_destination_country: Option<String>,
    pub discount_codes_json: Option<String>,
    pub discount_applied_json: Option<String>,
    pub expires_at: Option<String>,
    pub continue_url: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub error_severity: Option<String>,
    pub messages_json: Option<String>,
}

/// Extract whatever analytics fields the body carries.
pub fn extract(body: &Value) -> Fields {
    let mut f = Fields::default();
    let Some(obj) = body.as_object() else {
        return f;
    };

    // A top-level `id` is ambiguous: on a checkout response it is the
    // session id, on an order confirmation (which carries `checkout_id`)
    // it is the order id.
    if let Some(id) = id_string(obj.get("id")) {
        if obj.contains_key("checkout_id") {
            f.order_id = Some(id);
            f.checkout_session_id = id_string(obj.get("checkout_id"));
        } else {
            f.checkout_session_id = Some(id);
        }
    }
    if let Some(id) = id_string(obj.get("order_id")) {
        f.order_id = Some(id);
    }
    if let Some(order) = obj.get("order").and_then(Value::as_object) {
        if let Some(id) = id_string(order.get("id")) {
            f.order_id = Some(id);
        }
        if let Some(url) = str_field(order.get("permalink_url")) {
            f.permalink_url = Some(url);
        }
    }
    if let Some(url) = str_field(obj.get("permalink_url")) {
        f.permalink_url = Some(url);
    }

    // `status` on an order confirmation is an order status, not a
    // checkout status; only record values from the checkout vocabulary
    // on bodies that are not confirmations.
    if !obj.contains_key("checkout_id") {
        if let Some(status) = obj.get("status").and_then(Value::as_str) {
            if CheckoutStatus::parse(status).is_some() {
                f.checkout_status = Some(status.to_owned());
            }
        }
    }

    if let Some(currency) = str_field(obj.get("currency")) {
        f.currency = Some(currency);
    }

    if let Some(totals) = obj.get("totals").and_then(Value::as_array) {
        for entry in totals {
            let Some(t) = entry.as_object() else { continue };
            let Some(amount) = t.get("amount").and_then(Value::as_i64) else {
                continue;
            };
            match t.get("type").and_then(Value::as_str) {
                Some("items_discount") => f.items_discount_amount = Some(amount),
                Some("subtotal") => f.subtotal_amount = Some(amount),
                Some("discount") => f.discount_amount = Some(amount),
                Some("fulfillment") => f.fulfillment_amount = Some(amount),
                Some("tax") => f.tax_amount = Some(amount),
                Some("fee") => f.fee_amount = Some(amount),
                Some("total") => f.total_amount = Some(amount),
                _ => {}
            }
        }
    }

    if let Some(items) = obj.get("line_items").and_then(Value::as_array) {
        if !items.is_empty() {
            f.line_item_count = Some(items.len() as i64);
            f.line_items_json = serde_json::to_string(items).ok();
        }
    }

    if let Some(ucp) = obj.get("ucp").and_then(Value::as_object) {
        if let Some(version) = str_field(ucp.get("version")) {
            f.ucp_version = Some(version);
        }
        if let Some(caps) = ucp.get("capabilities") {
            let normalized = normalize_capabilities(caps);
            if !normalized.is_empty() {
                f.capabilities_json = serde_json::to_string(&normalized).ok();
            }
        }
    }

    extract_payment(obj, &mut f);
    if f.payment_handler_id.is_none() {
        // Discovery profiles list available handlers without a selection.
        if let Some(handlers) = obj
            .get("payment")
            .and_then(|p| p.get("handlers"))
            .and_then(Value::as_array)
        {
            if let Some(first) = handlers.first().and_then(Value::as_object) {
                f.payment_handler_id =
                    str_field(first.get("id")).or_else(|| str_field(first.get("name")));
            }
        }
    }

    extract_fulfillment(obj, &mut f);

    if let Some(discounts) = obj.get("discounts").and_then(Value::as_object) {
        if let Some(codes) = discounts.get("codes").and_then(Value::as_array) {
            if !codes.is_empty() {
                f.discount_codes_json = serde_json::to_string(codes).ok();
            }
        }
        if let Some(applied) = discounts.get("applied").and_then(Value::as_array) {
            if !applied.is_empty() {
                f.discount_applied_json = serde_json::to_string(applied).ok();
            }
        }
    }

    if let Some(expires) = str_field(obj.get("expires_at")) {
        f.expires_at = Some(expires);
    }
    if let Some(url) = str_field(obj.get("continue_url")) {
        f.continue_url = Some(url);
    }

    if let Some(provider) = str_field(obj.get("provider")) {
        f.identity_provider = Some(provider);
    }
    if let Some(scope) = str_field(obj.get("scope")) {
        f.identity_scope = Some(scope);
    }
    if let Some(identity) = obj.get("identity").and_then(Value::as_object) {
        if let Some(provider) = str_field(identity.get("provider")) {
            f.identity_provider = Some(provider);
        }
        if let Some(scope) = str_field(identity.get("scope")) {
            f.identity_scope = Some(scope);
        }
    }

    if let Some(messages) = obj.get("messages").and_then(Value::as_array) {
        if !messages.is_empty() {
            f.messages_json = serde_json::to_string(messages).ok();
            for msg in messages {
                let Some(m) = msg.as_object() else { continue };
                if m.get("type").and_then(Value::as_str) == Some("error") {
                    f.error_code = str_field(m.get("code"));
                    f.error_message = str_field(m.get("content"));
                    f.error_severity = str_field(m.get("severity"));
                    break;
                }
            }
        }
    }

    // Some confirmations only reference the order through a typed link.
    if f.order_id.is_none() {
        if let Some(links) = obj.get("links").and_then(Value::as_array) {
            for link in links {
                let Some(l) = link.as_object() else { continue };
                if l.get("type").and_then(Value::as_str) == Some("order") {
                    if let Some(url) = str_field(l.get("url")) {
                        f.order_id = Some(url);
                        break;
                    }
                }
            }
        }
    }

    f
}

/// Normalize the two capability encodings to a list of objects.
///
/// The array form is canonical; the object-keyed form (`{name: spec}`)
/// still appears in older profiles and is flattened to entries carrying
/// a `name` key.
pub fn normalize_capabilities(caps: &Value) -> Vec<Value> {
    match caps {
        Value::Array(list) => list.clone(),
        Value::Object(map) => {
            let mut out = Vec::with_capacity(map.len());
            for (name, spec) in map {
                // A key maps to either one entry or a list of entries.
                match spec {
                    Value::Array(entries) => {
                        for entry in entries {
                            out.push(named_entry(name, entry.as_object()));
                        }
                    }
                    other => out.push(named_entry(name, other.as_object())),
                }
            }
            out
        }
        _ => Vec::new(),
    }
}

fn named_entry(name: &str, spec: Option<&serde_json::Map<String, Value>>) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("name".to_owned(), Value::String(name.to_owned()));
    if let Some(spec) = spec {
        // Entry keys win over the synthesized name.
        entry.extend(spec.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Value::Object(entry)
}

fn extract_payment(obj: &serde_json::Map<String, Value>, f: &mut Fields) {
    // Completed checkouts carry the chosen instrument in `payment_data`.
    if let Some(data) = obj.get("payment_data").and_then(Value::as_object) {
        if !data.is_empty() {
            f.payment_handler_id =
                str_field(data.get("handler_id")).or_else(|| str_field(data.get("id")));
            f.payment_instrument_type = str_field(data.get("type"));
            f.payment_brand = str_field(data.get("brand"));
            return;
        }
    }
    let Some(payment) = obj.get("payment").and_then(Value::as_object) else {
        return;
    };
    if let Some(instruments) = payment.get("instruments").and_then(Value::as_array) {
        if let Some(first) = instruments.first().and_then(Value::as_object) {
            f.payment_handler_id =
                str_field(first.get("handler_id")).or_else(|| str_field(first.get("id")));
            f.payment_instrument_type = str_field(first.get("type"));
            f.payment_brand = str_field(first.get("brand"));
            return;
        }
    }
    if let Some(handlers) = payment.get("handlers").and_then(Value::as_array) {
        if let Some(first) = handlers.first().and_then(Value::as_object) {
            f.payment_handler_id = str_field(first.get("id"));
            f.payment_instrument_type = str_field(first.get("type"));
            f.payment_brand = str_field(first.get("brand"));
            return;
        }
    }
    if payment.is_empty() {
        return;
    }
    f.payment_handler_id =
        str_field(payment.get("handler_id")).or_else(|| str_field(payment.get("id")));
    f.payment_instrument_type = str_field(payment.get("type"));
    f.payment_brand = str_field(payment.get("brand"));
}

fn extract_fulfillment(obj: &serde_json::Map<String, Value>, f: &mut Fields) {
    let Some(fulfillment) = obj.get("fulfillment").and_then(Value::as_object) else {
        return;
    };
    if let Some(methods) = fulfillment.get("methods").and_then(Value::as_array) {
        if let Some(first) = methods.first().and_then(Value::as_object) {
            f.fulfillment_type = str_field(first.get("type"));
            if let Some(dest) = first
                .get("destinations")
                .and_then(Value::as_array)
                .and_then(|d| d.first())
                .and_then(Value::as_object)
            {
                f.fulfillment_destination_country = str_field(dest.get("address_country"))
                    .or_else(|| {
                        dest.get("address")
                            .and_then(Value::as_object)
                            .and_then(|a| str_field(a.get("address_country")))
                    });
            }
            return;
        }
    }
    if let Some(expectation) = fulfillment
        .get("expectations")
        .and_then(Value::as_array)
        .and_then(|e| e.first())
        .and_then(Value::as_object)
    {
        f.fulfillment_type = str_field(expectation.get("method_type"))
            .or_else(|| str_field(expectation.get("type")));
        if let Some(dest) = expectation.get("destination").and_then(Value::as_object) {
            f.fulfillment_destination_country = str_field(dest.get("address_country"));
        }
    }
}

/// Identifier coercion: non-empty strings pass through, numbers are
/// stringified, anything else is ignored.
fn id_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str).map(str::to_owned)
}
