//! Field extraction over representative body shapes.

use serde_json::{Value, json};

use ucp_analytics::extract::{Fields, extract, normalize_capabilities};

fn sample_checkout_response() -> Value {
    json!({
        "id": "cs_abc123",
        "status": "ready_for_complete",
        "currency": "usd",
        "line_items": [
            {"id": "li_1", "item": {"id": "item_1", "title": "Widget"}, "quantity": 2},
            {"id": "li_2", "item": {"id": "item_2", "title": "Gadget"}, "quantity": 1}
        ],
        "totals": [
            {"type": "subtotal", "display_text": "Subtotal", "amount": 3000},
            {"type": "tax", "display_text": "Tax", "amount": 240},
            {"type": "fulfillment", "display_text": "Shipping", "amount": 500},
            {"type": "total", "display_text": "Total", "amount": 3740}
        ],
        "ucp": {
            "version": "2026-01-15",
            "capabilities": [
                {"name": "dev.ucp.shopping.checkout"},
                {"name": "dev.ucp.shopping.discount", "extends": "dev.ucp.shopping.checkout"}
            ]
        },
        "payment": {
            "handlers": [
                {"id": "stripe_handler", "type": "card"}
            ]
        },
        "fulfillment": {
            "methods": [
                {
                    "type": "shipping",
                    "destinations": [
                        {"id": "dest_1", "address_country": "US", "postal_code": "94105"}
                    ]
                }
            ]
        },
        "expires_at": "2026-01-16T00:00:00Z",
        "continue_url": "https://merchant.example/checkout/cs_abc123"
    })
}

#[test]
fn checkout_response_core_fields() {
    let f = extract(&sample_checkout_response());
    assert_eq!(f.checkout_session_id.as_deref(), Some("cs_abc123"));
    assert_eq!(f.checkout_status.as_deref(), Some("ready_for_complete"));
    assert_eq!(f.currency.as_deref(), Some("usd"));
    assert_eq!(f.subtotal_amount, Some(3000));
    assert_eq!(f.tax_amount, Some(240));
    assert_eq!(f.fulfillment_amount, Some(500));
    assert_eq!(f.total_amount, Some(3740));
    assert_eq!(f.line_item_count, Some(2));
    assert!(f.line_items_json.as_deref().is_some_and(|s| s.contains("li_1")));
    assert_eq!(f.ucp_version.as_deref(), Some("2026-01-15"));
    assert!(
        f.capabilities_json
            .as_deref()
            .is_some_and(|s| s.contains("dev.ucp.shopping.discount"))
    );
    assert_eq!(f.payment_handler_id.as_deref(), Some("stripe_handler"));
    assert_eq!(f.fulfillment_type.as_deref(), Some("shipping"));
    assert_eq!(f.fulfillment_destination_country.as_deref(), Some("US"));
    assert_eq!(f.expires_at.as_deref(), Some("2026-01-16T00:00:00Z"));
    assert_eq!(
        f.continue_url.as_deref(),
        Some("https://merchant.example/checkout/cs_abc123")
    );
}

#[test]
fn all_total_types_and_unknown_skipped() {
    let body = json!({
        "totals": [
            {"type": "items_discount", "amount": -100},
            {"type": "subtotal", "amount": 1000},
            {"type": "discount", "amount": -200},
            {"type": "fulfillment", "amount": 300},
            {"type": "tax", "amount": 80},
            {"type": "fee", "amount": 50},
            {"type": "total", "amount": 1130},
            {"type": "loyalty_points", "amount": 999}
        ]
    });
    let f = extract(&body);
    assert_eq!(f.items_discount_amount, Some(-100));
    assert_eq!(f.subtotal_amount, Some(1000));
    assert_eq!(f.discount_amount, Some(-200));
    assert_eq!(f.fulfillment_amount, Some(300));
    assert_eq!(f.tax_amount, Some(80));
    assert_eq!(f.fee_amount, Some(50));
    assert_eq!(f.total_amount, Some(1130));
}

#[test]
fn total_without_amount_is_skipped() {
    let body = json!({"totals": [{"type": "total"}, {"type": "tax", "amount": 10}]});
    let f = extract(&body);
    assert_eq!(f.total_amount, None);
    assert_eq!(f.tax_amount, Some(10));
}

// ---------------------------------------------------------------------------
// Identifier heuristics
// ---------------------------------------------------------------------------

#[test]
fn order_confirmation_with_checkout_id() {
    // A body with both `id` and `checkout_id` is an order confirmation:
    // `id` names the order, not the session.
    let body = json!({"id": "ord_1", "checkout_id": "cs_1", "status": "confirmed"});
    let f = extract(&body);
    assert_eq!(f.order_id.as_deref(), Some("ord_1"));
    assert_eq!(f.checkout_session_id.as_deref(), Some("cs_1"));
    // "confirmed" is not a checkout status, and confirmations never
    // carry one anyway.
    assert_eq!(f.checkout_status, None);
}

#[test]
fn numeric_ids_are_stringified() {
    let body = json!({"id": 42, "checkout_id": 7});
    let f = extract(&body);
    assert_eq!(f.order_id.as_deref(), Some("42"));
    assert_eq!(f.checkout_session_id.as_deref(), Some("7"));
}

#[test]
fn explicit_order_id_wins() {
    let body = json!({"id": "cs_1", "order_id": "ord_9"});
    let f = extract(&body);
    assert_eq!(f.checkout_session_id.as_deref(), Some("cs_1"));
    assert_eq!(f.order_id.as_deref(), Some("ord_9"));
}

#[test]
fn nested_order_object() {
    let body = json!({
        "id": "cs_1",
        "order": {"id": "ord_5", "permalink_url": "https://merchant.example/orders/ord_5"}
    });
    let f = extract(&body);
    assert_eq!(f.order_id.as_deref(), Some("ord_5"));
    assert_eq!(
        f.permalink_url.as_deref(),
        Some("https://merchant.example/orders/ord_5")
    );
}

#[test]
fn order_id_from_typed_link() {
    let body = json!({
        "links": [
            {"type": "terms", "url": "https://merchant.example/terms"},
            {"type": "order", "url": "https://merchant.example/orders/ord_3"}
        ]
    });
    let f = extract(&body);
    assert_eq!(
        f.order_id.as_deref(),
        Some("https://merchant.example/orders/ord_3")
    );
}

#[test]
fn empty_string_id_ignored() {
    let body = json!({"id": ""});
    let f = extract(&body);
    assert_eq!(f.checkout_session_id, None);
}

// ---------------------------------------------------------------------------
// Checkout status scoping
// ---------------------------------------------------------------------------

#[test]
fn checkout_status_vocabulary_only() {
    let f = extract(&json!({"status": "completed"}));
    assert_eq!(f.checkout_status.as_deref(), Some("completed"));

    let f = extract(&json!({"status": "shipped"}));
    assert_eq!(f.checkout_status, None);

    let f = extract(&json!({"status": "completed", "checkout_id": "cs_1"}));
    assert_eq!(f.checkout_status, None);
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

#[test]
fn capabilities_object_form_normalized() {
    let body = json!({
        "ucp": {
            "version": "2026-01-15",
            "capabilities": {
                "dev.ucp.shopping.checkout": {"version": "1"},
                "dev.ucp.shopping.discount": {"version": "1", "extends": "dev.ucp.shopping.checkout"}
            }
        }
    });
    let f = extract(&body);
    let caps: Vec<Value> =
        serde_json::from_str(f.capabilities_json.as_deref().unwrap()).unwrap();
    assert_eq!(caps.len(), 2);
    assert!(caps.iter().all(|c| c.get("name").is_some()));
    assert!(
        caps.iter()
            .any(|c| c["name"] == "dev.ucp.shopping.discount"
                && c["extends"] == "dev.ucp.shopping.checkout")
    );
}

#[test]
fn capabilities_object_keyed_list_values_flattened() {
    // A key may carry a list of entries; each becomes its own named
    // object with the entry's fields intact.
    let caps = json!({
        "dev.ucp.shopping.checkout": [{"version": "2026-01-11"}],
        "dev.ucp.shopping.discount": [
            {"version": "2026-01-11"},
            {"version": "2026-02-01", "extends": "dev.ucp.shopping.checkout"}
        ]
    });
    let normalized = normalize_capabilities(&caps);
    assert_eq!(normalized.len(), 3);
    assert!(
        normalized
            .iter()
            .any(|c| c["name"] == "dev.ucp.shopping.checkout"
                && c["version"] == "2026-01-11")
    );
    assert!(
        normalized
            .iter()
            .any(|c| c["name"] == "dev.ucp.shopping.discount"
                && c["version"] == "2026-02-01"
                && c["extends"] == "dev.ucp.shopping.checkout")
    );
}

#[test]
fn capabilities_end_to_end_object_keyed_list() {
    let body = json!({
        "ucp": {
            "version": "2026-01-11",
            "capabilities": {"dev.ucp.shopping.checkout": [{"version": "2026-01-11"}]}
        }
    });
    let f = extract(&body);
    let caps: Vec<Value> =
        serde_json::from_str(f.capabilities_json.as_deref().unwrap()).unwrap();
    assert_eq!(caps.len(), 1);
    assert_eq!(caps[0]["name"], "dev.ucp.shopping.checkout");
    assert_eq!(caps[0]["version"], "2026-01-11");
}

#[test]
fn capabilities_entry_name_overrides_key() {
    let caps = json!({"outer": {"name": "inner", "version": "1"}});
    let normalized = normalize_capabilities(&caps);
    assert_eq!(normalized.len(), 1);
    assert_eq!(normalized[0]["name"], "inner");
}

#[test]
fn capabilities_scalar_is_empty() {
    assert!(normalize_capabilities(&json!("nope")).is_empty());
    assert!(normalize_capabilities(&json!(3)).is_empty());
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

#[test]
fn payment_data_takes_priority() {
    let body = json!({
        "payment_data": {"handler_id": "gpay", "type": "card", "brand": "visa"},
        "payment": {"handlers": [{"id": "stripe_handler"}]}
    });
    let f = extract(&body);
    assert_eq!(f.payment_handler_id.as_deref(), Some("gpay"));
    assert_eq!(f.payment_instrument_type.as_deref(), Some("card"));
    assert_eq!(f.payment_brand.as_deref(), Some("visa"));
}

#[test]
fn payment_instruments_before_handlers() {
    let body = json!({
        "payment": {
            "instruments": [{"handler_id": "adyen", "type": "card", "brand": "amex"}],
            "handlers": [{"id": "stripe_handler"}]
        }
    });
    let f = extract(&body);
    assert_eq!(f.payment_handler_id.as_deref(), Some("adyen"));
    assert_eq!(f.payment_brand.as_deref(), Some("amex"));
}

#[test]
fn payment_handler_discovery_fallback_by_name() {
    let body = json!({"payment": {"handlers": [{"name": "stripe"}]}});
    let f = extract(&body);
    assert_eq!(f.payment_handler_id.as_deref(), Some("stripe"));
}

#[test]
fn payment_direct_fields() {
    let body = json!({"payment": {"handler_id": "braintree", "type": "wallet"}});
    let f = extract(&body);
    assert_eq!(f.payment_handler_id.as_deref(), Some("braintree"));
    assert_eq!(f.payment_instrument_type.as_deref(), Some("wallet"));
}

#[test]
fn empty_payment_object_yields_nothing() {
    let f = extract(&json!({"payment": {}}));
    assert_eq!(f.payment_handler_id, None);
    assert_eq!(f.payment_instrument_type, None);
}

// ---------------------------------------------------------------------------
// Fulfillment
// ---------------------------------------------------------------------------

#[test]
fn fulfillment_nested_address_country() {
    let body = json!({
        "fulfillment": {
            "methods": [
                {"type": "shipping", "destinations": [{"address": {"address_country": "DE"}}]}
            ]
        }
    });
    let f = extract(&body);
    assert_eq!(f.fulfillment_destination_country.as_deref(), Some("DE"));
}

#[test]
fn fulfillment_expectations_fallback() {
    let body = json!({
        "fulfillment": {
            "expectations": [
                {"method_type": "pickup", "destination": {"address_country": "CA"}}
            ]
        }
    });
    let f = extract(&body);
    assert_eq!(f.fulfillment_type.as_deref(), Some("pickup"));
    assert_eq!(f.fulfillment_destination_country.as_deref(), Some("CA"));
}

// ---------------------------------------------------------------------------
// Discounts, identity, messages
// ---------------------------------------------------------------------------

#[test]
fn discount_lists_serialized() {
    let body = json!({
        "discounts": {
            "codes": ["SAVE10"],
            "applied": [{"code": "SAVE10", "amount": -100}]
        }
    });
    let f = extract(&body);
    assert!(f.discount_codes_json.as_deref().is_some_and(|s| s.contains("SAVE10")));
    assert!(f.discount_applied_json.as_deref().is_some_and(|s| s.contains("-100")));
}

#[test]
fn empty_discount_lists_ignored() {
    let f = extract(&json!({"discounts": {"codes": [], "applied": []}}));
    assert_eq!(f.discount_codes_json, None);
    assert_eq!(f.discount_applied_json, None);
}

#[test]
fn identity_flat_and_nested() {
    let f = extract(&json!({"provider": "google", "scope": "openid"}));
    assert_eq!(f.identity_provider.as_deref(), Some("google"));
    assert_eq!(f.identity_scope.as_deref(), Some("openid"));

    // Nested identity object overrides the flat fields.
    let f = extract(&json!({
        "provider": "flat",
        "identity": {"provider": "apple", "scope": "email"}
    }));
    assert_eq!(f.identity_provider.as_deref(), Some("apple"));
    assert_eq!(f.identity_scope.as_deref(), Some("email"));
}

#[test]
fn first_error_message_extracted() {
    let body = json!({
        "messages": [
            {"type": "info", "content": "heads up"},
            {"type": "error", "code": "out_of_stock", "content": "Item unavailable", "severity": "recoverable"},
            {"type": "error", "code": "later", "content": "ignored"}
        ]
    });
    let f = extract(&body);
    assert_eq!(f.error_code.as_deref(), Some("out_of_stock"));
    assert_eq!(f.error_message.as_deref(), Some("Item unavailable"));
    assert_eq!(f.error_severity.as_deref(), Some("recoverable"));
    assert!(f.messages_json.as_deref().is_some_and(|s| s.contains("heads up")));
}

// ---------------------------------------------------------------------------
// Degenerate inputs
// ---------------------------------------------------------------------------

#[test]
fn non_object_bodies_yield_default() {
    assert_eq!(extract(&json!(null)), Fields::default());
    assert_eq!(extract(&json!([1, 2])), Fields::default());
    assert_eq!(extract(&json!("text")), Fields::default());
    assert_eq!(extract(&json!({})), Fields::default());
}

#[test]
fn empty_line_items_ignored() {
    let f = extract(&json!({"line_items": []}));
    assert_eq!(f.line_item_count, None);
    assert_eq!(f.line_items_json, None);
}
