//! Webhook reconciliation tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use hmac::{Hmac, Mac};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use sha2::Sha256;

    use crate::config::ProviderConfig;
    use crate::gateway::PaymentGateway;
    use crate::orchestrator::{CreatePaymentCommand, PaymentOrchestrator, SUPPORTED_CURRENCY};
    use crate::reconciler::{map_provider_status, WebhookReconciler};
    use crate::store::{
        InMemoryOrderStore, InMemoryPaymentStore, InMemoryWebhookEventStore, OrderStore,
        PaymentStore, WebhookEventStore,
    };
    use crate::types::order::{Address, CustomerId, Order, OrderLineItem, OrderStatus};
    use crate::types::payment::{Payment, PaymentMethod, PaymentStatus};
    use crate::types::webhook::MatchStrategy;

    const SECRET: &str = "whsec_reconciler_test";
    const HEADER: &str = "Webhook-Signature";

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    struct Fixture {
        reconciler: WebhookReconciler,
        orchestrator: Arc<PaymentOrchestrator>,
        orders: Arc<InMemoryOrderStore>,
        events: Arc<InMemoryWebhookEventStore>,
    }

    fn sign_with(body: &[u8], secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_headers(body: &[u8]) -> HashMap<String, String> {
        HashMap::from([(HEADER.to_string(), sign_with(body, SECRET))])
    }

    fn shipping_address() -> Address {
        Address {
            line1: "4 Grid Lane".to_string(),
            line2: None,
            suburb: "Newcastle".to_string(),
            state: "NSW".to_string(),
            postcode: "2300".to_string(),
        }
    }

    fn battery_order(total: Decimal) -> Order {
        Order::new(
            CustomerId::new("cust-1"),
            vec![OrderLineItem {
                product_id: "ps-5000".to_string(),
                name: "PowerStack 5kWh Battery".to_string(),
                quantity: 1,
                unit_price: total,
                total,
            }],
            total,
            Decimal::ZERO,
            Decimal::ZERO,
            shipping_address(),
        )
    }

    fn bpay_details() -> Value {
        json!({
            "billerCode": "123456",
            "reference": "CRN00042",
            "amount": "500.00",
            "expiresAt": (Utc::now() + chrono::Duration::days(7)).to_rfc3339()
        })
    }

    /// Stands up the full pipeline with one pending BPAY payment.
    async fn fixture() -> (Fixture, Payment, Order) {
        let orders = Arc::new(InMemoryOrderStore::new());
        let payments = Arc::new(InMemoryPaymentStore::new());
        let events = Arc::new(InMemoryWebhookEventStore::new());
        let gateway = Arc::new(PaymentGateway::with_default_rails(Duration::from_secs(2)));
        let orchestrator = Arc::new(PaymentOrchestrator::new(
            Arc::clone(&orders) as Arc<dyn OrderStore>,
            Arc::clone(&payments) as Arc<dyn PaymentStore>,
            gateway,
        ));

        let order = battery_order(dec!(500.00));
        orders.insert(order.clone()).await.expect("insert order");
        let created = orchestrator
            .create(
                CreatePaymentCommand {
                    order_id: order.id.clone(),
                    amount: order.total,
                    currency: SUPPORTED_CURRENCY.to_string(),
                    method: PaymentMethod::Bpay,
                    details: bpay_details(),
                    metadata: HashMap::new(),
                    receipt_email: None,
                },
                &order.customer_id,
            )
            .await
            .expect("create payment");

        let reconciler = WebhookReconciler::new(
            &[ProviderConfig {
                name: "gateway".to_string(),
                signature_header: HEADER.to_string(),
                webhook_secret: SECRET.to_string(),
            }],
            Arc::clone(&orchestrator),
            Arc::clone(&payments) as Arc<dyn PaymentStore>,
            Arc::clone(&events) as Arc<dyn WebhookEventStore>,
        )
        .expect("build reconciler");

        (Fixture { reconciler, orchestrator, orders, events }, created.payment, order)
    }

    fn event_body(payment: &Payment, status: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "paymentMethod": "bpay",
            "paymentId": payment.provider_payment_id,
            "reference": payment.provider_reference,
            "status": status,
        }))
        .expect("serialize body")
    }

    // ------------------------------------------------------------------
    // Deliveries
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn settlement_event_completes_payment_and_order() {
        let (fixture, payment, order) = fixture().await;
        let body = event_body(&payment, "paid");

        let response = fixture.reconciler.handle(&body, &signed_headers(&body)).await;
        assert_eq!(response.status_code, 200);

        let stored = fixture.orchestrator.fetch(&payment.id).await.expect("fetch");
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert!(stored.completed_at.is_some());

        let stored_order =
            fixture.orders.get(&order.id).await.expect("get").expect("order exists");
        assert_eq!(stored_order.status, OrderStatus::Paid);

        let records = fixture.events.all().await.expect("audit records");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, response.event_id);
        assert!(record.success);
        assert!(record.error.is_none());
        assert_eq!(record.payment_id.as_ref(), Some(&payment.id));
        assert_eq!(record.match_strategy, Some(MatchStrategy::ProviderPaymentId));
        assert_eq!(record.mapped_status, Some(PaymentStatus::Completed));
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let (fixture, payment, _) = fixture().await;
        let body = event_body(&payment, "paid");

        let response = fixture.reconciler.handle(&body, &HashMap::new()).await;
        assert_eq!(response.status_code, 401);

        let stored = fixture.orchestrator.fetch(&payment.id).await.expect("fetch");
        assert_eq!(stored.status, PaymentStatus::Pending);

        let records = fixture.events.all().await.expect("audit records");
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert!(records[0].error.as_deref().unwrap_or_default().contains("missing signature"));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let (fixture, payment, _) = fixture().await;
        let body = event_body(&payment, "paid");
        let headers =
            HashMap::from([(HEADER.to_string(), sign_with(&body, "whsec_someone_else"))]);

        let response = fixture.reconciler.handle(&body, &headers).await;
        assert_eq!(response.status_code, 401);

        let stored = fixture.orchestrator.fetch(&payment.id).await.expect("fetch");
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let (fixture, payment, _) = fixture().await;
        let body = event_body(&payment, "paid");
        let headers = signed_headers(&body);
        let tampered = event_body(&payment, "refunded");

        let response = fixture.reconciler.handle(&tampered, &headers).await;
        assert_eq!(response.status_code, 401);

        let records = fixture.events.all().await.expect("audit records");
        assert_eq!(records.len(), 1);
        assert!(records[0].error.as_deref().unwrap_or_default().contains("invalid signature"));
    }

    #[tokio::test]
    async fn unparseable_payload_is_rejected_after_verification() {
        let (fixture, _, _) = fixture().await;
        let body = b"not json at all";

        let response = fixture.reconciler.handle(body, &signed_headers(body)).await;
        assert_eq!(response.status_code, 400);

        let records = fixture.events.all().await.expect("audit records");
        assert_eq!(records.len(), 1);
        assert!(records[0].error.as_deref().unwrap_or_default().contains("unparseable"));
    }

    #[tokio::test]
    async fn unmatched_event_is_audited() {
        let (fixture, _, _) = fixture().await;
        let body = serde_json::to_vec(&json!({
            "paymentMethod": "bpay",
            "paymentId": "bpay_unknown",
            "reference": "CRN99999",
            "status": "paid",
        }))
        .expect("serialize body");

        let response = fixture.reconciler.handle(&body, &signed_headers(&body)).await;
        assert_eq!(response.status_code, 404);

        let records = fixture.events.all().await.expect("audit records");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(!record.success);
        assert_eq!(record.error.as_deref(), Some("PaymentNotFound"));
        assert!(record.payment_id.is_none());
        assert_eq!(record.provider_payment_id.as_deref(), Some("bpay_unknown"));
    }

    #[tokio::test]
    async fn reference_match_is_recorded_as_fallback() {
        let (fixture, payment, _) = fixture().await;
        let body = serde_json::to_vec(&json!({
            "paymentMethod": "bpay",
            "reference": payment.provider_reference,
            "status": "paid",
        }))
        .expect("serialize body");

        let response = fixture.reconciler.handle(&body, &signed_headers(&body)).await;
        assert_eq!(response.status_code, 200);

        let records = fixture.events.all().await.expect("audit records");
        assert_eq!(records[0].match_strategy, Some(MatchStrategy::ProviderReference));

        let stored = fixture.orchestrator.fetch(&payment.id).await.expect("fetch");
        assert_eq!(stored.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_status_string_maps_to_pending() {
        let (fixture, payment, _) = fixture().await;
        let body = event_body(&payment, "settlement_scheduled");

        let response = fixture.reconciler.handle(&body, &signed_headers(&body)).await;
        assert_eq!(response.status_code, 200);

        let stored = fixture.orchestrator.fetch(&payment.id).await.expect("fetch");
        assert_eq!(stored.status, PaymentStatus::Pending);

        let records = fixture.events.all().await.expect("audit records");
        assert!(records[0].success);
        assert_eq!(records[0].mapped_status, Some(PaymentStatus::Pending));
    }

    #[tokio::test]
    async fn duplicate_delivery_is_audited_twice_and_applied_once() {
        let (fixture, payment, order) = fixture().await;
        let body = event_body(&payment, "paid");
        let headers = signed_headers(&body);

        let first = fixture.reconciler.handle(&body, &headers).await;
        let second = fixture.reconciler.handle(&body, &headers).await;
        assert_eq!(first.status_code, 200);
        assert_eq!(second.status_code, 200);
        assert_ne!(first.event_id, second.event_id);

        let stored = fixture.orchestrator.fetch(&payment.id).await.expect("fetch");
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert_eq!(stored.history.len(), 1);

        let stored_order =
            fixture.orders.get(&order.id).await.expect("get").expect("order exists");
        assert_eq!(stored_order.status, OrderStatus::Paid);

        let records = fixture.events.all().await.expect("audit records");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn stale_event_timestamp_is_rejected() {
        let (fixture, payment, _) = fixture().await;
        let body = serde_json::to_vec(&json!({
            "paymentMethod": "bpay",
            "paymentId": payment.provider_payment_id,
            "status": "paid",
            "timestamp": (Utc::now() - chrono::Duration::minutes(10)).to_rfc3339(),
        }))
        .expect("serialize body");

        let response = fixture.reconciler.handle(&body, &signed_headers(&body)).await;
        assert_eq!(response.status_code, 401);

        let stored = fixture.orchestrator.fetch(&payment.id).await.expect("fetch");
        assert_eq!(stored.status, PaymentStatus::Pending);

        let records = fixture.events.all().await.expect("audit records");
        assert!(records[0].error.as_deref().unwrap_or_default().contains("stale"));
    }

    #[tokio::test]
    async fn future_dated_event_timestamp_is_rejected() {
        let (fixture, payment, _) = fixture().await;
        let body = serde_json::to_vec(&json!({
            "paymentMethod": "bpay",
            "paymentId": payment.provider_payment_id,
            "status": "paid",
            "timestamp": (Utc::now() + chrono::Duration::minutes(5)).to_rfc3339(),
        }))
        .expect("serialize body");

        let response = fixture.reconciler.handle(&body, &signed_headers(&body)).await;
        assert_eq!(response.status_code, 401);

        let records = fixture.events.all().await.expect("audit records");
        assert!(records[0].error.as_deref().unwrap_or_default().contains("future"));
    }

    #[tokio::test]
    async fn header_lookup_is_case_insensitive() {
        let (fixture, payment, _) = fixture().await;
        let body = event_body(&payment, "paid");
        let headers =
            HashMap::from([("WEBHOOK-SIGNATURE".to_string(), sign_with(&body, SECRET))]);

        let response = fixture.reconciler.handle(&body, &headers).await;
        assert_eq!(response.status_code, 200);
    }

    // ------------------------------------------------------------------
    // Status vocabulary
    // ------------------------------------------------------------------

    #[test]
    fn provider_status_vocabulary() {
        assert_eq!(map_provider_status("succeeded"), PaymentStatus::Completed);
        assert_eq!(map_provider_status("PAID"), PaymentStatus::Completed);
        assert_eq!(map_provider_status(" confirmed "), PaymentStatus::Completed);
        assert_eq!(map_provider_status("completed"), PaymentStatus::Completed);
        assert_eq!(map_provider_status("failed"), PaymentStatus::Failed);
        assert_eq!(map_provider_status("declined"), PaymentStatus::Failed);
        assert_eq!(map_provider_status("cancelled"), PaymentStatus::Cancelled);
        assert_eq!(map_provider_status("refunded"), PaymentStatus::Refunded);
        assert_eq!(map_provider_status("processing"), PaymentStatus::Processing);
        assert_eq!(map_provider_status("anything else"), PaymentStatus::Pending);
        assert_eq!(map_provider_status(""), PaymentStatus::Pending);
    }
}
