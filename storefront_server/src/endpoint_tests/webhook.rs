use std::sync::Arc;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use storefront_common::Secret;
use storefront_engine::{
    db_types::{HoldItem, OrderStatus, ReservationStatus},
    events::EventProducers,
    helpers::{Canonicalization, SignatureReconciler, WebhookPayload},
    traits::{CommitOutcome, CommitResult, LedgerError, ReleaseOutcome},
    FulfilmentApi,
};

use super::{
    helpers::{hold, order, send_request},
    mocks::MockStorefrontDb,
};
use crate::{middleware::SignatureMiddlewareFactory, routes::PaymentWebhookRoute};

const SECRET: &str = "webhook-secret";
const FORM: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";

fn reconciler() -> SignatureReconciler {
    SignatureReconciler::new(Secret::new(SECRET.to_string())).unwrap()
}

fn configure(db: MockStorefrontDb, reconciler: Option<SignatureReconciler>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = FulfilmentApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/api/payments")
                .wrap(SignatureMiddlewareFactory::new(reconciler.map(Arc::new)))
                .service(PaymentWebhookRoute::<MockStorefrontDb>::new()),
        );
    }
}

fn sign(content_type: &str, body: &str, canonicalization: Canonicalization) -> String {
    let payload = WebhookPayload::decode(Some(content_type), body.as_bytes()).unwrap();
    reconciler().candidate(&payload, canonicalization)
}

fn webhook(content_type: &str, body: &str, signature: Option<String>) -> TestRequest {
    let mut req = TestRequest::post()
        .uri("/api/payments/webhook")
        .insert_header(("Content-Type", content_type))
        .set_payload(body.to_string());
    if let Some(signature) = signature {
        req = req.insert_header(("Sign", signature));
    }
    req
}

fn committed(order_id: &str, outcome: CommitOutcome) -> CommitResult {
    let status = ReservationStatus::Paid;
    CommitResult { outcome, hold: hold(order_id, status, &[HoldItem::new("A", 2)]), expired: vec![] }
}

#[actix_web::test]
async fn missing_signature_is_rejected_before_parsing() {
    let req = webhook(JSON, "this is not even json", None);
    let (status, body) = send_request(req, configure(MockStorefrontDb::new(), Some(reconciler()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("did not carry a signature"), "{body}");
}

#[actix_web::test]
async fn invalid_signature() {
    let body = r#"{"order_num":"o-1","payment_status":"success"}"#;
    let forged = SignatureReconciler::new(Secret::new("guess".to_string()))
        .unwrap()
        .candidate(&WebhookPayload::decode(Some(JSON), body.as_bytes()).unwrap(), Canonicalization::ALL[0]);
    let req = webhook(JSON, body, Some(forged));
    let (status, body) = send_request(req, configure(MockStorefrontDb::new(), Some(reconciler()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Webhook rejected. Invalid signature"}"#);
}

#[actix_web::test]
async fn unconfigured_secret_rejects_everything() {
    let body = r#"{"order_num":"o-1","payment_status":"success"}"#;
    let signature = sign(JSON, body, Canonicalization::ALL[0]);
    let req = webhook(JSON, body, Some(signature));
    let (status, _) = send_request(req, configure(MockStorefrontDb::new(), None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn successful_payment_commits_the_hold() {
    let mut db = MockStorefrontDb::new();
    db.expect_commit_paid()
        .withf(|order_id, _| order_id.as_str() == "o-1")
        .times(1)
        .returning(|order_id, _| Ok(committed(order_id.as_str(), CommitOutcome::Committed)));
    db.expect_update_order_status()
        .withf(|order_id, status| order_id.as_str() == "o-1" && status.as_str() == "paid")
        .times(1)
        .returning(|order_id, status| Ok(order(order_id.as_str(), status, 500)));
    let body = r#"{"order_num":"o-1","order_id":"9001","payment_status":"Success","sum":"500.00"}"#;
    let signature = sign(JSON, body, Canonicalization::ALL[4]);
    let (status, body) = send_request(webhook(JSON, body, Some(signature)), configure(db, Some(reconciler()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);
}

#[actix_web::test]
async fn signed_form_with_nested_products() {
    let mut db = MockStorefrontDb::new();
    db.expect_commit_paid()
        .times(1)
        .returning(|order_id, _| Ok(committed(order_id.as_str(), CommitOutcome::AlreadyPaid)));
    db.expect_update_order_status().times(1).returning(|order_id, status| Ok(order(order_id.as_str(), status, 500)));
    let body = "order_num=o-1&payment_status=success&customer_extra=Name%3A+Ann%0D%0AComment%3A+%2F\
                &products%5B0%5D%5Bname%5D=%D0%A2%D0%BE%D1%80%D1%82&products%5B0%5D%5Bquantity%5D=2";
    let signature = sign(FORM, body, Canonicalization::ALL[3]);
    let (status, _) = send_request(webhook(FORM, body, Some(signature)), configure(db, Some(reconciler()))).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn failed_payment_releases_the_hold() {
    let mut db = MockStorefrontDb::new();
    db.expect_release()
        .withf(|order_id, status| order_id.as_str() == "o-1" && *status == ReservationStatus::Released("fail".into()))
        .times(1)
        .returning(|order_id, status| Ok(ReleaseOutcome::Released(hold(order_id.as_str(), status, &[]))));
    db.expect_update_order_status()
        .withf(|_, status| *status == OrderStatus::from_provider("fail"))
        .times(1)
        .returning(|order_id, status| Ok(order(order_id.as_str(), status, 500)));
    db.expect_commit_paid().never();
    let body = "order_num=o-1&payment_status=FAIL";
    let signature = sign(FORM, body, Canonicalization::ALL[0]);
    let (status, body) = send_request(webhook(FORM, body, Some(signature)), configure(db, Some(reconciler()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":true}"#);
}

#[actix_web::test]
async fn late_success_for_an_expired_hold_is_a_conflict() {
    let mut db = MockStorefrontDb::new();
    db.expect_commit_paid()
        .times(1)
        .returning(|order_id, _| {
            Err(LedgerError::Conflict { order_id: order_id.clone(), status: ReservationStatus::Expired })
        });
    db.expect_update_order_status().never();
    let body = "order_num=o-1&payment_status=success";
    let signature = sign(FORM, body, Canonicalization::ALL[0]);
    let (status, body) = send_request(webhook(FORM, body, Some(signature)), configure(db, Some(reconciler()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("already expired"), "{body}");
}

#[actix_web::test]
async fn success_without_a_reservation_is_not_found() {
    let mut db = MockStorefrontDb::new();
    db.expect_commit_paid().times(1).returning(|order_id, _| Err(LedgerError::ReservationNotFound(order_id.clone())));
    let body = "order_num=ghost&payment_status=success";
    let signature = sign(FORM, body, Canonicalization::ALL[0]);
    let (status, _) = send_request(webhook(FORM, body, Some(signature)), configure(db, Some(reconciler()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn webhook_without_an_order_reference() {
    let body = "payment_status=success";
    let signature = sign(FORM, body, Canonicalization::ALL[0]);
    let req = webhook(FORM, body, Some(signature));
    let (status, _) = send_request(req, configure(MockStorefrontDb::new(), Some(reconciler()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
