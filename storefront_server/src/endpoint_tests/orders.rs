use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::{json, Value};
use storefront_engine::{
    db_types::{Order, OrderStatus, Price, ReservationStatus},
    events::EventProducers,
    order_objects::PlacedOrder,
    traits::{HoldPlaced, LedgerError, PaymentLinkError, ReleaseOutcome},
    FulfilmentApi,
};

use super::{
    helpers::{hold, inventory_item, order, send_request, timestamp},
    mocks::{MockLinkProvider, MockStorefrontDb},
};
use crate::routes::{OrderByIdRoute, PlaceOrderRoute};

fn configure(db: MockStorefrontDb, links: MockLinkProvider) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = FulfilmentApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api)).app_data(web::Data::new(links)).service(
            web::scope("/api")
                .service(PlaceOrderRoute::<MockStorefrontDb, MockLinkProvider>::new())
                .service(OrderByIdRoute::<MockStorefrontDb>::new()),
        );
    }
}

fn order_body(items: Value) -> Value {
    json!({
        "initData": "query_id=1",
        "telegram_id": 42,
        "customer": {"name": "Ann", "email": "ann@example.com", "phone": "+100"},
        "delivery": {"method": "cdek", "pickup_point": "Main St 1"},
        "comment": "Ring twice",
        "items": items,
    })
}

fn catalogue(db: &mut MockStorefrontDb) {
    db.expect_fetch_item().returning(|sku| match sku.as_str() {
        "A" => Ok(Some(inventory_item("A", 10, 0, 250))),
        "B" => Ok(Some(inventory_item("B", 10, 0, 100))),
        _ => Ok(None),
    });
}

fn accept_holds(db: &mut MockStorefrontDb) {
    db.expect_create_hold().times(1).returning(|req| {
        let hold = hold(req.order_id.as_str(), ReservationStatus::Active, &req.items);
        Ok(HoldPlaced { hold, expired: vec![] })
    });
}

#[actix_web::test]
async fn place_order() {
    let mut db = MockStorefrontDb::new();
    accept_holds(&mut db);
    catalogue(&mut db);
    db.expect_insert_order().times(1).returning(|o| {
        assert_eq!(o.amount, Price::from(600));
        assert_eq!(o.payload["customer"]["name"], "Ann");
        assert_eq!(o.payload["initData"], "query_id=1");
        Ok(Order {
            id: 1,
            order_id: o.order_id,
            status: OrderStatus::created(),
            amount: o.amount,
            payload_json: o.payload.to_string(),
            payment_url: o.payment_url,
            created_at: timestamp(),
            updated_at: timestamp(),
        })
    });
    let mut links = MockLinkProvider::new();
    links.expect_create_link().times(1).returning(|req| {
        assert_eq!(req.products.len(), 2);
        assert_eq!(req.amount, Price::from(600));
        Ok(format!("https://pay.example/{}", req.order_id))
    });
    let body = order_body(json!([{"sku": "A", "qty": 2}, {"sku": "B", "qty": 1}]));
    let req = TestRequest::post().uri("/api/orders").set_json(body);
    let (status, body) = send_request(req, configure(db, links)).await;
    assert_eq!(status, StatusCode::OK);
    let placed = serde_json::from_str::<PlacedOrder>(&body).unwrap();
    assert_eq!(placed.amount, Price::from(600));
    assert_eq!(placed.payment_url, format!("https://pay.example/{}", placed.order_id));
}

#[actix_web::test]
async fn invalid_orders_are_rejected_before_touching_stock() {
    for items in [json!([]), json!([{"sku": "A", "qty": 0}]), json!([{"sku": "A", "qty": 51}])] {
        let req = TestRequest::post().uri("/api/orders").set_json(order_body(items));
        let (status, body) = send_request(req, configure(MockStorefrontDb::new(), MockLinkProvider::new())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[actix_web::test]
async fn malformed_order_body() {
    let req = TestRequest::post()
        .uri("/api/orders")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"{"customer": "#);
    let (status, _) = send_request(req, configure(MockStorefrontDb::new(), MockLinkProvider::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn not_enough_stock() {
    let mut db = MockStorefrontDb::new();
    db.expect_create_hold()
        .times(1)
        .returning(|_| Err(LedgerError::OutOfStock { sku: "A".into(), available: 1, requested: 2 }));
    let req = TestRequest::post().uri("/api/orders").set_json(order_body(json!([{"sku": "A", "qty": 2}])));
    let (status, body) = send_request(req, configure(db, MockLinkProvider::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Not enough stock for A"), "{body}");
}

#[actix_web::test]
async fn failed_payment_link_releases_the_hold() {
    let mut db = MockStorefrontDb::new();
    accept_holds(&mut db);
    catalogue(&mut db);
    db.expect_release().times(1).returning(|order_id, status| {
        assert_eq!(status, ReservationStatus::Released("released".into()));
        Ok(ReleaseOutcome::Released(hold(order_id.as_str(), status, &[])))
    });
    db.expect_insert_order().never();
    let mut links = MockLinkProvider::new();
    links.expect_create_link().times(1).returning(|_| Err(PaymentLinkError("provider unavailable".into())));
    let req = TestRequest::post().uri("/api/orders").set_json(order_body(json!([{"sku": "A", "qty": 1}])));
    let (status, body) = send_request(req, configure(db, links)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("provider unavailable"), "{body}");
}

#[actix_web::test]
async fn fetch_order_by_id() {
    let mut db = MockStorefrontDb::new();
    db.expect_fetch_order().returning(|id| match id.as_str() {
        "o-1" => Ok(Some(order("o-1", OrderStatus::paid(), 600))),
        _ => Ok(None),
    });
    let req = TestRequest::get().uri("/api/orders/o-1");
    let (status, body) = send_request(req, configure(db, MockLinkProvider::new())).await;
    assert_eq!(status, StatusCode::OK);
    let value = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(value["order_id"], "o-1");
    assert_eq!(value["status"], "paid");
    assert_eq!(value["amount"], 600);
    assert_eq!(value["payment_url"], "https://pay.example/o-1");
    assert_eq!(value["created_at"], "2024-06-01T12:00:00Z");
    assert!(value.get("payload_json").is_none());
}

#[actix_web::test]
async fn unknown_order() {
    let mut db = MockStorefrontDb::new();
    db.expect_fetch_order().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/api/orders/nope");
    let (status, _) = send_request(req, configure(db, MockLinkProvider::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
