use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::{json, Value};
use storefront_engine::{db_types::InventoryItem, events::EventProducers, traits::LedgerError, InventoryApi};

use super::{
    helpers::{admin_config, basic_auth, inventory_item, send_request, ADMIN_PASS, ADMIN_USER},
    mocks::MockStorefrontDb,
};
use crate::{
    config::AdminConfig,
    routes::{InventoryRoute, UpdateStockRoute, UpsertItemRoute},
};

fn configure(db: MockStorefrontDb, admin: AdminConfig) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = InventoryApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api)).app_data(web::Data::new(admin)).service(
            web::scope("/api")
                .service(InventoryRoute::<MockStorefrontDb>::new())
                .service(UpdateStockRoute::<MockStorefrontDb>::new())
                .service(UpsertItemRoute::<MockStorefrontDb>::new()),
        );
    }
}

fn stock_patch(items: Value) -> TestRequest {
    TestRequest::patch().uri("/api/inventory").set_json(json!({ "items": items }))
}

#[actix_web::test]
async fn list_inventory() {
    let mut db = MockStorefrontDb::new();
    db.expect_expire_holds().times(1).returning(|_| Ok(vec![]));
    db.expect_list_inventory().times(1).returning(|| Ok(vec![inventory_item("A", 5, 2, 250)]));
    let (status, body) = send_request(TestRequest::get().uri("/api/inventory"), configure(db, admin_config())).await;
    assert_eq!(status, StatusCode::OK);
    let value = serde_json::from_str::<Value>(&body).unwrap();
    let expected = json!([
        {"sku": "A", "name": "Item A", "stock": 5, "reserved": 2, "available": 3, "unit_price": 250}
    ]);
    assert_eq!(value, expected);
}

#[actix_web::test]
async fn stock_updates_need_credentials() {
    let req = stock_patch(json!([{"sku": "A", "stock": 9}]));
    let (status, _) = send_request(req, configure(MockStorefrontDb::new(), admin_config())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let req = stock_patch(json!([{"sku": "A", "stock": 9}])).insert_header(basic_auth(ADMIN_USER, "guess"));
    let (status, _) = send_request(req, configure(MockStorefrontDb::new(), admin_config())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_routes_fail_closed_without_configuration() {
    let req = stock_patch(json!([{"sku": "A", "stock": 9}])).insert_header(basic_auth("", ""));
    let (status, _) = send_request(req, configure(MockStorefrontDb::new(), AdminConfig::default())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn update_stock() {
    let mut db = MockStorefrontDb::new();
    db.expect_set_stock()
        .withf(|updates| updates.len() == 1 && updates[0].sku.as_str() == "A" && updates[0].stock == 9)
        .times(1)
        .returning(|updates| Ok(updates.iter().map(|u| inventory_item(u.sku.as_str(), u.stock, 1, 250)).collect()));
    let req = stock_patch(json!([{"sku": "A", "stock": 9}])).insert_header(basic_auth(ADMIN_USER, ADMIN_PASS));
    let (status, body) = send_request(req, configure(db, admin_config())).await;
    assert_eq!(status, StatusCode::OK);
    let value = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(value[0]["available"], 8);
}

#[actix_web::test]
async fn stock_below_reserved_is_rejected() {
    let mut db = MockStorefrontDb::new();
    db.expect_set_stock().times(1).returning(|_| {
        Err(LedgerError::InvalidRequest("Stock for A cannot be set below the 3 units currently reserved".into()))
    });
    let req = stock_patch(json!([{"sku": "A", "stock": 1}])).insert_header(basic_auth(ADMIN_USER, ADMIN_PASS));
    let (status, _) = send_request(req, configure(db, admin_config())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn empty_stock_update() {
    let req = stock_patch(json!([])).insert_header(basic_auth(ADMIN_USER, ADMIN_PASS));
    let (status, _) = send_request(req, configure(MockStorefrontDb::new(), admin_config())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn upsert_catalogue_item() {
    let mut db = MockStorefrontDb::new();
    db.expect_upsert_item().times(1).returning(|item| {
        let (sku, name, stock, unit_price) = (item.sku, item.name, item.stock, item.unit_price);
        Ok(InventoryItem { sku, name, stock, reserved: 0, unit_price })
    });
    let req = TestRequest::post()
        .uri("/api/inventory")
        .insert_header(basic_auth(ADMIN_USER, ADMIN_PASS))
        .set_json(json!({"sku": "C", "name": "Cake", "stock": 4, "unit_price": 990}));
    let (status, body) = send_request(req, configure(db, admin_config())).await;
    assert_eq!(status, StatusCode::OK);
    let value = serde_json::from_str::<Value>(&body).unwrap();
    assert_eq!(value["name"], "Cake");
    assert_eq!(value["unit_price"], 990);
}
