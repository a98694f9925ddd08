use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use storefront_common::Secret;
use storefront_engine::db_types::{
    Hold,
    HoldItem,
    InventoryItem,
    Order,
    OrderId,
    OrderStatus,
    Price,
    Reservation,
    ReservationItem,
    ReservationStatus,
};

use crate::config::AdminConfig;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "correct horse";

/// Sends a single request to an app built by `configure` and returns the status and body. Errors raised by middleware
/// are rendered the same way the server would render them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let _ = env_logger::try_init();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn admin_config() -> AdminConfig {
    AdminConfig { user: ADMIN_USER.into(), pass: Secret::new(ADMIN_PASS.into()) }
}

pub fn basic_auth(user: &str, pass: &str) -> (&'static str, String) {
    ("Authorization", format!("Basic {}", base64::encode(format!("{user}:{pass}"))))
}

pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn inventory_item(sku: &str, stock: i64, reserved: i64, price: i64) -> InventoryItem {
    InventoryItem { sku: sku.into(), name: format!("Item {sku}"), stock, reserved, unit_price: Price::from(price) }
}

pub fn hold(order_id: &str, status: ReservationStatus, items: &[HoldItem]) -> Hold {
    let reservation = Reservation {
        id: 1,
        order_id: order_id.into(),
        status,
        expires_at: timestamp() + chrono::Duration::minutes(30),
        created_at: timestamp(),
    };
    let items = items
        .iter()
        .enumerate()
        .map(|(i, item)| ReservationItem {
            id: i as i64 + 1,
            order_id: order_id.into(),
            sku: item.sku.clone(),
            qty: item.qty,
        })
        .collect();
    Hold { reservation, items }
}

pub fn order(order_id: &str, status: OrderStatus, amount: i64) -> Order {
    Order {
        id: 1,
        order_id: OrderId::from(order_id),
        status,
        amount: Price::from(amount),
        payload_json: "{}".into(),
        payment_url: Some(format!("https://pay.example/{order_id}")),
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}
