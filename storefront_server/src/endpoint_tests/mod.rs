mod helpers;
mod inventory;
mod mocks;
mod orders;
mod webhook;

use actix_web::{http::StatusCode, test::TestRequest};

use crate::{endpoint_tests::helpers::send_request, routes::health};

#[actix_web::test]
async fn health_check() {
    let (status, body) = send_request(TestRequest::get().uri("/health"), |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);
}
