use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use storefront_engine::{
    events::EventProducers,
    helpers::{ExpiryPolicy, SignatureReconciler},
    FulfilmentApi,
    InventoryApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::{create_event_handlers, FormPaymentLinkProvider},
    middleware::SignatureMiddlewareFactory,
    routes::{
        health,
        InventoryRoute,
        OrderByIdRoute,
        PaymentWebhookRoute,
        PlaceOrderRoute,
        UpdateStockRoute,
        UpsertItemRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    info!("🗃️ Database ready at {}", config.database_url);
    let handlers = create_event_handlers(&config.crm);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let policy = ExpiryPolicy::new(config.hold_duration);
    let worker_api = FulfilmentApi::new(db.clone(), producers.clone()).with_expiry_policy(policy);
    let _worker = start_expiry_worker(worker_api, config.expiry_sweep_interval);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let reconciler = match SignatureReconciler::new(config.payment.secret_key.clone()) {
        Ok(r) => Some(Arc::new(r)),
        Err(e) => {
            warn!("🔐️ {e}. All payment webhooks will be rejected.");
            None
        },
    };
    let links = FormPaymentLinkProvider::new(&config.payment);
    let policy = ExpiryPolicy::new(config.hold_duration);
    let options = ServerOptions::from_config(&config);
    let admin = config.admin.clone();
    let srv = HttpServer::new(move || {
        let fulfilment_api = FulfilmentApi::new(db.clone(), producers.clone()).with_expiry_policy(policy);
        let inventory_api = InventoryApi::new(db.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("storefront::access_log"))
            .app_data(web::Data::new(fulfilment_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(links.clone()))
            .app_data(web::Data::new(admin.clone()))
            .app_data(web::Data::new(options));
        // Webhooks must be verified before they reach the handler. This scope must be registered before `/api`.
        let payments_scope = web::scope("/api/payments")
            .wrap(SignatureMiddlewareFactory::new(reconciler.clone()))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        let api_scope = web::scope("/api")
            .service(PlaceOrderRoute::<SqliteDatabase, FormPaymentLinkProvider>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(InventoryRoute::<SqliteDatabase>::new())
            .service(UpdateStockRoute::<SqliteDatabase>::new())
            .service(UpsertItemRoute::<SqliteDatabase>::new());
        app.service(health).service(payments_scope).service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
