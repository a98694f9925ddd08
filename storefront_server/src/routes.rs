//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST delegate to the engine APIs. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the database or the payment provider, so
//! they are all `async`.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use serde_json::json;
use storefront_engine::{
    db_types::{NewInventoryItem, OrderId},
    helpers::WebhookPayload,
    order_objects::OrderRequest,
    payment_objects::PaymentNotification,
    traits::PaymentLinkProvider,
    FulfilmentApi,
    InventoryApi,
    StorefrontDatabase,
};

use crate::{
    config::ServerOptions,
    data_objects::{OrderResponse, StockUpdateRequest, WebhookAck},
    errors::ServerError,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires admin)  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AdminMiddlewareFactory::new());
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl StorefrontDatabase, PaymentLinkProvider);
/// Route handler for new purchase requests.
///
/// Places a hold on the requested stock, prices the order from the catalogue and asks the payment provider for a
/// payment page. The response carries the new order id, the payment URL and the amount due.
///
/// Errors:
/// * 400 if the request is invalid, names an unknown SKU, or there is not enough stock.
/// * 502 if the payment provider could not create a payment link. The hold is released in this case.
pub async fn place_order<B, P>(
    body: web::Json<OrderRequest>,
    api: web::Data<FulfilmentApi<B>>,
    links: web::Data<P>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    P: PaymentLinkProvider,
{
    let request = body.into_inner();
    debug!("💻️ POST order with {} lines", request.items.len());
    let placed = api.place_order(request, links.get_ref()).await.map_err(|e| {
        info!("💻️ Order was not placed. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(placed))
}

route!(order_by_id => Get "/orders/{order_id}" impl StorefrontDatabase);
pub async fn order_by_id<B: StorefrontDatabase>(
    path: web::Path<String>,
    api: web::Data<FulfilmentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order {order_id}");
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(payment_webhook => Post "/webhook" impl StorefrontDatabase);
/// Route handler for payment provider webhooks.
///
/// This route must be wrapped in the signature middleware, which verifies the `Sign` header and hands over the decoded
/// payload. A success commits the order's hold; any other status releases it.
pub async fn payment_webhook<B: StorefrontDatabase>(
    req: HttpRequest,
    payload: web::ReqData<WebhookPayload>,
    api: web::Data<FulfilmentApi<B>>,
    options: Option<web::Data<ServerOptions>>,
) -> Result<HttpResponse, ServerError> {
    let options = options.map(|o| *o.get_ref()).unwrap_or_default();
    let peer = get_remote_ip(&req, options).map(|ip| ip.to_string()).unwrap_or_else(|| "an unknown peer".into());
    let notification = PaymentNotification::from_payload(&payload)?;
    info!("💻️ Verified payment webhook for order {} from {peer}", notification.order_id);
    let outcome = api.handle_payment_notification(notification).await.map_err(|e| {
        warn!("💻️ Could not act on payment webhook. {e}");
        ServerError::from(e)
    })?;
    debug!("💻️ Webhook handled: {outcome:?}");
    Ok(HttpResponse::Ok().json(WebhookAck { ok: true }))
}

//----------------------------------------------   Inventory  ----------------------------------------------------
route!(inventory => Get "/inventory" impl StorefrontDatabase);
pub async fn inventory<B: StorefrontDatabase>(api: web::Data<InventoryApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET inventory");
    let levels = api.list_inventory().await?;
    Ok(HttpResponse::Ok().json(levels))
}

route!(update_stock => Patch "/inventory" impl StorefrontDatabase where requires admin);
/// Sets the physical stock for a batch of SKUs. Either every update is applied or none are.
pub async fn update_stock<B: StorefrontDatabase>(
    body: web::Json<StockUpdateRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let StockUpdateRequest { items } = body.into_inner();
    info!("💻️ PATCH stock for {} items", items.len());
    let levels = api.set_stock(&items).await?;
    Ok(HttpResponse::Ok().json(levels))
}

route!(upsert_item => Post "/inventory" impl StorefrontDatabase where requires admin);
pub async fn upsert_item<B: StorefrontDatabase>(
    body: web::Json<NewInventoryItem>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let item = body.into_inner();
    info!("💻️ POST catalogue entry for {}", item.sku);
    let item = api.upsert_item(item).await?;
    Ok(HttpResponse::Ok().json(item))
}
