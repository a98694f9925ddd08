//! Sends paid orders to the CRM.
//!
//! When an order is paid, the customer is created (or updated) as a CRM contact, keyed by their Telegram id, and the
//! order details are attached to the contact as variables. Orders placed without a Telegram id are skipped.
//!
//! The notifier runs from the `OrderPaidEvent` hook, well after the webhook has been answered, so failures here never
//! affect the order itself. They are retried and then logged.
use std::{future::Future, pin::Pin, time::Duration};

use log::*;
use serde_json::Value;
use storefront_engine::{
    db_types::Order,
    events::{EventHandlers, EventHooks, OrderPaidEvent, RetryPolicy},
};
use thiserror::Error;

use crate::config::CrmConfig;

const CRM_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// The CRM rate-limits variable writes.
const VARIABLE_WRITE_PACING: Duration = Duration::from_millis(600);
const PAID_TAG: &str = "Payment received";
pub const CRM_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("The CRM request failed. {0}")]
    Request(#[from] reqwest::Error),
    #[error("The CRM did not return a contact id")]
    MissingContactId,
    #[error("The order payload could not be read. {0}")]
    InvalidPayload(String),
}

/// The order details the CRM cares about, taken from the stored purchase request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrmOrderDetails {
    pub telegram_id: Option<String>,
    pub telegram_username: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub delivery_method: String,
    pub pickup_point: String,
    pub comment: String,
    pub items: String,
}

impl CrmOrderDetails {
    pub fn from_payload(payload: &Value) -> Self {
        let text = |v: &Value| match v {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let telegram_id = match &payload["telegram_id"] {
            Value::Null => None,
            v => Some(text(v)).filter(|s| !s.is_empty() && s != "0"),
        };
        let items = payload["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|it| it["sku"].as_str().is_some_and(|s| !s.is_empty()))
                    .map(|it| format!("{} × {}", text(&it["sku"]), it["qty"].as_i64().unwrap_or(1)))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        let name = text(&payload["customer"]["name"]);
        Self {
            telegram_id,
            telegram_username: text(&payload["telegram_username"]),
            name: if name.is_empty() { "Customer".into() } else { name },
            phone: text(&payload["customer"]["phone"]),
            email: text(&payload["customer"]["email"]),
            delivery_method: text(&payload["delivery"]["method"]),
            pickup_point: text(&payload["delivery"]["pickup_point"]),
            comment: text(&payload["comment"]),
            items,
        }
    }

    pub fn variables(&self, order: &Order) -> Vec<(&'static str, String)> {
        vec![
            ("order_id", order.order_id.to_string()),
            ("amount", order.amount.to_string()),
            ("items", self.items.clone()),
            ("delivery_method", self.delivery_method.clone()),
            ("pickup_point", self.pickup_point.clone()),
            ("comment", self.comment.clone()),
            ("payment_status", "success".to_string()),
            ("order_created_at", order.created_at.to_rfc3339()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct CrmNotifier {
    client: reqwest::Client,
    base_url: String,
    config: CrmConfig,
}

impl CrmNotifier {
    /// Returns `None` if the CRM is not configured.
    pub fn from_config(config: &CrmConfig) -> Option<Self> {
        config.is_configured().then(|| Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    pub async fn notify_order_paid(&self, event: &OrderPaidEvent) -> Result<(), CrmError> {
        let order = &event.order;
        let payload = order.payload().map_err(|e| CrmError::InvalidPayload(e.to_string()))?;
        let details = CrmOrderDetails::from_payload(&payload);
        let Some(telegram_id) = details.telegram_id.clone() else {
            debug!("📇️ Order {} has no Telegram id. Not sending it to the CRM.", order.order_id);
            return Ok(());
        };
        let contact_id = self.upsert_contact(&telegram_id, &details).await?;
        debug!("📇️ CRM contact {contact_id} updated for order {}", order.order_id);
        for (name, value) in details.variables(order) {
            self.set_variable(&contact_id, name, &value).await?;
            tokio::time::sleep(VARIABLE_WRITE_PACING).await;
        }
        info!("📇️ Order {} sent to the CRM", order.order_id);
        Ok(())
    }

    async fn upsert_contact(&self, telegram_id: &str, details: &CrmOrderDetails) -> Result<String, CrmError> {
        let form = [
            ("bot_id", self.config.bot_id.as_str()),
            ("messenger", "telegram"),
            ("name", details.name.as_str()),
            ("phone", details.phone.as_str()),
            ("email", details.email.as_str()),
            ("telegram_id", telegram_id),
            ("telegram_username", details.telegram_username.as_str()),
            ("address", details.pickup_point.as_str()),
            ("tags", PAID_TAG),
        ];
        let response = self
            .client
            .post(format!("{}/createOrUpdateContact", self.base_url))
            .query(&[("api_token", self.config.api_token.reveal().as_str())])
            .form(&form)
            .header("X-Requested-With", "XMLHttpRequest")
            .timeout(CRM_REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let body = response.json::<Value>().await?;
        contact_id(&body).ok_or(CrmError::MissingContactId)
    }

    async fn set_variable(&self, contact_id: &str, name: &str, value: &str) -> Result<(), CrmError> {
        let params = [("contact_id", contact_id), ("name", name), ("value", value)];
        self.client
            .post(format!("{}/setContactVariable", self.base_url))
            .query(&[("api_token", self.config.api_token.reveal().as_str())])
            .query(&params)
            .form(&params)
            .header("X-Requested-With", "XMLHttpRequest")
            .timeout(CRM_REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        trace!("📇️ CRM variable {name} set for contact {contact_id}");
        Ok(())
    }
}

/// Builds the event handlers for the server.
///
/// 1. OrderPaidEvent - If the CRM is configured, the paid order is sent to the CRM. Failed attempts are retried with
///    backoff, and given up on with an error in the log.
/// 2. HoldReleasedEvent - Logged, so that released and expired holds can be traced.
pub fn create_event_handlers(config: &CrmConfig) -> EventHandlers {
    let mut hooks = EventHooks::default();
    match CrmNotifier::from_config(config) {
        Some(notifier) => {
            hooks.on_order_paid(move |ev| {
                let notifier = notifier.clone();
                Box::pin(async move {
                    let order_id = ev.order.order_id.clone();
                    let label = format!("CRM notification for order {order_id}");
                    let result = RetryPolicy::default().run(&label, || notifier.notify_order_paid(&ev)).await;
                    if let Err(e) = result {
                        error!("📇️ Order {order_id} was paid, but could not be sent to the CRM. {e}");
                    }
                })
            });
        },
        None => {
            hooks.on_order_paid(|ev| {
                debug!("📇️ Order {} paid. No CRM is configured.", ev.order.order_id);
                no_op()
            });
        },
    }
    hooks.on_hold_released(|ev| {
        let (order_id, status, units) = (ev.order_id(), ev.status(), ev.units());
        info!("📬️ Hold for order {order_id} is now {status}. {units} units returned to stock.");
        no_op()
    });
    EventHandlers::new(CRM_EVENT_BUFFER_SIZE, hooks)
}

fn no_op() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async {})
}

fn contact_id(body: &Value) -> Option<String> {
    match &body["data"]["id"] {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
