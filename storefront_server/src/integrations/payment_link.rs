//! Payment links from the hosted payment form.
//!
//! The form builds a checkout page from a signed set of form fields. The fields are signed as nested canonical JSON
//! with literal UTF-8 text, then posted flattened into bracket notation (`products[0][name]=...`). On success the form
//! answers with the bare payment URL as the response body.
use std::time::Duration;

use log::*;
use storefront_engine::{
    helpers::{flatten, JsonEscaping, PayloadMap, PayloadValue, SignatureReconciler},
    traits::{PaymentLinkError, PaymentLinkProvider, PaymentLinkRequest},
};

use crate::config::PaymentConfig;

const LINK_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_ERROR_BODY_LEN: usize = 400;

#[derive(Debug, Clone)]
pub struct FormPaymentLinkProvider {
    client: reqwest::Client,
    form_url: String,
    sys: String,
    signer: Option<SignatureReconciler>,
}

impl FormPaymentLinkProvider {
    /// An unconfigured provider is still constructed, but every link request fails until the configuration is fixed.
    pub fn new(config: &PaymentConfig) -> Self {
        let signer = config.is_configured().then(|| SignatureReconciler::new(config.secret_key.clone()).ok()).flatten();
        Self { client: reqwest::Client::new(), form_url: config.form_url.clone(), sys: config.sys.clone(), signer }
    }

    /// The signed form fields for a link request, in bracket notation.
    pub fn form_fields(&self, request: &PaymentLinkRequest) -> Result<Vec<(String, String)>, PaymentLinkError> {
        let signer = self.signer.as_ref().ok_or_else(|| PaymentLinkError("The payment form is not configured".into()))?;
        let mut map = signing_map(&self.sys, request);
        let signature = signer.sign_map(&map, JsonEscaping::Utf8);
        map.insert("signature".into(), PayloadValue::Text(signature));
        Ok(flatten(&map))
    }
}

/// The fields the payment form signs, in their nested shape.
pub fn signing_map(sys: &str, request: &PaymentLinkRequest) -> PayloadMap {
    let order_id = request.order_id.to_string();
    let products = request
        .products
        .iter()
        .map(|line| {
            let mut product = PayloadMap::new();
            product.insert("sku".into(), line.sku.to_string().into());
            product.insert("name".into(), line.name.clone().into());
            product.insert("price".into(), line.unit_price.value().to_string().into());
            product.insert("quantity".into(), line.qty.to_string().into());
            product.insert("type".into(), "goods".into());
            PayloadValue::Map(product)
        })
        .collect::<Vec<_>>();
    let mut map = PayloadMap::new();
    map.insert("do".into(), "link".into());
    map.insert("sys".into(), sys.into());
    map.insert("order_id".into(), order_id.clone().into());
    map.insert("order_num".into(), order_id.into());
    map.insert("customer_phone".into(), request.customer.phone.clone().into());
    map.insert("customer_email".into(), request.customer.email.clone().into());
    map.insert("customer_extra".into(), request.customer_extra.clone().into());
    map.insert("products".into(), PayloadValue::List(products));
    map
}

impl PaymentLinkProvider for FormPaymentLinkProvider {
    async fn create_link(&self, request: &PaymentLinkRequest) -> Result<String, PaymentLinkError> {
        let fields = self.form_fields(request)?;
        trace!("🔗️ Requesting a payment link for order {}", request.order_id);
        let response = self
            .client
            .post(&self.form_url)
            .timeout(LINK_REQUEST_TIMEOUT)
            .form(&fields)
            .send()
            .await
            .map_err(|e| PaymentLinkError(format!("Could not reach the payment form. {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentLinkError(format!("Could not read the payment form response. {e}")))?;
        let body = body.trim();
        if status.is_client_error() || status.is_server_error() || !body.starts_with("http") {
            let excerpt = body.chars().take(MAX_ERROR_BODY_LEN).collect::<String>();
            warn!("🔗️ The payment form did not return a link for order {}. Status {status}", request.order_id);
            return Err(PaymentLinkError(format!("The response is not a link: status={status}, body={excerpt}")));
        }
        debug!("🔗️ Payment link created for order {}", request.order_id);
        Ok(body.to_string())
    }
}
