use std::{fmt::Debug, sync::Arc};

use log::*;
use serde::Serialize;
use serde_json::Value;

use crate::{
    db_types::{Hold, HoldItem, NewOrder, Order, OrderId, OrderStatus, Price, ReservationStatus, RELEASED_REASON},
    events::{EventProducers, HoldReleasedEvent, OrderPaidEvent},
    helpers::{Clock, ExpiryPolicy, SystemClock},
    sfe_api::{
        errors::FulfilmentError,
        order_objects::{OrderRequest, PlacedOrder, PricedLine},
        payment_objects::{NotificationOutcome, PaymentNotification},
    },
    traits::{
        CommitResult,
        HoldRequest,
        InventoryManagement,
        LedgerError,
        OrderManagement,
        PaymentLinkProvider,
        PaymentLinkRequest,
        ReleaseOutcome,
        ReservationLedger,
    },
};

/// `FulfilmentApi` coordinates the life of an order: it places the hold when a purchase request arrives, and commits
/// or releases it when the payment provider reports the outcome.
///
/// ```text
/// (none) -> active            purchase request, capacity check passes
/// active -> paid              verified webhook, payment_status == success
/// active -> released|expired  verified webhook with any other status, or the hold timed out
/// paid -> paid                late success webhook, no-op
/// released|expired -> error   late success webhook, conflict
/// ```
///
/// Events are published only after the ledger transaction that caused them has been committed, and nothing an event
/// handler does can affect the outcome of the call that published it.
pub struct FulfilmentApi<B> {
    db: B,
    producers: EventProducers,
    policy: ExpiryPolicy,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for FulfilmentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfilmentApi ({:?})", self.policy)
    }
}

impl<B> FulfilmentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, policy: ExpiryPolicy::default(), clock: Arc::new(SystemClock) }
    }

    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn expiry_policy(&self) -> &ExpiryPolicy {
        &self.policy
    }
}

impl<B> FulfilmentApi<B>
where B: InventoryManagement + ReservationLedger + OrderManagement
{
    /// Places a hold on stock for the given order. Stale holds are reclaimed first.
    pub async fn place_hold(&self, order_id: OrderId, items: Vec<HoldItem>) -> Result<Hold, FulfilmentError> {
        if order_id.is_empty() {
            return Err(FulfilmentError::Validation("The order id cannot be empty".into()));
        }
        let now = self.clock.now();
        let request = HoldRequest::new(order_id, items, now, self.policy.expires_at(now));
        let placed = self.db.create_hold(request).await?;
        self.notify_released(placed.expired).await;
        info!("📦️ Hold placed for order {}", placed.hold.reservation.order_id);
        Ok(placed.hold)
    }

    /// Handles a purchase request from start to finish:
    /// 1. validates the request,
    /// 2. places the hold under a fresh order id,
    /// 3. prices the order from the catalogue,
    /// 4. asks the payment provider for a payment page (outside of any transaction),
    /// 5. stores the order.
    ///
    /// If anything fails after the hold was placed, the hold is released straight away rather than left to expire.
    pub async fn place_order<P>(&self, request: OrderRequest, links: &P) -> Result<PlacedOrder, FulfilmentError>
    where P: PaymentLinkProvider {
        request.validate().map_err(FulfilmentError::Validation)?;
        let order_id = OrderId::random();
        let hold = self.place_hold(order_id.clone(), request.hold_items()).await?;
        match self.finish_order(&order_id, &request, links).await {
            Ok(placed) => {
                info!("🧾️ Order {order_id} created for {}", placed.amount);
                Ok(placed)
            },
            Err(e) => {
                warn!("🧾️ Could not complete order {order_id}. Releasing its hold. {e}");
                self.abandon_hold(&hold.reservation.order_id).await;
                Err(e)
            },
        }
    }

    async fn finish_order<P>(
        &self,
        order_id: &OrderId,
        request: &OrderRequest,
        links: &P,
    ) -> Result<PlacedOrder, FulfilmentError>
    where
        P: PaymentLinkProvider,
    {
        let products = self.price_lines(request).await?;
        let amount = products.iter().map(PricedLine::total).sum::<Price>();
        let link_request = PaymentLinkRequest {
            order_id: order_id.clone(),
            customer: request.customer.clone(),
            customer_extra: request.customer_extra(),
            products,
            amount,
        };
        let payment_url = links.create_link(&link_request).await?;
        debug!("🔗️ Payment link for order {order_id}: {payment_url}");
        let payload = payload_snapshot(request)?;
        let order = NewOrder::new(order_id.clone(), amount, payload).with_payment_url(payment_url.clone());
        self.db.insert_order(order).await?;
        Ok(PlacedOrder { order_id: order_id.clone(), payment_url, amount })
    }

    async fn price_lines(&self, request: &OrderRequest) -> Result<Vec<PricedLine>, FulfilmentError> {
        let mut lines = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let item =
                self.db.fetch_item(&line.sku).await?.ok_or_else(|| FulfilmentError::UnknownSku(line.sku.clone()))?;
            lines.push(PricedLine { sku: item.sku, name: item.name, unit_price: item.unit_price, qty: line.qty });
        }
        Ok(lines)
    }

    async fn abandon_hold(&self, order_id: &OrderId) {
        match self.release(order_id, RELEASED_REASON).await {
            Ok(_) => debug!("📦️ Hold for abandoned order {order_id} released"),
            Err(e) => error!("📦️ Could not release the hold for abandoned order {order_id}. It will expire. {e}"),
        }
    }

    /// Acts on a verified payment notification.
    ///
    /// A success commits the hold and marks the order paid. Anything else releases the hold, using the reported
    /// status as the release reason, and records that status on the order. If the hold was no longer active (e.g. it
    /// was already paid), the order record is left untouched.
    pub async fn handle_payment_notification(
        &self,
        notification: PaymentNotification,
    ) -> Result<NotificationOutcome, FulfilmentError> {
        let PaymentNotification { order_id, payment_status } = notification;
        info!("🧾️ Payment notification for order {order_id}: '{payment_status}'");
        if payment_status == crate::sfe_api::payment_objects::PAYMENT_SUCCESS {
            let result = self.commit_paid(&order_id).await?;
            return Ok(NotificationOutcome::Paid(result.outcome));
        }
        let outcome = self.release(&order_id, &payment_status).await?;
        if let ReleaseOutcome::NotActive(status) = &outcome {
            if *status == ReservationStatus::Paid {
                warn!("🧾️ Order {order_id} is already paid. Ignoring the late '{payment_status}' notification");
            } else {
                debug!("🧾️ Hold for order {order_id} is already {status}. Order status left as is");
            }
            return Ok(NotificationOutcome::Released(outcome));
        }
        match self.db.update_order_status(&order_id, OrderStatus::from_provider(&payment_status)).await {
            Ok(order) => debug!("🧾️ Order {order_id} is now {}", order.status),
            Err(LedgerError::OrderNotFound(_)) => warn!("🧾️ Payment failure reported for unknown order {order_id}"),
            Err(e) => return Err(e.into()),
        }
        Ok(NotificationOutcome::Released(outcome))
    }

    /// Commits the hold for a paid order and marks the order as paid.
    ///
    /// This is idempotent. A repeated call reports [`crate::traits::CommitOutcome::AlreadyPaid`] and changes no stock,
    /// but still makes sure the order record says `paid`. The [`OrderPaidEvent`] is published only for the call that
    /// actually deducted the stock.
    pub async fn commit_paid(&self, order_id: &OrderId) -> Result<CommitResult, FulfilmentError> {
        let result = self.db.commit_paid(order_id, self.clock.now()).await.map_err(|e| {
            if let LedgerError::Conflict { status, .. } = &e {
                error!("🧾️ Payment arrived for order {order_id}, but its hold is already {status}. Needs attention.");
            }
            FulfilmentError::from(e)
        })?;
        self.notify_released(result.expired.clone()).await;
        let order = match self.db.update_order_status(order_id, OrderStatus::paid()).await {
            Ok(order) => Some(order),
            Err(LedgerError::OrderNotFound(_)) => {
                warn!("🧾️ Hold for order {order_id} was paid, but there is no matching order record");
                None
            },
            Err(e) => return Err(e.into()),
        };
        if result.is_fresh_commit() {
            info!("🧾️ Order {order_id} is paid");
            if let Some(order) = order {
                self.producers.publish_order_paid(OrderPaidEvent::new(order, result.hold.clone())).await;
            }
        } else {
            info!("🧾️ Order {order_id} was already paid. Ignoring the repeat notification");
        }
        Ok(result)
    }

    /// Releases an active hold with the given reason. Anything other than an active hold is left alone.
    pub async fn release(&self, order_id: &OrderId, reason: &str) -> Result<ReleaseOutcome, FulfilmentError> {
        let outcome = self.db.release(order_id, ReservationStatus::released(reason)).await?;
        if let ReleaseOutcome::Released(hold) = &outcome {
            info!("📦️ Hold for order {order_id} released ({})", hold.reservation.status);
            self.notify_released(vec![hold.clone()]).await;
        }
        Ok(outcome)
    }

    /// Sweeps every stale hold and returns the ones that were expired.
    pub async fn expire_holds(&self) -> Result<Vec<Hold>, FulfilmentError> {
        let expired = self.db.expire_holds(self.clock.now()).await?;
        self.notify_released(expired.clone()).await;
        Ok(expired)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, FulfilmentError> {
        Ok(self.db.fetch_order(order_id).await?)
    }

    async fn notify_released(&self, holds: Vec<Hold>) {
        for hold in holds {
            self.producers.publish_hold_released(HoldReleasedEvent::new(hold)).await;
        }
    }
}

fn payload_snapshot<T: Serialize>(request: &T) -> Result<Value, FulfilmentError> {
    serde_json::to_value(request).map_err(|e| FulfilmentError::Backend(format!("Could not snapshot the order. {e}")))
}
