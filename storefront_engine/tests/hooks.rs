use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::Duration;
use futures_util::FutureExt;
use log::*;
use storefront_engine::{
    db_types::{HoldItem, OrderId},
    events::{EventHandler, EventProducers, HoldReleasedEvent, OrderPaidEvent},
    helpers::ManualClock,
    payment_objects::PaymentNotification,
};

use crate::support::{fulfilment_api, setup, start_time, tear_down};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI64>,
    units: Arc<AtomicI64>,
}

impl HookCalled {
    pub fn called(&self, units: i64) {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
        let _ = self.units.fetch_add(units, Ordering::SeqCst);
    }

    pub fn count(&self) -> i64 {
        self.called.load(Ordering::SeqCst)
    }

    pub fn units(&self) -> i64 {
        self.units.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn order_paid_fires_once() {
    let db = setup(&[("CAKE", 5)]).await;
    let event = HookCalled::default();
    let event_copy = event.clone();
    let handler = EventHandler::<OrderPaidEvent>::new(
        10,
        Arc::new(move |ev: OrderPaidEvent| {
            info!("🪝️ {:?}", ev.order.order_id);
            let units = ev.hold.items.iter().map(|i| i.qty).sum();
            event_copy.called(units);
            async {}.boxed()
        }),
    );
    let producers = EventProducers { order_paid_producer: vec![handler.subscribe()], ..Default::default() };
    let listener = tokio::spawn(handler.start_handler());

    let clock = ManualClock::new(start_time());
    let api = fulfilment_api(db.clone(), producers, &clock);
    let order_id = OrderId::from("o1");
    api.place_hold(order_id.clone(), vec![HoldItem::new("CAKE", 2)]).await.unwrap();
    // No order record was stored for this hold, so there is nothing to announce
    api.commit_paid(&order_id).await.unwrap();

    let request = support::order_request(&[("CAKE", 3)]);
    let placed = api.place_order(request, &support::FixedLink).await.unwrap();
    let paid = PaymentNotification::new(placed.order_id.clone(), "success");
    api.handle_payment_notification(paid.clone()).await.unwrap();
    api.handle_payment_notification(paid).await.unwrap();

    drop(api);
    listener.await.unwrap();
    assert_eq!(event.count(), 1);
    assert_eq!(event.units(), 3);
    tear_down(db).await;
}

#[tokio::test]
async fn releases_and_expiries_are_announced() {
    let db = setup(&[("CAKE", 5)]).await;
    let event = HookCalled::default();
    let event_copy = event.clone();
    let handler = EventHandler::<HoldReleasedEvent>::new(
        10,
        Arc::new(move |ev: HoldReleasedEvent| {
            info!("🪝️ {} is {}", ev.order_id(), ev.status());
            event_copy.called(ev.units());
            async {}.boxed()
        }),
    );
    let producers = EventProducers { hold_released_producer: vec![handler.subscribe()], ..Default::default() };
    let listener = tokio::spawn(handler.start_handler());

    let clock = ManualClock::new(start_time());
    let api = fulfilment_api(db.clone(), producers, &clock);
    api.place_hold("o1".into(), vec![HoldItem::new("CAKE", 1)]).await.unwrap();
    api.place_hold("o2".into(), vec![HoldItem::new("CAKE", 2)]).await.unwrap();
    api.release(&"o1".into(), "fail").await.unwrap();
    // Releasing twice announces nothing new
    api.release(&"o1".into(), "fail").await.unwrap();
    clock.advance(Duration::minutes(31));
    api.expire_holds().await.unwrap();

    drop(api);
    listener.await.unwrap();
    assert_eq!(event.count(), 2);
    assert_eq!(event.units(), 3);
    tear_down(db).await;
}
