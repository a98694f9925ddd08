use log::*;
use storefront_engine::{
    db_types::{HoldItem, OrderId},
    events::EventProducers,
    helpers::ManualClock,
    FulfilmentApi,
    FulfilmentError,
};
use tokio::{runtime::Runtime, task::JoinSet};

use crate::support::{held_units, item, setup, start_time, tear_down};

mod support;

const CAPACITY: i64 = 25;
const NUM_ORDERS: u64 = 40;

#[test]
fn burst_holds() {
    info!("🚀️ Starting concurrent hold test");
    let sys = Runtime::new().unwrap();

    sys.block_on(async move {
        let db = setup(&[("CAKE", CAPACITY)]).await;
        let clock = ManualClock::new(start_time());
        let mut tasks = JoinSet::new();
        for i in 0..NUM_ORDERS {
            let api = FulfilmentApi::new(db.clone(), EventProducers::default()).with_clock(clock.clone());
            #[allow(clippy::cast_possible_wrap)]
            let qty = (i % 3 + 1) as i64;
            tasks.spawn(async move {
                let order_id = OrderId::from(format!("burst-{i}"));
                let result = api.place_hold(order_id, vec![HoldItem::new("CAKE", qty)]).await;
                (qty, result)
            });
        }
        let mut accepted = 0;
        let mut rejected = 0;
        while let Some(done) = tasks.join_next().await {
            let (qty, result) = done.expect("hold task panicked");
            match result {
                Ok(_) => accepted += qty,
                Err(FulfilmentError::Capacity { .. }) => rejected += 1,
                Err(e) => panic!("Unexpected error placing a hold: {e}"),
            }
        }
        info!("🚀️ {accepted} units held, {rejected} holds rejected");
        assert!(accepted <= CAPACITY);
        assert!(rejected > 0);
        let cake = item(&db, "CAKE").await;
        assert_eq!(cake.stock, CAPACITY);
        assert_eq!(cake.reserved, accepted);
        assert_eq!(held_units(&db, "CAKE").await, accepted);
        tear_down(db).await;
    });
    info!("🚀️ test complete");
}
