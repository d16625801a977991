//! End-to-end matching scenarios against the public engine API.

use exchange::engine::entry::{OrderId, Units};
use exchange::store::{MemoryStore, OrderStore, SqliteStore};
use exchange::{MatchingEngine, NewOrder, OrderSide, OrderStatus};
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

fn memory_engine() -> (Arc<MemoryStore>, Arc<MatchingEngine>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(MatchingEngine::with_interval(
        store.clone(),
        Duration::from_millis(2),
    ));
    (store, engine)
}

async fn status_of(store: &dyn OrderStore, order_id: OrderId) -> (OrderStatus, Units) {
    let order = store
        .list_orders()
        .await
        .unwrap()
        .into_iter()
        .find(|o| o.order_id == order_id)
        .unwrap();
    (order.status, order.units)
}

#[tokio::test]
async fn buy_sweeps_equal_priced_sells_in_arrival_order() {
    let (store, engine) = memory_engine();
    let first = engine.place_order(NewOrder::sell(1, 1, 10, 100)).await.unwrap();
    let second = engine.place_order(NewOrder::sell(1, 2, 10, 100)).await.unwrap();
    let buy = engine.place_order(NewOrder::buy(1, 3, 15, 100)).await.unwrap();

    let outcome = engine.run_cycle().await;
    assert!(outcome.failures.is_empty());
    let fills: Vec<_> = outcome
        .trades
        .iter()
        .map(|t| (t.buy_order_id, t.sell_order_id, t.units))
        .collect();
    assert_eq!(
        fills,
        vec![
            (buy.order_id, first.order_id, 10),
            (buy.order_id, second.order_id, 5),
        ]
    );

    assert_eq!(
        status_of(store.as_ref(), first.order_id).await,
        (OrderStatus::FullyExecuted, 0)
    );
    assert_eq!(
        status_of(store.as_ref(), second.order_id).await,
        (OrderStatus::PartiallyExecuted, 5)
    );
    assert_eq!(
        status_of(store.as_ref(), buy.order_id).await,
        (OrderStatus::FullyExecuted, 0)
    );

    let resting = engine.resting_orders(1);
    assert_eq!(resting.len(), 1);
    assert_eq!(resting[0].order_id, second.order_id);
    assert_eq!(resting[0].units, 5);
    assert_eq!(engine.best_ask(1), Some(100));
    assert_eq!(engine.best_bid(1), None);
}

#[tokio::test]
async fn non_crossing_orders_never_match() {
    let (store, engine) = memory_engine();
    engine.place_order(NewOrder::buy(1, 1, 5, 90)).await.unwrap();
    engine.place_order(NewOrder::sell(1, 2, 5, 95)).await.unwrap();
    let before = engine.resting_orders(1);

    for _ in 0..3 {
        let outcome = engine.run_cycle().await;
        assert!(outcome.trades.is_empty());
        assert!(outcome.failures.is_empty());
    }

    assert_eq!(engine.resting_orders(1), before);
    assert_eq!(engine.best_bid(1), Some(90));
    assert_eq!(engine.best_ask(1), Some(95));
    assert!(store.list_trades(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn trades_record_both_leg_prices() {
    let (_store, engine) = memory_engine();
    engine.place_order(NewOrder::sell(1, 1, 3, 95)).await.unwrap();
    engine.place_order(NewOrder::buy(1, 2, 3, 105)).await.unwrap();

    let outcome = engine.run_cycle().await;
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].buy_price, 105);
    assert_eq!(outcome.trades[0].sell_price, 95);
}

#[tokio::test]
async fn books_are_independent_per_stock() {
    let (_store, engine) = memory_engine();
    engine.place_order(NewOrder::buy(1, 1, 5, 100)).await.unwrap();
    engine.place_order(NewOrder::sell(2, 2, 5, 90)).await.unwrap();

    assert!(engine.run_cycle().await.trades.is_empty());
    assert_eq!(engine.stock_ids(), vec![1, 2]);
    assert_eq!(engine.best_bid(1), Some(100));
    assert_eq!(engine.best_ask(2), Some(90));
    assert_eq!(engine.best_bid(3), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_placement_conserves_units() {
    let (store, engine) = memory_engine();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let matcher = tokio::spawn({
        let engine = engine.clone();
        async move {
            engine
                .run_matcher_until(async {
                    let _ = stop_rx.await;
                })
                .await
        }
    });

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let orders: Vec<NewOrder> = (0..100)
        .map(|i| {
            let units = rng.gen_range(1..=20);
            let price = rng.gen_range(95..=105);
            if i % 2 == 0 {
                NewOrder::buy(1, i, units, price)
            } else {
                NewOrder::sell(1, i, units, price)
            }
        })
        .collect();
    let submitted: Units = orders.iter().map(|o| o.units).sum();

    let handles: Vec<_> = orders
        .into_iter()
        .map(|order| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.place_order(order).await.unwrap() })
        })
        .collect();
    let mut placed = Vec::new();
    for handle in handles {
        placed.push(handle.await.unwrap());
    }

    stop_tx.send(()).unwrap();
    matcher.await.unwrap();
    // Drain anything submitted after the matcher's last pass.
    assert!(engine.run_cycle().await.failures.is_empty());

    let ids: HashSet<_> = placed.iter().map(|o| o.order_id).collect();
    assert_eq!(ids.len(), 100);

    let trades = store.list_trades(0).await.unwrap();
    let traded: Units = trades.iter().map(|t| t.units).sum();
    let resting = engine.resting_orders(1);
    let resting_units: Units = resting.iter().map(|o| o.units).sum();
    assert_eq!(resting_units + 2 * traded, submitted);

    // Nothing crossing is left behind.
    if let (Some(bid), Some(ask)) = (engine.best_bid(1), engine.best_ask(1)) {
        assert!(bid < ask);
    }

    // Store and book agree, and filled orders never rest.
    let stored: HashMap<_, _> = store
        .list_orders()
        .await
        .unwrap()
        .into_iter()
        .map(|o| (o.order_id, o))
        .collect();
    for order in &resting {
        assert!(order.units > 0);
        assert_eq!(stored[&order.order_id].units, order.units);
        assert_ne!(stored[&order.order_id].status, OrderStatus::FullyExecuted);
    }
    let resting_ids: HashSet<_> = resting.iter().map(|o| o.order_id).collect();
    for order in stored.values() {
        if order.status == OrderStatus::FullyExecuted {
            assert_eq!(order.units, 0);
            assert!(!resting_ids.contains(&order.order_id));
        } else {
            assert!(resting_ids.contains(&order.order_id));
        }
    }

    // Each trade consumes units that really existed on both sides.
    let mut filled: HashMap<OrderId, Units> = HashMap::new();
    for trade in &trades {
        *filled.entry(trade.buy_order_id).or_default() += trade.units;
        *filled.entry(trade.sell_order_id).or_default() += trade.units;
        assert!(trade.buy_price >= trade.sell_price);
    }
    for order in &placed {
        let done = filled.get(&order.order_id).copied().unwrap_or(0);
        assert_eq!(done + stored[&order.order_id].units, order.units);
        let side_ok = match order.side {
            OrderSide::Buy => trades.iter().all(|t| t.sell_order_id != order.order_id),
            OrderSide::Sell => trades.iter().all(|t| t.buy_order_id != order.order_id),
        };
        assert!(side_ok);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sqlite_store_backs_full_round() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("exchange.db").display());
    let store = Arc::new(SqliteStore::connect(&url, 4).await.unwrap());
    let engine = MatchingEngine::new(store.clone());

    engine.place_order(NewOrder::sell(7, 1, 10, 100)).await.unwrap();
    engine.place_order(NewOrder::sell(7, 2, 10, 100)).await.unwrap();
    engine.place_order(NewOrder::buy(7, 3, 15, 101)).await.unwrap();
    let outcome = engine.run_cycle().await;
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.trades.len(), 2);

    let statuses: Vec<_> = store
        .list_orders()
        .await
        .unwrap()
        .into_iter()
        .map(|o| (o.status, o.units))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (OrderStatus::FullyExecuted, 0),
            (OrderStatus::PartiallyExecuted, 5),
            (OrderStatus::FullyExecuted, 0),
        ]
    );
    assert_eq!(store.latest_prices().await.unwrap(), vec![(7, 100)]);

    // A fresh engine over the same database picks up the open remainder.
    let restarted = MatchingEngine::new(store);
    assert_eq!(restarted.recover().await.unwrap(), 1);
    assert_eq!(restarted.best_ask(7), Some(100));
    assert_eq!(restarted.resting_orders(7)[0].units, 5);
}
