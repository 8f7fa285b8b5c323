//! Live trade feed
//!
//! Best-effort fan-out of newly persisted trades to dashboard subscribers.
//! Delivery is fire-and-forget over a broadcast channel: a slow or
//! disconnected subscriber never blocks the publisher, and late subscribers
//! get no backlog (they pull current state over HTTP first). Publish order
//! follows insert order.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use journal_core::Trade;

const FEED_CAPACITY: usize = 1024;

/// Unique identifier for a feed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

/// Fan-out hub for newly persisted trades
pub struct TradeFeed {
    next_id: AtomicU64,
    subscribers: Arc<DashMap<SubscriberId, ()>>,
    tx: broadcast::Sender<Trade>,
}

impl TradeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Arc::new(DashMap::new()),
            tx,
        }
    }

    /// Register a new subscriber
    ///
    /// The returned handle receives every trade published after this call.
    pub fn subscribe(&self) -> TradeSubscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers.insert(id, ());
        debug!("Feed subscriber registered: {}", id);

        TradeSubscription {
            id,
            rx: self.tx.subscribe(),
            registry: Arc::clone(&self.subscribers),
        }
    }

    /// Drop a subscription, ending delivery to it
    pub fn unsubscribe(&self, subscription: TradeSubscription) {
        drop(subscription);
    }

    /// Publish a trade to every current subscriber
    ///
    /// Errors are logged and swallowed; a publish can never fail the
    /// persist path that triggered it.
    pub fn publish(&self, trade: &Trade) {
        if self.tx.receiver_count() == 0 {
            debug!("No feed subscribers, dropping trade {}", trade.order_id);
            return;
        }

        if let Err(e) = self.tx.send(trade.clone()) {
            debug!("Failed to publish trade: {}", e);
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for TradeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TradeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeFeed")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A live subscription handle
///
/// Deregisters itself when dropped.
pub struct TradeSubscription {
    id: SubscriberId,
    rx: broadcast::Receiver<Trade>,
    registry: Arc<DashMap<SubscriberId, ()>>,
}

impl TradeSubscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Receive the next published trade
    ///
    /// Returns `None` once the feed is gone. If this subscriber lagged
    /// behind the channel capacity the oldest trades are dropped; that is
    /// acceptable for a best-effort audience and is logged.
    pub async fn recv(&mut self) -> Option<Trade> {
        loop {
            match self.rx.recv().await {
                Ok(trade) => return Some(trade),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("{} lagged {} trades", self.id, n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive, for drains in tests and handlers
    pub fn try_recv(&mut self) -> Option<Trade> {
        self.rx.try_recv().ok()
    }
}

impl Drop for TradeSubscription {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
        debug!("Feed subscriber removed: {}", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use journal_core::TradeSide;
    use rust_decimal_macros::dec;

    fn test_trade(order_id: i64) -> Trade {
        Trade {
            broker: "projectx".to_string(),
            account_id: 77,
            contract_id: "CON.F.US.ENQ.H25".to_string(),
            creation_timestamp: Utc.with_ymd_and_hms(2025, 3, 4, 15, 30, 0).unwrap(),
            price: dec!(18250.25),
            profit_and_loss: dec!(12.5),
            fees: dec!(5.00),
            side: TradeSide::Buy,
            size: dec!(1),
            order_id,
        }
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let feed = TradeFeed::new();
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        feed.publish(&test_trade(1));

        assert_eq!(a.recv().await.unwrap().order_id, 1);
        assert_eq!(b.recv().await.unwrap().order_id, 1);
    }

    #[tokio::test]
    async fn test_unsubscribed_handle_receives_nothing() {
        let feed = TradeFeed::new();
        let gone = feed.subscribe();
        let mut stays = feed.subscribe();

        feed.unsubscribe(gone);
        assert_eq!(feed.subscriber_count(), 1);

        feed.publish(&test_trade(1));
        assert_eq!(stays.recv().await.unwrap().order_id, 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_noop() {
        let feed = TradeFeed::new();
        feed.publish(&test_trade(1));

        // A later subscriber sees only what is published after subscribing.
        let mut sub = feed.subscribe();
        assert!(sub.try_recv().is_none());

        feed.publish(&test_trade(2));
        assert_eq!(sub.recv().await.unwrap().order_id, 2);
    }
}
