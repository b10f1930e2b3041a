use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use orderflow_core::error::StoreError;
use orderflow_domain::event::{OrderCreatedEvent, OrderEmailSentEvent};
use orderflow_domain::id::{EventId, OrderId};
use orderflow_domain::order::OrderStatus;
use orderflow_messaging::BrokerError;
use orderflow_orders::domain::repository::{OrderEventPort, OrderRepository};
use orderflow_orders::domain::types::Order;

// ── MockOrderRepo ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockOrderRepo {
    pub orders: Arc<Mutex<Vec<Order>>>,
    /// Number of upcoming calls that fail as if the database were down.
    pub failures: Arc<AtomicUsize>,
}

impl MockOrderRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(order: Order) -> Self {
        let repo = Self::new();
        repo.orders.lock().unwrap().push(order);
        repo
    }

    pub fn failing(times: usize) -> Self {
        Self {
            failures: Arc::new(AtomicUsize::new(times)),
            ..Self::default()
        }
    }

    /// Returns a shared handle to the stored orders for post-execution inspection.
    pub fn orders_handle(&self) -> Arc<Mutex<Vec<Order>>> {
        Arc::clone(&self.orders)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::unavailable(anyhow::anyhow!("connection refused")));
        }
        Ok(())
    }
}

impl OrderRepository for MockOrderRepo {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        self.check_available()?;
        self.orders.lock().unwrap().push(order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.check_available()?;
        Ok(self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        self.check_available()?;
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut orders = self.orders.lock().unwrap();
        match orders.iter_mut().find(|o| o.id == id) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ── MockEventPort ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockEventPort {
    pub published: Arc<Mutex<Vec<OrderCreatedEvent>>>,
    pub fail: bool,
}

impl MockEventPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn published_handle(&self) -> Arc<Mutex<Vec<OrderCreatedEvent>>> {
        Arc::clone(&self.published)
    }
}

impl OrderEventPort for MockEventPort {
    async fn publish_order_created(&self, event: &OrderCreatedEvent) -> Result<(), BrokerError> {
        if self.fail {
            return Err(BrokerError::ChannelClosed);
        }
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ── fixtures ─────────────────────────────────────────────────────────────────

pub fn order(status: OrderStatus) -> Order {
    Order {
        id: OrderId(Uuid::now_v7()),
        customer_email: "customer@example.com".into(),
        product_code: "P100".into(),
        quantity: 2,
        status,
        created_at: Utc::now(),
    }
}

pub fn email_sent(order_id: OrderId) -> OrderEmailSentEvent {
    OrderEmailSentEvent {
        event_id: EventId::new(),
        order_id,
        email: "customer@example.com".into(),
        sent_at: Utc::now(),
    }
}
