use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::channel::BrokerChannel;
use crate::error::BrokerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl ExchangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fanout => "fanout",
            Self::Topic => "topic",
            Self::Headers => "headers",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExchangeSpec {
    pub name: String,
    pub kind: ExchangeKind,
    pub durable: bool,
    pub auto_delete: bool,
}

impl ExchangeSpec {
    /// Durable topic exchange, the shape every orderflow exchange uses.
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExchangeKind::Topic,
            durable: true,
            auto_delete: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
}

impl QueueSpec {
    /// `durable=true, exclusive=false, auto_delete=false`.
    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
            exclusive: false,
            auto_delete: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
}

impl Binding {
    pub fn new(
        queue: impl Into<String>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }
}

/// Everything a publisher or consumer needs to exist before first use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub exchanges: Vec<ExchangeSpec>,
    pub queues: Vec<QueueSpec>,
    pub bindings: Vec<Binding>,
}

impl Topology {
    pub fn queue(spec: QueueSpec) -> Self {
        Self {
            queues: vec![spec],
            ..Self::default()
        }
    }

    pub fn exchange(spec: ExchangeSpec) -> Self {
        Self {
            exchanges: vec![spec],
            ..Self::default()
        }
    }

    /// A durable queue bound to a durable topic exchange with one routing key.
    pub fn bound_queue(exchange: &str, queue: &str, routing_key: &str) -> Self {
        Self {
            exchanges: vec![ExchangeSpec::topic(exchange)],
            queues: vec![QueueSpec::durable(queue)],
            bindings: vec![Binding::new(queue, exchange, routing_key)],
        }
    }
}

#[derive(Default)]
struct Declared {
    exchanges: HashMap<String, ExchangeSpec>,
    queues: HashMap<String, QueueSpec>,
    bindings: Vec<Binding>,
}

enum Seen {
    New,
    Same,
}

/// Declares topology once per channel.
///
/// Re-declaring an identical exchange or queue is a no-op and does not reach
/// the broker. Re-declaring with different parameters is rejected with
/// [`BrokerError::TopologyConflict`] before anything is sent; the broker
/// enforces the same rule for names declared by other processes.
pub struct TopologyDeclarator<C> {
    channel: C,
    declared: Mutex<Declared>,
}

impl<C: BrokerChannel> TopologyDeclarator<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            declared: Mutex::new(Declared::default()),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub async fn declare(&self, topology: &Topology) -> Result<(), BrokerError> {
        for exchange in &topology.exchanges {
            self.declare_exchange(exchange).await?;
        }
        for queue in &topology.queues {
            self.declare_queue(queue).await?;
        }
        for binding in &topology.bindings {
            self.bind(binding).await?;
        }
        Ok(())
    }

    pub async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), BrokerError> {
        let seen = check(&self.lock().exchanges, "exchange", &spec.name, spec)?;
        if let Seen::Same = seen {
            return Ok(());
        }
        self.channel.declare_exchange(spec).await?;
        self.lock().exchanges.insert(spec.name.clone(), spec.clone());
        tracing::info!(
            exchange = %spec.name,
            kind = spec.kind.as_str(),
            durable = spec.durable,
            "exchange declared"
        );
        Ok(())
    }

    pub async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), BrokerError> {
        let seen = check(&self.lock().queues, "queue", &spec.name, spec)?;
        if let Seen::Same = seen {
            return Ok(());
        }
        self.channel.declare_queue(spec).await?;
        self.lock().queues.insert(spec.name.clone(), spec.clone());
        tracing::info!(queue = %spec.name, durable = spec.durable, "queue declared");
        Ok(())
    }

    pub async fn bind(&self, binding: &Binding) -> Result<(), BrokerError> {
        let bound = self.lock().bindings.contains(binding);
        if bound {
            return Ok(());
        }
        self.channel.bind_queue(binding).await?;
        self.lock().bindings.push(binding.clone());
        tracing::info!(
            queue = %binding.queue,
            exchange = %binding.exchange,
            routing_key = %binding.routing_key,
            "queue bound"
        );
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Declared> {
        self.declared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check<T: PartialEq>(
    table: &HashMap<String, T>,
    kind: &'static str,
    name: &str,
    spec: &T,
) -> Result<Seen, BrokerError> {
    match table.get(name) {
        None => Ok(Seen::New),
        Some(existing) if existing == spec => Ok(Seen::Same),
        Some(_) => Err(BrokerError::TopologyConflict {
            kind,
            name: name.to_owned(),
        }),
    }
}
