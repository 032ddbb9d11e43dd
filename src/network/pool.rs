//! Connection pool keyed by `"host:port"` (spec §4.4). Lazily connects,
//! removes closed connections on lookup, and can try a broker list
//! sequentially for the bootstrap case.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::config::Broker;
use crate::error::{Error, Result};
use crate::network::connection::{Connection, ConnectionEvent};

pub struct ConnectionPool {
    client_id: String,
    connections: Mutex<HashMap<String, Arc<Connection>>>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionPool {
    pub fn new(client_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { client_id: client_id.into(), connections: Mutex::new(HashMap::new()), events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Returns the existing connection for `broker` if still open, else
    /// connects (spec §4.4).
    pub async fn get(&self, broker: &Broker) -> Result<Arc<Connection>> {
        let key = broker.key();
        let mut connections = self.connections.lock().await;
        if let Some(conn) = connections.get(&key) {
            if !conn.is_closed() {
                return Ok(conn.clone());
            }
            connections.remove(&key);
        }

        let conn = Connection::connect(broker.clone(), self.client_id.clone(), self.events.clone()).await?;
        connections.insert(key, conn.clone());
        Ok(conn)
    }

    /// Tries each broker in order, returning the first that connects.
    /// Aggregates every failure into `MultipleErrors` only if all fail
    /// (spec §4.4).
    pub async fn get_first_available(&self, brokers: &[Broker]) -> Result<Arc<Connection>> {
        if brokers.is_empty() {
            return Err(Error::User("no brokers to connect to".to_string()));
        }
        let mut errors = Vec::new();
        for broker in brokers {
            match self.get(broker).await {
                Ok(conn) => return Ok(conn),
                Err(e) => errors.push(e),
            }
        }
        if errors.len() == 1 {
            Err(errors.pop().unwrap())
        } else {
            Err(Error::multiple("no broker in the bootstrap list was reachable", errors))
        }
    }

    /// Removes a connection that the caller has observed to be closed,
    /// so the next `get` reconnects instead of handing back a dead entry.
    pub async fn evict(&self, broker: &Broker) {
        self.connections.lock().await.remove(&broker.key());
    }

    /// Closes every member connection concurrently; a second call is a no-op
    /// because each `Connection::close` is itself idempotent (spec §4.4).
    pub async fn close(&self) {
        let connections: Vec<_> = self.connections.lock().await.drain().map(|(_, c)| c).collect();
        futures::future::join_all(connections.iter().map(|c| c.close())).await;
    }
}
