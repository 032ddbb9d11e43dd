//! Single TCP connection: frames requests, demultiplexes responses by
//! correlation id (spec §4.3). One reader task owns the socket's read half
//! and drives the pending map; `send` callers share the write half behind a
//! mutex so emission order on the wire matches correlation-id order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::config::Broker;
use crate::error::{Error, Result};
use crate::protocol::header::RequestHeader;

/// Lifecycle events a `Connection` (or the pool wrapping it) emits (spec
/// §4.3). Subscribers that lag behind are dropped lazily by `broadcast`.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connecting { broker: String },
    Connect { broker: String },
    Failed { broker: String, message: String },
    Disconnect { broker: String },
    Drain { broker: String },
    SaslHandshake { broker: String },
    SaslAuthentication { broker: String },
}

struct PendingRequest {
    flexible: bool,
    responder: oneshot::Sender<Result<Bytes>>,
}

/// Owns one TCP stream and the outbound pending map (spec §4.3).
pub struct Connection {
    broker: Broker,
    write_half: Mutex<OwnedWriteHalf>,
    pending: Arc<Mutex<HashMap<i32, PendingRequest>>>,
    next_correlation_id: AtomicI32,
    client_id: String,
    events: broadcast::Sender<ConnectionEvent>,
    closed: AtomicBool,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    pub async fn connect(broker: Broker, client_id: String, events: broadcast::Sender<ConnectionEvent>) -> Result<Arc<Self>> {
        let _ = events.send(ConnectionEvent::Connecting { broker: broker.to_string() });
        let stream = TcpStream::connect((broker.host.as_str(), broker.port))
            .await
            .map_err(|e| Error::network(format!("connect to {broker}: {e}")))?;
        stream.set_nodelay(true).ok();
        let (read_half, write_half) = stream.into_split();

        let pending: Arc<Mutex<HashMap<i32, PendingRequest>>> = Arc::new(Mutex::new(HashMap::new()));
        let conn = Arc::new(Self {
            broker: broker.clone(),
            write_half: Mutex::new(write_half),
            pending: pending.clone(),
            next_correlation_id: AtomicI32::new(0),
            client_id,
            events: events.clone(),
            closed: AtomicBool::new(false),
            reader_task: Mutex::new(None),
        });

        let reader_conn = conn.clone();
        let task = tokio::spawn(async move {
            reader_conn.read_loop(read_half).await;
        });
        *conn.reader_task.lock().await = Some(task);

        let _ = events.send(ConnectionEvent::Connect { broker: broker.to_string() });
        Ok(conn)
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sends one request and awaits its response (spec §4.3 send contract).
    /// `flexible` tells the reader how to parse the response header (whether
    /// tagged fields follow the correlation id).
    pub async fn send(&self, api_key: i16, api_version: i16, body: &BytesMut, flexible: bool) -> Result<Bytes> {
        if self.is_closed() {
            return Err(Error::network_closed());
        }

        let (tx, rx) = oneshot::channel();

        // Correlation id allocation and the write itself happen under the
        // same write-half lock, so two concurrent `send` calls hit the wire
        // in the same order as their correlation ids (spec §4.3/§5).
        {
            let mut write_half = self.write_half.lock().await;
            let correlation_id = self.next_correlation_id.fetch_add(1, Ordering::SeqCst);
            let header = RequestHeader {
                api_key,
                api_version,
                correlation_id,
                client_id: Some(self.client_id.clone()),
            };

            let mut frame = BytesMut::new();
            header.write(&mut frame);
            frame.put_slice(body);

            let mut message = BytesMut::with_capacity(frame.len() + 4);
            message.put_i32(frame.len() as i32);
            message.put_slice(&frame);

            self.pending.lock().await.insert(correlation_id, PendingRequest { flexible, responder: tx });

            if let Err(e) = write_half.write_all(&message).await {
                self.pending.lock().await.remove(&correlation_id);
                self.fail_all(Error::network(format!("write to {}: {e}", self.broker))).await;
                return Err(Error::network(format!("write to {}: {e}", self.broker)));
            }
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::network_closed()),
        }
    }

    /// Reader loop: frames each response, looks up the pending entry by
    /// correlation id, skips tagged fields if the API/version is flexible,
    /// and resolves the waiting future (spec §4.3).
    async fn read_loop(self: Arc<Self>, mut read_half: tokio::net::tcp::OwnedReadHalf) {
        loop {
            let mut len_buf = [0u8; 4];
            if let Err(e) = read_half.read_exact(&mut len_buf).await {
                self.close_with_error(Error::network(format!("read from {}: {e}", self.broker))).await;
                return;
            }
            let len = i32::from_be_bytes(len_buf);
            if len < 0 {
                self.close_with_error(Error::network(format!("negative frame length from {}", self.broker))).await;
                return;
            }
            let mut body = vec![0u8; len as usize];
            if let Err(e) = read_half.read_exact(&mut body).await {
                self.close_with_error(Error::network(format!("read from {}: {e}", self.broker))).await;
                return;
            }

            let mut buf = Bytes::from(body);
            if buf.remaining() < 4 {
                self.close_with_error(Error::network("response shorter than a correlation id")).await;
                return;
            }
            let correlation_id = buf.get_i32();

            let pending_entry = self.pending.lock().await.remove(&correlation_id);
            let Some(entry) = pending_entry else {
                // spec §4.3: unknown correlation id is fatal, fail everything.
                self.close_with_error(Error::UnexpectedCorrelationId(correlation_id)).await;
                return;
            };

            let result = (|| {
                if entry.flexible {
                    crate::protocol::types::skip_tagged_fields(&mut buf)?;
                }
                Ok(buf)
            })();
            let _ = entry.responder.send(result);
        }
    }

    async fn fail_all(&self, error: Error) {
        let mut pending = self.pending.lock().await;
        for (_, entry) in pending.drain() {
            let _ = entry.responder.send(Err(error.clone()));
        }
    }

    async fn close_with_error(&self, error: Error) {
        self.closed.store(true, Ordering::SeqCst);
        self.fail_all(error).await;
        let _ = self.events.send(ConnectionEvent::Disconnect { broker: self.broker.to_string() });
    }

    /// Owner-initiated close: flush the pending map with `NetworkError{closed:true}`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.events.send(ConnectionEvent::Drain { broker: self.broker.to_string() });
        self.fail_all(Error::network_closed()).await;
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        let mut write_half = self.write_half.lock().await;
        let _ = write_half.shutdown().await;
    }
}
