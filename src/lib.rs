//! A native Apache Kafka client: producer, consumer group, and a thin admin
//! surface built directly on the wire protocol (no JVM client, no FFI).
//!
//! - [`producer::Producer`] — batched, optionally idempotent sends.
//! - [`consumer::Consumer`] — group membership, fetch loop, offset commits.
//! - [`admin::Admin`] — topic and group management.
//!
//! All three share a [`cluster::ClusterBase`]: API-version negotiation, the
//! metadata cache, and the retry engine.

pub mod admin;
pub mod cluster;
pub mod config;
pub mod consumer;
pub mod error;
pub mod network;
pub mod producer;
pub mod protocol;

/// Re-exports of the types most callers need, so `use kafka_native::prelude::*;`
/// covers the common path without naming every submodule.
pub mod prelude {
    pub use crate::admin::{Admin, TopicListing};
    pub use crate::cluster::ClusterBase;
    pub use crate::config::{
        Acks, AdminConfig, AutocommitMode, Broker, ClientConfig, ConsumeOptions, ConsumerConfig, FallbackMode, OffsetMode, ProducerConfig,
    };
    pub use crate::consumer::{Consumer, Message};
    pub use crate::error::{Error, ProtocolError, Result};
    pub use crate::producer::{ProduceOutcome, Producer, Record};
}
