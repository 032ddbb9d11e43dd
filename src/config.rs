//! Configuration structs (spec §6.4). The ambient concern spec.md's
//! Non-goals exclude is file/env loading, not the in-memory option surface
//! itself — callers build one of these and hand it to a client.

use std::time::Duration;

use crate::protocol::compression::Compression;

/// A bootstrap broker: `{host, port}` (spec §3). Equality is both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Broker {
    pub host: String,
    pub port: u16,
}

impl Broker {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Options shared by every client role (spec §6.4).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub bootstrap_brokers: Vec<Broker>,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub metadata_max_age: Duration,
    pub autocreate_topics: bool,
    pub strict: bool,
}

impl ClientConfig {
    pub fn new(bootstrap_brokers: Vec<Broker>) -> Self {
        Self {
            client_id: "kafka-native".to_string(),
            bootstrap_brokers,
            timeout: Duration::from_secs(30),
            retries: 5,
            retry_delay: Duration::from_millis(300),
            metadata_max_age: Duration::from_secs(300),
            autocreate_topics: false,
            strict: false,
        }
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn metadata_max_age(mut self, max_age: Duration) -> Self {
        self.metadata_max_age = max_age;
        self
    }

    pub fn autocreate_topics(mut self, autocreate: bool) -> Self {
        self.autocreate_topics = autocreate;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Acknowledgement policy (spec §4.7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acks {
    None = 0,
    Leader = 1,
    All = -1,
}

impl Acks {
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

/// Producer-specific options layered on top of `ClientConfig` (spec §6.4).
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub client: ClientConfig,
    pub acks: Acks,
    pub compression: Compression,
    pub idempotent: bool,
    pub autocreate_topics: bool,
    pub repeat_on_stale_metadata: bool,
}

impl ProducerConfig {
    pub fn new(client: ClientConfig) -> Self {
        Self {
            autocreate_topics: client.autocreate_topics,
            client,
            acks: Acks::Leader,
            compression: Compression::None,
            idempotent: false,
            repeat_on_stale_metadata: true,
        }
    }

    pub fn acks(mut self, acks: Acks) -> Self {
        self.acks = acks;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Idempotence forces `acks=-1` and a single in-flight request per
    /// partition is the caller's responsibility to uphold by serializing
    /// sends (spec §4.7.1).
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        if idempotent {
            self.acks = Acks::All;
        }
        self
    }
}

/// Where a new `MessageStream` resolves its starting offset (spec §4.8.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetMode {
    Latest,
    Earliest,
    Committed,
    Manual,
}

/// Resolves partitions with no committed offset in `Committed` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    Latest,
    Earliest,
    Fail,
}

/// `false` \| `true` (commit inline per push) \| a periodic interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutocommitMode {
    Disabled,
    Inline,
    Interval(Duration),
}

impl Default for AutocommitMode {
    fn default() -> Self {
        AutocommitMode::Inline
    }
}

/// Consumer-specific options (spec §6.4).
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub client: ClientConfig,
    pub group_id: String,
    pub session_timeout: Duration,
    pub rebalance_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub max_wait_time: Duration,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub high_water_mark: usize,
}

impl ConsumerConfig {
    pub fn new(client: ClientConfig, group_id: impl Into<String>) -> Self {
        let heartbeat_interval = Duration::from_secs(3);
        let session_timeout = Duration::from_secs(10);
        let rebalance_timeout = Duration::from_secs(60);
        assert!(
            heartbeat_interval <= session_timeout && heartbeat_interval <= rebalance_timeout,
            "heartbeatInterval must be <= sessionTimeout and <= rebalanceTimeout (spec §5)"
        );
        Self {
            client,
            group_id: group_id.into(),
            session_timeout,
            rebalance_timeout,
            heartbeat_interval,
            max_wait_time: Duration::from_millis(500),
            min_bytes: 1,
            max_bytes: 1024 * 1024,
            isolation_level: 0,
            high_water_mark: 1024,
        }
    }

    pub fn timeouts(mut self, session: Duration, rebalance: Duration, heartbeat: Duration) -> Self {
        assert!(heartbeat <= session && heartbeat <= rebalance);
        self.session_timeout = session;
        self.rebalance_timeout = rebalance;
        self.heartbeat_interval = heartbeat;
        self
    }

    pub fn fetch_shape(mut self, min_bytes: i32, max_bytes: i32, max_wait_time: Duration) -> Self {
        self.min_bytes = min_bytes;
        self.max_bytes = max_bytes;
        self.max_wait_time = max_wait_time;
        self
    }
}

/// Per-`consume()` call options (spec §6.3 `Consumer.consume`).
pub struct ConsumeOptions {
    pub topics: Vec<String>,
    pub mode: OffsetMode,
    pub fallback_mode: FallbackMode,
    pub offsets: Vec<(String, i32, i64)>,
    pub autocommit: AutocommitMode,
}

impl ConsumeOptions {
    pub fn new(topics: Vec<String>, mode: OffsetMode) -> Self {
        Self { topics, mode, fallback_mode: FallbackMode::Latest, offsets: Vec::new(), autocommit: AutocommitMode::default() }
    }

    pub fn manual(topics: Vec<String>, offsets: Vec<(String, i32, i64)>) -> Self {
        Self { topics, mode: OffsetMode::Manual, fallback_mode: FallbackMode::Fail, offsets, autocommit: AutocommitMode::Disabled }
    }

    pub fn fallback_mode(mut self, mode: FallbackMode) -> Self {
        self.fallback_mode = mode;
        self
    }

    pub fn autocommit(mut self, mode: AutocommitMode) -> Self {
        self.autocommit = mode;
        self
    }
}

/// Admin surface shares the plain client config (spec §6.3).
pub type AdminConfig = ClientConfig;
