//! Property P6 (fetch no-overlap): a fetch cycle issues exactly one `Fetch`
//! per leader regardless of how many assigned partitions that leader owns,
//! and two leaders are serviced concurrently rather than one after another.
//!
//! Each "broker" here is a real `TcpListener` answering the same framing a
//! live broker would (length-prefixed, flexible response header, empty
//! `FetchResponse`), so the test exercises `Fetcher::fetch_cycle` exactly as
//! the consumer's background loop would call it, with no broker code
//! mocked out below the socket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use kafka_native::cluster::{ClusterMetadata, PartitionMetadata, TopicMetadata};
use kafka_native::config::{Broker, ClientConfig, ConsumerConfig};
use kafka_native::network::ConnectionPool;
use kafka_native::protocol::messages::ApiVersionsTable;
use kafka_native::protocol::ApiKey;

/// Answers every request on `listener` with an empty, well-framed
/// `FetchResponse`, counting how many requests it has served.
async fn run_stub_broker(listener: TcpListener, requests_served: Arc<AtomicUsize>) {
    let (mut socket, _) = listener.accept().await.expect("accept");
    loop {
        let mut len_buf = [0u8; 4];
        if socket.read_exact(&mut len_buf).await.is_err() {
            return;
        }
        let len = i32::from_be_bytes(len_buf) as usize;
        let mut request = vec![0u8; len];
        if socket.read_exact(&mut request).await.is_err() {
            return;
        }
        let correlation_id = i32::from_be_bytes([request[4], request[5], request[6], request[7]]);
        requests_served.fetch_add(1, Ordering::SeqCst);

        let mut frame = Vec::new();
        frame.extend_from_slice(&correlation_id.to_be_bytes());
        frame.push(0); // response header tagged fields (flexible)
        frame.extend_from_slice(&0i32.to_be_bytes()); // throttle_time_ms
        frame.extend_from_slice(&0i16.to_be_bytes()); // error_code
        frame.extend_from_slice(&0i32.to_be_bytes()); // session_id
        frame.push(0); // responses: empty compact array
        frame.push(0); // body tagged fields

        let mut out = Vec::with_capacity(4 + frame.len());
        out.extend_from_slice(&(frame.len() as i32).to_be_bytes());
        out.extend_from_slice(&frame);
        if socket.write_all(&out).await.is_err() {
            return;
        }
    }
}

async fn spawn_stub_broker() -> (Broker, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();
    tokio::spawn(async move { run_stub_broker(listener, counter_clone).await });
    (Broker::new(addr.ip().to_string(), addr.port()), counter)
}

#[tokio::test]
async fn one_fetch_cycle_issues_a_single_request_per_leader_no_matter_the_partition_count() {
    let (broker_a, requests_to_a) = spawn_stub_broker().await;

    let mut brokers = HashMap::new();
    brokers.insert(0, broker_a.clone());
    let mut topics = HashMap::new();
    topics.insert(
        "t".to_string(),
        TopicMetadata {
            id: uuid::Uuid::nil(),
            // Three partitions, same leader: a correct scheduler sends one
            // Fetch, not three.
            partitions: vec![
                PartitionMetadata { leader: 0, leader_epoch: 0, replicas: vec![0] },
                PartitionMetadata { leader: 0, leader_epoch: 0, replicas: vec![0] },
                PartitionMetadata { leader: 0, leader_epoch: 0, replicas: vec![0] },
            ],
        },
    );
    let metadata = ClusterMetadata::new(None, brokers, topics);

    let mut api_versions = ApiVersionsTable::default();
    api_versions.insert(ApiKey::Fetch.into(), 0, 17);

    let fetch_pool = Arc::new(ConnectionPool::new("test-client"));
    let config = ConsumerConfig::new(ClientConfig::new(vec![broker_a]), "test-group");
    let fetcher = kafka_native::consumer::fetcher::Fetcher::new(fetch_pool, config);

    let assignments = vec![("t".to_string(), 0), ("t".to_string(), 1), ("t".to_string(), 2)];
    let mut next_offsets = HashMap::new();
    fetcher.fetch_cycle(&api_versions, &assignments, &mut next_offsets, &metadata).await.expect("fetch cycle");

    assert_eq!(requests_to_a.load(Ordering::SeqCst), 1, "three same-leader partitions must collapse into one Fetch");
}

#[tokio::test]
async fn two_leaders_are_serviced_concurrently_across_repeated_cycles() {
    let (broker_a, requests_to_a) = spawn_stub_broker().await;
    let (broker_b, requests_to_b) = spawn_stub_broker().await;

    let mut brokers = HashMap::new();
    brokers.insert(0, broker_a.clone());
    brokers.insert(1, broker_b.clone());
    let mut topics = HashMap::new();
    topics.insert(
        "t".to_string(),
        TopicMetadata {
            id: uuid::Uuid::nil(),
            partitions: vec![
                PartitionMetadata { leader: 0, leader_epoch: 0, replicas: vec![0] },
                PartitionMetadata { leader: 1, leader_epoch: 0, replicas: vec![1] },
            ],
        },
    );
    let metadata = ClusterMetadata::new(None, brokers, topics);

    let mut api_versions = ApiVersionsTable::default();
    api_versions.insert(ApiKey::Fetch.into(), 0, 17);

    let fetch_pool = Arc::new(ConnectionPool::new("test-client"));
    let config = ConsumerConfig::new(ClientConfig::new(vec![broker_a.clone(), broker_b.clone()]), "test-group");
    let fetcher = kafka_native::consumer::fetcher::Fetcher::new(fetch_pool, config);

    let assignments = vec![("t".to_string(), 0), ("t".to_string(), 1)];
    let mut next_offsets = HashMap::new();

    // Two full cycles, each awaited to completion before the next starts:
    // the fetch loop never has a second cycle's Fetch outstanding while the
    // first is still in flight for the same leader.
    for _ in 0..2 {
        fetcher.fetch_cycle(&api_versions, &assignments, &mut next_offsets, &metadata).await.expect("fetch cycle");
    }

    assert_eq!(requests_to_a.load(Ordering::SeqCst), 2);
    assert_eq!(requests_to_b.load(Ordering::SeqCst), 2);
}
