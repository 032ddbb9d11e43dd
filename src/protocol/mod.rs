//! Wire protocol: primitives, compression, the records batch codec, and the
//! request/response messages for the API surface named in spec §6.1.

pub mod compression;
pub mod crc32c;
pub mod header;
pub mod messages;
pub mod murmur2;
pub mod record_batch;
pub mod types;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// https://kafka.apache.org/protocol.html#protocol_api_keys
///
/// Only the subset spec §6.1 requires this client to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    OffsetCommit = 8,
    OffsetFetch = 9,
    FindCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
    CreateTopics = 19,
    DeleteTopics = 20,
    InitProducerId = 22,
    DeleteGroups = 42,
    ApiVersions = 18,
}

impl ApiKey {
    /// Highest version this client implements for a given API (used both as
    /// the wire version we request and as the ceiling the negotiation step
    /// clamps against, spec §4.5).
    pub fn max_supported_version(self) -> i16 {
        match self {
            ApiKey::Produce => 11,
            ApiKey::Fetch => 17,
            ApiKey::ListOffsets => 9,
            ApiKey::Metadata => 12,
            ApiKey::OffsetCommit => 9,
            ApiKey::OffsetFetch => 9,
            ApiKey::FindCoordinator => 6,
            ApiKey::JoinGroup => 9,
            ApiKey::Heartbeat => 4,
            ApiKey::LeaveGroup => 5,
            ApiKey::SyncGroup => 5,
            ApiKey::DescribeGroups => 5,
            ApiKey::ListGroups => 5,
            ApiKey::CreateTopics => 7,
            ApiKey::DeleteTopics => 6,
            ApiKey::InitProducerId => 5,
            ApiKey::DeleteGroups => 2,
            ApiKey::ApiVersions => 3,
        }
    }

    /// Whether requests/responses for this API use "flexible" (compact +
    /// tagged-fields) encoding at `version`.
    pub fn is_flexible(self, version: i16) -> bool {
        match self {
            ApiKey::Produce => version >= 9,
            ApiKey::Fetch => version >= 12,
            ApiKey::ListOffsets => version >= 6,
            ApiKey::Metadata => version >= 9,
            ApiKey::OffsetCommit => version >= 8,
            ApiKey::OffsetFetch => version >= 6,
            ApiKey::FindCoordinator => version >= 3,
            ApiKey::JoinGroup => version >= 6,
            ApiKey::Heartbeat => version >= 4,
            ApiKey::LeaveGroup => version >= 4,
            ApiKey::SyncGroup => version >= 4,
            ApiKey::DescribeGroups => version >= 5,
            ApiKey::ListGroups => version >= 3,
            ApiKey::CreateTopics => version >= 5,
            ApiKey::DeleteTopics => version >= 4,
            ApiKey::InitProducerId => version >= 2,
            ApiKey::DeleteGroups => version >= 2,
            ApiKey::ApiVersions => version >= 3,
        }
    }
}

/// https://kafka.apache.org/protocol.html#protocol_error_codes
///
/// Only the codes this client's control flow branches on get a name; all
/// other codes still round-trip through `ProtocolError::from_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i16)]
pub enum ErrorCode {
    None = 0,
    UnknownTopicOrPartition = 3,
    LeaderNotAvailable = 5,
    NotLeaderOrFollower = 6,
    RequestTimedOut = 7,
    CoordinatorNotAvailable = 15,
    NotCoordinator = 16,
    IllegalGeneration = 22,
    UnsupportedVersion = 35,
    NotController = 41,
    InvalidRequest = 42,
    UnknownMemberId = 25,
    RebalanceInProgress = 27,
    ProducerFenced = 45,
    DuplicateSequenceNumber = 46,
    InvalidProducerEpoch = 47,
}
