//! API registry (spec §4.5) and the individual request/response message
//! encoders/decoders (spec §6.1). Every message here is written against the
//! single flexible (compact + tagged-fields) version spec §6.1 names for
//! that API, since every version required by this client happens to be a
//! post-KIP-482 flexible version.

pub mod api_versions;
pub mod create_topics;
pub mod delete_groups;
pub mod delete_topics;
pub mod describe_groups;
pub mod find_coordinator;
pub mod fetch;
pub mod heartbeat;
pub mod init_producer_id;
pub mod join_group;
pub mod leave_group;
pub mod list_groups;
pub mod list_offsets;
pub mod metadata;
pub mod offset_commit;
pub mod offset_fetch;
pub mod produce;
pub mod sync_group;

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::protocol::ApiKey;

/// `{min_version, max_version}` as advertised by a broker for one API key.
#[derive(Debug, Clone, Copy)]
pub struct ApiVersionRange {
    pub min_version: i16,
    pub max_version: i16,
}

/// The table returned by `ApiVersions`, cached for the client's lifetime
/// (spec §4.6.1).
#[derive(Debug, Clone, Default)]
pub struct ApiVersionsTable {
    entries: HashMap<i16, ApiVersionRange>,
}

impl ApiVersionsTable {
    pub fn insert(&mut self, api_key: i16, min_version: i16, max_version: i16) {
        self.entries.insert(api_key, ApiVersionRange { min_version, max_version });
    }

    /// "Highest version the server supports that the client also
    /// implements" (spec §4.5). Absence of the API in the table, or no
    /// overlapping range, is `UnsupportedApiError`.
    pub fn negotiate(&self, api: ApiKey) -> Result<i16> {
        let key: i16 = api.into();
        let server_range = self
            .entries
            .get(&key)
            .ok_or_else(|| Error::Unsupported(format!("broker does not advertise {api:?}")))?;

        let client_max = api.max_supported_version();
        let negotiated = client_max.min(server_range.max_version);
        if negotiated < server_range.min_version {
            return Err(Error::Unsupported(format!(
                "no overlapping version for {api:?}: client supports up to {client_max}, broker requires at least {}",
                server_range.min_version
            )));
        }
        Ok(negotiated)
    }
}
