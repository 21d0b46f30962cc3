//! Resolves staking addresses into the BLS keys they currently have staked.
//!
//! The lookup is a read-only query against the validator system smart
//! contract. Its `returnData` is a flat list of base64 values read in
//! `(key, status)` pairs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use keywatch_types::{Address, BLS_KEY_LEN};

use crate::http::HttpTransport;
use crate::AdapterError;

const VM_QUERY_ENDPOINT: &str = "vm-values/query";
const GET_BLS_KEYS_STATUS_FUNC: &str = "getBlsKeysStatus";
const STAKED_STATUS: &[u8] = b"staked";

/// Address of the validator system smart contract.
pub const VALIDATOR_SC_ADDRESS: &str =
    "erd1qqqqqqqqqqqqqqqpqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqplllst77y4l";

/// Source of the identities discovered at cycle time.
#[async_trait]
pub trait KeysFetcher: Send + Sync {
    /// Return the hex-encoded keys to monitor in addition to the configured
    /// ones. `sender` names the caller and is only used for logging.
    async fn get_all_bls_keys(
        &self,
        cancel: &CancellationToken,
        sender: &str,
    ) -> Result<Vec<String>, AdapterError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VmQueryRequest<'a> {
    sc_address: &'a str,
    func_name: &'a str,
    caller: &'a str,
    args: [&'a str; 1],
}

#[derive(Debug, Default, Deserialize)]
struct VmQueryResponse {
    #[serde(default)]
    data: VmQueryEnvelope,
}

#[derive(Debug, Default, Deserialize)]
struct VmQueryEnvelope {
    #[serde(default)]
    data: VmQueryOutput,
}

#[derive(Debug, Default, Deserialize)]
struct VmQueryOutput {
    #[serde(default, rename = "returnData")]
    return_data: Option<Vec<Option<String>>>,
}

/// [`KeysFetcher`] that asks the validator contract about each configured
/// address, one at a time.
pub struct BlsKeysFetcher {
    transport: Arc<dyn HttpTransport>,
    addresses: Vec<Address>,
    time_between_queries: Duration,
}

impl BlsKeysFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        addresses: Vec<Address>,
        time_between_queries: Duration,
    ) -> Self {
        Self {
            transport,
            addresses,
            time_between_queries,
        }
    }

    async fn staked_keys(
        &self,
        cancel: &CancellationToken,
        address: &Address,
        sender: &str,
    ) -> Result<Vec<String>, AdapterError> {
        tracing::debug!(address = %address.bech32, "querying staked BLS keys");

        let request = VmQueryRequest {
            sc_address: VALIDATOR_SC_ADDRESS,
            func_name: GET_BLS_KEYS_STATUS_FUNC,
            caller: VALIDATOR_SC_ADDRESS,
            args: [address.hex.as_str()],
        };
        let body = serde_json::to_vec(&request)?;

        let response = self
            .transport
            .post(cancel, VM_QUERY_ENDPOINT, body)
            .await?
            .error_for_status()?;
        let decoded: VmQueryResponse = serde_json::from_slice(&response.body)?;

        let return_data = decoded
            .data
            .data
            .return_data
            .unwrap_or_default()
            .into_iter()
            .map(|item| match item {
                Some(encoded) => STANDARD
                    .decode(encoded)
                    .map_err(|e| AdapterError::Parse(e.to_string())),
                None => Ok(Vec::new()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let keys = staked_keys_from_pairs(&return_data);
        tracing::debug!(
            sender,
            address = %address.bech32,
            num_keys = keys.len(),
            "fetched staked BLS keys"
        );
        Ok(keys)
    }
}

/// Read `(key, status)` pairs, keeping the staked keys. A trailing odd
/// item is ignored.
fn staked_keys_from_pairs(return_data: &[Vec<u8>]) -> Vec<String> {
    return_data
        .chunks_exact(2)
        .filter_map(|pair| {
            let (key, status) = (&pair[0], &pair[1]);
            if key.len() != BLS_KEY_LEN {
                tracing::warn!(len = key.len(), "invalid BLS key in query response");
                return None;
            }
            (status.as_slice() == STAKED_STATUS).then(|| hex::encode(key))
        })
        .collect()
}

#[async_trait]
impl KeysFetcher for BlsKeysFetcher {
    async fn get_all_bls_keys(
        &self,
        cancel: &CancellationToken,
        sender: &str,
    ) -> Result<Vec<String>, AdapterError> {
        let mut all_keys = Vec::new();

        for address in &self.addresses {
            if address.hex.is_empty() {
                continue;
            }

            let keys = self.staked_keys(cancel, address, sender).await?;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AdapterError::ContextClosing),
                _ = tokio::time::sleep(self.time_between_queries) => {}
            }

            all_keys.extend(keys);
        }

        Ok(all_keys)
    }
}
