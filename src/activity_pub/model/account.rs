use anyhow::{Context, Result};
use minicbor::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// What the server knows locally about a remote account.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Account {
    /// Time-sortable local identifier, see [`crate::id`].
    #[n(0)]
    pub(crate) id: String,
    #[n(1)]
    pub(crate) handle: String,
    #[n(2)]
    #[serde(default)]
    pub(crate) followers_count: u64,
    /// The actor IRI.
    #[n(3)]
    pub(crate) uri: String,
}

impl Account {
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        minicbor::to_vec(self).context("unable to encode account")
    }
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Account> {
        minicbor::decode(bytes).context("unable to decode account")
    }
}
