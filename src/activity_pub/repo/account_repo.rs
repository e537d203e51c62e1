use anyhow::Result;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use tokio::task::spawn_blocking;

use crate::activity_pub::model::Account;
use crate::mrf::AccountResolver;

/// Locally known remote accounts, keyed by actor IRI.
#[derive(Clone)]
pub(crate) struct AccountRepo {
    accounts: PartitionHandle,
}

impl AccountRepo {
    pub(crate) fn new(keyspace: Keyspace) -> Result<AccountRepo> {
        let accounts = keyspace.open_partition("accounts", PartitionCreateOptions::default())?;
        Ok(AccountRepo { accounts })
    }
    pub(crate) fn insert(&self, account: &Account) -> Result<()> {
        let bytes = account.to_bytes()?;
        self.accounts.insert(account.uri.as_str(), bytes)?;
        Ok(())
    }
    pub(crate) fn find_one(&self, iri: &str) -> Result<Option<Account>> {
        if let Some(bytes) = self.accounts.get(iri)? {
            let account = Account::from_bytes(&bytes)?;
            return Ok(Some(account));
        }
        Ok(None)
    }
}

impl AccountResolver for AccountRepo {
    async fn resolve(&self, actor_iri: &str) -> Result<Option<Account>> {
        let repo = self.clone();
        let iri = actor_iri.to_string();
        spawn_blocking(move || repo.find_one(&iri)).await?
    }
}
