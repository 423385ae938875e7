use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use geon_types::Address;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

/// In-memory, `BTreeMap`-based ledger store.
///
/// Holds no lock of its own: the runtime serializes invocations and stages
/// a copy of the whole world per invocation, so the store is `Clone` and
/// mutated through `&mut self`.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    address: Address,
    owner: Address,
    whitelist: BTreeSet<Address>,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryLedgerStore {
    /// Create an empty store at `address`, administered by `owner`.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            whitelist: BTreeSet::new(),
            entries: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Grant write access to `account`. Owner only; idempotent.
    pub fn add_whitelisted(&mut self, caller: Address, account: Address) -> StoreResult<()> {
        self.require_owner(caller)?;
        if self.whitelist.insert(account) {
            info!(store = %self.address.short_hex(), account = %account, "writer whitelisted");
        }
        Ok(())
    }

    /// Revoke write access from `account`. Owner only; idempotent.
    pub fn remove_whitelisted(&mut self, caller: Address, account: Address) -> StoreResult<()> {
        self.require_owner(caller)?;
        if self.whitelist.remove(&account) {
            info!(store = %self.address.short_hex(), account = %account, "writer removed from whitelist");
        }
        Ok(())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn require_owner(&self, caller: Address) -> StoreResult<()> {
        if caller != self.owner {
            return Err(StoreError::NotOwner { caller });
        }
        Ok(())
    }

    fn require_writer(&self, writer: Address) -> StoreResult<()> {
        if !self.whitelist.contains(&writer) {
            return Err(StoreError::NotWhitelisted { writer });
        }
        Ok(())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn address(&self) -> Address {
        self.address
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, writer: Address, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.require_writer(writer)?;
        debug!(key = %hex::encode(key), len = value.len(), "store put");
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, writer: Address, key: &[u8]) -> StoreResult<bool> {
        self.require_writer(writer)?;
        let existed = self.entries.remove(key).is_some();
        debug!(key = %hex::encode(key), existed, "store delete");
        Ok(existed)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn is_whitelisted(&self, account: &Address) -> bool {
        self.whitelist.contains(account)
    }
}

impl fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("address", &self.address)
            .field("writers", &self.whitelist.len())
            .field("entry_count", &self.entries.len())
            .finish()
    }
}
