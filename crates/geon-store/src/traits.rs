use geon_types::Address;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Key/value surface the registry persists through.
///
/// All implementations must satisfy these invariants:
/// - Reads never fail for authorization reasons.
/// - `put` and `delete` fail with [`StoreError::NotWhitelisted`] unless the
///   named writer is whitelisted, and leave the store untouched when they do.
/// - The store never interprets values; it is a pure byte map.
pub trait LedgerStore {
    /// Identity this store is deployed at.
    fn address(&self) -> Address;

    /// Read the raw value under `key`. `None` if absent.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Insert or overwrite `key`.
    fn put(&mut self, writer: Address, key: &[u8], value: Vec<u8>) -> StoreResult<()>;

    /// Remove `key`. Returns `true` if it existed.
    fn delete(&mut self, writer: Address, key: &[u8]) -> StoreResult<bool>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    /// Whether `account` may write.
    fn is_whitelisted(&self, account: &Address) -> bool;

    /// Read and decode a bincode record.
    fn get_record<T: DeserializeOwned>(&self, key: &[u8]) -> StoreResult<Option<T>>
    where
        Self: Sized,
    {
        self.get(key)
            .map(|bytes| bincode::deserialize(&bytes).map_err(|e| StoreError::codec(key, e)))
            .transpose()
    }

    /// Encode `record` with bincode and write it.
    fn put_record<T: Serialize>(&mut self, writer: Address, key: &[u8], record: &T) -> StoreResult<()>
    where
        Self: Sized,
    {
        let bytes = bincode::serialize(record).map_err(|e| StoreError::codec(key, e))?;
        self.put(writer, key, bytes)
    }

    /// Decode every record under `prefix`, in key order.
    fn scan_records<T: DeserializeOwned>(&self, prefix: &[u8]) -> StoreResult<Vec<T>>
    where
        Self: Sized,
    {
        self.scan_prefix(prefix)
            .into_iter()
            .map(|(key, bytes)| bincode::deserialize(&bytes).map_err(|e| StoreError::codec(&key, e)))
            .collect()
    }
}
