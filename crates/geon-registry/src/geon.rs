use geon_types::{Address, Amount, GeonId};
use serde::{Deserialize, Serialize};

/// A registered Geon: an identified share of the registry's pooled custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geon {
    pub id: GeonId,
    /// Account that created the Geon. Only it may delete the Geon.
    pub creator: Address,
    /// This Geon's share of the custody balance.
    pub reward_token_owned: Amount,
}

impl Geon {
    pub fn new(id: GeonId, creator: Address) -> Self {
        Self {
            id,
            creator,
            reward_token_owned: Amount::ZERO,
        }
    }
}

/// Store key layout. Ids are written as raw big-endian bytes so a prefix
/// scan yields Geons in id order.
pub(crate) mod keys {
    use geon_types::{Address, GeonId, RequestId};

    pub const GEON_PREFIX: &[u8] = b"geon/";
    pub const GRANT_PREFIX: &[u8] = b"grant/";
    pub const GEON_COUNT: &[u8] = b"meta/geon-count";

    pub fn geon(id: &GeonId) -> Vec<u8> {
        let mut key = Vec::with_capacity(GEON_PREFIX.len() + 16);
        key.extend_from_slice(GEON_PREFIX);
        key.extend_from_slice(id.as_bytes());
        key
    }

    /// Prefix shared by every grant on `geon_id`.
    pub fn grants_of(geon_id: &GeonId) -> Vec<u8> {
        let mut key = Vec::with_capacity(GRANT_PREFIX.len() + 16 + 1 + 20 + 1 + 16);
        key.extend_from_slice(GRANT_PREFIX);
        key.extend_from_slice(geon_id.as_bytes());
        key.push(b'/');
        key
    }

    pub fn grant(geon_id: &GeonId, geominer: &Address, request_id: &RequestId) -> Vec<u8> {
        let mut key = grants_of(geon_id);
        key.extend_from_slice(geominer.as_bytes());
        key.push(b'/');
        key.extend_from_slice(request_id.as_bytes());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geon_types::RequestId;

    #[test]
    fn geon_keys_sort_by_id() {
        let low = keys::geon(&GeonId::from(1u128));
        let high = keys::geon(&GeonId::from(256u128));
        assert!(low < high);
        assert!(low.starts_with(keys::GEON_PREFIX));
    }

    #[test]
    fn grant_keys_distinguish_every_component() {
        let geon = GeonId::from(1u128);
        let miner = Address::derive("miner");
        let base = keys::grant(&geon, &miner, &RequestId::from(1u128));
        assert_ne!(base, keys::grant(&geon, &miner, &RequestId::from(2u128)));
        assert_ne!(base, keys::grant(&geon, &Address::derive("other"), &RequestId::from(1u128)));
        assert_ne!(base, keys::grant(&GeonId::from(2u128), &miner, &RequestId::from(1u128)));
    }

    #[test]
    fn grants_of_covers_only_its_geon() {
        let miner = Address::derive("miner");
        let request = RequestId::from(3u128);
        let prefix = keys::grants_of(&GeonId::from(1u128));
        assert!(keys::grant(&GeonId::from(1u128), &miner, &request).starts_with(&prefix));
        assert!(!keys::grant(&GeonId::from(2u128), &miner, &request).starts_with(&prefix));
    }

    #[test]
    fn fresh_geon_holds_nothing() {
        let geon = Geon::new(GeonId::from(7u128), Address::derive("creator"));
        assert!(geon.reward_token_owned.is_zero());
    }
}
