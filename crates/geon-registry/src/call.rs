//! Selector-prefixed call encoding for the registry.
//!
//! An encoded call is a 4-byte [`Selector`] followed by the bincode encoding
//! of the call's arguments. The selector is the head of a domain-separated
//! BLAKE3 hash of the call's signature string, so it is stable across
//! builds and independent of enum ordering.

use std::fmt;

use geon_types::{Address, Amount, GeonId, RequestId};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RegistryError, RegistryResult};
use crate::geon::Geon;

/// Byte width of a selector.
pub const SELECTOR_LEN: usize = 4;

const SELECTOR_DOMAIN: &[u8] = b"geon-abi-v1:";

mod sig {
    pub const CREATE_GEON: &str = "create_geon(GeonId)";
    pub const CREATE_GEONS: &str = "create_geons(Vec<GeonId>)";
    pub const GET_GEON: &str = "get_geon(GeonId)";
    pub const GEON_COUNT: &str = "geon_count()";
    pub const DELETE_GEON: &str = "delete_geon(GeonId)";
    pub const INCREASE_GEON_BALANCE: &str = "increase_geon_balance(GeonId,Amount)";
    pub const SET_GEOMINING_REWARD: &str = "set_geomining_reward(GeonId,Address,RequestId,Amount)";
    pub const GET_GEOMINING_REWARD: &str = "get_geomining_reward(GeonId,Address,RequestId)";
    pub const GEOMINE: &str = "geomine(GeonId,RequestId)";
    pub const UPDATE_REWARD_TOKEN: &str = "update_reward_token(Address)";
    pub const UPDATE_STORAGE: &str = "update_storage(Address)";
    pub const OWNER: &str = "owner()";
    pub const REWARD_TOKEN: &str = "reward_token()";
    pub const STORAGE: &str = "storage()";
}

/// Leading bytes of an encoded call naming the operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selector([u8; SELECTOR_LEN]);

impl Selector {
    /// Selector for a signature string.
    pub fn of(signature: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(SELECTOR_DOMAIN);
        hasher.update(signature.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; SELECTOR_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..SELECTOR_LEN]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SELECTOR_LEN] {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

/// A decoded registry invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    CreateGeon { id: GeonId },
    CreateGeons { ids: Vec<GeonId> },
    GetGeon { id: GeonId },
    GeonCount,
    DeleteGeon { id: GeonId },
    IncreaseGeonBalance { id: GeonId, amount: Amount },
    SetGeominingReward {
        geon_id: GeonId,
        geominer: Address,
        request_id: RequestId,
        amount: Amount,
    },
    GetGeominingReward {
        geon_id: GeonId,
        geominer: Address,
        request_id: RequestId,
    },
    Geomine { geon_id: GeonId, request_id: RequestId },
    UpdateRewardToken { address: Address },
    UpdateStorage { address: Address },
    Owner,
    RewardToken,
    Storage,
}

impl RegistryCall {
    /// Every signature the registry answers to.
    pub const SIGNATURES: [&'static str; 14] = [
        sig::CREATE_GEON,
        sig::CREATE_GEONS,
        sig::GET_GEON,
        sig::GEON_COUNT,
        sig::DELETE_GEON,
        sig::INCREASE_GEON_BALANCE,
        sig::SET_GEOMINING_REWARD,
        sig::GET_GEOMINING_REWARD,
        sig::GEOMINE,
        sig::UPDATE_REWARD_TOKEN,
        sig::UPDATE_STORAGE,
        sig::OWNER,
        sig::REWARD_TOKEN,
        sig::STORAGE,
    ];

    /// `(signature, selector)` for every call, in declaration order.
    pub fn abi() -> impl Iterator<Item = (&'static str, Selector)> {
        Self::SIGNATURES
            .into_iter()
            .map(|signature| (signature, Selector::of(signature)))
    }

    pub fn signature(&self) -> &'static str {
        match self {
            Self::CreateGeon { .. } => sig::CREATE_GEON,
            Self::CreateGeons { .. } => sig::CREATE_GEONS,
            Self::GetGeon { .. } => sig::GET_GEON,
            Self::GeonCount => sig::GEON_COUNT,
            Self::DeleteGeon { .. } => sig::DELETE_GEON,
            Self::IncreaseGeonBalance { .. } => sig::INCREASE_GEON_BALANCE,
            Self::SetGeominingReward { .. } => sig::SET_GEOMINING_REWARD,
            Self::GetGeominingReward { .. } => sig::GET_GEOMINING_REWARD,
            Self::Geomine { .. } => sig::GEOMINE,
            Self::UpdateRewardToken { .. } => sig::UPDATE_REWARD_TOKEN,
            Self::UpdateStorage { .. } => sig::UPDATE_STORAGE,
            Self::Owner => sig::OWNER,
            Self::RewardToken => sig::REWARD_TOKEN,
            Self::Storage => sig::STORAGE,
        }
    }

    pub fn selector(&self) -> Selector {
        Selector::of(self.signature())
    }

    /// Whether the call leaves every component unchanged.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::GetGeon { .. }
                | Self::GeonCount
                | Self::GetGeominingReward { .. }
                | Self::Owner
                | Self::RewardToken
                | Self::Storage
        )
    }

    /// Encode as selector followed by bincode arguments.
    pub fn encode(&self) -> RegistryResult<Vec<u8>> {
        let args = match self {
            Self::CreateGeon { id } | Self::GetGeon { id } | Self::DeleteGeon { id } => encode_args(id)?,
            Self::CreateGeons { ids } => encode_args(ids)?,
            Self::IncreaseGeonBalance { id, amount } => encode_args(&(id, amount))?,
            Self::SetGeominingReward {
                geon_id,
                geominer,
                request_id,
                amount,
            } => encode_args(&(geon_id, geominer, request_id, amount))?,
            Self::GetGeominingReward {
                geon_id,
                geominer,
                request_id,
            } => encode_args(&(geon_id, geominer, request_id))?,
            Self::Geomine { geon_id, request_id } => encode_args(&(geon_id, request_id))?,
            Self::UpdateRewardToken { address } | Self::UpdateStorage { address } => encode_args(address)?,
            Self::GeonCount | Self::Owner | Self::RewardToken | Self::Storage => Vec::new(),
        };
        let mut input = Vec::with_capacity(SELECTOR_LEN + args.len());
        input.extend_from_slice(self.selector().as_bytes());
        input.extend_from_slice(&args);
        Ok(input)
    }

    /// Decode selector-prefixed input.
    ///
    /// Input too short to hold a selector, or whose selector names no call,
    /// is an [`RegistryError::UnknownCall`]; undecodable arguments are a
    /// [`RegistryError::Codec`].
    pub fn decode(input: &[u8]) -> RegistryResult<Self> {
        if input.len() < SELECTOR_LEN {
            return Err(RegistryError::UnknownCall {
                selector: hex::encode(input),
            });
        }
        let (head, args) = input.split_at(SELECTOR_LEN);
        let mut bytes = [0u8; SELECTOR_LEN];
        bytes.copy_from_slice(head);
        let selector = Selector(bytes);

        let signature = Self::SIGNATURES
            .into_iter()
            .find(|signature| Selector::of(signature) == selector)
            .ok_or_else(|| RegistryError::UnknownCall {
                selector: hex::encode(head),
            })?;

        let call = match signature {
            sig::CREATE_GEON => Self::CreateGeon {
                id: decode_args(args)?,
            },
            sig::CREATE_GEONS => Self::CreateGeons {
                ids: decode_args(args)?,
            },
            sig::GET_GEON => Self::GetGeon {
                id: decode_args(args)?,
            },
            sig::GEON_COUNT => Self::GeonCount,
            sig::DELETE_GEON => Self::DeleteGeon {
                id: decode_args(args)?,
            },
            sig::INCREASE_GEON_BALANCE => {
                let (id, amount) = decode_args(args)?;
                Self::IncreaseGeonBalance { id, amount }
            }
            sig::SET_GEOMINING_REWARD => {
                let (geon_id, geominer, request_id, amount) = decode_args(args)?;
                Self::SetGeominingReward {
                    geon_id,
                    geominer,
                    request_id,
                    amount,
                }
            }
            sig::GET_GEOMINING_REWARD => {
                let (geon_id, geominer, request_id) = decode_args(args)?;
                Self::GetGeominingReward {
                    geon_id,
                    geominer,
                    request_id,
                }
            }
            sig::GEOMINE => {
                let (geon_id, request_id) = decode_args(args)?;
                Self::Geomine { geon_id, request_id }
            }
            sig::UPDATE_REWARD_TOKEN => Self::UpdateRewardToken {
                address: decode_args(args)?,
            },
            sig::UPDATE_STORAGE => Self::UpdateStorage {
                address: decode_args(args)?,
            },
            sig::OWNER => Self::Owner,
            sig::REWARD_TOKEN => Self::RewardToken,
            sig::STORAGE => Self::Storage,
            _ => {
                return Err(RegistryError::UnknownCall {
                    selector: hex::encode(head),
                })
            }
        };
        Ok(call)
    }
}

fn encode_args<T: Serialize + ?Sized>(args: &T) -> RegistryResult<Vec<u8>> {
    bincode::serialize(args).map_err(|e| RegistryError::Codec(e.to_string()))
}

fn decode_args<T: DeserializeOwned>(args: &[u8]) -> RegistryResult<T> {
    bincode::deserialize(args).map_err(|e| RegistryError::Codec(e.to_string()))
}

/// Result of a dispatched registry call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallOutput {
    Unit,
    Geon(Geon),
    Count(u64),
    Amount(Amount),
    Address(Address),
}

impl fmt::Display for CallOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("ok"),
            Self::Geon(geon) => write!(
                f,
                "geon {} creator={} balance={}",
                geon.id, geon.creator, geon.reward_token_owned
            ),
            Self::Count(count) => write!(f, "{count}"),
            Self::Amount(amount) => write!(f, "{amount}"),
            Self::Address(address) => write!(f, "{address}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geon_types::ErrorKind;
    use std::collections::HashSet;

    fn sample_calls() -> Vec<RegistryCall> {
        let geon_id = GeonId::from(0xabcdu128);
        let geominer = Address::derive("miner");
        let request_id = RequestId::from(7u128);
        vec![
            RegistryCall::CreateGeon { id: geon_id },
            RegistryCall::CreateGeons {
                ids: vec![geon_id, GeonId::from(1u128)],
            },
            RegistryCall::GetGeon { id: geon_id },
            RegistryCall::GeonCount,
            RegistryCall::DeleteGeon { id: geon_id },
            RegistryCall::IncreaseGeonBalance {
                id: geon_id,
                amount: Amount::tokens(3),
            },
            RegistryCall::SetGeominingReward {
                geon_id,
                geominer,
                request_id,
                amount: Amount::MAX,
            },
            RegistryCall::GetGeominingReward {
                geon_id,
                geominer,
                request_id,
            },
            RegistryCall::Geomine { geon_id, request_id },
            RegistryCall::UpdateRewardToken {
                address: Address::derive("coin"),
            },
            RegistryCall::UpdateStorage {
                address: Address::derive("store"),
            },
            RegistryCall::Owner,
            RegistryCall::RewardToken,
            RegistryCall::Storage,
        ]
    }

    #[test]
    fn every_call_decodes_to_itself() {
        let calls = sample_calls();
        assert_eq!(calls.len(), RegistryCall::SIGNATURES.len());
        for call in calls {
            let input = call.encode().unwrap();
            assert_eq!(&input[..SELECTOR_LEN], call.selector().as_bytes());
            assert_eq!(RegistryCall::decode(&input).unwrap(), call);
        }
    }

    #[test]
    fn selectors_are_distinct() {
        let selectors: HashSet<Selector> = RegistryCall::abi().map(|(_, s)| s).collect();
        assert_eq!(selectors.len(), RegistryCall::SIGNATURES.len());
    }

    #[test]
    fn selector_is_domain_separated() {
        let plain = blake3::hash(sig::OWNER.as_bytes());
        assert_ne!(Selector::of(sig::OWNER).as_bytes()[..], plain.as_bytes()[..SELECTOR_LEN]);
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let err = RegistryCall::decode(&[0xde, 0xad, 0xbe, 0xef, 1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCall);
        assert_eq!(err.to_string(), "unknown call selector 0xdeadbeef");
    }

    #[test]
    fn short_input_is_an_unknown_call() {
        assert_eq!(
            RegistryCall::decode(&[]).unwrap_err().kind(),
            ErrorKind::UnknownCall
        );
        assert_eq!(
            RegistryCall::decode(&[1, 2]).unwrap_err().kind(),
            ErrorKind::UnknownCall
        );
    }

    #[test]
    fn truncated_arguments_are_a_codec_error() {
        let mut input = RegistryCall::CreateGeon {
            id: GeonId::from(1u128),
        }
        .encode()
        .unwrap();
        input.truncate(SELECTOR_LEN + 3);
        let err = RegistryCall::decode(&input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
    }

    #[test]
    fn reads_are_flagged() {
        assert!(RegistryCall::GeonCount.is_read_only());
        assert!(!RegistryCall::CreateGeon {
            id: GeonId::from(1u128)
        }
        .is_read_only());
    }

    #[test]
    fn output_serializes_with_kind_tag() {
        let json = serde_json::to_value(CallOutput::Count(3)).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "count", "value": 3 }));
        let json = serde_json::to_value(CallOutput::Unit).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "unit" }));
    }
}
