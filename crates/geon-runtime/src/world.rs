use geon_coin::GeonCoin;
use geon_registry::{CallOutput, GeonRegistry, RegistryCall, RegistryError};
use geon_store::{InMemoryLedgerStore, LedgerStore};
use geon_types::{Address, Amount, GeonId};

use crate::audit::CustodyAudit;
use crate::config::DeploymentConfig;
use crate::error::{InvocationError, InvocationResult};

/// One instance of each component.
///
/// `World` is plain data: it is cloned to stage an invocation and the clone
/// replaces the committed world only if the invocation succeeds.
#[derive(Debug, Clone)]
pub struct World {
    pub coin: GeonCoin,
    pub registry: GeonRegistry,
    pub store: InMemoryLedgerStore,
}

impl World {
    /// Construct the components at their configured addresses, unwired.
    pub fn new(config: &DeploymentConfig) -> Self {
        Self {
            coin: GeonCoin::new(config.coin, config.owner),
            registry: GeonRegistry::new(config.registry, config.owner),
            store: InMemoryLedgerStore::new(config.store, config.owner),
        }
    }

    /// Point the components at each other, acting as `owner`.
    pub fn wire(&mut self, owner: Address) -> InvocationResult<()> {
        self.coin
            .update_geon_topup_address(owner, self.registry.address())?;
        self.registry.update_reward_token(owner, self.coin.address())?;
        self.registry.update_storage(owner, self.store.address())?;
        self.store.add_whitelisted(owner, self.registry.address())?;
        Ok(())
    }

    /// Directed top-up of one Geon through the coin.
    pub fn top_up(&mut self, caller: Address, geon_id: GeonId, amount: Amount) -> InvocationResult<()> {
        let mut target = self.registry.topup(&mut self.store);
        self.coin
            .transfer_to_geon(caller, geon_id, amount, &mut target)?;
        Ok(())
    }

    /// Directed top-up of several Geons through the coin.
    pub fn top_up_many(
        &mut self,
        caller: Address,
        geon_ids: &[GeonId],
        amounts: &[Amount],
    ) -> InvocationResult<()> {
        let mut target = self.registry.topup(&mut self.store);
        self.coin
            .transfer_to_geons(caller, geon_ids, amounts, &mut target)?;
        Ok(())
    }

    /// Answer a read-only registry call. `None` if the call mutates.
    pub fn query(&self, call: &RegistryCall) -> Option<InvocationResult<CallOutput>> {
        if !call.is_read_only() {
            return None;
        }
        let registry = &self.registry;
        let store = &self.store;
        let output = match call {
            RegistryCall::GetGeon { id } => registry.get_geon(store, id).map(CallOutput::Geon),
            RegistryCall::GeonCount => registry.geon_count(store).map(CallOutput::Count),
            RegistryCall::GetGeominingReward {
                geon_id,
                geominer,
                request_id,
            } => registry
                .get_geomining_reward(store, geon_id, geominer, request_id)
                .map(CallOutput::Amount),
            RegistryCall::Owner => Ok(CallOutput::Address(registry.owner())),
            RegistryCall::RewardToken => Ok(CallOutput::Address(registry.reward_token())),
            RegistryCall::Storage => Ok(CallOutput::Address(registry.storage())),
            _ => return None,
        };
        Some(output.map_err(InvocationError::from))
    }

    /// Execute a decoded registry call on behalf of `caller`.
    pub fn dispatch(&mut self, caller: Address, call: RegistryCall) -> InvocationResult<CallOutput> {
        if let Some(output) = self.query(&call) {
            return output;
        }
        let registry = &mut self.registry;
        let store = &mut self.store;
        let output = match call {
            RegistryCall::CreateGeon { id } => {
                registry.create_geon(store, caller, id)?;
                CallOutput::Unit
            }
            RegistryCall::CreateGeons { ids } => {
                registry.create_geons(store, caller, &ids)?;
                CallOutput::Unit
            }
            RegistryCall::DeleteGeon { id } => {
                CallOutput::Amount(registry.delete_geon(store, &mut self.coin, caller, id)?)
            }
            RegistryCall::IncreaseGeonBalance { id, amount } => {
                registry.increase_geon_balance(store, caller, id, amount)?;
                CallOutput::Unit
            }
            RegistryCall::SetGeominingReward {
                geon_id,
                geominer,
                request_id,
                amount,
            } => {
                registry.set_geomining_reward(store, caller, geon_id, geominer, request_id, amount)?;
                CallOutput::Unit
            }
            RegistryCall::Geomine { geon_id, request_id } => {
                CallOutput::Amount(registry.geomine(store, &mut self.coin, caller, geon_id, request_id)?)
            }
            RegistryCall::UpdateRewardToken { address } => {
                registry.update_reward_token(caller, address)?;
                CallOutput::Unit
            }
            RegistryCall::UpdateStorage { address } => {
                registry.update_storage(caller, address)?;
                CallOutput::Unit
            }
            // Answered by `query` above.
            read_only => {
                return Err(RegistryError::UnknownCall {
                    selector: hex::encode(read_only.selector().as_bytes()),
                }
                .into())
            }
        };
        Ok(output)
    }

    /// Compare the registry's custody balance with its Geon records.
    pub fn audit(&self) -> InvocationResult<CustodyAudit> {
        let geons = self.registry.geons(&self.store)?;
        Ok(CustodyAudit {
            custody_balance: self.coin.balance_of(&self.registry.address()),
            geon_total: Amount::checked_sum(geons.iter().map(|g| &g.reward_token_owned)),
            geon_count: self.registry.geon_count(&self.store)?,
            enumerated: geons.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geon_types::ErrorKind;

    fn wired() -> (World, DeploymentConfig) {
        let config = DeploymentConfig::default();
        let mut world = World::new(&config);
        world.wire(config.owner).unwrap();
        (world, config)
    }

    #[test]
    fn wiring_connects_every_component() {
        let (world, _) = wired();
        assert_eq!(world.coin.geon_topup_address(), world.registry.address());
        assert_eq!(world.registry.reward_token(), world.coin.address());
        assert_eq!(world.registry.storage(), world.store.address());
        assert!(world.store.is_whitelisted(&world.registry.address()));
    }

    #[test]
    fn wiring_requires_the_owner() {
        let config = DeploymentConfig::default();
        let mut world = World::new(&config);
        let err = world.wire(Address::derive("mallory")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn dispatch_routes_reads_and_writes() {
        let (mut world, config) = wired();
        let alice = Address::derive("alice");
        let id = GeonId::from(5u128);

        let out = world
            .dispatch(alice, RegistryCall::CreateGeon { id })
            .unwrap();
        assert_eq!(out, CallOutput::Unit);
        assert_eq!(
            world.dispatch(alice, RegistryCall::GeonCount).unwrap(),
            CallOutput::Count(1)
        );
        assert_eq!(
            world.dispatch(alice, RegistryCall::Owner).unwrap(),
            CallOutput::Address(config.owner)
        );
        match world.dispatch(alice, RegistryCall::GetGeon { id }).unwrap() {
            CallOutput::Geon(geon) => assert_eq!(geon.creator, alice),
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn query_answers_only_read_only_calls() {
        let (world, config) = wired();
        let id = GeonId::from(5u128);

        assert!(world
            .query(&RegistryCall::CreateGeon { id })
            .is_none());
        assert!(world.query(&RegistryCall::DeleteGeon { id }).is_none());

        let count = world.query(&RegistryCall::GeonCount).unwrap().unwrap();
        assert_eq!(count, CallOutput::Count(0));
        let storage = world.query(&RegistryCall::Storage).unwrap().unwrap();
        assert_eq!(storage, CallOutput::Address(config.store));
        let err = world
            .query(&RegistryCall::GetGeon { id })
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn audit_of_fresh_world_is_balanced() {
        let (world, _) = wired();
        let audit = world.audit().unwrap();
        assert!(audit.is_balanced());
        assert_eq!(audit.geon_count, 0);
    }
}
