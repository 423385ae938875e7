use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use geon_registry::{CallOutput, Geon, RegistryCall, RegistryError};
use geon_store::LedgerStore;
use geon_types::{Address, Amount, GeonId, RequestId};
use tracing::{debug, info, warn};

use crate::audit::CustodyAudit;
use crate::config::DeploymentConfig;
use crate::error::{InvocationError, InvocationResult};
use crate::world::World;

/// Serialized, all-or-nothing execution of invocations against one world.
///
/// Every mutating invocation holds the write lock for its whole duration and
/// runs against a staged clone of the world. The clone replaces the
/// committed world only when the invocation returns `Ok`; on `Err` it is
/// dropped, so no component keeps a partial change.
///
/// The committed world is only ever replaced wholesale, so a lock poisoned
/// by a panicking invocation still guards a consistent world and is
/// recovered rather than reported.
#[derive(Debug)]
pub struct Runtime {
    world: RwLock<World>,
    config: DeploymentConfig,
}

impl Runtime {
    /// Construct the components without wiring them together.
    pub fn undeployed(config: DeploymentConfig) -> Self {
        Self {
            world: RwLock::new(World::new(&config)),
            config,
        }
    }

    /// Construct the components and wire them as the configured owner.
    pub fn deploy(config: DeploymentConfig) -> InvocationResult<Self> {
        let runtime = Self::undeployed(config);
        let owner = runtime.config.owner;
        runtime.transact("deploy", |world| world.wire(owner))?;
        info!(
            owner = %runtime.config.owner,
            coin = %runtime.config.coin,
            registry = %runtime.config.registry,
            store = %runtime.config.store,
            "geon ledger deployed"
        );
        Ok(runtime)
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// A copy of the committed world.
    pub fn snapshot(&self) -> World {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, World> {
        self.world.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn transact<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut World) -> InvocationResult<T>,
    ) -> InvocationResult<T> {
        let mut committed = self.world.write().unwrap_or_else(PoisonError::into_inner);
        let mut staged = committed.clone();
        match f(&mut staged) {
            Ok(value) => {
                *committed = staged;
                debug!(operation, "invocation committed");
                Ok(value)
            }
            Err(err) => {
                warn!(operation, kind = %err.kind(), error = %err, "invocation reverted");
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    pub fn create_geon(&self, caller: Address, id: GeonId) -> InvocationResult<()> {
        self.transact("create_geon", |w| Ok(w.registry.create_geon(&mut w.store, caller, id)?))
    }

    pub fn create_geons(&self, caller: Address, ids: &[GeonId]) -> InvocationResult<()> {
        self.transact("create_geons", |w| Ok(w.registry.create_geons(&mut w.store, caller, ids)?))
    }

    pub fn get_geon(&self, id: &GeonId) -> InvocationResult<Geon> {
        let world = self.read();
        Ok(world.registry.get_geon(&world.store, id)?)
    }

    pub fn geon_count(&self) -> InvocationResult<u64> {
        let world = self.read();
        Ok(world.registry.geon_count(&world.store)?)
    }

    /// Every live Geon, in id order.
    pub fn geons(&self) -> InvocationResult<Vec<Geon>> {
        let world = self.read();
        Ok(world.registry.geons(&world.store)?)
    }

    /// Returns the amount paid to the creator.
    pub fn delete_geon(&self, caller: Address, id: GeonId) -> InvocationResult<Amount> {
        self.transact("delete_geon", |w| {
            Ok(w.registry.delete_geon(&mut w.store, &mut w.coin, caller, id)?)
        })
    }

    pub fn increase_geon_balance(&self, caller: Address, id: GeonId, amount: Amount) -> InvocationResult<()> {
        self.transact("increase_geon_balance", |w| {
            Ok(w.registry.increase_geon_balance(&mut w.store, caller, id, amount)?)
        })
    }

    pub fn set_geomining_reward(
        &self,
        caller: Address,
        geon_id: GeonId,
        geominer: Address,
        request_id: RequestId,
        amount: Amount,
    ) -> InvocationResult<()> {
        self.transact("set_geomining_reward", |w| {
            Ok(w.registry
                .set_geomining_reward(&mut w.store, caller, geon_id, geominer, request_id, amount)?)
        })
    }

    pub fn get_geomining_reward(
        &self,
        geon_id: &GeonId,
        geominer: &Address,
        request_id: &RequestId,
    ) -> InvocationResult<Amount> {
        let world = self.read();
        Ok(world
            .registry
            .get_geomining_reward(&world.store, geon_id, geominer, request_id)?)
    }

    /// Returns the amount paid to `caller`.
    pub fn geomine(&self, caller: Address, geon_id: GeonId, request_id: RequestId) -> InvocationResult<Amount> {
        self.transact("geomine", |w| {
            Ok(w.registry
                .geomine(&mut w.store, &mut w.coin, caller, geon_id, request_id)?)
        })
    }

    pub fn update_reward_token(&self, caller: Address, token: Address) -> InvocationResult<()> {
        self.transact("update_reward_token", |w| Ok(w.registry.update_reward_token(caller, token)?))
    }

    pub fn update_storage(&self, caller: Address, storage: Address) -> InvocationResult<()> {
        self.transact("update_storage", |w| Ok(w.registry.update_storage(caller, storage)?))
    }

    pub fn registry_owner(&self) -> Address {
        self.read().registry.owner()
    }

    pub fn reward_token(&self) -> Address {
        self.read().registry.reward_token()
    }

    pub fn storage(&self) -> Address {
        self.read().registry.storage()
    }

    // -----------------------------------------------------------------------
    // Coin
    // -----------------------------------------------------------------------

    pub fn mint(&self, caller: Address, to: Address, amount: Amount) -> InvocationResult<()> {
        self.transact("mint", |w| Ok(w.coin.mint(caller, to, amount)?))
    }

    pub fn transfer(&self, caller: Address, to: Address, amount: Amount) -> InvocationResult<()> {
        self.transact("transfer", |w| Ok(w.coin.transfer(caller, to, amount)?))
    }

    pub fn transfer_to_geon(&self, caller: Address, geon_id: GeonId, amount: Amount) -> InvocationResult<()> {
        self.transact("transfer_to_geon", |w| w.top_up(caller, geon_id, amount))
    }

    pub fn transfer_to_geons(
        &self,
        caller: Address,
        geon_ids: &[GeonId],
        amounts: &[Amount],
    ) -> InvocationResult<()> {
        self.transact("transfer_to_geons", |w| w.top_up_many(caller, geon_ids, amounts))
    }

    pub fn update_geon_topup_address(&self, caller: Address, registry: Address) -> InvocationResult<()> {
        self.transact("update_geon_topup_address", |w| {
            Ok(w.coin.update_geon_topup_address(caller, registry)?)
        })
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.read().coin.balance_of(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.read().coin.total_supply()
    }

    // -----------------------------------------------------------------------
    // Store
    // -----------------------------------------------------------------------

    pub fn add_whitelisted(&self, caller: Address, account: Address) -> InvocationResult<()> {
        self.transact("add_whitelisted", |w| Ok(w.store.add_whitelisted(caller, account)?))
    }

    pub fn remove_whitelisted(&self, caller: Address, account: Address) -> InvocationResult<()> {
        self.transact("remove_whitelisted", |w| Ok(w.store.remove_whitelisted(caller, account)?))
    }

    pub fn is_whitelisted(&self, account: &Address) -> bool {
        self.read().store.is_whitelisted(account)
    }

    // -----------------------------------------------------------------------
    // Raw invocation
    // -----------------------------------------------------------------------

    /// A plain value transfer to the registry. Always rejected.
    pub fn send_value(&self, caller: Address, value: Amount) -> InvocationResult<()> {
        let err = InvocationError::from(RegistryError::ValueNotAccepted { value });
        warn!(caller = %caller.short_hex(), %value, error = %err, "value transfer rejected");
        Err(err)
    }

    /// Decode selector-prefixed `input` and run it as `caller`, with `value`
    /// attached.
    ///
    /// Empty input carrying value is a plain value transfer. Otherwise the
    /// input is decoded first, so an unknown selector is reported as such
    /// whether or not value is attached; a known call with value attached is
    /// rejected because no registry call accepts value. Read-only calls are
    /// answered under the read lock without staging a copy of the world.
    pub fn call_registry(&self, caller: Address, value: Amount, input: &[u8]) -> InvocationResult<CallOutput> {
        if input.is_empty() && !value.is_zero() {
            return self.send_value(caller, value).map(|()| CallOutput::Unit);
        }
        let call = RegistryCall::decode(input).map_err(|err| {
            warn!(caller = %caller.short_hex(), error = %err, "call rejected");
            InvocationError::from(err)
        })?;
        if !value.is_zero() {
            let err = InvocationError::from(RegistryError::ValueNotAccepted { value });
            warn!(caller = %caller.short_hex(), call = call.signature(), error = %err, "call rejected");
            return Err(err);
        }
        let answered = self.read().query(&call);
        if let Some(output) = answered {
            debug!(caller = %caller.short_hex(), call = call.signature(), ok = output.is_ok(), "query answered");
            return output;
        }
        self.transact(call.signature(), |w| w.dispatch(caller, call))
    }

    // -----------------------------------------------------------------------
    // Audit
    // -----------------------------------------------------------------------

    pub fn audit(&self) -> InvocationResult<CustodyAudit> {
        self.read().audit()
    }
}
