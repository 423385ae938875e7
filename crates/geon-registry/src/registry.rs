use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use geon_coin::{GeonCoin, GeonTopup};
use geon_store::{LedgerStore, StoreError};
use geon_types::{Address, Amount, GeonId, RequestId};
use tracing::{debug, info};

use crate::error::{Collaborator, RegistryError, RegistryResult};
use crate::geon::{keys, Geon};

/// The Geon registry.
///
/// Holds only configuration. Geon records, grants, and the live count are
/// persisted in the [`LedgerStore`] passed to each operation, and payouts go
/// through the [`GeonCoin`] passed in. Both collaborators are checked against
/// the configured addresses before use.
///
/// Every mutating operation validates before it writes, so an `Err` leaves
/// the store and the coin as they were.
#[derive(Debug, Clone)]
pub struct GeonRegistry {
    address: Address,
    owner: Address,
    reward_token: Address,
    storage: Address,
}

impl GeonRegistry {
    /// Create a registry at `address`. Reward token and storage start unset.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            reward_token: Address::NULL,
            storage: Address::NULL,
        }
    }

    /// The registry's own identity: its custody account in the coin and its
    /// writer identity in the store.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    pub fn storage(&self) -> Address {
        self.storage
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Set the coin trusted to report top-ups. Owner only.
    pub fn update_reward_token(&mut self, caller: Address, token: Address) -> RegistryResult<()> {
        self.require_owner(caller)?;
        info!(previous = %self.reward_token, token = %token, "reward token updated");
        self.reward_token = token;
        Ok(())
    }

    /// Set the store records are persisted in. Owner only.
    pub fn update_storage(&mut self, caller: Address, storage: Address) -> RegistryResult<()> {
        self.require_owner(caller)?;
        info!(previous = %self.storage, storage = %storage, "storage updated");
        self.storage = storage;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get_geon<S: LedgerStore>(&self, store: &S, id: &GeonId) -> RegistryResult<Geon> {
        self.readable(store)?;
        self.load_geon(store, id)?
            .ok_or(RegistryError::NotFound { id: *id })
    }

    /// Geons created minus Geons deleted.
    pub fn geon_count<S: LedgerStore>(&self, store: &S) -> RegistryResult<u64> {
        self.readable(store)?;
        self.load_count(store)
    }

    /// Every live Geon, in id order.
    pub fn geons<S: LedgerStore>(&self, store: &S) -> RegistryResult<Vec<Geon>> {
        self.readable(store)?;
        Ok(store.scan_records(keys::GEON_PREFIX)?)
    }

    /// The grant for `(geon_id, geominer, request_id)`; zero when unset.
    /// Does not require the Geon to exist.
    pub fn get_geomining_reward<S: LedgerStore>(
        &self,
        store: &S,
        geon_id: &GeonId,
        geominer: &Address,
        request_id: &RequestId,
    ) -> RegistryResult<Amount> {
        self.readable(store)?;
        Ok(self
            .load_grant(store, geon_id, geominer, request_id)?
            .unwrap_or(Amount::ZERO))
    }

    // -----------------------------------------------------------------------
    // Geon lifecycle
    // -----------------------------------------------------------------------

    /// Register `id` with `caller` as creator.
    pub fn create_geon<S: LedgerStore>(
        &self,
        store: &mut S,
        caller: Address,
        id: GeonId,
    ) -> RegistryResult<()> {
        self.create_geons(store, caller, &[id])
    }

    /// Register every id in `ids` with `caller` as creator.
    ///
    /// A duplicate, against an existing Geon or within `ids` itself,
    /// rejects the whole batch before anything is written.
    pub fn create_geons<S: LedgerStore>(
        &self,
        store: &mut S,
        caller: Address,
        ids: &[GeonId],
    ) -> RegistryResult<()> {
        self.writable(store)?;

        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(*id) || store.get(&keys::geon(id)).is_some() {
                return Err(RegistryError::DuplicateId { id: *id });
            }
        }
        let count = self
            .load_count(store)?
            .checked_add(ids.len() as u64)
            .ok_or(RegistryError::CountOverflow)?;

        for id in ids {
            self.save_geon(store, &Geon::new(*id, caller))?;
            debug!(geon = %id.short_hex(), creator = %caller.short_hex(), "geon created");
        }
        self.save_count(store, count)
    }

    /// Delete `id`, paying its whole balance to the creator. Creator only.
    /// Unclaimed grants on `id` are dropped with it, so a later Geon reusing
    /// the id starts without grants. Returns the amount paid.
    pub fn delete_geon<S: LedgerStore>(
        &self,
        store: &mut S,
        coin: &mut GeonCoin,
        caller: Address,
        id: GeonId,
    ) -> RegistryResult<Amount> {
        self.writable(store)?;
        self.paying(coin)?;

        let geon = self
            .load_geon(store, &id)?
            .ok_or(RegistryError::NotFound { id })?;
        if geon.creator != caller {
            return Err(RegistryError::NotCreator { id, caller });
        }
        let count = self.load_count(store)?.saturating_sub(1);

        let payout = geon.reward_token_owned;
        coin.transfer(self.address, caller, payout)?;
        store.delete(self.address, &keys::geon(&id))?;
        let grants = store.scan_prefix(&keys::grants_of(&id));
        for (key, _) in &grants {
            store.delete(self.address, key)?;
        }
        self.save_count(store, count)?;

        debug!(
            geon = %id.short_hex(),
            creator = %caller.short_hex(),
            %payout,
            dropped_grants = grants.len(),
            "geon deleted"
        );
        Ok(payout)
    }

    // -----------------------------------------------------------------------
    // Balances
    // -----------------------------------------------------------------------

    /// Credit `amount` to `id`. Only the configured reward token may call.
    pub fn increase_geon_balance<S: LedgerStore>(
        &self,
        store: &mut S,
        caller: Address,
        id: GeonId,
        amount: Amount,
    ) -> RegistryResult<()> {
        self.increase_geon_balances(store, caller, &[(id, amount)])
    }

    /// Apply several credits. Either every credit applies or none.
    pub fn increase_geon_balances<S: LedgerStore>(
        &self,
        store: &mut S,
        caller: Address,
        credits: &[(GeonId, Amount)],
    ) -> RegistryResult<()> {
        if self.reward_token.is_null() || caller != self.reward_token {
            return Err(RegistryError::NotRewardToken { caller });
        }
        self.writable(store)?;

        let mut staged: BTreeMap<GeonId, Geon> = BTreeMap::new();
        for (id, amount) in credits {
            let geon = match staged.entry(*id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let geon = self
                        .load_geon(store, id)?
                        .ok_or(RegistryError::NotFound { id: *id })?;
                    entry.insert(geon)
                }
            };
            geon.reward_token_owned = geon
                .reward_token_owned
                .checked_add(*amount)
                .ok_or(RegistryError::BalanceOverflow { id: *id })?;
        }

        for geon in staged.values() {
            self.save_geon(store, geon)?;
            debug!(geon = %geon.id.short_hex(), balance = %geon.reward_token_owned, "geon balance increased");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Geomining
    // -----------------------------------------------------------------------

    /// Grant `amount` to `geominer` for `request_id` on `geon_id`,
    /// replacing any previous grant. Owner only.
    pub fn set_geomining_reward<S: LedgerStore>(
        &self,
        store: &mut S,
        caller: Address,
        geon_id: GeonId,
        geominer: Address,
        request_id: RequestId,
        amount: Amount,
    ) -> RegistryResult<()> {
        self.require_owner(caller)?;
        self.writable(store)?;
        if self.load_geon(store, &geon_id)?.is_none() {
            return Err(RegistryError::NotFound { id: geon_id });
        }

        let key = keys::grant(&geon_id, &geominer, &request_id);
        if amount.is_zero() {
            store.delete(self.address, &key)?;
        } else {
            store.put_record(self.address, &key, &amount)?;
        }
        debug!(
            geon = %geon_id.short_hex(),
            geominer = %geominer.short_hex(),
            request = %request_id.short_hex(),
            %amount,
            "geomining reward set"
        );
        Ok(())
    }

    /// Claim the grant for `(geon_id, caller, request_id)`.
    ///
    /// Pays the grant from the Geon's balance and clears it, so a second
    /// claim pays nothing. An unset grant is a successful claim of zero,
    /// whether or not the Geon exists. Returns the amount paid.
    pub fn geomine<S: LedgerStore>(
        &self,
        store: &mut S,
        coin: &mut GeonCoin,
        caller: Address,
        geon_id: GeonId,
        request_id: RequestId,
    ) -> RegistryResult<Amount> {
        self.readable(store)?;
        let grant = match self.load_grant(store, &geon_id, &caller, &request_id)? {
            Some(grant) if !grant.is_zero() => grant,
            _ => return Ok(Amount::ZERO),
        };
        self.writable(store)?;
        self.paying(coin)?;

        let mut geon = self.load_geon(store, &geon_id)?;
        let available = geon
            .as_ref()
            .map(|g| g.reward_token_owned)
            .unwrap_or(Amount::ZERO);
        let remaining = available
            .checked_sub(grant)
            .ok_or(RegistryError::InsufficientBalance {
                id: geon_id,
                available,
                required: grant,
            })?;

        coin.transfer(self.address, caller, grant)?;
        if let Some(geon) = geon.as_mut() {
            geon.reward_token_owned = remaining;
            self.save_geon(store, geon)?;
        }
        store.delete(self.address, &keys::grant(&geon_id, &caller, &request_id))?;

        debug!(
            geon = %geon_id.short_hex(),
            geominer = %caller.short_hex(),
            request = %request_id.short_hex(),
            paid = %grant,
            "geomined"
        );
        Ok(grant)
    }

    /// Adapter the coin notifies during a directed top-up.
    pub fn topup<'a, S: LedgerStore>(&'a self, store: &'a mut S) -> RegistryTopup<'a, S> {
        RegistryTopup {
            registry: self,
            store,
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_owner(&self, caller: Address) -> RegistryResult<()> {
        if caller != self.owner {
            return Err(RegistryError::NotOwner { caller });
        }
        Ok(())
    }

    fn readable<S: LedgerStore>(&self, store: &S) -> RegistryResult<()> {
        let actual = store.address();
        if self.storage.is_null() || actual != self.storage {
            return Err(RegistryError::Misconfigured {
                role: Collaborator::Storage,
                configured: self.storage,
                actual,
            });
        }
        Ok(())
    }

    /// Store writes only fail on the whitelist, so checking it up front
    /// means later writes in the same operation cannot fail halfway.
    fn writable<S: LedgerStore>(&self, store: &S) -> RegistryResult<()> {
        self.readable(store)?;
        if !store.is_whitelisted(&self.address) {
            return Err(StoreError::NotWhitelisted {
                writer: self.address,
            }
            .into());
        }
        Ok(())
    }

    fn paying(&self, coin: &GeonCoin) -> RegistryResult<()> {
        let actual = coin.address();
        if self.reward_token.is_null() || actual != self.reward_token {
            return Err(RegistryError::Misconfigured {
                role: Collaborator::RewardToken,
                configured: self.reward_token,
                actual,
            });
        }
        Ok(())
    }

    fn load_geon<S: LedgerStore>(&self, store: &S, id: &GeonId) -> RegistryResult<Option<Geon>> {
        Ok(store.get_record(&keys::geon(id))?)
    }

    fn save_geon<S: LedgerStore>(&self, store: &mut S, geon: &Geon) -> RegistryResult<()> {
        Ok(store.put_record(self.address, &keys::geon(&geon.id), geon)?)
    }

    fn load_grant<S: LedgerStore>(
        &self,
        store: &S,
        geon_id: &GeonId,
        geominer: &Address,
        request_id: &RequestId,
    ) -> RegistryResult<Option<Amount>> {
        Ok(store.get_record(&keys::grant(geon_id, geominer, request_id))?)
    }

    fn load_count<S: LedgerStore>(&self, store: &S) -> RegistryResult<u64> {
        Ok(store.get_record::<u64>(keys::GEON_COUNT)?.unwrap_or(0))
    }

    fn save_count<S: LedgerStore>(&self, store: &mut S, count: u64) -> RegistryResult<()> {
        Ok(store.put_record(self.address, keys::GEON_COUNT, &count)?)
    }
}

/// A registry bound to its store, as seen by the coin during a top-up.
pub struct RegistryTopup<'a, S> {
    registry: &'a GeonRegistry,
    store: &'a mut S,
}

impl<S: LedgerStore> GeonTopup for RegistryTopup<'_, S> {
    type Error = RegistryError;

    fn address(&self) -> Address {
        self.registry.address
    }

    fn increase_geon_balance(
        &mut self,
        caller: Address,
        geon_id: GeonId,
        amount: Amount,
    ) -> RegistryResult<()> {
        self.registry
            .increase_geon_balance(self.store, caller, geon_id, amount)
    }

    fn increase_geon_balances(
        &mut self,
        caller: Address,
        credits: &[(GeonId, Amount)],
    ) -> RegistryResult<()> {
        self.registry.increase_geon_balances(self.store, caller, credits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geon_coin::TopupError;
    use geon_store::InMemoryLedgerStore;
    use geon_types::ErrorKind;

    struct Fixture {
        registry: GeonRegistry,
        store: InMemoryLedgerStore,
        coin: GeonCoin,
    }

    fn owner() -> Address {
        Address::derive("owner")
    }

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    fn id(n: u128) -> GeonId {
        GeonId::from(n)
    }

    fn tokens(n: u64) -> Amount {
        Amount::tokens(n)
    }

    /// Wired registry, store, and coin, with 100 tokens minted to alice.
    fn fixture() -> Fixture {
        let mut registry = GeonRegistry::new(Address::derive("registry"), owner());
        let mut store = InMemoryLedgerStore::new(Address::derive("store"), owner());
        let mut coin = GeonCoin::new(Address::derive("coin"), owner());

        coin.update_geon_topup_address(owner(), registry.address()).unwrap();
        registry.update_reward_token(owner(), coin.address()).unwrap();
        registry.update_storage(owner(), store.address()).unwrap();
        store.add_whitelisted(owner(), registry.address()).unwrap();
        coin.mint(owner(), alice(), tokens(100)).unwrap();

        Fixture {
            registry,
            store,
            coin,
        }
    }

    impl Fixture {
        fn top_up(&mut self, from: Address, geon: GeonId, amount: Amount) -> Result<(), TopupError<RegistryError>> {
            let mut target = self.registry.topup(&mut self.store);
            self.coin.transfer_to_geon(from, geon, amount, &mut target)
        }

        fn custody(&self) -> Amount {
            self.coin.balance_of(&self.registry.address())
        }

        fn balance(&self, geon: GeonId) -> Amount {
            self.registry
                .get_geon(&self.store, &geon)
                .unwrap()
                .reward_token_owned
        }
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    #[test]
    fn fresh_registry_has_null_collaborators() {
        let registry = GeonRegistry::new(Address::derive("registry"), owner());
        assert_eq!(registry.owner(), owner());
        assert!(registry.reward_token().is_null());
        assert!(registry.storage().is_null());
    }

    #[test]
    fn only_owner_updates_configuration() {
        let mut registry = GeonRegistry::new(Address::derive("registry"), owner());
        let err = registry
            .update_reward_token(alice(), Address::derive("coin"))
            .unwrap_err();
        assert_eq!(err, RegistryError::NotOwner { caller: alice() });
        let err = registry
            .update_storage(alice(), Address::derive("store"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(registry.reward_token().is_null());
        assert!(registry.storage().is_null());

        registry.update_storage(owner(), Address::derive("store")).unwrap();
        assert_eq!(registry.storage(), Address::derive("store"));
    }

    #[test]
    fn unset_storage_is_misconfigured() {
        let registry = GeonRegistry::new(Address::derive("registry"), owner());
        let mut store = InMemoryLedgerStore::new(Address::derive("store"), owner());
        let err = registry.create_geon(&mut store, alice(), id(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Misconfigured);
        assert!(store.is_empty());
    }

    #[test]
    fn foreign_store_is_rejected() {
        let f = fixture();
        let mut other = InMemoryLedgerStore::new(Address::derive("other"), owner());
        other.add_whitelisted(owner(), f.registry.address()).unwrap();
        let err = f.registry.create_geon(&mut other, alice(), id(1)).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Misconfigured {
                role: Collaborator::Storage,
                ..
            }
        ));
    }

    #[test]
    fn registry_without_write_access_cannot_create() {
        let mut f = fixture();
        f.store.remove_whitelisted(owner(), f.registry.address()).unwrap();
        let err = f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Creation and deletion
    // -----------------------------------------------------------------------

    #[test]
    fn create_and_get() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();

        let geon = f.registry.get_geon(&f.store, &id(1)).unwrap();
        assert_eq!(geon, Geon::new(id(1), alice()));
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 1);
    }

    #[test]
    fn get_missing_geon_is_not_found() {
        let f = fixture();
        let err = f.registry.get_geon(&f.store, &id(1)).unwrap_err();
        assert_eq!(err, RegistryError::NotFound { id: id(1) });
    }

    #[test]
    fn duplicate_create_changes_nothing() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        let err = f.registry.create_geon(&mut f.store, bob(), id(1)).unwrap_err();

        assert_eq!(err, RegistryError::DuplicateId { id: id(1) });
        assert_eq!(f.registry.get_geon(&f.store, &id(1)).unwrap().creator, alice());
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 1);
    }

    #[test]
    fn batch_create_assigns_caller_as_creator() {
        let mut f = fixture();
        f.registry
            .create_geons(&mut f.store, bob(), &[id(1), id(2), id(3)])
            .unwrap();
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 3);
        for n in 1..=3 {
            assert_eq!(f.registry.get_geon(&f.store, &id(n)).unwrap().creator, bob());
        }
    }

    #[test]
    fn batch_with_internal_duplicate_creates_nothing() {
        let mut f = fixture();
        let err = f
            .registry
            .create_geons(&mut f.store, alice(), &[id(0), id(1), id(0)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateId);
        assert!(f.registry.get_geon(&f.store, &id(0)).is_err());
        assert!(f.registry.get_geon(&f.store, &id(1)).is_err());
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 0);
    }

    #[test]
    fn batch_clashing_with_existing_geon_creates_nothing() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(2)).unwrap();
        let err = f
            .registry
            .create_geons(&mut f.store, alice(), &[id(1), id(2)])
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId { id: id(2) });
        assert!(f.registry.get_geon(&f.store, &id(1)).is_err());
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 1);
    }

    #[test]
    fn empty_batch_is_accepted() {
        let mut f = fixture();
        f.registry.create_geons(&mut f.store, alice(), &[]).unwrap();
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 0);
    }

    #[test]
    fn delete_by_non_creator_is_rejected() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        f.top_up(alice(), id(1), tokens(10)).unwrap();

        let err = f
            .registry
            .delete_geon(&mut f.store, &mut f.coin, bob(), id(1))
            .unwrap_err();
        assert_eq!(err.to_string(), "Can only be called by the Geon creator.");
        assert_eq!(f.balance(id(1)), tokens(10));
        assert_eq!(f.coin.balance_of(&bob()), Amount::ZERO);
    }

    #[test]
    fn delete_missing_geon_is_not_found() {
        let mut f = fixture();
        let err = f
            .registry
            .delete_geon(&mut f.store, &mut f.coin, alice(), id(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn round_trip_returns_every_token() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        f.top_up(alice(), id(1), tokens(100)).unwrap();
        assert_eq!(f.balance(id(1)), tokens(100));
        assert_eq!(f.coin.balance_of(&alice()), Amount::ZERO);
        assert_eq!(f.custody(), tokens(100));

        let paid = f
            .registry
            .delete_geon(&mut f.store, &mut f.coin, alice(), id(1))
            .unwrap();
        assert_eq!(paid, tokens(100));
        assert_eq!(f.coin.balance_of(&alice()), tokens(100));
        assert_eq!(f.custody(), Amount::ZERO);
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 0);
        assert!(f.registry.get_geon(&f.store, &id(1)).is_err());
    }

    #[test]
    fn deleted_id_can_be_reused() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        f.registry
            .delete_geon(&mut f.store, &mut f.coin, alice(), id(1))
            .unwrap();
        f.registry.create_geon(&mut f.store, bob(), id(1)).unwrap();
        assert_eq!(f.registry.get_geon(&f.store, &id(1)).unwrap().creator, bob());
    }

    #[test]
    fn delete_through_foreign_coin_is_misconfigured() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        let mut rogue = GeonCoin::new(Address::derive("rogue"), owner());
        let err = f
            .registry
            .delete_geon(&mut f.store, &mut rogue, alice(), id(1))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Misconfigured {
                role: Collaborator::RewardToken,
                ..
            }
        ));
        assert_eq!(f.registry.geon_count(&f.store).unwrap(), 1);
    }

    #[test]
    fn geons_are_enumerated_in_id_order() {
        let mut f = fixture();
        f.registry
            .create_geons(&mut f.store, alice(), &[id(3), id(1), id(2)])
            .unwrap();
        let ids: Vec<GeonId> = f
            .registry
            .geons(&f.store)
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![id(1), id(2), id(3)]);
    }

    // -----------------------------------------------------------------------
    // Balance increases
    // -----------------------------------------------------------------------

    #[test]
    fn only_reward_token_may_increase() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        let err = f
            .registry
            .increase_geon_balance(&mut f.store, alice(), id(1), tokens(5))
            .unwrap_err();
        assert_eq!(err.to_string(), "Can only be called by the reward token contract.");
        assert_eq!(f.balance(id(1)), Amount::ZERO);
    }

    #[test]
    fn unauthorized_is_reported_before_not_found() {
        let mut f = fixture();
        let err = f
            .registry
            .increase_geon_balance(&mut f.store, alice(), id(9), tokens(5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn increase_overflow_is_rejected() {
        let mut f = fixture();
        let coin = f.coin.address();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        f.registry
            .increase_geon_balance(&mut f.store, coin, id(1), Amount::MAX)
            .unwrap();
        let err = f
            .registry
            .increase_geon_balance(&mut f.store, coin, id(1), Amount::new(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(f.balance(id(1)), Amount::MAX);
    }

    #[test]
    fn batch_increase_with_missing_id_changes_nothing() {
        let mut f = fixture();
        let coin = f.coin.address();
        f.registry
            .create_geons(&mut f.store, alice(), &[id(1), id(3)])
            .unwrap();
        let err = f
            .registry
            .increase_geon_balances(
                &mut f.store,
                coin,
                &[(id(1), tokens(1)), (id(2), tokens(1)), (id(3), tokens(1))],
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::NotFound { id: id(2) });
        assert_eq!(f.balance(id(1)), Amount::ZERO);
        assert_eq!(f.balance(id(3)), Amount::ZERO);
    }

    #[test]
    fn repeated_id_in_batch_accumulates() {
        let mut f = fixture();
        let coin = f.coin.address();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        f.registry
            .increase_geon_balances(&mut f.store, coin, &[(id(1), tokens(2)), (id(1), tokens(3))])
            .unwrap();
        assert_eq!(f.balance(id(1)), tokens(5));
    }

    #[test]
    fn top_up_of_missing_geon_moves_nothing() {
        let mut f = fixture();
        let err = f.top_up(alice(), id(7), tokens(10)).unwrap_err();
        assert_eq!(err, TopupError::Geon(RegistryError::NotFound { id: id(7) }));
        assert_eq!(f.coin.balance_of(&alice()), tokens(100));
        assert_eq!(f.custody(), Amount::ZERO);
    }

    #[test]
    fn batch_top_up_with_missing_middle_id_moves_nothing() {
        let mut f = fixture();
        f.registry
            .create_geons(&mut f.store, alice(), &[id(1), id(3)])
            .unwrap();
        let mut target = f.registry.topup(&mut f.store);
        let err = f
            .coin
            .transfer_to_geons(
                alice(),
                &[id(1), id(2), id(3)],
                &[tokens(1), tokens(1), tokens(1)],
                &mut target,
            )
            .unwrap_err();
        assert!(matches!(err, TopupError::Geon(RegistryError::NotFound { .. })));
        assert_eq!(f.coin.balance_of(&alice()), tokens(100));
        assert_eq!(f.custody(), Amount::ZERO);
        assert_eq!(f.balance(id(1)), Amount::ZERO);
    }

    // -----------------------------------------------------------------------
    // Geomining
    // -----------------------------------------------------------------------

    fn mined_fixture() -> (Fixture, RequestId) {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        f.top_up(alice(), id(1), tokens(50)).unwrap();
        let request = RequestId::from(42u128);
        f.registry
            .set_geomining_reward(&mut f.store, owner(), id(1), bob(), request, tokens(20))
            .unwrap();
        (f, request)
    }

    #[test]
    fn unset_grant_reads_as_zero() {
        let f = fixture();
        let grant = f
            .registry
            .get_geomining_reward(&f.store, &id(1), &bob(), &RequestId::from(1u128))
            .unwrap();
        assert_eq!(grant, Amount::ZERO);
    }

    #[test]
    fn only_owner_sets_grants() {
        let mut f = fixture();
        f.registry.create_geon(&mut f.store, alice(), id(1)).unwrap();
        let err = f
            .registry
            .set_geomining_reward(&mut f.store, alice(), id(1), bob(), RequestId::from(1u128), tokens(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn grant_on_missing_geon_is_not_found() {
        let mut f = fixture();
        let err = f
            .registry
            .set_geomining_reward(&mut f.store, owner(), id(1), bob(), RequestId::from(1u128), tokens(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn geomine_pays_once() {
        let (mut f, request) = mined_fixture();
        assert_eq!(
            f.registry
                .get_geomining_reward(&f.store, &id(1), &bob(), &request)
                .unwrap(),
            tokens(20)
        );

        let paid = f
            .registry
            .geomine(&mut f.store, &mut f.coin, bob(), id(1), request)
            .unwrap();
        assert_eq!(paid, tokens(20));
        assert_eq!(f.coin.balance_of(&bob()), tokens(20));
        assert_eq!(f.balance(id(1)), tokens(30));
        assert_eq!(f.custody(), tokens(30));

        let replay = f
            .registry
            .geomine(&mut f.store, &mut f.coin, bob(), id(1), request)
            .unwrap();
        assert_eq!(replay, Amount::ZERO);
        assert_eq!(f.coin.balance_of(&bob()), tokens(20));
        assert_eq!(f.balance(id(1)), tokens(30));
    }

    #[test]
    fn grant_is_bound_to_its_geominer() {
        let (mut f, request) = mined_fixture();
        let paid = f
            .registry
            .geomine(&mut f.store, &mut f.coin, alice(), id(1), request)
            .unwrap();
        assert_eq!(paid, Amount::ZERO);
        assert_eq!(f.balance(id(1)), tokens(50));
    }

    #[test]
    fn grant_above_balance_changes_nothing() {
        let (mut f, request) = mined_fixture();
        f.registry
            .set_geomining_reward(&mut f.store, owner(), id(1), bob(), request, tokens(51))
            .unwrap();

        let err = f
            .registry
            .geomine(&mut f.store, &mut f.coin, bob(), id(1), request)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(f.balance(id(1)), tokens(50));
        assert_eq!(f.coin.balance_of(&bob()), Amount::ZERO);
        assert_eq!(
            f.registry
                .get_geomining_reward(&f.store, &id(1), &bob(), &request)
                .unwrap(),
            tokens(51)
        );
    }

    #[test]
    fn zero_grant_on_missing_geon_is_a_no_op() {
        let mut f = fixture();
        let paid = f
            .registry
            .geomine(&mut f.store, &mut f.coin, bob(), id(99), RequestId::from(1u128))
            .unwrap();
        assert_eq!(paid, Amount::ZERO);
        assert!(f.store.scan_prefix(b"grant/").is_empty());
    }

    #[test]
    fn deleting_a_geon_drops_its_grants() {
        let (mut f, request) = mined_fixture();
        let carol = Address::derive("carol");
        f.coin.mint(owner(), carol, tokens(50)).unwrap();
        f.registry.create_geon(&mut f.store, alice(), id(2)).unwrap();
        f.registry
            .set_geomining_reward(&mut f.store, owner(), id(2), bob(), request, tokens(5))
            .unwrap();

        f.registry
            .delete_geon(&mut f.store, &mut f.coin, alice(), id(1))
            .unwrap();
        assert_eq!(
            f.registry
                .get_geomining_reward(&f.store, &id(1), &bob(), &request)
                .unwrap(),
            Amount::ZERO
        );
        assert_eq!(
            f.registry
                .get_geomining_reward(&f.store, &id(2), &bob(), &request)
                .unwrap(),
            tokens(5)
        );

        // The id is reused by another creator: the old grant cannot drain it.
        f.registry.create_geon(&mut f.store, carol, id(1)).unwrap();
        f.top_up(carol, id(1), tokens(50)).unwrap();
        let paid = f
            .registry
            .geomine(&mut f.store, &mut f.coin, bob(), id(1), request)
            .unwrap();
        assert_eq!(paid, Amount::ZERO);
        assert_eq!(f.balance(id(1)), tokens(50));
        assert_eq!(f.coin.balance_of(&bob()), Amount::ZERO);
    }

    #[test]
    fn setting_zero_clears_grant() {
        let (mut f, request) = mined_fixture();
        f.registry
            .set_geomining_reward(&mut f.store, owner(), id(1), bob(), request, Amount::ZERO)
            .unwrap();
        assert!(f.store.scan_prefix(b"grant/").is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            #[test]
            fn batch_create_is_all_or_nothing(raw in proptest::collection::vec(0u8..16, 1..12)) {
                let mut f = fixture();
                let ids: Vec<GeonId> = raw.iter().map(|n| id(u128::from(*n))).collect();
                let distinct = raw.iter().collect::<HashSet<_>>().len();

                let result = f.registry.create_geons(&mut f.store, alice(), &ids);
                let count = f.registry.geon_count(&f.store).unwrap();
                if distinct == raw.len() {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(count, raw.len() as u64);
                } else {
                    prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::DuplicateId);
                    prop_assert_eq!(count, 0);
                    prop_assert!(f.registry.geons(&f.store).unwrap().is_empty());
                }
            }
        }
    }
}
