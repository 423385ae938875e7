use std::collections::BTreeMap;

use geon_types::{Address, Amount, GeonId};
use tracing::{debug, info};

use crate::error::{CoinError, CoinResult, TopupError};
use crate::topup::GeonTopup;

/// The reward asset ledger.
///
/// Balances are kept sparse: an account absent from the map holds zero.
#[derive(Debug, Clone)]
pub struct GeonCoin {
    address: Address,
    owner: Address,
    geon_topup: Address,
    balances: BTreeMap<Address, Amount>,
    total_supply: Amount,
}

/// Post-transfer balances, computed before anything is written.
struct TransferPlan {
    from: Address,
    to: Address,
    from_after: Amount,
    to_after: Amount,
}

impl GeonCoin {
    /// Create an empty ledger at `address`. The top-up account starts unset.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            geon_topup: Address::NULL,
            balances: BTreeMap::new(),
            total_supply: Amount::ZERO,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The registry account top-ups are directed to, or [`Address::NULL`].
    pub fn geon_topup_address(&self) -> Address {
        self.geon_topup
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    /// Accounts with a non-zero balance, in address order.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Point top-ups at a registry. Owner only.
    pub fn update_geon_topup_address(&mut self, caller: Address, registry: Address) -> CoinResult<()> {
        self.require_owner(caller)?;
        info!(
            coin = %self.address.short_hex(),
            previous = %self.geon_topup,
            registry = %registry,
            "geon top-up address updated"
        );
        self.geon_topup = registry;
        Ok(())
    }

    /// Create `amount` new tokens for `to`. Owner only.
    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> CoinResult<()> {
        self.require_owner(caller)?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(CoinError::SupplyOverflow)?;
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(CoinError::BalanceOverflow { account: to })?;

        self.total_supply = supply;
        self.set_balance(to, balance);
        debug!(to = %to.short_hex(), %amount, supply = %supply, "minted");
        Ok(())
    }

    /// Move `amount` from `caller` to `to`.
    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> CoinResult<()> {
        let plan = self.plan_transfer(caller, to, amount)?;
        self.apply(plan);
        debug!(from = %caller.short_hex(), to = %to.short_hex(), %amount, "transfer");
        Ok(())
    }

    /// Move `amount` from `caller` into the registry's custody and credit it
    /// to `geon_id`.
    ///
    /// The registry is notified before any balance moves; if it refuses, the
    /// ledger is untouched.
    pub fn transfer_to_geon<T: GeonTopup>(
        &mut self,
        caller: Address,
        geon_id: GeonId,
        amount: Amount,
        registry: &mut T,
    ) -> Result<(), TopupError<T::Error>> {
        let custody = self.topup_target(registry)?;
        let plan = self.plan_transfer(caller, custody, amount)?;

        registry
            .increase_geon_balance(self.address, geon_id, amount)
            .map_err(TopupError::Geon)?;

        self.apply(plan);
        debug!(from = %caller.short_hex(), geon = %geon_id.short_hex(), %amount, "geon topped up");
        Ok(())
    }

    /// Batch form of [`transfer_to_geon`](Self::transfer_to_geon).
    ///
    /// `geon_ids[i]` receives `amounts[i]`. The whole batch is debited from
    /// `caller` at once and the registry applies every credit or none.
    pub fn transfer_to_geons<T: GeonTopup>(
        &mut self,
        caller: Address,
        geon_ids: &[GeonId],
        amounts: &[Amount],
        registry: &mut T,
    ) -> Result<(), TopupError<T::Error>> {
        if geon_ids.len() != amounts.len() {
            return Err(CoinError::LengthMismatch {
                ids: geon_ids.len(),
                amounts: amounts.len(),
            }
            .into());
        }
        let custody = self.topup_target(registry)?;
        let total = Amount::checked_sum(amounts).ok_or(CoinError::BalanceOverflow { account: caller })?;
        let plan = self.plan_transfer(caller, custody, total)?;

        let credits: Vec<(GeonId, Amount)> = geon_ids.iter().copied().zip(amounts.iter().copied()).collect();
        registry
            .increase_geon_balances(self.address, &credits)
            .map_err(TopupError::Geon)?;

        self.apply(plan);
        debug!(from = %caller.short_hex(), geons = credits.len(), %total, "geons topped up");
        Ok(())
    }

    fn topup_target<T: GeonTopup>(&self, registry: &T) -> CoinResult<Address> {
        let actual = registry.address();
        if self.geon_topup.is_null() || actual != self.geon_topup {
            return Err(CoinError::TopupTargetMismatch {
                configured: self.geon_topup,
                actual,
            });
        }
        Ok(actual)
    }

    fn plan_transfer(&self, from: Address, to: Address, amount: Amount) -> CoinResult<TransferPlan> {
        let available = self.balance_of(&from);
        let from_after = available
            .checked_sub(amount)
            .ok_or(CoinError::InsufficientBalance {
                account: from,
                available,
                required: amount,
            })?;
        let to_after = if from == to {
            available
        } else {
            self.balance_of(&to)
                .checked_add(amount)
                .ok_or(CoinError::BalanceOverflow { account: to })?
        };
        Ok(TransferPlan {
            from,
            to,
            from_after,
            to_after,
        })
    }

    fn apply(&mut self, plan: TransferPlan) {
        if plan.from == plan.to {
            return;
        }
        self.set_balance(plan.from, plan.from_after);
        self.set_balance(plan.to, plan.to_after);
    }

    fn set_balance(&mut self, account: Address, amount: Amount) {
        if amount.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }

    fn require_owner(&self, caller: Address) -> CoinResult<()> {
        if caller != self.owner {
            return Err(CoinError::NotOwner { caller });
        }
        Ok(())
    }
}
