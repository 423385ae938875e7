use geon_types::{Address, Amount, GeonId};

/// Registry-side boundary notified by a directed top-up.
///
/// The coin passes its own address as `caller`; the registry decides whether
/// that caller is its trusted reward token. Implementations must be
/// all-or-nothing per call: on `Err`, no Geon balance has changed.
pub trait GeonTopup {
    type Error;

    /// Identity the registry is deployed at (the custody account).
    fn address(&self) -> Address;

    /// Credit `amount` to one Geon.
    fn increase_geon_balance(
        &mut self,
        caller: Address,
        geon_id: GeonId,
        amount: Amount,
    ) -> Result<(), Self::Error>;

    /// Credit several Geons at once. Either every credit applies or none.
    fn increase_geon_balances(
        &mut self,
        caller: Address,
        credits: &[(GeonId, Amount)],
    ) -> Result<(), Self::Error>;
}
