//! CO2 Token: the carbon accounting ledger.
//!
//! Balances are minted as a reward for compensatory actions or when an
//! operation stays under its emission threshold, and burned when an
//! operation exceeds it. `total_supply` always equals the sum of all
//! balances: every mint and burn updates both in the same staged set.

use crate::context::ExecutionContext;
use crate::error::{ContractError, Result};
use carbonchain_core::{Address, Amount, LedgerEvent, Settlement};
use carbonchain_storage::{StateRead, Storage};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NAME: &str = "CO2 Token";
pub const SYMBOL: &str = "CO2";
pub const DECIMALS: u8 = 18;

/// Static token description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Handle to a CarbonToken instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarbonToken {
    address: Address,
}

impl CarbonToken {
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn metadata() -> TokenMetadata {
        TokenMetadata {
            name: NAME.to_string(),
            symbol: SYMBOL.to_string(),
            decimals: DECIMALS,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Mint `amount` to the caller unconditionally.
    pub fn reward_compensatory_action(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        amount: Amount,
    ) -> Result<()> {
        let to = ctx.caller();
        self.mint(ctx, &to, amount)
    }

    /// Threshold settlement for the caller.
    pub fn process_operation_co2(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        consumed: Amount,
        threshold: Amount,
    ) -> Result<Settlement> {
        let account = ctx.caller();
        self.settle(ctx, &account, consumed, threshold)
    }

    /// Threshold settlement for `account`: mint `threshold - consumed` or burn
    /// `consumed - threshold`. A burn beyond the balance fails without effect.
    pub fn settle(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        account: &Address,
        consumed: Amount,
        threshold: Amount,
    ) -> Result<Settlement> {
        let settlement = Settlement::compute(consumed, threshold);
        match settlement {
            Settlement::Minted(amount) => self.mint(ctx, account, amount)?,
            Settlement::Burned(amount) => self.burn(ctx, account, amount)?,
        }
        debug!(%account, consumed, threshold, ?settlement, "settled operation CO2");
        Ok(settlement)
    }

    /// Move `amount` from the caller to `to`. All or nothing.
    pub fn transfer(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        if to.is_zero() {
            return Err(ContractError::InvalidInput(
                "transfer to the zero address".into(),
            ));
        }
        let from = ctx.caller();
        let from_balance = self.balance_of(ctx.state(), &from)?;
        if from_balance < amount {
            return Err(ContractError::InsufficientBalance {
                address: from,
                required: amount,
                available: from_balance,
            });
        }

        if from != *to {
            let to_balance = self.balance_of(ctx.state(), to)?;
            let credited = to_balance
                .checked_add(amount)
                .ok_or(ContractError::Overflow("transfer"))?;
            let state = ctx.state_mut();
            state.put(Storage::balance_key(&self.address, &from), &(from_balance - amount))?;
            state.put(Storage::balance_key(&self.address, to), &credited)?;
        }

        ctx.emit(
            self.address,
            LedgerEvent::Transfer {
                from,
                to: *to,
                amount,
            },
        );
        Ok(())
    }

    fn mint(&self, ctx: &mut ExecutionContext<'_, '_>, to: &Address, amount: Amount) -> Result<()> {
        let balance = self.balance_of(ctx.state(), to)?;
        let supply = self.total_supply(ctx.state())?;
        let new_balance = balance
            .checked_add(amount)
            .ok_or(ContractError::Overflow("mint"))?;
        let new_supply = supply
            .checked_add(amount)
            .ok_or(ContractError::Overflow("mint"))?;

        let state = ctx.state_mut();
        state.put(Storage::balance_key(&self.address, to), &new_balance)?;
        state.put(Storage::total_supply_key(&self.address), &new_supply)?;
        ctx.emit(self.address, LedgerEvent::TokensMinted { to: *to, amount });
        Ok(())
    }

    fn burn(&self, ctx: &mut ExecutionContext<'_, '_>, from: &Address, amount: Amount) -> Result<()> {
        let balance = self.balance_of(ctx.state(), from)?;
        if balance < amount {
            return Err(ContractError::InsufficientBalance {
                address: *from,
                required: amount,
                available: balance,
            });
        }
        // Supply is at least any single balance, so this cannot underflow.
        let supply = self.total_supply(ctx.state())?;

        let state = ctx.state_mut();
        state.put(Storage::balance_key(&self.address, from), &(balance - amount))?;
        state.put(Storage::total_supply_key(&self.address), &(supply - amount))?;
        ctx.emit(self.address, LedgerEvent::TokensBurned { from: *from, amount });
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn balance_of<S: StateRead>(&self, state: &S, holder: &Address) -> Result<Amount> {
        Ok(state
            .read(&Storage::balance_key(&self.address, holder))?
            .unwrap_or(0))
    }

    pub fn total_supply<S: StateRead>(&self, state: &S) -> Result<Amount> {
        Ok(state
            .read(&Storage::total_supply_key(&self.address))?
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonchain_core::ErrorKind;
    use carbonchain_storage::StagedState;

    const TOKEN: Address = Address([0xC0; 20]);
    const ALICE: Address = Address([0x01; 20]);
    const BOB: Address = Address([0x02; 20]);

    #[test]
    fn test_metadata() {
        let meta = CarbonToken::metadata();
        assert_eq!(meta.name, "CO2 Token");
        assert_eq!(meta.symbol, "CO2");
        assert_eq!(meta.decimals, 18);
    }

    #[test]
    fn test_reward_mints_to_caller() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);

        token.reward_compensatory_action(&mut ctx, 1000).unwrap();
        token.reward_compensatory_action(&mut ctx, 0).unwrap();

        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), 1000);
        assert_eq!(token.total_supply(ctx.state()).unwrap(), 1000);
    }

    #[test]
    fn test_transfer_preserves_sum() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);

        token.reward_compensatory_action(&mut ctx, 1000).unwrap();
        token.transfer(&mut ctx, &BOB, 500).unwrap();

        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), 500);
        assert_eq!(token.balance_of(ctx.state(), &BOB).unwrap(), 500);
        assert_eq!(token.total_supply(ctx.state()).unwrap(), 1000);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);
        token.reward_compensatory_action(&mut ctx, 100).unwrap();

        let err = token.transfer(&mut ctx, &BOB, 101).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), 100);
        assert_eq!(token.balance_of(ctx.state(), &BOB).unwrap(), 0);
    }

    #[test]
    fn test_self_transfer_and_zero_recipient() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);
        token.reward_compensatory_action(&mut ctx, 100).unwrap();

        token.transfer(&mut ctx, &ALICE, 60).unwrap();
        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), 100);

        let err = token.transfer(&mut ctx, &Address::ZERO, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_settlement_under_threshold_mints() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);

        let settlement = token.process_operation_co2(&mut ctx, 500, 1000).unwrap();

        assert_eq!(settlement, Settlement::Minted(500));
        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), 500);
        assert_eq!(ctx.events()[0].event.name(), "TokensMinted");
    }

    #[test]
    fn test_settlement_over_threshold_burns() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);
        token.reward_compensatory_action(&mut ctx, 1000).unwrap();

        let settlement = token.process_operation_co2(&mut ctx, 800, 500).unwrap();

        assert_eq!(settlement, Settlement::Burned(300));
        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), 700);
        assert_eq!(token.total_supply(ctx.state()).unwrap(), 700);
        assert_eq!(ctx.events().last().unwrap().event.name(), "TokensBurned");
    }

    #[test]
    fn test_settlement_at_threshold_is_zero_mint() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);

        let settlement = token.process_operation_co2(&mut ctx, 700, 700).unwrap();

        assert_eq!(settlement, Settlement::Minted(0));
        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), 0);
    }

    #[test]
    fn test_burn_beyond_balance_fails_without_change() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);
        token.reward_compensatory_action(&mut ctx, 100).unwrap();
        let events_before = ctx.events().len();

        let err = token.process_operation_co2(&mut ctx, 500, 100).unwrap_err();

        assert!(matches!(
            err,
            ContractError::InsufficientBalance {
                required: 400,
                available: 100,
                ..
            }
        ));
        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), 100);
        assert_eq!(token.total_supply(ctx.state()).unwrap(), 100);
        assert_eq!(ctx.events().len(), events_before);
    }

    #[test]
    fn test_mint_overflow_is_rejected() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let token = CarbonToken::at(TOKEN);
        token.reward_compensatory_action(&mut ctx, Amount::MAX).unwrap();

        let err = token.reward_compensatory_action(&mut ctx, 1).unwrap_err();
        assert!(matches!(err, ContractError::Overflow(_)));
        assert_eq!(token.balance_of(ctx.state(), &ALICE).unwrap(), Amount::MAX);
    }
}
