//! UserRegistry: directory of registered participants and their roles.

use crate::context::ExecutionContext;
use crate::error::{require_text, ContractError, Result};
use carbonchain_core::{Address, LedgerEvent, Role, User};
use carbonchain_storage::{StateRead, Storage};
use tracing::debug;

/// Handle to a UserRegistry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRegistry {
    address: Address,
}

impl UserRegistry {
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Register the caller. At most one record per address.
    pub fn register_user(
        &self,
        ctx: &mut ExecutionContext<'_, '_>,
        name: &str,
        email: &str,
        role: &str,
    ) -> Result<()> {
        let caller = ctx.caller();
        let name = require_text("name", name)?;
        let email = require_text("email", email)?;
        if !email.contains('@') {
            return Err(ContractError::InvalidInput(format!(
                "email is not an address: {email}"
            )));
        }
        let role: Role = role.parse()?;

        if self.is_user_registered(ctx.state(), &caller)? {
            return Err(ContractError::AlreadyRegistered(caller));
        }

        let user = User::new(caller, name, email, role, ctx.timestamp());
        let count = self.user_count(ctx.state())?;
        let state = ctx.state_mut();
        state.put(Storage::user_key(&self.address, &caller), &user)?;
        state.put(Storage::user_count_key(&self.address), &(count + 1))?;

        debug!(user = %caller, %role, "registered user");
        ctx.emit(self.address, LedgerEvent::UserRegistered { user: caller, role });
        Ok(())
    }

    /// Toggle the caller's own `is_active` flag.
    pub fn set_user_active(&self, ctx: &mut ExecutionContext<'_, '_>, active: bool) -> Result<()> {
        let caller = ctx.caller();
        let mut user = self
            .get_user(ctx.state(), &caller)?
            .ok_or(ContractError::UserNotFound(caller))?;
        user.is_active = active;
        ctx.state_mut()
            .put(Storage::user_key(&self.address, &caller), &user)?;
        ctx.emit(
            self.address,
            LedgerEvent::UserStatusChanged {
                user: caller,
                is_active: active,
            },
        );
        Ok(())
    }

    pub fn is_user_registered<S: StateRead>(&self, state: &S, user: &Address) -> Result<bool> {
        Ok(state.exists(&Storage::user_key(&self.address, user))?)
    }

    /// `None` when the address never registered.
    pub fn get_user<S: StateRead>(&self, state: &S, user: &Address) -> Result<Option<User>> {
        Ok(state.read(&Storage::user_key(&self.address, user))?)
    }

    pub fn user_count<S: StateRead>(&self, state: &S) -> Result<u64> {
        Ok(state
            .read(&Storage::user_count_key(&self.address))?
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonchain_core::ErrorKind;
    use carbonchain_storage::StagedState;

    const REGISTRY: Address = Address([0xAA; 20]);
    const ALICE: Address = Address([0x01; 20]);

    #[test]
    fn test_register_and_get_user() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 1_700_000_000);
        let registry = UserRegistry::at(REGISTRY);

        registry
            .register_user(&mut ctx, "Alice", "alice@farm.example", "PRODUCER")
            .unwrap();

        let user = registry.get_user(ctx.state(), &ALICE).unwrap().unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.role, Role::Producer);
        assert!(user.is_active);
        assert_eq!(user.registration_date, 1_700_000_000);
        assert!(registry.is_user_registered(ctx.state(), &ALICE).unwrap());
        assert_eq!(registry.user_count(ctx.state()).unwrap(), 1);
        assert_eq!(ctx.events()[0].event.name(), "UserRegistered");
    }

    #[test]
    fn test_double_registration_rejected() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let registry = UserRegistry::at(REGISTRY);

        registry
            .register_user(&mut ctx, "Alice", "alice@farm.example", "producer")
            .unwrap();
        let err = registry
            .register_user(&mut ctx, "Alice 2", "alice2@farm.example", "retailer")
            .unwrap_err();

        assert!(matches!(err, ContractError::AlreadyRegistered(addr) if addr == ALICE));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let user = registry.get_user(ctx.state(), &ALICE).unwrap().unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(registry.user_count(ctx.state()).unwrap(), 1);
    }

    #[test]
    fn test_unknown_user_is_none() {
        let storage = Storage::open_temporary().unwrap();
        let registry = UserRegistry::at(REGISTRY);
        assert!(registry.get_user(&storage, &ALICE).unwrap().is_none());
        assert!(!registry.is_user_registered(&storage, &ALICE).unwrap());
    }

    #[test]
    fn test_validation() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let registry = UserRegistry::at(REGISTRY);

        let empty_name = registry.register_user(&mut ctx, " ", "a@b.c", "PRODUCER");
        assert!(matches!(empty_name, Err(ContractError::InvalidInput(_))));
        let bad_email = registry.register_user(&mut ctx, "Alice", "alice", "PRODUCER");
        assert!(matches!(bad_email, Err(ContractError::InvalidInput(_))));
        let bad_role = registry.register_user(&mut ctx, "Alice", "a@b.c", "wizard");
        assert_eq!(bad_role.unwrap_err().kind(), ErrorKind::Validation);

        assert!(ctx.state().is_empty());
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_set_user_active() {
        let storage = Storage::open_temporary().unwrap();
        let mut staged = StagedState::new(&storage);
        let mut ctx = ExecutionContext::new(&mut staged, ALICE, 0);
        let registry = UserRegistry::at(REGISTRY);

        assert!(matches!(
            registry.set_user_active(&mut ctx, false),
            Err(ContractError::UserNotFound(_))
        ));

        registry
            .register_user(&mut ctx, "Alice", "alice@farm.example", "TRANSPORTER")
            .unwrap();
        registry.set_user_active(&mut ctx, false).unwrap();

        let user = registry.get_user(ctx.state(), &ALICE).unwrap().unwrap();
        assert!(!user.is_active);
        assert_eq!(user.role, Role::Transporter);
    }
}
