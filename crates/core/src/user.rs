//! Registered supply-chain participants.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

/// The part a participant plays in the supply chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Farm or other primary producer.
    Producer,
    Transporter,
    /// Transforms raw products (milling, packing, ...).
    Processor,
    Retailer,
    /// Audits products and may retire them through the orchestrator.
    Certifier,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Producer,
        Role::Transporter,
        Role::Processor,
        Role::Retailer,
        Role::Certifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "PRODUCER",
            Role::Transporter => "TRANSPORTER",
            Role::Processor => "PROCESSOR",
            Role::Retailer => "RETAILER",
            Role::Certifier => "CERTIFIER",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered participant. Only `is_active` changes after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub address: Address,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    /// Unix timestamp (seconds) of the block that registered the user.
    pub registration_date: u64,
}

impl User {
    pub fn new(address: Address, name: String, email: String, role: Role, now: u64) -> Self {
        Self {
            address,
            name,
            email,
            role,
            is_active: true,
            registration_date: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("PRODUCER".parse::<Role>().unwrap(), Role::Producer);
        assert_eq!("certifier".parse::<Role>().unwrap(), Role::Certifier);
        assert_eq!(" Retailer ".parse::<Role>().unwrap(), Role::Retailer);
        assert_eq!(
            "farmer".parse::<Role>(),
            Err(UnknownRole("farmer".to_string()))
        );
    }

    #[test]
    fn test_role_serializes_upper_case() {
        let json = serde_json::to_string(&Role::Transporter).unwrap();
        assert_eq!(json, "\"TRANSPORTER\"");
    }

    #[test]
    fn test_new_user_is_active() {
        let user = User::new(
            Address([1u8; 20]),
            "Ada".into(),
            "ada@farm.example".into(),
            Role::Producer,
            42,
        );
        assert!(user.is_active);
        assert_eq!(user.registration_date, 42);
    }
}
