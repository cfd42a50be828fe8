//! Simulated network participants

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::token::TokenAmount;

/// Part a user plays in the data exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buys access to data (a data scientist)
    Consumer,
    /// Publishes data (a data owner)
    Provider,
}

impl Role {
    /// Roles alternate by position, starting with a consumer
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            Role::Consumer
        } else {
            Role::Provider
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Role::Consumer => "Data Scientist",
            Role::Provider => "Data Owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Outcome of trying to unlock a user's account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockState {
    /// No password was found for the address
    NoCredential,
    /// A password was found, unlock not attempted yet
    Pending,
    /// A password was found but the node refused it
    Rejected,
    /// The account can sign transactions
    Unlocked,
}

impl fmt::Display for UnlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockState::NoCredential => write!(f, "no credential"),
            UnlockState::Pending => write!(f, "pending"),
            UnlockState::Rejected => write!(f, "rejected"),
            UnlockState::Unlocked => write!(f, "unlocked"),
        }
    }
}

/// A simulated participant bound to one account
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    /// Generated display name
    pub name: String,
    /// Consumer or provider
    pub role: Role,
    /// Account address
    pub address: Address,
    /// Password used for unlocking, if one was found
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Unlock outcome
    pub unlock: UnlockState,
    /// Last observed token balance
    pub balance: Option<TokenAmount>,
}

impl User {
    pub fn new(name: impl Into<String>, role: Role, address: Address, password: Option<String>) -> Self {
        let unlock = if password.is_some() {
            UnlockState::Pending
        } else {
            UnlockState::NoCredential
        };
        Self {
            name: name.into(),
            role,
            address,
            password,
            unlock,
            balance: None,
        }
    }

    /// Whether the account was unlocked and may be funded
    pub fn is_unlocked(&self) -> bool {
        self.unlock == UnlockState::Unlocked
    }

    pub fn has_credential(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("unlock", &self.unlock)
            .field("balance", &self.balance)
            .finish()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let balance = self
            .balance
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());
        let lock = if self.is_unlocked() { "" } else { " [locked]" };
        write!(
            f,
            "{:<24} {:<15} {} {:>12} token{}",
            self.name, self.role, self.address, balance, lock
        )
    }
}

/// Users whose accounts were unlocked, in order
pub fn unlocked(users: &[User]) -> Vec<&User> {
    users.iter().filter(|u| u.is_unlocked()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn test_roles_alternate() {
        let roles: Vec<Role> = (0..6).map(Role::for_index).collect();
        assert_eq!(
            roles,
            vec![
                Role::Consumer,
                Role::Provider,
                Role::Consumer,
                Role::Provider,
                Role::Consumer,
                Role::Provider,
            ]
        );
    }

    #[test]
    fn test_new_user_starts_locked() {
        let with_pw = User::new("Ada", Role::Consumer, address(1), Some("pw".into()));
        assert_eq!(with_pw.unlock, UnlockState::Pending);
        assert!(!with_pw.is_unlocked());

        let without = User::new("Bob", Role::Provider, address(2), None);
        assert_eq!(without.unlock, UnlockState::NoCredential);
    }

    #[test]
    fn test_unlocked_filter_keeps_order() {
        let mut users = vec![
            User::new("A", Role::Consumer, address(1), Some("a".into())),
            User::new("B", Role::Provider, address(2), None),
            User::new("C", Role::Consumer, address(3), Some("c".into())),
        ];
        users[0].unlock = UnlockState::Unlocked;
        users[2].unlock = UnlockState::Unlocked;

        let selected: Vec<Address> = unlocked(&users).iter().map(|u| u.address).collect();
        assert_eq!(selected, vec![address(1), address(3)]);
    }

    #[test]
    fn test_display_and_debug_hide_password() {
        let mut user = User::new("Ada Lovelace", Role::Consumer, address(0xab), Some("hunter2".into()));
        user.unlock = UnlockState::Unlocked;
        user.balance = Some(TokenAmount(42));

        let line = user.to_string();
        assert!(line.contains("Ada Lovelace"));
        assert!(line.contains("Data Scientist"));
        assert!(line.contains("42"));
        assert!(!line.contains("[locked]"));

        assert!(!format!("{:?}", user).contains("hunter2"));
        assert!(!serde_json::to_string(&user).unwrap().contains("hunter2"));
    }
}
