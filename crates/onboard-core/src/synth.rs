//! Turning node accounts into simulated users

use rand::Rng;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::client::ProtocolClient;
use crate::credentials::Credentials;
use crate::error::UnlockError;
use crate::names;
use crate::user::{Role, UnlockState, User};

/// Build up to `count` users from the first accounts in `addresses`.
///
/// Roles alternate by position. Each user with a stored password gets one
/// unlock attempt; a refused or failed unlock leaves the user locked and the
/// run continues.
pub async fn synthesize_users<C, R>(
    client: &C,
    addresses: &[Address],
    credentials: &Credentials,
    count: usize,
    rng: &mut R,
) -> Vec<User>
where
    C: ProtocolClient + ?Sized,
    R: Rng,
{
    let mut users = Vec::with_capacity(count.min(addresses.len()));

    for (index, address) in addresses.iter().take(count).enumerate() {
        let role = Role::for_index(index);
        let password = credentials.get(address).map(str::to_string);
        let mut user = User::new(names::full_name(rng), role, *address, password);

        match unlock_user(client, &user).await {
            Ok(()) => {
                user.unlock = UnlockState::Unlocked;
                debug!("Unlocked {} ({})", user.address.short(), user.role);
            }
            Err(UnlockError::NoCredential(_)) => {
                user.unlock = UnlockState::NoCredential;
                debug!("No credential for {}", user.address.short());
            }
            Err(e) => {
                user.unlock = UnlockState::Rejected;
                warn!("{}", e);
            }
        }

        users.push(user);
    }

    let unlocked = users.iter().filter(|u| u.is_unlocked()).count();
    info!(
        "Selected {} unlocked accounts for simulation ({} users total)",
        unlocked,
        users.len()
    );
    users
}

/// Attempt a single unlock for a user
pub async fn unlock_user<C>(client: &C, user: &User) -> Result<(), UnlockError>
where
    C: ProtocolClient + ?Sized,
{
    let password = user
        .password
        .as_deref()
        .ok_or_else(|| UnlockError::NoCredential(user.address.to_hex()))?;

    match client.unlock(&user.address, password).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(UnlockError::Rejected(user.address.to_hex())),
        Err(source) => Err(UnlockError::Client {
            address: user.address.to_hex(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::TxHandle;
    use crate::client::{ClientResult, Receipt};
    use crate::error::ClientError;
    use crate::token::TokenAmount;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    /// Accepts exactly the configured passwords and records unlock calls
    #[derive(Default)]
    struct PasswordNode {
        passwords: HashMap<Address, String>,
        broken: Option<Address>,
        calls: Mutex<Vec<Address>>,
    }

    #[async_trait]
    impl ProtocolClient for PasswordNode {
        async fn list_accounts(&self) -> ClientResult<Vec<Address>> {
            Ok(self.passwords.keys().copied().collect())
        }

        async fn unlock(&self, address: &Address, password: &str) -> ClientResult<bool> {
            self.calls.lock().push(*address);
            if self.broken == Some(*address) {
                return Err(ClientError::Transport("connection reset".into()));
            }
            Ok(self.passwords.get(address).map(String::as_str) == Some(password))
        }

        async fn balance(&self, _address: &Address) -> ClientResult<TokenAmount> {
            Ok(TokenAmount::ZERO)
        }

        async fn request_funds(&self, _address: &Address, _amount: TokenAmount) -> ClientResult<TxHandle> {
            Err(ClientError::Transport("not used".into()))
        }

        async fn transaction_receipt(&self, _tx: &TxHandle) -> ClientResult<Option<Receipt>> {
            Ok(None)
        }

        fn name(&self) -> &str {
            "password-node"
        }
    }

    fn address(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn credentials(entries: &[(Address, &str)]) -> Credentials {
        let mut creds = Credentials::new();
        for (address, pw) in entries {
            creds.insert(*address, *pw);
        }
        creds
    }

    #[tokio::test]
    async fn test_roles_and_unlocked_set() {
        let (a, b, c, d) = (address(0xaa), address(0xbb), address(0xcc), address(0xdd));
        let node = PasswordNode {
            passwords: [(a, "secret1".to_string()), (b, "secret2".to_string())].into(),
            ..Default::default()
        };
        let creds = credentials(&[(a, "secret1"), (b, "secret2")]);
        let mut rng = StdRng::seed_from_u64(1);

        let users = synthesize_users(&node, &[a, b, c, d], &creds, 4, &mut rng).await;

        let roles: Vec<Role> = users.iter().map(|u| u.role).collect();
        assert_eq!(
            roles,
            vec![Role::Consumer, Role::Provider, Role::Consumer, Role::Provider]
        );

        let unlocked: Vec<Address> = users.iter().filter(|u| u.is_unlocked()).map(|u| u.address).collect();
        assert_eq!(unlocked, vec![a, b]);
        assert_eq!(users[2].unlock, UnlockState::NoCredential);
        assert!(users[3].password.is_none());

        // no unlock attempt without a credential
        assert_eq!(*node.calls.lock(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_takes_only_first_count() {
        let addrs: Vec<Address> = (1..=6).map(address).collect();
        let node = PasswordNode::default();
        let mut rng = StdRng::seed_from_u64(2);

        let users = synthesize_users(&node, &addrs, &Credentials::new(), 4, &mut rng).await;
        assert_eq!(users.len(), 4);
        assert_eq!(users[3].address, address(4));

        let users = synthesize_users(&node, &addrs[..2], &Credentials::new(), 4, &mut rng).await;
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected_not_fatal() {
        let a = address(1);
        let node = PasswordNode {
            passwords: [(a, "right".to_string())].into(),
            ..Default::default()
        };
        let creds = credentials(&[(a, "wrong")]);
        let mut rng = StdRng::seed_from_u64(3);

        let users = synthesize_users(&node, &[a], &creds, 4, &mut rng).await;
        assert_eq!(users[0].unlock, UnlockState::Rejected);
        assert!(users[0].has_credential());
        assert!(!users[0].is_unlocked());
    }

    #[tokio::test]
    async fn test_client_error_leaves_user_locked() {
        let (a, b) = (address(1), address(2));
        let node = PasswordNode {
            passwords: [(a, "pa".to_string()), (b, "pb".to_string())].into(),
            broken: Some(a),
            ..Default::default()
        };
        let creds = credentials(&[(a, "pa"), (b, "pb")]);
        let mut rng = StdRng::seed_from_u64(4);

        let users = synthesize_users(&node, &[a, b], &creds, 4, &mut rng).await;
        assert_eq!(users[0].unlock, UnlockState::Rejected);
        assert_eq!(users[1].unlock, UnlockState::Unlocked);

        // exactly one attempt each
        assert_eq!(node.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_unlock_user_errors() {
        let node = PasswordNode::default();
        let user = User::new("X", Role::Consumer, address(9), None);
        assert!(matches!(
            unlock_user(&node, &user).await,
            Err(UnlockError::NoCredential(_))
        ));
    }
}
