//! Read-only ledger access.
//!
//! The resolver depends only on [`LedgerClient`]. [`RpcLedgerClient`] backs it
//! with a Solana RPC node (feature `solana-rpc`); [`InMemoryLedger`] backs it
//! with a local account table for tests and offline tooling.
//!
//! No implementation retries. Each call reads whatever ledger state is
//! current at that moment, so two reads in one resolution may observe
//! different slots.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use solana_pubkey::Pubkey;

use crate::program::accounts::has_discriminator;
use crate::program::constants::{TOKEN_ACCOUNT_AMOUNT_OFFSET, TOKEN_ACCOUNT_SIZE};
use crate::program::error::{SdkError, SdkResult};

/// Raw account as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    /// Owning program
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

/// Account paired with its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedAccount {
    pub address: Pubkey,
    pub account: LedgerAccount,
}

/// Read-only account fetch capability.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch one account; `Ok(None)` when it does not exist.
    async fn get_account(&self, address: &Pubkey) -> SdkResult<Option<LedgerAccount>>;

    /// Fetch every account owned by `program_id` whose data starts with
    /// `discriminator`, in the order the backend returns them.
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: &[u8; 8],
    ) -> SdkResult<Vec<KeyedAccount>>;
}

// ============================================================================
// In-memory ledger
// ============================================================================

/// Insertion-ordered account table implementing [`LedgerClient`].
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: RwLock<Vec<KeyedAccount>>,
    failing: RwLock<HashSet<Pubkey>>,
    fail_scans: RwLock<bool>,
    fetches: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account. Replacing keeps the existing position.
    pub fn set_account(&self, address: Pubkey, account: LedgerAccount) {
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        match accounts.iter_mut().find(|k| k.address == address) {
            Some(existing) => existing.account = account,
            None => accounts.push(KeyedAccount { address, account }),
        }
    }

    pub fn with_account(self, address: Pubkey, account: LedgerAccount) -> Self {
        self.set_account(address, account);
        self
    }

    /// Store a program-owned account holding `data`.
    pub fn set_program_account(&self, address: Pubkey, program_id: Pubkey, data: Vec<u8>) {
        self.set_account(
            address,
            LedgerAccount {
                owner: program_id,
                lamports: 1_000_000,
                data,
            },
        );
    }

    /// Store a mint account owned by `token_program`.
    pub fn set_mint(&self, mint: Pubkey, token_program: Pubkey, decimals: u8) {
        let mut data = vec![0u8; 82];
        data[44] = decimals;
        data[45] = 1;
        self.set_account(
            mint,
            LedgerAccount {
                owner: token_program,
                lamports: 1_461_600,
                data,
            },
        );
    }

    /// Store a token account with the given balance.
    pub fn set_token_account(
        &self,
        address: Pubkey,
        mint: Pubkey,
        owner: Pubkey,
        amount: u64,
        token_program: Pubkey,
    ) {
        let mut data = vec![0u8; TOKEN_ACCOUNT_SIZE];
        data[0..32].copy_from_slice(mint.as_ref());
        data[32..64].copy_from_slice(owner.as_ref());
        data[TOKEN_ACCOUNT_AMOUNT_OFFSET..TOKEN_ACCOUNT_AMOUNT_OFFSET + 8]
            .copy_from_slice(&amount.to_le_bytes());
        data[108] = 1; // initialized
        self.set_account(
            address,
            LedgerAccount {
                owner: token_program,
                lamports: 2_039_280,
                data,
            },
        );
    }

    pub fn remove_account(&self, address: &Pubkey) {
        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        accounts.retain(|k| k.address != *address);
    }

    /// Make every fetch of `address` fail with [`SdkError::LedgerFetch`].
    pub fn fail_address(&self, address: Pubkey) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address);
    }

    /// Make every program scan fail with [`SdkError::LedgerFetch`].
    pub fn fail_program_scans(&self, fail: bool) {
        *self.fail_scans.write().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// Number of ledger calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn get_account(&self, address: &Pubkey) -> SdkResult<Option<LedgerAccount>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing
            .read()
            .map_err(|_| SdkError::LedgerFetch("ledger lock poisoned".to_string()))?;
        if failing.contains(address) {
            return Err(SdkError::LedgerFetch(format!("{}: injected failure", address)));
        }

        let accounts = self
            .accounts
            .read()
            .map_err(|_| SdkError::LedgerFetch("ledger lock poisoned".to_string()))?;
        Ok(accounts
            .iter()
            .find(|k| k.address == *address)
            .map(|k| k.account.clone()))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: &[u8; 8],
    ) -> SdkResult<Vec<KeyedAccount>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let fail = *self
            .fail_scans
            .read()
            .map_err(|_| SdkError::LedgerFetch("ledger lock poisoned".to_string()))?;
        if fail {
            return Err(SdkError::LedgerFetch(format!(
                "getProgramAccounts {}: injected failure",
                program_id
            )));
        }

        let accounts = self
            .accounts
            .read()
            .map_err(|_| SdkError::LedgerFetch("ledger lock poisoned".to_string()))?;
        Ok(accounts
            .iter()
            .filter(|k| k.account.owner == *program_id)
            .filter(|k| has_discriminator(&k.account.data, discriminator))
            .cloned()
            .collect())
    }
}

// ============================================================================
// RPC ledger
// ============================================================================

#[cfg(feature = "solana-rpc")]
pub use rpc::RpcLedgerClient;

#[cfg(feature = "solana-rpc")]
mod rpc {
    use async_trait::async_trait;
    use solana_account_decoder_client_types::UiAccountEncoding;
    use solana_client::nonblocking::rpc_client::RpcClient;
    use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
    use solana_client::rpc_filter::{Memcmp, RpcFilterType};
    use solana_commitment_config::CommitmentConfig;
    use solana_pubkey::Pubkey;

    use super::{KeyedAccount, LedgerAccount, LedgerClient};
    use crate::program::config::PerpsConfig;
    use crate::program::error::{SdkError, SdkResult};

    /// [`LedgerClient`] over a Solana JSON-RPC endpoint.
    pub struct RpcLedgerClient {
        /// RPC client for Solana
        pub rpc_client: RpcClient,
    }

    impl RpcLedgerClient {
        /// Create a client at `confirmed` commitment.
        pub fn new(rpc_url: &str) -> Self {
            Self {
                rpc_client: RpcClient::new_with_commitment(
                    rpc_url.to_string(),
                    CommitmentConfig::confirmed(),
                ),
            }
        }

        pub fn from_config(config: &PerpsConfig) -> Self {
            Self::new(&config.rpc_url)
        }

        /// Create a new client with existing RpcClient.
        pub fn from_rpc_client(rpc_client: RpcClient) -> Self {
            Self { rpc_client }
        }
    }

    #[async_trait]
    impl LedgerClient for RpcLedgerClient {
        async fn get_account(&self, address: &Pubkey) -> SdkResult<Option<LedgerAccount>> {
            let response = self
                .rpc_client
                .get_account_with_commitment(address, self.rpc_client.commitment())
                .await
                .map_err(|e| SdkError::LedgerFetch(format!("getAccountInfo {}: {}", address, e)))?;

            Ok(response.value.map(|account| LedgerAccount {
                owner: account.owner,
                lamports: account.lamports,
                data: account.data,
            }))
        }

        async fn get_program_accounts(
            &self,
            program_id: &Pubkey,
            discriminator: &[u8; 8],
        ) -> SdkResult<Vec<KeyedAccount>> {
            let config = RpcProgramAccountsConfig {
                filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    0,
                    discriminator,
                ))]),
                account_config: RpcAccountInfoConfig {
                    encoding: Some(UiAccountEncoding::Base64),
                    commitment: Some(self.rpc_client.commitment()),
                    ..RpcAccountInfoConfig::default()
                },
                ..RpcProgramAccountsConfig::default()
            };

            let accounts = self
                .rpc_client
                .get_program_accounts_with_config(program_id, config)
                .await
                .map_err(|e| {
                    SdkError::LedgerFetch(format!("getProgramAccounts {}: {}", program_id, e))
                })?;

            tracing::debug!(%program_id, count = accounts.len(), "program scan");

            Ok(accounts
                .into_iter()
                .map(|(address, account)| KeyedAccount {
                    address,
                    account: LedgerAccount {
                        owner: account.owner,
                        lamports: account.lamports,
                        data: account.data,
                    },
                })
                .collect())
        }
    }
}
