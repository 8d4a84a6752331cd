//! Connected wallet state.
//!
//! [`WalletSession`] owns the single source of truth for "which address is
//! the dashboard showing". Every change of the address bumps a generation
//! counter; loaders capture the generation before fetching and drop their
//! result if it changed meanwhile (see [`crate::portfolio::PortfolioTracker`]).

use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};

use alloy::primitives::Address;
use tokio::sync::watch;
use tracing::{debug, info};

/// Browser-extension style wallet.
pub trait WalletProvider {
    /// Accounts already authorized, without prompting the user.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>, WalletError>> + Send;

    /// Prompts the user to authorize an account.
    fn request_accounts(&self) -> impl Future<Output = Result<Vec<Address>, WalletError>> + Send;
}

/// Reasons for not having a connected address. None of them is a data error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("no wallet provider installed")]
    NotInstalled,

    #[error("wallet connection rejected: {0}")]
    Rejected(String),

    #[error("wallet returned no accounts")]
    NoAccounts,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    address: Option<Address>,
    generation: u64,
}

impl SessionState {
    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// Number of address changes since the session was created.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Connected(Address),
    AccountChanged(Address),
    Disconnected,
    Unchanged,
}

#[derive(Debug)]
pub struct WalletSession {
    state: watch::Sender<SessionState>,
    connecting: AtomicBool,
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletSession {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(SessionState::default()),
            connecting: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn address(&self) -> Option<Address> {
        self.state().address
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// `true` while a [`Self::connect`] prompt is pending.
    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Picks up an account authorized in a previous visit, silently.
    ///
    /// A missing provider or a failing query leaves the session disconnected.
    pub async fn restore<W: WalletProvider>(&self, wallet: Option<&W>) -> Option<Address> {
        let wallet = wallet?;
        match wallet.accounts().await {
            Ok(accounts) => {
                if let Some(address) = accounts.first().copied() {
                    info!(%address, "restored wallet session");
                    self.set_address(Some(address));
                }
                self.address()
            }
            Err(err) => {
                debug!(%err, "no wallet session to restore");
                None
            }
        }
    }

    /// Asks the wallet for an account and makes it the session address.
    pub async fn connect<W: WalletProvider>(&self, wallet: Option<&W>) -> Result<Address, WalletError> {
        let wallet = wallet.ok_or(WalletError::NotInstalled)?;

        self.connecting.store(true, Ordering::Release);
        let accounts = wallet.request_accounts().await;
        self.connecting.store(false, Ordering::Release);

        let address = accounts?
            .first()
            .copied()
            .ok_or(WalletError::NoAccounts)?;
        info!(%address, "wallet connected");
        self.set_address(Some(address));
        Ok(address)
    }

    pub fn disconnect(&self) -> SessionEvent {
        if self.set_address(None) {
            info!("wallet disconnected");
            SessionEvent::Disconnected
        } else {
            SessionEvent::Unchanged
        }
    }

    /// Applies an `accountsChanged` notification of the wallet.
    ///
    /// An empty list disconnects, otherwise the first account becomes the
    /// session address.
    pub fn accounts_changed(&self, accounts: &[Address]) -> SessionEvent {
        match accounts.first().copied() {
            None => self.disconnect(),
            Some(address) => {
                let was_connected = self.is_connected();
                if !self.set_address(Some(address)) {
                    SessionEvent::Unchanged
                } else if was_connected {
                    info!(%address, "wallet account changed");
                    SessionEvent::AccountChanged(address)
                } else {
                    info!(%address, "wallet connected");
                    SessionEvent::Connected(address)
                }
            }
        }
    }

    /// Returns `true` if the address changed.
    fn set_address(&self, address: Option<Address>) -> bool {
        self.state.send_if_modified(|state| {
            if state.address == address {
                return false;
            }
            state.address = address;
            state.generation += 1;
            true
        })
    }
}
