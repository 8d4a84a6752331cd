//! Portfolio aggregation.
//!
//! [`aggregate`] is the pure part: native balance, token holdings and the
//! native price in, [`PortfolioSnapshot`] out. [`PortfolioTracker`] fetches
//! the inputs from a [`PortfolioSource`] concurrently, tracks per-source
//! status and publishes the view of the session address as each query
//! resolves.

use std::future::Future;

use alloy::primitives::{Address, U256};
use futures::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::FuturesUnordered,
};
use itertools::Itertools;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    Network,
    error::ClientError,
    num::Converter,
    session::{SessionState, WalletSession},
    types::{CoinPriceResponse, TokenBalance, TokensResponse, TransactionsResponse},
};

/// Upstream queries a portfolio is built from.
pub trait PortfolioSource {
    fn native_balance(&self, address: Address) -> impl Future<Output = Result<U256, ClientError>> + Send;

    fn address_tokens(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<TokensResponse, ClientError>> + Send;

    fn address_transactions(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<TransactionsResponse, ClientError>> + Send;

    fn coin_price(&self) -> impl Future<Output = Result<CoinPriceResponse, ClientError>> + Send;
}

/// Status of one upstream query.
#[derive(Clone, Debug, Default)]
pub enum SourceState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(ClientError),
}

impl<T> SourceState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ClientError>> for SourceState<T> {
    fn from(result: Result<T, ClientError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Share of one asset in the total portfolio value.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    pub symbol: String,
    pub value_usd: f64,
    /// Percent of [`PortfolioSnapshot::total_value_usd`].
    pub share_pct: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PortfolioSnapshot {
    pub native_balance: f64,
    pub native_price_usd: f64,
    pub native_value_usd: f64,
    pub token_values_usd: f64,
    pub total_value_usd: f64,
    /// Assets with a positive balance, native asset included.
    pub asset_count: usize,
    /// Sorted by value, largest first.
    pub allocations: Vec<Allocation>,
}

/// Symbol and decimals of the network's native asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeAsset {
    pub symbol: String,
    pub decimals: u8,
}

impl NativeAsset {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }
}

impl From<&Network> for NativeAsset {
    fn from(network: &Network) -> Self {
        Self::new(network.native_symbol(), network.native_decimals())
    }
}

/// Derives a snapshot from whatever inputs are available.
///
/// Missing inputs count as zero. A token value that does not parse as a
/// finite number counts as zero, it never fails the snapshot.
pub fn aggregate(
    native_balance: Option<U256>,
    tokens: Option<&[TokenBalance]>,
    price_usd: Option<f64>,
    native: &NativeAsset,
) -> PortfolioSnapshot {
    let tokens = tokens.unwrap_or_default();
    let native_balance = native_balance
        .map(|wei| Converter::new(native.decimals).to_f64(wei))
        .unwrap_or_default();
    let native_price_usd = price_usd.filter(|p| p.is_finite()).unwrap_or_default();
    let native_value_usd = native_balance * native_price_usd;

    let token_values_usd = tokens
        .iter()
        .map(TokenBalance::value_usd)
        .fold(0.0, |acc, value| acc + value);
    let total_value_usd = native_value_usd + token_values_usd;

    let asset_count = usize::from(native_balance > 0.0)
        + tokens.iter().filter(|t| t.display_amount() > 0.0).count();

    let share = |value: f64| {
        if total_value_usd > 0.0 {
            value / total_value_usd * 100.0
        } else {
            0.0
        }
    };
    let native = (native_value_usd > 0.0).then(|| Allocation {
        symbol: native.symbol.clone(),
        value_usd: native_value_usd,
        share_pct: share(native_value_usd),
    });
    let allocations = native
        .into_iter()
        .chain(
            tokens
                .iter()
                .map(|t| (t, t.value_usd()))
                .filter(|(_, value)| *value > 0.0)
                .map(|(t, value)| Allocation {
                    symbol: t.token.label().to_string(),
                    value_usd: value,
                    share_pct: share(value),
                }),
        )
        .sorted_by(|a, b| b.value_usd.total_cmp(&a.value_usd))
        .collect();

    PortfolioSnapshot {
        native_balance,
        native_price_usd,
        native_value_usd,
        token_values_usd,
        total_value_usd,
        asset_count,
        allocations,
    }
}

/// Portfolio of one address with the status of every upstream query.
#[derive(Clone, Debug)]
pub struct PortfolioView {
    address: Option<Address>,
    native: NativeAsset,
    pub balance: SourceState<U256>,
    pub tokens: SourceState<TokensResponse>,
    pub transactions: SourceState<TransactionsResponse>,
    pub coin_price: SourceState<CoinPriceResponse>,
}

impl PortfolioView {
    /// View of a session without a connected address; nothing is fetched.
    pub fn disconnected(native: NativeAsset) -> Self {
        Self {
            address: None,
            native,
            balance: SourceState::Idle,
            tokens: SourceState::Idle,
            transactions: SourceState::Idle,
            coin_price: SourceState::Idle,
        }
    }

    /// View of `address` with every query pending.
    pub fn loading(address: Address, native: NativeAsset) -> Self {
        Self {
            address: Some(address),
            native,
            balance: SourceState::Loading,
            tokens: SourceState::Loading,
            transactions: SourceState::Loading,
            coin_price: SourceState::Loading,
        }
    }

    pub fn address(&self) -> Option<Address> {
        self.address
    }

    pub fn native(&self) -> &NativeAsset {
        &self.native
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.balance.is_loading() || self.tokens.is_loading() || self.coin_price.is_loading()
    }

    /// `true` if balance, tokens or price failed. Transactions are not
    /// part of the portfolio status.
    pub fn is_error(&self) -> bool {
        self.balance.is_failed() || self.tokens.is_failed() || self.coin_price.is_failed()
    }

    pub fn errors(&self) -> Vec<&ClientError> {
        [
            self.balance.error(),
            self.tokens.error(),
            self.transactions.error(),
            self.coin_price.error(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn price_usd(&self) -> Option<f64> {
        self.coin_price.ready().and_then(CoinPriceResponse::usd)
    }

    pub fn holdings(&self) -> &[TokenBalance] {
        self.tokens
            .ready()
            .map(|page| page.items.as_slice())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        aggregate(
            self.balance.ready().copied(),
            self.tokens.ready().map(|page| page.items.as_slice()),
            self.price_usd(),
            &self.native,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// The session changed address while loading.
    Discarded,
}

/// Result of one of the queries a view is built from.
enum SourceUpdate {
    Balance(Result<U256, ClientError>),
    Tokens(Result<TokensResponse, ClientError>),
    Transactions(Result<TransactionsResponse, ClientError>),
    CoinPrice(Result<CoinPriceResponse, ClientError>),
}

impl SourceUpdate {
    fn apply(self, view: &mut PortfolioView) {
        match self {
            Self::Balance(result) => view.balance = result.into(),
            Self::Tokens(result) => view.tokens = result.into(),
            Self::Transactions(result) => view.transactions = result.into(),
            Self::CoinPrice(result) => view.coin_price = result.into(),
        }
    }
}

/// View on display together with the session state it was requested for.
pub type Displayed = Option<(SessionState, PortfolioView)>;

#[derive(Debug)]
pub struct PortfolioTracker<S> {
    source: S,
    native: NativeAsset,
    displayed: watch::Sender<Displayed>,
}

impl<S: PortfolioSource> PortfolioTracker<S> {
    pub fn new(source: S, network: &Network) -> Self {
        Self::with_native(source, NativeAsset::from(network))
    }

    pub fn with_native(source: S, native: NativeAsset) -> Self {
        Self {
            source,
            native,
            displayed: watch::Sender::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn fetches(&self, address: Address) -> FuturesUnordered<BoxFuture<'_, SourceUpdate>> {
        [
            self.source.native_balance(address).map(SourceUpdate::Balance).boxed(),
            self.source.address_tokens(address).map(SourceUpdate::Tokens).boxed(),
            self.source
                .address_transactions(address)
                .map(SourceUpdate::Transactions)
                .boxed(),
            self.source.coin_price().map(SourceUpdate::CoinPrice).boxed(),
        ]
        .into_iter()
        .collect()
    }

    /// Fetches the portfolio of `address`.
    ///
    /// Without an address nothing is fetched. Each query resolves on its
    /// own, a failing one leaves the others intact.
    pub async fn load(&self, address: Option<Address>) -> PortfolioView {
        let Some(address) = address else {
            debug!("no connected address, skipping portfolio fetch");
            return PortfolioView::disconnected(self.native.clone());
        };

        let mut view = PortfolioView::loading(address, self.native.clone());
        let mut pending = self.fetches(address);
        while let Some(update) = pending.next().await {
            update.apply(&mut view);
        }

        debug!(
            %address,
            is_error = view.is_error(),
            failed = view.errors().len(),
            "portfolio loaded"
        );
        view
    }

    /// Loads the portfolio of the session address and displays it.
    ///
    /// The displayed view is updated as each query resolves, so sources
    /// that are ready show up while slower ones are still loading. Once the
    /// session switches address, remaining results are dropped. Refreshing
    /// the address already on display keeps its data until new results
    /// replace it.
    pub async fn refresh(&self, session: &WalletSession) -> RefreshOutcome {
        let requested = session.state();
        let Some(address) = requested.address() else {
            let view = PortfolioView::disconnected(self.native.clone());
            return self.show(session, requested, |slot| *slot = Some((requested, view)));
        };

        let outcome = self.show(session, requested, |slot| {
            let shown = slot
                .as_ref()
                .is_some_and(|(shown, _)| shown.generation() == requested.generation());
            if !shown {
                *slot = Some((requested, PortfolioView::loading(address, self.native.clone())));
            }
        });
        if outcome == RefreshOutcome::Discarded {
            return outcome;
        }

        let mut pending = self.fetches(address);
        while let Some(update) = pending.next().await {
            let outcome = self.show(session, requested, |slot| {
                if let Some((_, view)) = slot {
                    update.apply(view);
                }
            });
            if outcome == RefreshOutcome::Discarded {
                return outcome;
            }
        }
        RefreshOutcome::Applied
    }

    /// Runs `update` on the displayed slot unless `requested` is stale: the
    /// session moved on or a newer generation is already shown.
    fn show(
        &self,
        session: &WalletSession,
        requested: SessionState,
        update: impl FnOnce(&mut Displayed),
    ) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::Discarded;
        self.displayed.send_if_modified(|slot| {
            let current = session.state();
            let newer_shown = slot
                .as_ref()
                .is_some_and(|(shown, _)| shown.generation() > requested.generation());
            if current.generation() != requested.generation() || newer_shown {
                debug!(
                    requested = requested.generation(),
                    current = current.generation(),
                    "discarding stale portfolio"
                );
                return false;
            }
            update(slot);
            outcome = RefreshOutcome::Applied;
            true
        });
        outcome
    }

    /// Last displayed view.
    pub fn displayed(&self) -> Option<PortfolioView> {
        self.displayed.borrow().as_ref().map(|(_, view)| view.clone())
    }

    /// Receiver notified on every change of the displayed view.
    pub fn subscribe(&self) -> watch::Receiver<Displayed> {
        self.displayed.subscribe()
    }
}
