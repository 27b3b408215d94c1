// swapflow - non-custodial DEX swap engine

#![allow(dead_code)]

pub mod aggregator;
pub mod common;
pub mod config;
pub mod errors;
pub mod execution;
pub mod guards;
pub mod mocks;
pub mod providers;
pub mod session;
pub mod wallet;

// Core types
pub mod constants;
pub mod types;

// Re-exports for convenience
pub use aggregator::{QuoteAggregator, QuoteSelection, SelectionReason};
pub use config::Config;
pub use errors::{ErrorCategory, SwapError};
pub use execution::{TransactionSigner, UnsignedTransaction};
pub use guards::{evaluate as evaluate_guards, GuardEvaluation, PresetGuards};
pub use providers::{NormalizedQuote, ProviderKind, QuoteRequest, SwapProvider};
pub use session::{ConfirmOutcome, ControllerSettings, SwapLifecycleController, SwapStatus};
pub use types::Asset;
pub use wallet::{WalletEvent, WalletEventBroker};
