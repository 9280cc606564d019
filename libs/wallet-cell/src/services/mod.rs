// libs/wallet-cell/src/services/mod.rs

pub mod ledger;
pub mod subscription;

pub use ledger::WalletLedgerService;
pub use subscription::SubscriptionAccountService;
