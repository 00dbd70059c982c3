//! Reshaping of ledger and market data for display and export

pub mod charts;
pub mod cumulative;
pub mod eps;
pub mod export;
pub mod ledger;

pub use cumulative::{DailyTotal, cumulative_gain_loss};
pub use eps::{EpsKind, EpsPoint, eps_long};
pub use ledger::{Brokerage, ConvertedLot, LedgerSummary, Lot, convert_lots, parse_ledger, summarize};
