//! Built-in strategies.

pub mod buy_and_hold;
pub mod ma_crossover;
pub mod rsi_reversion;

pub use buy_and_hold::BuyAndHold;
pub use ma_crossover::MaCrossover;
pub use rsi_reversion::RsiReversion;
