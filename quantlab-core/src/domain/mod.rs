//! Domain types for QuantLab.

pub mod event;
pub mod fill;
pub mod ids;
pub mod order;
pub mod position;
pub mod snapshot;

pub use event::MarketEvent;
pub use fill::Fill;
pub use ids::{IdGen, OrderRef};
pub use order::{OrderIntent, OrderSide, OrderType, PendingOrder};
pub use position::Position;
pub use snapshot::PortfolioSnapshot;

/// Symbol type alias
pub type Symbol = String;
