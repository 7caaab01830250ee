//! The closed economy: markets, fiscal flows, merchants, and the
//! conservation audit.
//!
//! One rule binds everything here: **no code path mints crowns**. Every
//! crown that leaves an account arrives in another -- taxes and decay flow
//! agent→treasury, wages and welfare flow treasury→agent, trades flow
//! buyer→seller, consignment flows treasury→agent and back. The
//! [`conservation`] module computes the aggregate the integration tests
//! hold constant.

pub mod circuit;
pub mod conservation;
pub mod market;
pub mod merchant;
pub mod transfer;
pub mod welfare;

pub use circuit::run_circuit_breakers;
pub use conservation::total_crowns;
pub use market::{buy_food, resolve_market, MarketReport};
pub use merchant::run_merchant_pass;
pub use transfer::move_crowns;
pub use welfare::{run_daily_fiscal, FiscalReport};
