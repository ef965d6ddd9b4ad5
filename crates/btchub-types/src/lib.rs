pub mod api;
pub mod legislation;
pub mod liquidity;
pub mod models;
