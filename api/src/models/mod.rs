pub mod api;
pub mod chain;
pub mod db;
pub mod translation;

#[cfg(test)]
mod tests;

pub use api::*;
pub use chain::*;
pub use db::*;
