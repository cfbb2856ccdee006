//! Data models for the drink menu.

mod drink;

pub use drink::*;
