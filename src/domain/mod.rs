//! Domain types and the pure pricing logic for cart and checkout.

pub mod cart;
pub mod catalog;
pub mod order;
