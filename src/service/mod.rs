//! Persistence-backed services: each module owns one resource's queries.

pub mod cart;
pub mod catalog;
pub mod orders;
