//! Persisted row types and queries, one module per table.

pub mod countries;
pub mod games;
pub mod leagues;
pub mod seasons;
pub mod teams;
pub mod users;
