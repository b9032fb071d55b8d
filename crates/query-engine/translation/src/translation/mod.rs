//! Translate incoming grid requests to execution plans (SQL) to be run against the database.

pub mod error;
pub mod helpers;
pub mod mutation;
pub mod query;
pub mod record;
