//! A server-side adapter for the w2ui grid protocol.
//!
//! Grids post their commands to `/grids/{grid}`; the adapter translates them
//! into queries and mutations against a SQLite database and answers with the
//! envelope the grid expects.

pub mod cli;
pub mod error;
pub mod grid;
pub mod health;
pub mod routes;
pub mod state;
