//! Route modules for the Koha sync server

pub mod health;
pub mod sync;
