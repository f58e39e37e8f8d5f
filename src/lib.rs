pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod deck;
pub mod domain;
pub mod srs;
pub mod study;
pub mod sync;

#[cfg(test)]
pub mod testing;
