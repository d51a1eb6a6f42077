//! Domain rules for the image template backend.
//!
//! Everything in this crate is free of database and HTTP concerns so it can
//! be shared by the repository layer, the API server, and the seeder.

pub mod asset;
pub mod error;
pub mod listing;
pub mod roles;
pub mod storage;
pub mod tags;
pub mod template;
pub mod types;
