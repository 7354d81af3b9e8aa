//! Remote document store access.
//!
//! [`DocumentStore`] is the vendor-neutral contract the upload pipeline is
//! written against; [`GraphStore`] implements it on top of the Microsoft
//! Graph drive API of a SharePoint site.

pub mod auth;
pub mod client;
pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
mod path;
pub mod store;

pub use auth::{Credentials, TokenProvider};
pub use client::{GraphConfig, GraphStore};
pub use error::StoreError;
#[cfg(feature = "memory")]
pub use memory::{MemoryStore, StoreCall};
pub use store::{DocumentStore, StoreFuture};

#[cfg(test)]
mod mock;
