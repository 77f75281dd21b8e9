//! Core types and trait definitions for the FIA reduction database.
//!
//! This crate is deliberately free of database dependencies. Storage
//! backends implement [`store::ReductionStore`]; collaborators (run
//! detection, job workers, rerun requests) hand it already-parsed payloads
//! from [`event`].

// `ReductionStore` spells out `Send` futures itself; implementors may still
// write plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod event;
pub mod instrument;
pub mod job;
pub mod owner;
pub mod record;
pub mod run;
pub mod script;
pub mod store;

pub use error::{Error, Result};
pub use record::SameRecord;
