//! # parlance-shared
//!
//! Domain types shared by the Parlance store and client crates: message
//! identifiers, the origin flag, messages, fetched pages and the accumulated
//! paginated result.  Nothing in here performs I/O.

pub mod constants;
pub mod error;
pub mod types;

pub use error::SharedError;
pub use types::{Message, MessageHash, Origin, Page, PaginatedResult};
