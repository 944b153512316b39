//! # errtree
//!
//! Error values that form a **tree of causes** rather than a linear
//! chain: an error may hold zero, one, or many sub-causes plus an
//! optional numeric code, and the inspection primitives walk the whole
//! tree while staying compatible with foreign `std::error::Error` values
//! that only speak the single-cause `source()` contract.
//!
//! ## Design Philosophy
//!
//! - **Code**: a small signed integer with a registered display name,
//!   itself a valid error value (`Code::NOT_FOUND` can be attached,
//!   matched, and extracted like any other error)
//! - **Error**: the composite value - message template, code, and an
//!   ordered list of causes; the first cause is the primary one
//! - **Matching**: [`is`] answers "is this kind of failure in there?",
//!   [`find_ref`] pulls a typed value out, [`type_is`] matches by shape
//! - **Registry**: an explicit, lockable code/name table; the
//!   process-wide default is just a shared instance of it
//!
//! ## Usage
//!
//! ```rust
//! use errtree::{arc, AnyError, Code, Error};
//!
//! let missing = arc(std::io::Error::new(
//!     std::io::ErrorKind::NotFound,
//!     "index.db missing",
//! ));
//!
//! let err = Error::new("open catalog")
//!     .with_errors([missing.clone()])
//!     .with_code(Code::NOT_FOUND);
//!
//! assert!(err.is(&Code::NOT_FOUND));
//! assert!(err.is(missing.as_error()));
//! assert_eq!(errtree::find_code(&err), Some(Code::NOT_FOUND));
//! assert_eq!(err.to_string(), "open catalog [index.db missing]");
//! ```
//!
//! Application codes come from the registry:
//!
//! ```rust
//! use errtree::{register_slot, Code};
//!
//! let cannot_ack = register_slot(3, "CANNOT_ACK");
//! assert_eq!(cannot_ack, Code(-1003));
//! assert_eq!(cannot_ack.to_string(), "CANNOT_ACK");
//! ```
//!
//! ## Principles
//!
//! - Attaching an absent error is always a no-op, never a failure
//! - A failed match is a `false`/`None`, never a panic; registry
//!   collisions come back as the `ALREADY_EXISTS` sentinel
//! - Trees are immutable after handoff; the stepping cursor lives in the
//!   iterator from [`Error::iterate_causes`], so sharing a tree is safe
//!   and sharing an iterator is the caller's problem
//! - Matching walks values, capabilities, then structure, in that order;
//!   nothing is thrown across the tree

mod code;
mod error;
mod matching;
mod registry;

pub use code::Code;
pub use error::{wrap, CauseIter, Error};
pub use matching::{
    arc, find_causes, find_code, find_in_slice, find_ref, has_type, is, is_any_of, is_descended,
    is_slice, is_std, type_is, type_is_slice, unwrap_once, walk, AnyError, ArcError, DynError,
    Matchable,
};
pub use registry::{default_registry, name_of, register, register_slot, Registry};

/// Result type alias using the tree error.
pub type Result<T> = std::result::Result<T, Error>;
