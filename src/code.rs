//! Error codes - small signed integers with registered display names.

use std::fmt;

use crate::error::Error;
use crate::registry;

/// A signed error code with a process-wide registered display name.
///
/// The built-in table mirrors the gRPC status space, negated; application
/// codes live at or below [`Code::MIN_ERROR_CODE`] and are registered
/// through [`crate::register`] or [`crate::register_slot`].
///
/// A `Code` is itself a valid error value: its display name is its
/// message, and it compares by value. [`Code::OK`] is the zero value and
/// means "no code".
///
/// # Example
///
/// ```
/// use errtree::Code;
///
/// assert_eq!(Code::INTERNAL.to_string(), "INTERNAL");
/// assert_eq!(Code(12345).to_string(), "UNKNOWN");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code(pub i32);

impl Code {
    /// Success; the zero value, meaning "no code".
    pub const OK: Code = Code(0);
    /// The operation was canceled, typically by the caller.
    pub const CANCELED: Code = Code(-1);
    /// Unknown error, or an error converted from a space this process
    /// does not know about.
    pub const UNKNOWN: Code = Code(-2);
    /// The caller specified an invalid argument, regardless of system state.
    pub const INVALID_ARGUMENT: Code = Code(-3);
    /// The operation expired before completion.
    pub const DEADLINE_EXCEEDED: Code = Code(-4);
    /// A requested entity was not found.
    pub const NOT_FOUND: Code = Code(-5);
    /// An attempt to create an entity failed because one already exists.
    ///
    /// Also the sentinel returned by registry operations on collision.
    pub const ALREADY_EXISTS: Code = Code(-6);
    /// The caller lacks permission for the operation.
    pub const PERMISSION_DENIED: Code = Code(-7);
    /// Some resource (quota, disk) has been exhausted.
    pub const RESOURCE_EXHAUSTED: Code = Code(-8);
    /// The system is not in a state required for the operation.
    pub const FAILED_PRECONDITION: Code = Code(-9);
    /// The operation was aborted, typically a concurrency conflict.
    pub const ABORTED: Code = Code(-10);
    /// The operation was attempted past the valid range.
    pub const OUT_OF_RANGE: Code = Code(-11);
    /// The operation is not implemented or not enabled.
    pub const UNIMPLEMENTED: Code = Code(-12);
    /// An invariant expected by the underlying system was broken.
    pub const INTERNAL: Code = Code(-13);
    /// The service is currently unavailable; likely transient.
    pub const UNAVAILABLE: Code = Code(-14);
    /// Unrecoverable data loss or corruption.
    pub const DATA_LOSS: Code = Code(-15);
    /// The request lacks valid authentication credentials.
    pub const UNAUTHENTICATED: Code = Code(-16);
    /// A flow-control algorithm rejected the request.
    pub const RATE_LIMITED: Code = Code(-17);
    /// Malformed request.
    pub const BAD_REQUEST: Code = Code(-18);
    /// Conflicting state change.
    pub const CONFLICT: Code = Code(-19);
    /// The operation is forbidden.
    pub const FORBIDDEN: Code = Code(-20);
    /// Generic server-side failure.
    pub const INTERNAL_SERVER_ERROR: Code = Code(-21);
    /// The method is not allowed on the target.
    pub const METHOD_NOT_ALLOWED: Code = Code(-22);
    /// The operation timed out.
    pub const TIMEOUT: Code = Code(-23);
    /// Lower bound reserved for built-ins. Application codes must be
    /// `<= MIN_ERROR_CODE`.
    pub const MIN_ERROR_CODE: Code = Code(-1000);

    /// The raw integer value.
    pub fn value(self) -> i32 {
        self.0
    }

    /// True for the zero value.
    pub fn is_ok(self) -> bool {
        self == Code::OK
    }

    /// The display name bound in the default registry, or the UNKNOWN
    /// name for unbound codes. Never fails.
    pub fn name(self) -> String {
        registry::name_of(self)
    }

    /// Register `self` under `name` in the default registry.
    ///
    /// Returns `self` on success or idempotent re-registration, and
    /// [`Code::ALREADY_EXISTS`] on any collision.
    pub fn register(self, name: &str) -> Code {
        registry::register(self, name)
    }

    /// Build a coded error container with this code and `message`.
    #[track_caller]
    pub fn new_error(self, message: impl Into<String>) -> Error {
        Error::new(message).with_code(self)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&registry::name_of(*self))
    }
}

impl std::error::Error for Code {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_display() {
        assert_eq!(Code::OK.to_string(), "OK");
        assert_eq!(Code::CANCELED.to_string(), "CANCELLED");
        assert_eq!(Code::NOT_FOUND.to_string(), "NOT_FOUND");
        assert_eq!(Code::INTERNAL.to_string(), "INTERNAL");
    }

    #[test]
    fn test_unbound_falls_back_to_unknown() {
        assert_eq!(Code(-777).to_string(), "UNKNOWN");
        assert_eq!(Code(42).name(), "UNKNOWN");
    }

    #[test]
    fn test_value_comparison() {
        assert_eq!(Code::INTERNAL, Code(-13));
        assert_ne!(Code::INTERNAL, Code::NOT_FOUND);
        assert!(Code(-999) > Code::MIN_ERROR_CODE);
    }

    #[test]
    fn test_new_error_carries_code() {
        let err = Code::TIMEOUT.new_error("upstream took too long");
        assert_eq!(err.code(), Code::TIMEOUT);
        assert_eq!(err.message(), "upstream took too long");
    }
}
