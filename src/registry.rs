//! Process-wide registry mapping codes to display names.
//!
//! The registry is an explicit, constructible object; the process-wide
//! default used by [`Code`]'s `Display` is a lazily-built instance of the
//! same type. Both directions of the mapping live behind a single lock so
//! a registration is observed atomically.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::code::Code;

/// Names seeded into every registry at construction.
const BUILTINS: &[(Code, &str)] = &[
    (Code::OK, "OK"),
    (Code::CANCELED, "CANCELLED"),
    (Code::UNKNOWN, "UNKNOWN"),
    (Code::INVALID_ARGUMENT, "INVALID_ARGUMENT"),
    (Code::DEADLINE_EXCEEDED, "DEADLINE_EXCEEDED"),
    (Code::NOT_FOUND, "NOT_FOUND"),
    (Code::ALREADY_EXISTS, "ALREADY_EXISTS"),
    (Code::PERMISSION_DENIED, "PERMISSION_DENIED"),
    (Code::RESOURCE_EXHAUSTED, "RESOURCE_EXHAUSTED"),
    (Code::FAILED_PRECONDITION, "FAILED_PRECONDITION"),
    (Code::ABORTED, "ABORTED"),
    (Code::OUT_OF_RANGE, "OUT_OF_RANGE"),
    (Code::UNIMPLEMENTED, "UNIMPLEMENTED"),
    (Code::INTERNAL, "INTERNAL"),
    (Code::UNAVAILABLE, "UNAVAILABLE"),
    (Code::DATA_LOSS, "DATA_LOSS"),
    (Code::UNAUTHENTICATED, "UNAUTHENTICATED"),
    (Code::RATE_LIMITED, "RATE_LIMITED"),
    (Code::BAD_REQUEST, "BAD_REQUEST"),
    (Code::CONFLICT, "CONFLICT"),
    (Code::FORBIDDEN, "FORBIDDEN"),
    (Code::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR"),
    (Code::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
    (Code::TIMEOUT, "TIMEOUT"),
];

struct Tables {
    by_name: HashMap<String, Code>,
    by_code: HashMap<Code, String>,
}

/// A bidirectional code/name table.
///
/// Registrations are collision-safe: a name or number already bound to a
/// different partner is rejected with the [`Code::ALREADY_EXISTS`]
/// sentinel and the table is left unchanged. There is no unregistration;
/// bindings live as long as the registry.
pub struct Registry {
    inner: RwLock<Tables>,
}

impl Registry {
    /// A fresh registry with the built-in names seeded.
    pub fn new() -> Self {
        let mut by_name = HashMap::with_capacity(BUILTINS.len() * 2);
        let mut by_code = HashMap::with_capacity(BUILTINS.len() * 2);
        for &(code, name) in BUILTINS {
            by_name.insert(name.to_string(), code);
            by_code.insert(code, name.to_string());
        }
        Registry {
            inner: RwLock::new(Tables { by_name, by_code }),
        }
    }

    /// Bind `code` to `name` in both directions.
    ///
    /// Returns `code` unchanged on success; exact re-registration of an
    /// existing pair is a no-op that also returns `code`. Returns
    /// [`Code::ALREADY_EXISTS`] without changing anything when `code` is
    /// outside the application range (above [`Code::MIN_ERROR_CODE`]), or
    /// when either side of the pair is already bound to a different
    /// partner.
    pub fn register(&self, code: Code, name: &str) -> Code {
        if code > Code::MIN_ERROR_CODE {
            warn!(code = code.value(), name, "code outside application range");
            return Code::ALREADY_EXISTS;
        }
        let mut tables = self.inner.write();
        let bound_code = tables.by_name.get(name).copied();
        let bound_name = tables.by_code.get(&code).cloned();
        match (bound_code, bound_name) {
            (Some(other), _) if other != code => {
                warn!(code = code.value(), name, "name already bound");
                Code::ALREADY_EXISTS
            }
            (_, Some(ref other)) if other != name => {
                warn!(code = code.value(), name, "code already bound");
                Code::ALREADY_EXISTS
            }
            (Some(_), Some(_)) => code,
            _ => {
                tables.by_name.insert(name.to_string(), code);
                tables.by_code.insert(code, name.to_string());
                trace!(code = code.value(), name, "registered error code");
                code
            }
        }
    }

    /// Allocate an application code from a small slot number.
    ///
    /// A positive `slot` maps deterministically into the application
    /// range: slot `n` is always `MIN_ERROR_CODE - n` (slot 3 yields
    /// -1003 on every call). A negative `slot` below the application
    /// bound is used as-is. Anything else is rejected with
    /// [`Code::ALREADY_EXISTS`]. Delegates the binding to
    /// [`Registry::register`].
    pub fn register_slot(&self, slot: i32, name: &str) -> Code {
        if slot > 0 {
            self.register(Code(Code::MIN_ERROR_CODE.value() - slot), name)
        } else if Code(slot) < Code::MIN_ERROR_CODE {
            self.register(Code(slot), name)
        } else {
            Code::ALREADY_EXISTS
        }
    }

    /// The name bound to `code`, or the UNKNOWN name for unbound codes.
    pub fn name_of(&self, code: Code) -> String {
        let tables = self.inner.read();
        match tables.by_code.get(&code) {
            Some(name) => name.clone(),
            None => tables
                .by_code
                .get(&Code::UNKNOWN)
                .cloned()
                .unwrap_or_else(|| "UNKNOWN".to_string()),
        }
    }

    /// True if `code` has a binding.
    pub fn is_registered(&self, code: Code) -> bool {
        self.inner.read().by_code.contains_key(&code)
    }

    /// The code bound to `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<Code> {
        self.inner.read().by_name.get(name).copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

static DEFAULT: Lazy<Registry> = Lazy::new(Registry::new);

/// The process-wide default registry, used by [`Code`]'s `Display`.
pub fn default_registry() -> &'static Registry {
    &DEFAULT
}

/// Register `code` under `name` in the default registry.
pub fn register(code: Code, name: &str) -> Code {
    DEFAULT.register(code, name)
}

/// Allocate a slot in the default registry. See [`Registry::register_slot`].
pub fn register_slot(slot: i32, name: &str) -> Code {
    DEFAULT.register_slot(slot, name)
}

/// The name bound to `code` in the default registry.
pub fn name_of(code: Code) -> String {
    DEFAULT.name_of(code)
}
