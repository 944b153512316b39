//! The matching engine: `is`, `find`, and cause-tree traversal.
//!
//! All walks operate on `&dyn std::error::Error`, so foreign errors that
//! only implement the standard single-cause `source()` contract
//! participate in chains alongside [`Error`](crate::Error) trees. Types
//! that want a say in matching implement [`Matchable`]; the engine
//! discovers the capability through a single downcast probe.
//!
//! Matching never allocates into the tree, never mutates it, and fails
//! locally: a miss at one node just moves the search to the next sibling
//! or cause.

use std::any::{Any, TypeId};
use std::error::Error as StdError;
use std::sync::Arc;

use crate::code::Code;
use crate::error::Error;

/// The node type walked by the engine.
pub type DynError = dyn StdError + 'static;

/// Object-safe view of a concrete error, blanket-implemented for every
/// `Error + Send + Sync + 'static` type.
///
/// `as_any` recovers the concrete `TypeId` that `dyn Error` hides, which
/// is what type-identity matching and capability extraction are built on;
/// `as_error` re-enters the plain `source()` world.
pub trait AnyError: StdError + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn as_error(&self) -> &DynError;
}

impl<T: StdError + Send + Sync + 'static> AnyError for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_error(&self) -> &DynError {
        self
    }
}

/// A shared handle to a cause.
///
/// `Arc` sharing is what gives two holders of the same error the aliasing
/// that identity matching relies on: attach a clone of the handle, keep
/// the other, and [`is`] will recognize them as the same error.
pub type ArcError = Arc<dyn AnyError>;

/// Wrap a concrete error into a shareable cause handle.
pub fn arc(err: impl StdError + Send + Sync + 'static) -> ArcError {
    Arc::new(err)
}

/// Opt-in matching capability.
///
/// `matches` is consulted by [`is`] before any descent; `find_any` is the
/// extraction hook behind [`find_ref`], keyed by `TypeId` so it stays
/// object-safe. Implemented by [`Error`] and [`Code`].
pub trait Matchable {
    /// Does this error consider itself a match for `target`?
    fn matches(&self, target: &DynError) -> bool;

    /// A reference to a value of type `want` carried by this error, if any.
    fn find_any(&self, want: TypeId) -> Option<&dyn Any>;
}

impl Matchable for Code {
    fn matches(&self, target: &DynError) -> bool {
        target.downcast_ref::<Code>().is_some_and(|c| c == self)
    }

    fn find_any(&self, want: TypeId) -> Option<&dyn Any> {
        (want == TypeId::of::<Code>()).then_some(self as &dyn Any)
    }
}

/// Probe for the [`Matchable`] capability.
pub(crate) fn as_matchable(err: &DynError) -> Option<&dyn Matchable> {
    if let Some(tree) = err.downcast_ref::<Error>() {
        return Some(tree);
    }
    if let Some(code) = err.downcast_ref::<Code>() {
        return Some(code);
    }
    None
}

/// Value identity: the same (non-zero-sized) allocation, or two codes
/// equal by value. Zero-sized errors carry no allocation identity and
/// only match through [`type_is`]/[`has_type`] or a capability.
fn value_eq(err: &DynError, target: &DynError) -> bool {
    if std::mem::size_of_val(err) > 0
        && std::mem::size_of_val(target) > 0
        && std::ptr::eq(
            err as *const DynError as *const u8,
            target as *const DynError as *const u8,
        )
    {
        return true;
    }
    match (err.downcast_ref::<Code>(), target.downcast_ref::<Code>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// One generic unwrap step: the standard single-cause contract.
pub fn unwrap_once(err: &DynError) -> Option<&DynError> {
    err.source()
}

/// Reports whether any error in `err`'s tree matches `target`.
///
/// An absent target matches exactly an absent error. Otherwise each node
/// is tested in order: value identity, the node's own [`Matchable`]
/// verdict, and - when the target is not itself a [`Code`] - the text
/// fallback that treats a plain error whose message case-insensitively
/// equals the rendered name of a code found under `err` as a match for
/// that code's kind. A tree node then descends into every direct cause,
/// depth-first with short-circuit; a foreign node steps through
/// `source()`. Only `err` advances - `target` is never rewritten.
///
/// The text fallback is approximate by design and its position in the
/// order above is part of the contract; [`is_std`] is the strict variant
/// without it. Cause trees are finite by construction, so the walk
/// carries no cycle guard.
pub fn is(err: Option<&DynError>, target: Option<&DynError>) -> bool {
    let Some(target) = target else {
        return err.is_none();
    };
    let Some(mut err) = err else {
        return false;
    };
    let target_is_code = target.downcast_ref::<Code>().is_some();
    let target_text = target.to_string();
    loop {
        if value_eq(err, target) {
            return true;
        }
        if let Some(m) = as_matchable(err) {
            if m.matches(target) {
                return true;
            }
        }
        if !target_is_code {
            if let Some(code) = find_code(err) {
                if code.name().eq_ignore_ascii_case(&target_text) {
                    return true;
                }
            }
        }
        if let Some(tree) = err.downcast_ref::<Error>() {
            return tree
                .causes()
                .iter()
                .any(|c| is(Some(c.as_error()), Some(target)));
        }
        match err.source() {
            Some(next) => err = next,
            None => return false,
        }
    }
}

/// [`is`] without the code-name text fallback: value identity and
/// [`Matchable`] verdicts only.
pub fn is_std(err: Option<&DynError>, target: Option<&DynError>) -> bool {
    let Some(target) = target else {
        return err.is_none();
    };
    let Some(mut err) = err else {
        return false;
    };
    loop {
        if value_eq(err, target) {
            return true;
        }
        if let Some(m) = as_matchable(err) {
            if m.matches(target) {
                return true;
            }
        }
        if let Some(tree) = err.downcast_ref::<Error>() {
            return tree
                .causes()
                .iter()
                .any(|c| is_std(Some(c.as_error()), Some(target)));
        }
        match err.source() {
            Some(next) => err = next,
            None => return false,
        }
    }
}

/// True if [`is`] holds for any of `targets`.
pub fn is_any_of<'a, I>(err: Option<&DynError>, targets: I) -> bool
where
    I: IntoIterator<Item = &'a DynError>,
{
    targets.into_iter().any(|t| is(err, Some(t)))
}

/// Finds the first error in `err`'s chain whose concrete type is `T`.
///
/// Each node is tried by downcast first, then through its [`Matchable`]
/// extraction hook (which is how a tree yields its code, its causes, or a
/// match buried in a direct cause), then the walk steps `source()`.
pub fn find_ref<'a, T: StdError + 'static>(err: &'a DynError) -> Option<&'a T> {
    let mut cur = Some(err);
    while let Some(node) = cur {
        if let Some(hit) = node.downcast_ref::<T>() {
            return Some(hit);
        }
        if let Some(m) = as_matchable(node) {
            if let Some(any) = m.find_any(TypeId::of::<T>()) {
                if let Some(hit) = any.downcast_ref::<T>() {
                    return Some(hit);
                }
            }
        }
        cur = node.source();
    }
    None
}

/// Extracts a [`Code`] from anywhere in `err`'s tree.
pub fn find_code(err: &DynError) -> Option<Code> {
    find_ref::<Code>(err).copied()
}

/// Extracts the direct-causes list of the nearest tree in `err`'s chain.
pub fn find_causes(err: &DynError) -> Option<&[ArcError]> {
    let mut cur = Some(err);
    while let Some(node) = cur {
        if let Some(m) = as_matchable(node) {
            if let Some(any) = m.find_any(TypeId::of::<Vec<ArcError>>()) {
                return any.downcast_ref::<Vec<ArcError>>().map(Vec::as_slice);
            }
        }
        cur = node.source();
    }
    None
}

/// [`is`] over an explicit list instead of a chain: a value-identity pass
/// over every element, then a [`Matchable`] pass over every element. Used
/// by the tree so "does this error match X" means "does any direct cause
/// match X", not "does the deep chain under the first cause match X".
pub fn is_slice(errs: &[ArcError], target: &DynError) -> bool {
    for e in errs {
        if value_eq(e.as_error(), target) {
            return true;
        }
    }
    for e in errs {
        if let Some(m) = as_matchable(e.as_error()) {
            if m.matches(target) {
                return true;
            }
        }
    }
    false
}

/// [`find_ref`] over an explicit list: per element, downcast first, then
/// the element's own extraction hook.
pub fn find_in_slice<T: StdError + 'static>(errs: &[ArcError]) -> Option<&T> {
    for e in errs {
        if let Some(hit) = e.as_any().downcast_ref::<T>() {
            return Some(hit);
        }
        if let Some(m) = as_matchable(e.as_error()) {
            if let Some(any) = m.find_any(TypeId::of::<T>()) {
                if let Some(hit) = any.downcast_ref::<T>() {
                    return Some(hit);
                }
            }
        }
    }
    None
}

/// Like [`is_slice`] but the first pass compares concrete types instead
/// of values.
pub fn type_is_slice(errs: &[ArcError], target: &dyn AnyError) -> bool {
    let want = target.as_any().type_id();
    for e in errs {
        if e.as_any().type_id() == want {
            return true;
        }
    }
    for e in errs {
        if let Some(m) = as_matchable(e.as_error()) {
            if m.matches(target.as_error()) {
                return true;
            }
        }
    }
    false
}

/// Like [`is`] but matches on concrete-type identity: "is an error of
/// this same shape anywhere in the tree", regardless of value.
///
/// Tree descent compares every direct cause's type, so a different
/// instance of an attached cause's type still matches. Past the first
/// `source()` step of a foreign chain, concrete types are opaque; those
/// nodes participate through their [`Matchable`] capability only -
/// [`has_type`] is the fully typed alternative for foreign chains.
pub fn type_is(err: &dyn AnyError, target: &dyn AnyError) -> bool {
    if err.as_any().type_id() == target.as_any().type_id() {
        return true;
    }
    if let Some(m) = as_matchable(err.as_error()) {
        if m.matches(target.as_error()) {
            return true;
        }
    }
    if let Some(tree) = err.as_any().downcast_ref::<Error>() {
        return tree.causes().iter().any(|c| type_is(c.as_ref(), target));
    }
    let mut cur = err.as_error().source();
    while let Some(node) = cur {
        if let Some(m) = as_matchable(node) {
            if m.matches(target.as_error()) {
                return true;
            }
        }
        if let Some(tree) = node.downcast_ref::<Error>() {
            return tree.causes().iter().any(|c| type_is(c.as_ref(), target));
        }
        cur = node.source();
    }
    false
}

/// True if an error of concrete type `T` is reachable from `err`.
pub fn has_type<T: StdError + 'static>(err: &DynError) -> bool {
    find_ref::<T>(err).is_some()
}

/// Template/instance kinship: true when `ancestor` is a tree and
/// `descendant` was stamped out of it (identical code and raw message
/// template), typically via [`Error::format_with`].
pub fn is_descended(ancestor: &DynError, descendant: &DynError) -> bool {
    ancestor
        .downcast_ref::<Error>()
        .is_some_and(|tree| tree.is_descended(descendant))
}

/// Depth-first visit of `err` and everything under it: every direct cause
/// of a tree, recursively, or the `source()` chain of a foreign error.
/// The visitor returns `true` to stop early; `walk` reports whether it
/// was stopped.
pub fn walk(err: &DynError, mut visit: impl FnMut(&DynError) -> bool) -> bool {
    walk_inner(err, &mut visit)
}

fn walk_inner(err: &DynError, visit: &mut dyn FnMut(&DynError) -> bool) -> bool {
    if visit(err) {
        return true;
    }
    if let Some(tree) = err.downcast_ref::<Error>() {
        for c in tree.causes() {
            if walk_inner(c.as_error(), visit) {
                return true;
            }
        }
        return false;
    }
    match err.source() {
        Some(next) => walk_inner(next, visit),
        None => false,
    }
}
