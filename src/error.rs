//! The composite error value: a message, an optional code, and an
//! ordered tree of causes.

use std::any::{Any, TypeId};
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::code::Code;
use crate::matching::{self, AnyError, ArcError, DynError, Matchable};

type DebugValue = Arc<dyn fmt::Debug + Send + Sync>;

/// The composite error.
///
/// Holds a message (possibly a `{}` template), an optional [`Code`], and
/// an ordered list of sub-causes; the first cause is "the" primary cause.
/// Built through the fluent `with_*` chain and inspected through
/// [`crate::is`], [`crate::find_ref`], and [`Error::iterate_causes`].
///
/// A tree with no causes, no code, and no staged template arguments is
/// **empty** - a usable "no error yet" sentinel for the container
/// pattern:
///
/// ```
/// use errtree::{arc, Error};
///
/// fn copy_all() -> errtree::Result<()> {
///     let mut bucket = Error::new("copy failed");
///     for path in ["/no/such/a", "/no/such/b"] {
///         if let Err(e) = std::fs::metadata(path) {
///             bucket.attach([arc(e)]);
///         }
///     }
///     bucket.finish()
/// }
///
/// assert!(copy_all().is_err());
/// ```
///
/// After handoff a tree is immutable; the stepping cursor lives in the
/// iterator returned by [`Error::iterate_causes`], never in the tree
/// itself.
#[derive(Clone)]
pub struct Error {
    message: String,
    code: Code,
    causes: Vec<ArcError>,
    live_args: Vec<String>,
    data: Vec<DebugValue>,
    tagged: BTreeMap<String, DebugValue>,
    origin: &'static Location<'static>,
    backtrace: Option<Arc<Backtrace>>,
}

/// Wrap a foreign error into a new tree with the given message.
#[track_caller]
pub fn wrap(err: impl StdError + Send + Sync + 'static, message: impl Into<String>) -> Error {
    Error::new(message).with_cause(err)
}

impl Error {
    /// A new tree with an eagerly formatted message (use `format!` at the
    /// call site for arguments) and no code or causes.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
            code: Code::OK,
            causes: Vec::new(),
            live_args: Vec::new(),
            data: Vec::new(),
            tagged: BTreeMap::new(),
            origin: Location::caller(),
            backtrace: None,
        }
    }

    /// A new tree holding a reusable `{}` message template. Stamp out
    /// concrete instances with [`Error::format_with`].
    #[track_caller]
    pub fn templated(template: impl Into<String>) -> Self {
        Self::new(template)
    }

    /// A new tree carrying only a code.
    #[track_caller]
    pub fn coded(code: Code) -> Self {
        Self::new("").with_code(code)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// The raw message template (live arguments not substituted).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The code, [`Code::OK`] meaning "no code".
    pub fn code(&self) -> Code {
        self.code
    }

    /// The first cause, if any. Distinct from iteration: this never
    /// yields the code.
    pub fn cause(&self) -> Option<&DynError> {
        self.causes.first().map(|c| c.as_error())
    }

    /// The direct causes, in insertion order. A flat, one-level view;
    /// nested trees are not flattened into it.
    pub fn causes(&self) -> &[ArcError] {
        &self.causes
    }

    /// Where this tree was created.
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    /// The captured backtrace, if [`Error::with_backtrace`] was called.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }

    /// True iff there are no causes, no code, and no staged template
    /// arguments. The message alone does not make a tree non-empty.
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty() && self.code.is_ok() && self.live_args.is_empty()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Set the code.
    pub fn with_code(mut self, code: Code) -> Self {
        self.code = code;
        self
    }

    /// Replace the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Append causes. See [`Error::attach`] for the exact rules.
    pub fn with_errors<I>(mut self, errs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<ArcError>>,
    {
        self.attach(errs);
        self
    }

    /// Append a single concrete cause.
    pub fn with_cause(mut self, err: impl StdError + Send + Sync + 'static) -> Self {
        self.push_cause(err);
        self
    }

    /// Attach a foreign source error (anything convertible to
    /// `anyhow::Error`), keeping its own chain reachable.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = source.into().into();
        self.causes.push(Arc::new(SourceError(boxed)));
        self
    }

    /// Attach an opaque, Debug-renderable value. Shown in verbose output
    /// only; never consulted by matching and does not affect emptiness.
    pub fn with_data(mut self, value: impl fmt::Debug + Send + Sync + 'static) -> Self {
        self.data.push(Arc::new(value));
        self
    }

    /// Attach a tagged, Debug-renderable value.
    pub fn with_tagged(
        mut self,
        key: impl Into<String>,
        value: impl fmt::Debug + Send + Sync + 'static,
    ) -> Self {
        self.tagged.insert(key.into(), Arc::new(value));
        self
    }

    /// Capture a backtrace now and carry it for verbose rendering.
    pub fn with_backtrace(mut self) -> Self {
        self.backtrace = Some(Arc::new(Backtrace::capture()));
        self
    }

    // =========================================================================
    // Container mutation
    // =========================================================================

    /// Append each present cause, in order.
    ///
    /// Absent (`None`) entries are dropped silently - never an error. An
    /// entry that is itself an empty tree is dropped too, unless its
    /// rendered message is non-empty: an empty tree that still says
    /// something is kept for the text alone.
    pub fn attach<I>(&mut self, errs: I)
    where
        I: IntoIterator,
        I::Item: Into<Option<ArcError>>,
    {
        for e in errs {
            if let Some(e) = e.into() {
                self.append(e);
            }
        }
    }

    /// Append a single concrete cause in place.
    pub fn push_cause(&mut self, err: impl StdError + Send + Sync + 'static) {
        self.append(Arc::new(err));
    }

    fn append(&mut self, err: ArcError) {
        if let Some(tree) = err.as_any().downcast_ref::<Error>() {
            if tree.is_empty() && tree.to_string().is_empty() {
                return;
            }
        }
        self.causes.push(err);
    }

    /// Drop all causes, the code, and any staged state, returning the
    /// tree to the empty sentinel.
    pub fn clear(&mut self) {
        self.causes.clear();
        self.code = Code::OK;
        self.live_args.clear();
        self.data.clear();
        self.tagged.clear();
        self.backtrace = None;
    }

    /// Finalize the container pattern: `Err(self)` iff anything was
    /// collected, `Ok(())` for the empty sentinel.
    pub fn finish(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Stamp a concrete instance out of this template: a shallow clone
    /// sharing code, message, and causes, with `args` bound as fresh live
    /// arguments (stringified now, substituted into `{}` placeholders at
    /// render time).
    ///
    /// ```
    /// use errtree::Error;
    ///
    /// let template = Error::templated("no such bucket: {}");
    /// let err = template.format_with(["assets"]);
    /// assert_eq!(err.to_string(), "no such bucket: assets");
    /// assert!(template.is_descended(&err));
    /// ```
    pub fn format_with<I>(&self, args: I) -> Error
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        let mut instance = self.clone();
        instance.live_args = args.into_iter().map(|a| a.to_string()).collect();
        instance
    }

    /// Template/instance kinship: `other` is a tree with the same code
    /// and the same raw message template. A dedicated relation, distinct
    /// from matching.
    pub fn is_descended(&self, other: &DynError) -> bool {
        other
            .downcast_ref::<Error>()
            .is_some_and(|e| e.code == self.code && e.message == self.message)
    }

    fn rendered_message(&self) -> String {
        if self.live_args.is_empty() {
            return self.message.clone();
        }
        expand(&self.message, &self.live_args)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// [`crate::is`] with this tree as the error side.
    pub fn is(&self, target: &DynError) -> bool {
        matching::is(Some(self as &DynError), Some(target))
    }

    /// [`crate::type_is`] with this tree as the error side.
    pub fn type_is(&self, target: &dyn AnyError) -> bool {
        matching::type_is(self, target)
    }

    /// Step through the causes one at a time.
    ///
    /// Positions run over the causes in order, then - if a code is set -
    /// the code itself as a terminal cause. On exhaustion the iterator
    /// yields `None` once and resets, so the next call restarts from the
    /// first cause; it is deliberately not fused. Each iterator owns its
    /// own position: share one across owners and the interleaving is
    /// yours to define.
    pub fn iterate_causes(&self) -> CauseIter<'_> {
        CauseIter { err: self, pos: 0 }
    }

    /// The compact rendering, quoted.
    pub fn quoted(&self) -> String {
        format!("{:?}", self.to_string())
    }
}

impl Default for Error {
    fn default() -> Self {
        Error::new("")
    }
}

impl From<Code> for Error {
    fn from(code: Code) -> Self {
        Error::coded(code)
    }
}

/// Substitute `args` into `{}` placeholders, left to right. Placeholders
/// beyond the argument list stay verbatim; surplus arguments are ignored.
fn expand(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    let mut args = args.iter();
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(a) => out.push_str(a),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// Stepping iterator over a tree's causes. See [`Error::iterate_causes`].
pub struct CauseIter<'a> {
    err: &'a Error,
    pos: usize,
}

impl<'a> Iterator for CauseIter<'a> {
    type Item = &'a DynError;

    fn next(&mut self) -> Option<&'a DynError> {
        let err = self.err;
        if self.pos < err.causes.len() {
            let item = err.causes[self.pos].as_error();
            self.pos += 1;
            return Some(item);
        }
        if self.pos == err.causes.len() && !err.code.is_ok() {
            self.pos += 1;
            return Some(&err.code);
        }
        // exhausted: reset so the next call restarts from the first cause
        self.pos = 0;
        None
    }
}

/// Keeps an anyhow-boxed foreign source addressable inside the tree; the
/// original error stays one `source()` step below.
struct SourceError(Box<dyn StdError + Send + Sync + 'static>);

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl StdError for SourceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.0.as_ref())
    }
}

impl Matchable for Error {
    fn matches(&self, target: &DynError) -> bool {
        if let Some(code) = target.downcast_ref::<Code>() {
            if *code == self.code {
                return true;
            }
        }
        if matching::is_slice(&self.causes, target) {
            return true;
        }
        if let Some(peer) = target.downcast_ref::<Error>() {
            if peer.code == self.code && peer.message == self.message {
                // Inherited: a matching pair decides *against* equality
                // here, and the first one decides. Kept as-is; see
                // DESIGN.md before touching.
                for (theirs, ours) in peer.causes.iter().zip(self.causes.iter()) {
                    if matching::is(Some(theirs.as_error()), Some(ours.as_error())) {
                        return false;
                    }
                }
                return true;
            }
        }
        false
    }

    fn find_any(&self, want: TypeId) -> Option<&dyn Any> {
        if want == TypeId::of::<Code>() && !self.code.is_ok() {
            return Some(&self.code);
        }
        if want == TypeId::of::<Error>() {
            return Some(self);
        }
        if want == TypeId::of::<Vec<ArcError>>() {
            return Some(&self.causes);
        }
        for child in &self.causes {
            if child.as_any().type_id() == want {
                return Some(child.as_any());
            }
            if let Some(m) = matching::as_matchable(child.as_error()) {
                if let Some(hit) = m.find_any(want) {
                    return Some(hit);
                }
            }
        }
        None
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause()
    }
}

// =============================================================================
// Display - compact, single-line format
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = self.rendered_message();
        f.write_str(&msg)?;
        if !self.causes.is_empty() {
            if !msg.is_empty() {
                f.write_str(" ")?;
            }
            f.write_str("[")?;
            for (i, c) in self.causes.iter().enumerate() {
                if i > 0 {
                    f.write_str(" | ")?;
                }
                write!(f, "{}", c)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = self.rendered_message();
        match (msg.is_empty(), self.code.is_ok()) {
            (false, false) => write!(f, "{} ({})", msg, self.code)?,
            (false, true) => f.write_str(&msg)?,
            (true, false) => write!(f, "({})", self.code)?,
            (true, true) => f.write_str("(empty)")?,
        }

        if !self.causes.is_empty() {
            write!(f, "\n    Causes:")?;
            for (i, c) in self.causes.iter().enumerate() {
                let rendered = match c.as_any().downcast_ref::<Error>() {
                    Some(tree) => format!("{:?}", tree),
                    None => c.to_string(),
                };
                write!(f, "\n        {}. {}", i + 1, rendered.replace('\n', "\n        "))?;
            }
        }

        if !self.data.is_empty() {
            write!(f, "\n    Data:")?;
            for (i, d) in self.data.iter().enumerate() {
                write!(f, "\n        {}. {:?}", i + 1, d)?;
            }
        }

        if !self.tagged.is_empty() {
            write!(f, "\n    Tagged:")?;
            for (k, v) in &self.tagged {
                write!(f, "\n        {} => {:?}", k, v)?;
            }
        }

        write!(f, "\n    Origin: {}", self.origin)?;
        if let Some(bt) = &self.backtrace {
            write!(f, "\n    Backtrace:\n{}", bt)?;
        }
        Ok(())
    }
}
