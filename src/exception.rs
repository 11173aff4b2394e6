//! Exceptions raised by test code.
//!
//! Test bodies report errors as values: every fallible piece of test code
//! returns `Result<_, Raise>`. A [`Raise`] is either the fail-fast signal
//! produced by a failed assertion (already recorded, stop the test) or an
//! [`Exception`] carrying an [`ExceptionKind`].
//!
//! Kinds form a single-inheritance hierarchy rooted at [`ERROR`], so an
//! expected-exception declaration naming [`ARITHMETIC`] also accepts a
//! [`DIVIDE_BY_ZERO`]. Kinds are identified by name.
//!
//! Panics are exceptions too. [`catch`] runs a closure under
//! `catch_unwind` and turns any panic into an `Exception` of kind [`PANIC`],
//! unless the payload already is an `Exception` (see
//! `std::panic::panic_any`).
use std::{
    any::Any,
    cell::{Cell, RefCell},
    error, fmt,
    num::{ParseFloatError, ParseIntError},
    panic::{self, AssertUnwindSafe, Location},
    sync::Once,
};

/// A named node in the exception hierarchy.
#[derive(Debug)]
pub struct ExceptionKind {
    name: &'static str,
    parent: Option<&'static ExceptionKind>,
}

impl ExceptionKind {
    /// A kind with no parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// A kind that descends from `parent`.
    pub const fn derived(
        name: &'static str,
        parent: &'static ExceptionKind,
    ) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static ExceptionKind> {
        self.parent
    }

    /// True when `self` is `ancestor` or one of its descendants.
    pub fn is_a(&self, ancestor: &ExceptionKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind.name == ancestor.name {
                return true;
            }
            current = kind.parent;
        }
        false
    }
}

impl PartialEq for ExceptionKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ExceptionKind {}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub static ERROR: ExceptionKind = ExceptionKind::root("Error");
pub static ARITHMETIC: ExceptionKind =
    ExceptionKind::derived("ArithmeticError", &ERROR);
pub static DIVIDE_BY_ZERO: ExceptionKind =
    ExceptionKind::derived("DivideByZeroError", &ARITHMETIC);
pub static NULL_REFERENCE: ExceptionKind =
    ExceptionKind::derived("NullReferenceError", &ERROR);
pub static ARGUMENT: ExceptionKind =
    ExceptionKind::derived("ArgumentError", &ERROR);
pub static OUT_OF_RANGE: ExceptionKind =
    ExceptionKind::derived("OutOfRangeError", &ARGUMENT);
pub static FORMAT: ExceptionKind =
    ExceptionKind::derived("FormatError", &ERROR);
pub static INVALID_OPERATION: ExceptionKind =
    ExceptionKind::derived("InvalidOperationError", &ERROR);
pub static IO: ExceptionKind = ExceptionKind::derived("IoError", &ERROR);
pub static PANIC: ExceptionKind = ExceptionKind::derived("Panic", &ERROR);

/// An error raised by test code.
#[derive(Debug, Clone)]
pub struct Exception {
    kind: &'static ExceptionKind,
    message: String,
    location: Option<String>,
}

impl Exception {
    /// Create an exception, remembering the caller's source location.
    #[track_caller]
    pub fn new(kind: &'static ExceptionKind, message: impl Into<String>) -> Self {
        let caller = Location::caller();
        Self {
            kind,
            message: message.into(),
            location: Some(format!("{}:{}", caller.file(), caller.line())),
        }
    }

    fn without_location(
        kind: &'static ExceptionKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn kind(&self) -> &'static ExceptionKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line` where the exception was created or the panic happened.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Build an exception out of a `catch_unwind` payload.
    pub(crate) fn from_panic(
        payload: Box<dyn Any + Send>,
        location: Option<String>,
    ) -> Self {
        let payload = match payload.downcast::<Exception>() {
            Ok(exception) => return *exception,
            Err(other) => other,
        };
        let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "panicked with a non-string payload".to_string()
        };
        Self {
            kind: &PANIC,
            message,
            location,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl error::Error for Exception {}

impl From<std::io::Error> for Exception {
    fn from(err: std::io::Error) -> Self {
        Exception::without_location(&IO, err.to_string())
    }
}

impl From<ParseIntError> for Exception {
    fn from(err: ParseIntError) -> Self {
        Exception::without_location(&FORMAT, err.to_string())
    }
}

impl From<ParseFloatError> for Exception {
    fn from(err: ParseFloatError) -> Self {
        Exception::without_location(&FORMAT, err.to_string())
    }
}

/// Why a piece of test code stopped early.
#[derive(Debug)]
pub enum Raise {
    /// An assertion failed. The failure is already recorded.
    FailFast,
    /// Test code raised an exception.
    Exception(Exception),
}

impl Raise {
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            Raise::FailFast => None,
            Raise::Exception(exception) => Some(exception),
        }
    }
}

impl From<Exception> for Raise {
    fn from(exception: Exception) -> Self {
        Raise::Exception(exception)
    }
}

impl From<std::io::Error> for Raise {
    fn from(err: std::io::Error) -> Self {
        Raise::Exception(err.into())
    }
}

impl From<ParseIntError> for Raise {
    fn from(err: ParseIntError) -> Self {
        Raise::Exception(err.into())
    }
}

impl From<ParseFloatError> for Raise {
    fn from(err: ParseFloatError) -> Self {
        Raise::Exception(err.into())
    }
}

/// Result of a piece of test code that produces no value.
pub type Outcome = Result<(), Raise>;

/// Raise an exception of the given kind from test code.
#[track_caller]
pub fn throw<T>(
    kind: &'static ExceptionKind,
    message: impl Into<String>,
) -> Result<T, Raise> {
    Err(Raise::Exception(Exception::new(kind, message)))
}

thread_local! {
    static CAPTURE_DEPTH: Cell<u32> = const { Cell::new(0) };
    static PANIC_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Wrap the process panic hook so panics raised under [`catch`] are not
/// reported on stderr. Panics elsewhere go to the previous hook.
fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURE_DEPTH.with(|depth| depth.get() > 0) {
                let location = info
                    .location()
                    .map(|loc| format!("{}:{}", loc.file(), loc.line()));
                PANIC_LOCATION.with(|slot| *slot.borrow_mut() = location);
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `body`, converting a panic into [`Raise::Exception`].
pub fn catch<T>(body: impl FnOnce() -> Result<T, Raise>) -> Result<T, Raise> {
    install_hook();
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let caught = panic::catch_unwind(AssertUnwindSafe(body));
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() - 1));

    caught.unwrap_or_else(|payload| {
        let location = PANIC_LOCATION.with(|slot| slot.borrow_mut().take());
        tracing::trace!(?location, "captured panic from test code");
        Err(Raise::Exception(Exception::from_panic(payload, location)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    static CUSTOM: ExceptionKind =
        ExceptionKind::derived("CustomError", &INVALID_OPERATION);

    #[test]
    fn kinds_match_themselves_and_ancestors() {
        assert!(DIVIDE_BY_ZERO.is_a(&DIVIDE_BY_ZERO));
        assert!(DIVIDE_BY_ZERO.is_a(&ARITHMETIC));
        assert!(DIVIDE_BY_ZERO.is_a(&ERROR));
        assert!(CUSTOM.is_a(&INVALID_OPERATION));
        assert!(!ARITHMETIC.is_a(&DIVIDE_BY_ZERO));
        assert!(!NULL_REFERENCE.is_a(&ARITHMETIC));
    }

    #[test]
    fn string_panics_become_panic_exceptions() {
        let res: Result<(), Raise> = catch(|| panic!("boom {}", 7));
        let exception = res.unwrap_err().exception().cloned().unwrap();
        assert_eq!(exception.kind(), &PANIC);
        assert_eq!(exception.message(), "boom 7");
        assert!(exception.location().unwrap().contains("exception.rs"));
    }

    #[test]
    fn exception_payloads_keep_their_kind() {
        let res: Result<(), Raise> = catch(|| {
            panic::panic_any(Exception::new(&NULL_REFERENCE, "no target"))
        });
        let exception = res.unwrap_err().exception().cloned().unwrap();
        assert_eq!(exception.kind(), &NULL_REFERENCE);
        assert_eq!(exception.to_string(), "NullReferenceError: no target");
    }

    #[test]
    fn returned_errors_pass_through() {
        let res: Result<u32, Raise> = catch(|| Ok("12x".parse::<u32>()?));
        let exception = res.unwrap_err().exception().cloned().unwrap();
        assert!(exception.kind().is_a(&FORMAT));

        assert!(matches!(catch(|| Err::<(), _>(Raise::FailFast)), Err(Raise::FailFast)));
        assert_eq!(catch(|| Ok(3)).ok(), Some(3));
    }
}
