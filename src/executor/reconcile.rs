//! Reconcile a test's expected-exception declaration with what its body
//! actually raised.
use super::results::AssertionOutcome;
use crate::exception::{Exception, ExceptionKind};

/// Exception kinds a test is allowed (and required) to raise. Empty means
/// no exception is expected.
#[derive(Debug, Clone, Default)]
pub struct ExpectedExceptions {
    allowed: Vec<&'static ExceptionKind>,
}

impl ExpectedExceptions {
    pub fn allow(&mut self, kind: &'static ExceptionKind) {
        if !self.allowed.iter().any(|known| *known == kind) {
            self.allowed.push(kind);
        }
    }

    pub fn allowed(&self) -> &[&'static ExceptionKind] {
        &self.allowed
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// True if `exception` is of an allowed kind or a descendant of one.
    pub fn accepts(&self, exception: &Exception) -> bool {
        self.allowed
            .iter()
            .any(|allowed| exception.kind().is_a(allowed))
    }
}

/// Decide whether the captured exception (if any) matches the
/// declaration. Returns the failure to record, or `None` when there is
/// nothing to record.
pub fn reconcile(
    expected: &ExpectedExceptions,
    captured: Option<&Exception>,
) -> Option<AssertionOutcome> {
    match (expected.is_empty(), captured) {
        (false, Some(exception)) if expected.accepts(exception) => None,
        (false, Some(exception)) => {
            let mut msg = String::from(
                "Expected one type of exception, but got another.  Expected one of:",
            );
            for kind in expected.allowed() {
                msg.push(' ');
                msg.push_str(kind.name());
            }
            Some(AssertionOutcome::failure(msg, None, Some(exception.clone())))
        }
        (false, None) => Some(AssertionOutcome::failure(
            "Expected an exception, but did not get one.",
            None,
            None,
        )),
        (true, Some(exception)) => Some(AssertionOutcome::failure(
            "Unexpected exception.",
            None,
            Some(exception.clone()),
        )),
        (true, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::{ARITHMETIC, DIVIDE_BY_ZERO, ERROR, NULL_REFERENCE};

    fn expecting(kinds: &[&'static ExceptionKind]) -> ExpectedExceptions {
        let mut expected = ExpectedExceptions::default();
        kinds.iter().for_each(|kind| expected.allow(*kind));
        expected
    }

    #[test]
    fn matching_and_descendant_kinds_pass() {
        let expected = expecting(&[&ARITHMETIC]);
        let exact = Exception::new(&ARITHMETIC, "x");
        let child = Exception::new(&DIVIDE_BY_ZERO, "x");
        assert!(reconcile(&expected, Some(&exact)).is_none());
        assert!(reconcile(&expected, Some(&child)).is_none());
    }

    #[test]
    fn wrong_kind_names_the_allowed_kinds() {
        let expected = expecting(&[&NULL_REFERENCE, &ARITHMETIC]);
        let thrown = Exception::new(&ERROR, "generic");
        let outcome = reconcile(&expected, Some(&thrown)).unwrap();
        assert_eq!(
            outcome.message(),
            "Expected one type of exception, but got another.  \
             Expected one of: NullReferenceError ArithmeticError"
        );
        assert_eq!(outcome.captured_exception().unwrap().message(), "generic");
    }

    #[test]
    fn missing_exception_fails() {
        let outcome = reconcile(&expecting(&[&ERROR]), None).unwrap();
        assert_eq!(outcome.message(), "Expected an exception, but did not get one.");
        assert!(outcome.captured_exception().is_none());
    }

    #[test]
    fn unexpected_exception_fails_with_it_attached() {
        let thrown = Exception::new(&NULL_REFERENCE, "null");
        let outcome = reconcile(&ExpectedExceptions::default(), Some(&thrown)).unwrap();
        assert_eq!(outcome.message(), "Unexpected exception.");
        assert_eq!(outcome.captured_exception().unwrap().kind(), &NULL_REFERENCE);
    }

    #[test]
    fn nothing_expected_nothing_thrown() {
        assert!(reconcile(&ExpectedExceptions::default(), None).is_none());
    }
}
