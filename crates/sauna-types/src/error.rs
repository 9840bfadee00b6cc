//! Unified error interface for the sauna workspace.
//!
//! Every error type in the workspace implements [`ErrorCode`] so the
//! HTTP layer and logs can report a stable machine code regardless of
//! which crate produced the failure.
//!
//! # Design
//!
//! - **Machine-readable codes**: UPPER_SNAKE_CASE, namespace-prefixed
//!   (`ADAPTER_TIMEOUT`, `BUS_CLOSED`, `CMD_DEVICE`), stable once
//!   published.
//! - **Recoverability**: transient conditions (timeouts, network
//!   resets) report `true`; protocol and malformed-input errors report
//!   `false` — retrying will not help.

/// Unified error code interface.
///
/// # Code Format
///
/// - UPPER_SNAKE_CASE
/// - Prefixed with the owning domain (`ADAPTER_`, `BUS_`, `CMD_`,
///   `CONFIG_`)
/// - Stable across versions (changing a code is a breaking change)
///
/// # Recoverability
///
/// An error is recoverable when retrying the operation may succeed or
/// the operator can take corrective action; it is not recoverable when
/// the input or device response is simply wrong.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows workspace conventions.
///
/// # Panics
///
/// Panics with a descriptive message if the code is empty, has the
/// wrong prefix, or is not UPPER_SNAKE_CASE.
///
/// # Example
///
/// ```
/// use sauna_types::{assert_error_code, ErrorCode};
///
/// #[derive(Debug)]
/// struct Oops;
///
/// impl ErrorCode for Oops {
///     fn code(&self) -> &'static str {
///         "BUS_CLOSED"
///     }
///     fn is_recoverable(&self) -> bool {
///         false
///     }
/// }
///
/// assert_error_code(&Oops, "BUS_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates multiple error codes at once.
///
/// Use this to cover all variants of an error enum in one test.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Transient => "TEST_TRANSIENT",
                Self::Permanent => "TEST_PERMANENT",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    #[test]
    fn error_code_trait() {
        assert_eq!(TestError::Transient.code(), "TEST_TRANSIENT");
        assert!(TestError::Transient.is_recoverable());
        assert!(!TestError::Permanent.is_recoverable());
    }

    #[test]
    fn assert_error_codes_all_variants() {
        assert_error_codes(&[TestError::Transient, TestError::Permanent], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn assert_error_code_wrong_prefix() {
        assert_error_code(&TestError::Transient, "WRONG_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("BUS_CLOSED"));
        assert!(is_upper_snake_case("ADAPTER_TIMEOUT_2"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("bus_closed"));
        assert!(!is_upper_snake_case("_BUS"));
        assert!(!is_upper_snake_case("BUS__CLOSED"));
    }
}
