use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnboundSymbol,
    /// Arity or parameter-pattern mismatch.
    Bind,
    TypeMismatch,
    IndexOutOfRange,
    InvalidMapKey,
    Unsupported,
    /// Raised by user code through `throw`.
    Thrown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::UnboundSymbol => "UnboundSymbol",
            ErrorKind::Bind => "BindMismatch",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::IndexOutOfRange => "IndexOutOfRange",
            ErrorKind::InvalidMapKey => "InvalidMapKey",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::Thrown => "Thrown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> RuntimeError {
        RuntimeError {
            kind,
            message: message.into(),
        }
    }

    /// Prefix the message with the library function that raised it, keeping the kind.
    pub fn within(self, name: &str) -> RuntimeError {
        RuntimeError {
            kind: self.kind,
            message: format!("{}: {}", name, self.message),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}: {}", self.kind, self.message) }
}

impl std::error::Error for RuntimeError {}

#[macro_export]
macro_rules! runtime_error {
    ($kind:ident, $($arg:tt)*) => (
        return Err($crate::interpreter::cps::RuntimeError::new(
            $crate::interpreter::cps::ErrorKind::$kind,
            format!($($arg)*),
        ))
    )
}

#[cfg(test)]
mod test_error {
    use super::*;

    fn fails() -> Result<(), RuntimeError> { runtime_error!(IndexOutOfRange, "index {} out of range", 3) }

    #[test]
    fn test_macro_returns_kind() {
        let err = fails().unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexOutOfRange);
        assert_eq!(err.to_string(), "IndexOutOfRange: index 3 out of range");
    }

    #[test]
    fn test_within_keeps_kind() {
        let err = RuntimeError::new(ErrorKind::Unsupported, "permission denied").within("spit");
        assert_eq!(err.kind, ErrorKind::Unsupported);
        assert_eq!(err.message, "spit: permission denied");
    }
}
