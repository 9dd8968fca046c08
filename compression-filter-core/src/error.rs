//! RPC status codes and the call status type.
//!
//! - [`Code`]: protocol status codes
//! - [`Status`]: the terminal status of a call (code plus optional message)

/// RPC status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    Ok = 0,
    Canceled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl Code {
    /// Get the string representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Ok => "ok",
            Code::Canceled => "canceled",
            Code::Unknown => "unknown",
            Code::InvalidArgument => "invalid_argument",
            Code::DeadlineExceeded => "deadline_exceeded",
            Code::NotFound => "not_found",
            Code::AlreadyExists => "already_exists",
            Code::PermissionDenied => "permission_denied",
            Code::ResourceExhausted => "resource_exhausted",
            Code::FailedPrecondition => "failed_precondition",
            Code::Aborted => "aborted",
            Code::OutOfRange => "out_of_range",
            Code::Unimplemented => "unimplemented",
            Code::Internal => "internal",
            Code::Unavailable => "unavailable",
            Code::DataLoss => "data_loss",
            Code::Unauthenticated => "unauthenticated",
        }
    }

    /// The numeric value carried in `grpc-status`.
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// Terminal status of a call.
///
/// # Example
///
/// ```
/// use compression_filter_core::{Code, Status};
///
/// let status = Status::resource_exhausted("Received message larger than max (2048 vs. 1024)");
/// assert_eq!(status.code(), Code::ResourceExhausted);
/// assert_eq!(status.code().value(), 8);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: Option<String>,
}

impl Status {
    /// Create a new status with a code and message.
    pub fn new<S: Into<String>>(code: Code, message: S) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Create a new status with just a code.
    pub fn from_code(code: Code) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Get the status code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// Get the status message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Create a canceled status.
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Canceled, message)
    }

    /// Create an invalid argument status.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    /// Create a resource exhausted status.
    pub fn resource_exhausted<S: Into<String>>(message: S) -> Self {
        Self::new(Code::ResourceExhausted, message)
    }

    /// Create an internal status.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(Code::Internal, message)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code.as_str())?;
        if let Some(msg) = &self.message {
            write!(f, ": {}", msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_as_str() {
        assert_eq!(Code::Ok.as_str(), "ok");
        assert_eq!(Code::ResourceExhausted.as_str(), "resource_exhausted");
        assert_eq!(Code::Unauthenticated.as_str(), "unauthenticated");
    }

    #[test]
    fn test_code_value() {
        assert_eq!(Code::Ok.value(), 0);
        assert_eq!(Code::Internal.value(), 13);
    }

    #[test]
    fn test_status_new() {
        let status = Status::new(Code::NotFound, "resource not found");
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), Some("resource not found"));
    }

    #[test]
    fn test_status_from_code() {
        let status = Status::from_code(Code::Internal);
        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().is_none());
    }

    #[test]
    fn test_status_convenience_constructors() {
        assert_eq!(Status::cancelled("msg").code(), Code::Canceled);
        assert_eq!(Status::invalid_argument("msg").code(), Code::InvalidArgument);
        assert_eq!(Status::resource_exhausted("msg").code(), Code::ResourceExhausted);
        assert_eq!(Status::internal("msg").code(), Code::Internal);
    }

    #[test]
    fn test_status_display() {
        let status = Status::internal("decompression failed");
        assert_eq!(status.to_string(), "internal: decompression failed");

        let status = Status::from_code(Code::Canceled);
        assert_eq!(status.to_string(), "canceled");
    }
}
