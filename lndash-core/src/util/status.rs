use core::fmt;

/// gRPC compatible error status
#[derive(Clone, PartialEq, Eq)]
pub struct Status {
    /// The gRPC status code, found in the `grpc-status` header.
    code: Code,
    /// A relevant error message, found in the `grpc-message` header.
    message: String,
}

/// gRPC compatible error status code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Code {
    /// The operation completed successfully.
    Ok = 0,

    /// The operation was cancelled, typically by the caller.
    Cancelled = 1,

    /// Unknown error.
    Unknown = 2,

    /// Client specified an invalid argument.
    InvalidArgument = 3,

    /// Deadline expired before operation could complete.
    DeadlineExceeded = 4,

    /// Some requested entity was not found.
    NotFound = 5,

    /// Internal error.
    Internal = 13,

    /// The service is currently unavailable.
    Unavailable = 14,
}

impl Status {
    /// Create a new `Status` with the associated code and message.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Status { code, message: message.into() }
    }

    /// Get the gRPC `Code` of this `Status`.
    pub fn code(&self) -> Code {
        self.code
    }

    /// Get the text error message of this `Status`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Construct a cancelled status
    pub fn cancelled(message: impl Into<String>) -> Status {
        Self::new(Code::Cancelled, message)
    }

    /// Construct an invalid argument status
    pub fn invalid_argument(message: impl Into<String>) -> Status {
        Self::new(Code::InvalidArgument, message)
    }

    /// Construct a deadline exceeded status, used when a request times out
    pub fn deadline_exceeded(message: impl Into<String>) -> Status {
        Self::new(Code::DeadlineExceeded, message)
    }

    /// Construct a not found status
    pub fn not_found(message: impl Into<String>) -> Status {
        Self::new(Code::NotFound, message)
    }

    /// Construct an unavailable status, used when the node can't be reached
    pub fn unavailable(message: impl Into<String>) -> Status {
        Self::new(Code::Unavailable, message)
    }

    /// Construct an internal error status
    pub fn internal(message: impl Into<String>) -> Status {
        Self::new(Code::Internal, message)
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A manual impl to reduce the noise of frequently empty fields.
        let mut builder = f.debug_struct("Status");

        builder.field("code", &self.code);

        if !self.message.is_empty() {
            builder.field("message", &self.message);
        }

        builder.finish()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status: {:?}, message: {:?}", self.code(), self.message())
    }
}

impl std::error::Error for Status {}

#[cfg(feature = "grpc")]
impl From<tonic::Status> for Status {
    fn from(s: tonic::Status) -> Self {
        let code = match s.code() {
            tonic::Code::Ok => Code::Ok,
            tonic::Code::Cancelled => Code::Cancelled,
            tonic::Code::InvalidArgument => Code::InvalidArgument,
            tonic::Code::DeadlineExceeded => Code::DeadlineExceeded,
            tonic::Code::NotFound => Code::NotFound,
            tonic::Code::Internal => Code::Internal,
            tonic::Code::Unavailable => Code::Unavailable,
            _ => Code::Unknown,
        };
        Status::new(code, s.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_test() {
        let status = Status::unavailable("connection refused");
        assert_eq!(status.code(), Code::Unavailable);
        assert_eq!(
            status.to_string(),
            "status: Unavailable, message: \"connection refused\"".to_string()
        );
    }

    #[test]
    fn debug_omits_empty_message_test() {
        assert_eq!(format!("{:?}", Status::internal("")), "Status { code: Internal }");
        assert_eq!(
            format!("{:?}", Status::not_found("node")),
            "Status { code: NotFound, message: \"node\" }"
        );
    }

    #[cfg(feature = "grpc")]
    #[test]
    fn from_tonic_test() {
        let status: Status = tonic::Status::deadline_exceeded("slow").into();
        assert_eq!(status, Status::deadline_exceeded("slow"));
        let status: Status = tonic::Status::permission_denied("macaroon").into();
        assert_eq!(status.code(), Code::Unknown);
    }
}
