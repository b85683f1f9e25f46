//! Error-code trait shared by every module error enum.

/// Grepable, stable error code attached to a user-facing error message.
///
/// Hosts show `to_string()` to the user and key retry/telemetry decisions off
/// `error_code()`.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
