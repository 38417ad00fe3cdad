//! Process-wide tracing setup shared by binaries and black-box tests.

/// Subscriber setup (filters, formatters).
pub mod tracing;

pub use self::tracing::LogFormat;

/// Initialize process-wide tracing.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    self::tracing::init(format);
}
