use chrono::Local;

/// Timestamp format used in evidence paths and emitted reports.
///
/// Microsecond precision keeps names collision-resistant when one source
/// produces several events within a second. Dots instead of colons keep
/// the string usable as a file name on every platform.
const FORMAT: &str = "%Y-%m-%d-%H.%M.%S.%6f";

pub fn formatted_now() -> String {
    Local::now().format(FORMAT).to_string()
}
