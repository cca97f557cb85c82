//! Log pattern scanning
//!
//! Counts error and warning lines in a bounded window of service logs and
//! reports the most frequent error signatures.

mod pattern;
mod scanner;

pub use pattern::{LogPattern, Matcher};
pub use scanner::LogScanner;
