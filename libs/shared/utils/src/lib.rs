pub mod datetime;
pub mod extractor;
pub mod jwt;
pub mod test_utils;

pub use datetime::DateFormatter;
