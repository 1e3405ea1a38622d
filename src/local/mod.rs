pub mod ignore;
pub mod scanner;

pub use ignore::IgnorePatternSet;
pub use scanner::{LocalEntry, LocalScanner};
