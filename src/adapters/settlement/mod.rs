//! Settlement sources backed by exported report files.

mod file_source;

pub use file_source::FileSettlementSource;
