pub mod document;
pub mod export;
pub mod report;

pub use document::*;
pub use export::*;
pub use report::*;
