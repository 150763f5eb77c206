pub mod html;
pub mod input;
pub mod output;

pub use html::*;
pub use input::*;
pub use output::*;
