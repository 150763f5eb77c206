pub mod diagnose;
pub mod reconcile;
pub mod recover;
pub mod segment;

pub use diagnose::*;
pub use reconcile::*;
pub use recover::*;
pub use segment::*;
