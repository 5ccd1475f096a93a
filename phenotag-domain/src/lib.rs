mod bb;
mod core;
pub mod result;
pub use bb::BoxCorners;
pub use core::{PartKind, Point};
pub use result::{to_pt, PtError, PtResult};
