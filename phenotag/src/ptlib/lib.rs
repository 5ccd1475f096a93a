pub mod annotation;
pub mod cache;
pub mod cfg;
pub mod controller;
pub mod events;
pub mod file_util;
pub mod image_list;
pub mod record_io;
pub mod result;
pub mod session;
pub mod tracing_setup;
pub mod voc_import;

pub use annotation::{AnnotationStore, PlantAnnotation};
pub use controller::{EditController, Snapshot, StateChange};
pub use events::{parse_gesture, Gesture};
pub use phenotag_domain::{pterr, to_pt, BoxCorners, PartKind, Point, PtError, PtResult};
pub use session::Session;
