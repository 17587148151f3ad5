//! # Meridian Core
//!
//! Engine-independent building blocks for the Meridian scene editor:
//!
//! - [`math`]: nalgebra aliases, TRS [`Transform`](math::Transform) values and bounding boxes
//! - [`signal`]: synchronous multi-observer change notification
//! - [`history`]: reversible operations and the undo/redo [`OperationStack`](history::OperationStack)

pub mod history;
pub mod math;
pub mod signal;

