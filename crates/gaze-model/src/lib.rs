//! GazeClick Gaze Model
//!
//! Defines the data contracts shared by the tracking loop and its
//! collaborators:
//! - **Landmarks:** Normalized facial keypoints and the table mapping
//!   semantic eye roles to detector-specific indices
//! - **Frames:** Camera images with geometry, timestamps, and overlay markers
//! - **Traces:** JSONL landmark streams produced by an external detector
//! - **Actions:** JSONL log of cursor moves and clicks
//!
//! Landmark coordinates are normalized to `[0.0, 1.0]` relative to the
//! frame they were detected in.

pub mod action;
pub mod frame;
pub mod landmark;
pub mod trace;

pub use action::*;
pub use frame::*;
pub use landmark::*;
pub use trace::*;
