//! Facial landmark types and the eye-role index table.
//!
//! A face-mesh detector returns an ordered sequence of normalized points per
//! face. Which index is which facial feature is a property of the detector,
//! so every index the tracking loop relies on lives in [`LandmarkMap`].

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A normalized 2D position, `(0.0, 0.0)` is the top-left of the frame.
///
/// Serialized as a two-element array `[x, y]` to keep traces compact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Mirror across the vertical axis.
    pub fn mirrored(self) -> Self {
        Self {
            x: 1.0 - self.x,
            y: self.y,
        }
    }

    /// Convert to integer frame-pixel coordinates (truncating).
    pub fn to_pixel(self, frame_width: u32, frame_height: u32) -> (i64, i64) {
        (
            (self.x * frame_width as f64) as i64,
            (self.y * frame_height as f64) as i64,
        )
    }
}

impl From<(f64, f64)> for NormalizedPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<NormalizedPoint> for (f64, f64) {
    fn from(p: NormalizedPoint) -> Self {
        (p.x, p.y)
    }
}

/// A landmark position tagged with its detector index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub index: usize,
    pub point: NormalizedPoint,
}

/// All landmarks detected for one face, in detector order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    points: Vec<NormalizedPoint>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<NormalizedPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[NormalizedPoint] {
        &self.points
    }

    /// Look up a landmark by detector index.
    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.points
            .get(index)
            .map(|&point| Landmark { index, point })
    }

    /// Landmarks in `range`, or `None` if the range runs past the end.
    pub fn slice(&self, range: Range<usize>) -> Option<Vec<Landmark>> {
        self.points.get(range.clone()).map(|points| {
            range
                .zip(points.iter())
                .map(|(index, &point)| Landmark { index, point })
                .collect()
        })
    }

    /// A copy with every point mirrored horizontally.
    pub fn mirrored(&self) -> Self {
        Self {
            points: self.points.iter().map(|p| p.mirrored()).collect(),
        }
    }

    /// Set one point, growing the sequence with `fill` if needed.
    pub fn set(&mut self, index: usize, point: NormalizedPoint, fill: NormalizedPoint) {
        if index >= self.points.len() {
            self.points.resize(index + 1, fill);
        }
        self.points[index] = point;
    }
}

/// Semantic roles the tracking loop reads from a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkRole {
    /// The iris point that drives the cursor.
    RightEyePrimary,
    /// Lower eyelid of the blink eye.
    LeftEyelidLower,
    /// Upper eyelid of the blink eye.
    LeftEyelidUpper,
}

/// Maps eye roles to detector-specific landmark indices.
///
/// Defaults follow the 478-point refined face mesh: the right iris occupies
/// 474..478, the cursor follows 475, and the left eyelid pair is 145/159.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkMap {
    /// First index of the right-iris slice.
    pub right_iris_start: usize,
    /// Number of landmarks in the right-iris slice.
    pub right_iris_len: usize,
    /// Index of the landmark that drives the cursor.
    pub cursor_anchor: usize,
    /// Lower eyelid landmark of the blink eye.
    pub eyelid_lower: usize,
    /// Upper eyelid landmark of the blink eye.
    pub eyelid_upper: usize,
}

impl Default for LandmarkMap {
    fn default() -> Self {
        Self {
            right_iris_start: 474,
            right_iris_len: 4,
            cursor_anchor: 475,
            eyelid_lower: 145,
            eyelid_upper: 159,
        }
    }
}

impl LandmarkMap {
    /// Detector index for a role.
    pub fn index_of(&self, role: LandmarkRole) -> usize {
        match role {
            LandmarkRole::RightEyePrimary => self.cursor_anchor,
            LandmarkRole::LeftEyelidLower => self.eyelid_lower,
            LandmarkRole::LeftEyelidUpper => self.eyelid_upper,
        }
    }

    /// Index range of the right-iris slice.
    pub fn iris_range(&self) -> Range<usize> {
        self.right_iris_start..self.right_iris_start.saturating_add(self.right_iris_len)
    }

    /// Minimum landmark count a face needs for every role to resolve.
    pub fn required_len(&self) -> usize {
        self.iris_range()
            .end
            .max(self.cursor_anchor.saturating_add(1))
            .max(self.eyelid_lower.saturating_add(1))
            .max(self.eyelid_upper.saturating_add(1))
    }

    pub fn validate(&self) -> Result<(), LandmarkMapError> {
        if self.right_iris_len == 0 {
            return Err(LandmarkMapError::EmptyIrisSlice);
        }
        let end = self
            .right_iris_start
            .checked_add(self.right_iris_len)
            .ok_or(LandmarkMapError::IrisSliceOverflow {
                start: self.right_iris_start,
                len: self.right_iris_len,
            })?;
        if !(self.right_iris_start..end).contains(&self.cursor_anchor) {
            return Err(LandmarkMapError::AnchorOutsideIris {
                anchor: self.cursor_anchor,
                start: self.right_iris_start,
                end,
            });
        }
        if self.eyelid_lower == self.eyelid_upper {
            return Err(LandmarkMapError::SameEyelidIndex(self.eyelid_lower));
        }
        Ok(())
    }

    /// Resolve the eye landmarks of one face.
    ///
    /// The iris and eyelid parts resolve independently, so a 468-point mesh
    /// without iris refinement still yields its eyelids.
    pub fn extract(&self, face: &FaceLandmarks) -> EyeLandmarks {
        EyeLandmarks {
            iris: self.extract_iris(face),
            eyelids: self.extract_eyelids(face),
        }
    }

    pub fn extract_iris(&self, face: &FaceLandmarks) -> Option<IrisLandmarks> {
        Some(IrisLandmarks {
            slice: face.slice(self.iris_range())?,
            anchor: face.get(self.cursor_anchor)?,
        })
    }

    pub fn extract_eyelids(&self, face: &FaceLandmarks) -> Option<EyelidPair> {
        Some(EyelidPair {
            lower: face.get(self.eyelid_lower)?,
            upper: face.get(self.eyelid_upper)?,
        })
    }
}

/// Right-iris landmarks; they drive the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct IrisLandmarks {
    /// The full right-iris slice, used for overlay markers.
    pub slice: Vec<Landmark>,
    /// The landmark that drives the cursor.
    pub anchor: Landmark,
}

/// Eyelid pair of the blink eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyelidPair {
    pub lower: Landmark,
    pub upper: Landmark,
}

impl EyelidPair {
    /// Vertical eyelid gap, `lower.y - upper.y`. Shrinks as the eye closes.
    pub fn gap(&self) -> f64 {
        self.lower.point.y - self.upper.point.y
    }
}

/// The eye landmarks the tracking loop works with for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EyeLandmarks {
    pub iris: Option<IrisLandmarks>,
    pub eyelids: Option<EyelidPair>,
}

impl EyeLandmarks {
    pub fn eyelid_gap(&self) -> Option<f64> {
        self.eyelids.as_ref().map(EyelidPair::gap)
    }

    /// Every role resolved.
    pub fn is_complete(&self) -> bool {
        self.iris.is_some() && self.eyelids.is_some()
    }

    /// No role resolved.
    pub fn is_empty(&self) -> bool {
        self.iris.is_none() && self.eyelids.is_none()
    }
}

/// Inconsistent landmark index table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LandmarkMapError {
    #[error("right iris slice is empty")]
    EmptyIrisSlice,

    #[error("iris slice {start} + {len} overflows the index range")]
    IrisSliceOverflow { start: usize, len: usize },

    #[error("cursor anchor {anchor} is outside the iris slice {start}..{end}")]
    AnchorOutsideIris {
        anchor: usize,
        start: usize,
        end: usize,
    },

    #[error("upper and lower eyelid share index {0}")]
    SameEyelidIndex(usize),
}
