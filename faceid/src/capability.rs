use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by host-supplied detection and embedding capabilities.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("detector: {0}")]
    Detect(String),

    #[error("embedder: {0}")]
    Embed(String),
}

/// Axis-aligned face box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One detected face: its box plus the eye keypoints used for alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    pub left_eye: Point,
    pub right_eye: Point,
    pub confidence: f32,
}

impl FaceDetection {
    /// In-plane roll of the face in degrees, from the line through both eyes.
    pub fn roll_degrees(&self) -> f32 {
        let dy = self.right_eye.y - self.left_eye.y;
        let dx = self.right_eye.x - self.left_eye.x;
        dy.atan2(dx).to_degrees()
    }
}

/// Finds faces in an image.
///
/// Implementations wrap an external detection model; this crate never
/// inspects pixels itself.
pub trait Detector {
    type Image: ?Sized;

    fn detect(&self, image: &Self::Image) -> Result<Vec<FaceDetection>, CapabilityError>;
}

/// Turns one detected face into an embedding vector.
///
/// Cropping and eye alignment are the implementation's job. The output
/// length must equal the engine's configured dimension.
pub trait Embedder {
    type Image: ?Sized;

    fn embed(&self, image: &Self::Image, face: &FaceDetection) -> Result<Vec<f32>, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_with_eyes(left: (f32, f32), right: (f32, f32)) -> FaceDetection {
        FaceDetection {
            bbox: BoundingBox { x: 0, y: 0, width: 100, height: 100 },
            left_eye: Point { x: left.0, y: left.1 },
            right_eye: Point { x: right.0, y: right.1 },
            confidence: 0.99,
        }
    }

    #[test]
    fn roll_level_eyes() {
        let f = face_with_eyes((30.0, 40.0), (70.0, 40.0));
        assert!(f.roll_degrees().abs() < 1e-4);
    }

    #[test]
    fn roll_tilted() {
        let f = face_with_eyes((30.0, 40.0), (70.0, 80.0));
        assert!((f.roll_degrees() - 45.0).abs() < 1e-3);
    }
}
