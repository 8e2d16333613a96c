use tracing::{debug, warn};

use crate::capability::{Detector, Embedder, FaceDetection};
use crate::engine::{Recognition, RecognitionEngine};
use crate::enroll::EnrollmentSession;
use crate::error::FaceIdError;

/// Per-face result of [`FramePipeline::recognize`].
#[derive(Debug, Clone, PartialEq)]
pub enum FaceOutcome {
    Recognized {
        face: FaceDetection,
        recognition: Recognition,
    },
    /// The embedder failed on this face; the rest of the frame still ran.
    Skipped { face: FaceDetection, reason: String },
}

/// Runs detection and embedding for whole frames and feeds the resulting
/// vectors to a [`RecognitionEngine`] or an [`EnrollmentSession`].
pub struct FramePipeline<D, E> {
    detector: D,
    embedder: E,
}

impl<D, E> FramePipeline<D, E>
where
    D: Detector,
    E: Embedder<Image = D::Image>,
{
    pub fn new(detector: D, embedder: E) -> Self {
        Self { detector, embedder }
    }

    /// Recognizes every face in `image`, in detection order.
    ///
    /// A detector failure fails the frame. An embedder failure only skips
    /// that face.
    pub fn recognize(
        &self,
        engine: &mut RecognitionEngine,
        image: &D::Image,
    ) -> Result<Vec<FaceOutcome>, FaceIdError> {
        let faces = self.detector.detect(image)?;
        debug!(faces = faces.len(), "detected faces");

        let mut outcomes = Vec::with_capacity(faces.len());
        for face in faces {
            match self.embedder.embed(image, &face) {
                Ok(vector) => {
                    let recognition = engine.query(&vector)?;
                    outcomes.push(FaceOutcome::Recognized { face, recognition });
                }
                Err(e) => {
                    warn!(error = %e, bbox = ?face.bbox, "failed to embed face");
                    outcomes.push(FaceOutcome::Skipped {
                        face,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(outcomes)
    }

    /// Submits every embeddable face in `image` to `session` until it is
    /// complete. Returns the number of samples accepted from this frame.
    ///
    /// A sample whose save failed is still accepted: it is in the store and
    /// the next flush retries the write.
    pub fn collect_samples(
        &self,
        session: &mut EnrollmentSession<'_>,
        image: &D::Image,
    ) -> Result<usize, FaceIdError> {
        let faces = self.detector.detect(image)?;
        let mut accepted = 0;
        for face in faces {
            if session.is_complete() {
                break;
            }
            match self.embedder.embed(image, &face) {
                Ok(vector) => match session.submit(&vector) {
                    Ok(()) => accepted += 1,
                    Err(FaceIdError::PersistenceFailure(e)) => {
                        warn!(
                            error = %e,
                            name = session.name(),
                            "sample kept in memory, save will be retried"
                        );
                        accepted += 1;
                    }
                    Err(e) => return Err(e),
                },
                Err(e) => warn!(error = %e, bbox = ?face.bbox, "failed to embed face"),
            }
        }
        Ok(accepted)
    }
}
