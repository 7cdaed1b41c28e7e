use std::sync::Arc;

use crate::catalog::domain::resolver::IdentityResolver;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_embedder::FaceEmbedder;
use crate::notify::domain::sink::NotificationSink;
use crate::shared::config::SourceKind;
use crate::shared::timestamp;
use crate::sources::domain::frame_source::FrameSource;
use crate::storage::domain::evidence_store::EvidenceStore;

use super::report::{DetectedPerson, Report};

/// Per-pipeline configuration, immutable for the pipeline's lifetime.
#[derive(Clone, Debug)]
pub struct SourceContext {
    pub source_id: String,
    pub kind: SourceKind,
    pub validation_threshold: f32,
}

/// Drives one logical frame source through the resolution pipeline.
///
/// A tick is: fetch frame → detect faces → per face: embed → resolve →
/// emit a report if anything resolved. Every failure inside a tick is
/// recovered locally; the pipeline is always ready for the next tick.
pub struct SourcePipeline {
    ctx: SourceContext,
    source: Box<dyn FrameSource>,
    detector: Arc<dyn FaceDetector>,
    embedder: Arc<dyn FaceEmbedder>,
    resolver: IdentityResolver,
    store: Arc<dyn EvidenceStore>,
    sink: Arc<dyn NotificationSink>,
}

impl SourcePipeline {
    pub fn new(
        ctx: SourceContext,
        source: Box<dyn FrameSource>,
        detector: Arc<dyn FaceDetector>,
        embedder: Arc<dyn FaceEmbedder>,
        resolver: IdentityResolver,
        store: Arc<dyn EvidenceStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            ctx,
            source,
            detector,
            embedder,
            resolver,
            store,
            sink,
        }
    }

    pub fn context(&self) -> &SourceContext {
        &self.ctx
    }

    /// Runs one tick. Returns the emitted report, if any, mostly for the
    /// benefit of callers that want to observe what was published.
    pub fn tick(&mut self) -> Option<Report> {
        let source_id = self.ctx.source_id.clone();
        let time = timestamp::formatted_now();

        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::debug!("source {source_id}: no frame available, tick skipped");
                return None;
            }
            Err(e) => {
                log::warn!("source {source_id}: frame read failed, tick skipped: {e}");
                return None;
            }
        };

        let faces = match self.detector.detect_all(&frame) {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!("source {source_id}: detection failed, tick skipped: {e}");
                return None;
            }
        };

        // Detection ran: keep a point-in-time capture for audit, with or
        // without faces in it.
        if let Err(e) = self.store.write_source_capture(&source_id, &time, &frame) {
            log::warn!("source {source_id}: capture write failed: {e}");
        }

        if faces.is_empty() {
            log::info!("source {source_id}: no faces in frame");
            return None;
        }

        let mut persons: Vec<DetectedPerson> = Vec::new();
        for (i, face) in faces.iter().enumerate() {
            let embedding = match self.embedder.embed(face) {
                Ok(embedding) => embedding,
                Err(e) => {
                    log::warn!("source {source_id}: embedding failed for face {i}, skipped: {e}");
                    continue;
                }
            };

            match self.resolver.resolve(
                &embedding,
                face,
                &source_id,
                &time,
                self.ctx.validation_threshold,
            ) {
                Ok(resolution) => persons.push(DetectedPerson::from(resolution)),
                Err(e) => {
                    log::warn!("source {source_id}: resolution failed for face {i}, skipped: {e}");
                }
            }
        }

        if persons.is_empty() {
            return None;
        }

        let report = Report {
            source_id,
            time,
            validation_threshold: self.ctx.validation_threshold,
            detected_persons: persons,
        };

        match report.to_json() {
            Ok(json) => {
                if let Err(e) = self.sink.publish(&json) {
                    log::warn!("source {}: publish failed: {e}", report.source_id);
                }
            }
            Err(e) => log::warn!("source {}: report serialization failed: {e}", report.source_id),
        }

        Some(report)
    }
}
