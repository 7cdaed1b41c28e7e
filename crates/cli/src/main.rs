use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;

use sightline_core::catalog::domain::resolver::IdentityResolver;
use sightline_core::catalog::infrastructure::catalog_loader;
use sightline_core::detection::domain::face_embedder::FaceEmbedder;
use sightline_core::detection::infrastructure::model_resolver;
use sightline_core::detection::infrastructure::onnx_arcface_embedder::OnnxArcfaceEmbedder;
use sightline_core::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use sightline_core::notify::domain::sink::NotificationSink;
use sightline_core::notify::infrastructure::channel_sink::ChannelNotificationSink;
use sightline_core::pipeline::intake_sweep::IntakeSweep;
use sightline_core::pipeline::runner::Runner;
use sightline_core::pipeline::source_pipeline::{SourceContext, SourcePipeline};
use sightline_core::shared::config::{Config, SourceConfig, SourceKind};
use sightline_core::shared::constants::{
    DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
};
use sightline_core::sources::domain::frame_source::FrameSource;
use sightline_core::sources::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use sightline_core::sources::infrastructure::still_image_source::StillImageSource;
use sightline_core::storage::domain::evidence_store::EvidenceStore;
use sightline_core::storage::infrastructure::fs_evidence_store::FsEvidenceStore;

/// Identity resolution over camera, video, and image sources.
#[derive(Parser)]
#[command(name = "sightline")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Seconds between intake directory sweeps.
    #[arg(long, default_value = "3")]
    sweep_interval: u64,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    confidence: f64,

    /// Directory with bundled ONNX models (checked before downloading).
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let bundled = cli.models_dir.as_deref();
    let detector_model = model_resolver::resolve(DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, bundled)?;
    let embedding_model =
        model_resolver::resolve(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, bundled)?;

    let embedder: Arc<dyn FaceEmbedder> = Arc::new(OnnxArcfaceEmbedder::new(&embedding_model)?);
    let mut detectors = DetectorCache::new(detector_model, cli.confidence);

    let store: Arc<dyn EvidenceStore> = Arc::new(FsEvidenceStore::new(
        config.data_path.clone(),
        config.events_path.clone(),
        config.captures_path.clone(),
    ));

    // One detector pass over stored samples rebuilds the in-memory catalog.
    let loader_detector = detectors.get(config.max_detector_size)?;
    let catalog = catalog_loader::load_catalog(
        &*store,
        &*loader_detector,
        &*embedder,
        config.max_samples_per_identity,
    )?;
    let catalog = Arc::new(Mutex::new(catalog));

    let (sink, notifications) = ChannelNotificationSink::bounded(64);
    let sink: Arc<dyn NotificationSink> = Arc::new(sink);
    let drain = std::thread::spawn(move || {
        for payload in notifications {
            log::info!("report: {payload}");
        }
    });

    let mut pipelines = Vec::new();
    for source in &config.sources {
        let frame_source = match open_source(source) {
            Ok(frame_source) => frame_source,
            Err(e) => {
                log::error!("source {}: cannot open {}: {e}", source.id, source.location);
                continue;
            }
        };
        let detector = detectors.get(config.clamped_resolution(source.resolution))?;
        pipelines.push(SourcePipeline::new(
            SourceContext {
                source_id: source.id.clone(),
                kind: source.kind,
                validation_threshold: config.validation_threshold,
            },
            frame_source,
            detector,
            embedder.clone(),
            IdentityResolver::new(catalog.clone(), store.clone()),
            store.clone(),
            sink.clone(),
        ));
        log::info!("source {} ({}) attached", source.id, source.kind);
    }
    if pipelines.is_empty() {
        log::warn!("no sources attached, only the intake sweep will run");
    }

    let sweep = IntakeSweep::new(
        config.uploads_path.clone(),
        catalog,
        store,
        detectors.get(config.max_detector_size)?,
        embedder,
    );

    let runner = Runner::spawn(
        pipelines,
        sweep,
        Duration::from_secs(cli.sweep_interval.max(1)),
        Arc::new(AtomicBool::new(false)),
    );

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    log::info!("sightline running, press Ctrl-C to stop");
    let _ = stop_rx.recv();
    log::info!("shutting down");
    runner.join();

    drop(sink);
    if drain.join().is_err() {
        log::error!("notification drain thread panicked");
    }

    Ok(())
}

fn open_source(source: &SourceConfig) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    match source.kind {
        SourceKind::Camera | SourceKind::Video => {
            Ok(Box::new(FfmpegFrameSource::open(&source.location)?))
        }
        SourceKind::Image => Ok(Box::new(StillImageSource::open(Path::new(
            &source.location,
        ))?)),
    }
}

/// Detectors are expensive to load, so sources sharing a working resolution
/// share one instance.
struct DetectorCache {
    model_path: PathBuf,
    confidence: f64,
    by_resolution: HashMap<u32, Arc<OnnxFaceDetector>>,
}

impl DetectorCache {
    fn new(model_path: PathBuf, confidence: f64) -> Self {
        Self {
            model_path,
            confidence,
            by_resolution: HashMap::new(),
        }
    }

    fn get(&mut self, resolution: u32) -> Result<Arc<OnnxFaceDetector>, Box<dyn std::error::Error>> {
        if let Some(detector) = self.by_resolution.get(&resolution) {
            return Ok(detector.clone());
        }
        let detector = Arc::new(OnnxFaceDetector::new(
            &self.model_path,
            self.confidence,
            resolution,
        )?);
        self.by_resolution.insert(resolution, detector.clone());
        Ok(detector)
    }
}
