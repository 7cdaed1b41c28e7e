use std::path::Path;

use crate::shared::frame::Frame;
use crate::sources::domain::frame_source::{FrameSource, SourceError};

/// Serves one still image as an endless frame source.
///
/// Image sources re-yield the same frame on every tick, so a watched photo
/// keeps being validated the same way a camera feed is.
pub struct StillImageSource {
    frame: Frame,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        let (width, height) = (img.width(), img.height());
        let frame = Frame::new(img.into_raw(), width, height);
        log::info!("opened still image {} ({width}x{height})", path.display());
        Ok(Self { frame })
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self { frame }
    }
}

impl FrameSource for StillImageSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(Some(self.frame.clone()))
    }
}
