use std::path::Path;

use crate::shared::frame::Frame;
use crate::sources::domain::frame_source::{FrameSource, SourceError};

/// Camera/video frame source decoding via ffmpeg-next (libavformat +
/// libavcodec). Every decoded frame is converted to RGB24.
///
/// Frames are pulled one at a time; whatever the device produced while the
/// pipeline was busy is simply never requested, which is the only
/// backpressure this system needs.
pub struct FfmpegFrameSource {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    stream_index: usize,
    flushing: bool,
    finished: bool,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    /// Opens a camera device, stream URL, or video file.
    pub fn open(location: &str) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(Path::new(location))?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("no video stream found")?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!("opened source {location} ({width}x{height})");
        Ok(Self {
            ictx,
            decoder,
            scaler,
            width,
            height,
            stream_index,
            flushing: false,
            finished: false,
        })
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, SourceError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
            self.scaler
                .run(&decoded, &mut rgb)
                .map_err(|e| SourceError::Decode(e.to_string()))?;
            let pixels = extract_rgb_pixels(&rgb, self.width, self.height);
            Ok(Some(Frame::new(pixels, self.width, self.height)))
        } else {
            Ok(None)
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
            if self.flushing {
                self.finished = true;
                return Ok(None);
            }

            let mut sent = false;
            for (stream, packet) in self.ictx.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .map_err(|e| SourceError::Decode(e.to_string()))?;
                sent = true;
                break;
            }

            if !sent {
                // End of input: drain whatever the decoder still buffers.
                let _ = self.decoder.send_eof();
                self.flushing = true;
            }
        }
    }
}

fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
