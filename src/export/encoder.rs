//! Frame sinks for the export pipeline: a streaming ffmpeg child process
//! for video output, and a numbered image-sequence directory.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::error::{CelError, CelResult};

/// Video codecs the encoder knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Codec {
    H264,
    Vp9,
    /// Motion JPEG.
    Mjpeg,
    /// Uncompressed YUV 4:2:2.
    Yuy2,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Codec::H264 => "h264",
            Codec::Vp9 => "VP9",
            Codec::Mjpeg => "MJPG",
            Codec::Yuy2 => "YUY2",
        })
    }
}

/// Output containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Container {
    Mp4,
    Avi,
}

impl Container {
    pub fn extension(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Avi => "avi",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Image formats for sequence export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageExt {
    Png,
    Jpg,
    Bmp,
}

impl ImageExt {
    pub fn extension(self) -> &'static str {
        match self {
            ImageExt::Png => "png",
            ImageExt::Jpg => "jpg",
            ImageExt::Bmp => "bmp",
        }
    }

    fn format(self) -> image::ImageFormat {
        match self {
            ImageExt::Png => image::ImageFormat::Png,
            ImageExt::Jpg => image::ImageFormat::Jpeg,
            ImageExt::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// Reject unsupported codec/container pairings before any frame is
/// rendered. Everything not listed here encodes fine.
pub fn check_compatibility(codec: Codec, container: Container) -> CelResult<()> {
    let rejected = matches!(
        (codec, container),
        (Codec::Vp9, Container::Avi) | (Codec::Yuy2, Container::Mp4) | (Codec::Mjpeg, Container::Mp4)
    );
    if rejected {
        return Err(CelError::ExportConfig {
            codec: codec.to_string(),
            container: container.to_string(),
        });
    }
    Ok(())
}

/// Destination for rendered frames. Implementations receive tightly
/// packed RGB rows, one call per frame in timeline order, and finalize
/// cleanly on `finish`.
pub trait FrameSink: Send {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<()>;
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Streaming video encoder backed by an external ffmpeg process. The
/// process is started once with the full stream parameters; frames are
/// piped over stdin and the container is finalized when stdin closes.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    output: PathBuf,
}

impl FfmpegEncoder {
    /// Check if ffmpeg is available.
    pub fn is_available(binary: &str) -> bool {
        Command::new(binary).arg("-version").output().is_ok()
    }

    pub fn start(
        binary: &str,
        output: &Path,
        codec: Codec,
        fps: i64,
        width: i64,
        height: i64,
    ) -> Result<Self> {
        if !Self::is_available(binary) {
            anyhow::bail!("{binary} not found; install ffmpeg to enable video export");
        }
        let args = encoder_args(codec, fps, width, height, output);
        log::debug!("starting {binary} {}", args.join(" "));
        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start {binary}"))?;
        let stdin = child.stdin.take().context("ffmpeg stdin unavailable")?;
        Ok(Self {
            child,
            stdin: Some(stdin),
            output: output.to_path_buf(),
        })
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        self.stdin
            .as_mut()
            .context("encoder already finalized")?
            .write_all(rgb)
            .context("ffmpeg rejected a frame")?;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        // Closing stdin tells ffmpeg the stream is complete.
        drop(self.stdin.take());
        let status = self.child.wait().context("waiting for ffmpeg")?;
        if !status.success() {
            anyhow::bail!("ffmpeg exited with {status}");
        }
        log::info!("finalized video {}", self.output.display());
        Ok(())
    }
}

/// Raw-RGB-in arguments for one streaming encode.
fn encoder_args(codec: Codec, fps: i64, width: i64, height: i64, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pixel_format",
        "rgb24",
    ]
    .map(String::from)
    .to_vec();
    args.push("-video_size".into());
    args.push(format!("{width}x{height}"));
    args.push("-framerate".into());
    args.push(fps.to_string());
    args.push("-i".into());
    args.push("-".into());
    match codec {
        Codec::H264 => {
            args.extend(["-c:v", "libx264", "-pix_fmt", "yuv420p"].map(String::from));
        }
        Codec::Vp9 => {
            args.extend(["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p"].map(String::from));
        }
        Codec::Mjpeg => {
            args.extend(["-c:v", "mjpeg"].map(String::from));
        }
        Codec::Yuy2 => {
            args.extend(["-c:v", "rawvideo", "-pix_fmt", "yuyv422"].map(String::from));
        }
    }
    args.push(output.display().to_string());
    args
}

/// Image-sequence sink: one file per frame named by a zero-based counter
/// with the chosen extension.
pub struct SequenceSink {
    dir: PathBuf,
    ext: ImageExt,
    width: u32,
    height: u32,
    counter: u64,
}

impl SequenceSink {
    /// Creates the output directory if absent.
    pub fn create(dir: &Path, ext: ImageExt, width: i64, height: i64) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            ext,
            width: width as u32,
            height: height as u32,
            counter: 0,
        })
    }
}

impl FrameSink for SequenceSink {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        let path = self
            .dir
            .join(format!("{}.{}", self.counter, self.ext.extension()));
        image::save_buffer_with_format(
            &path,
            rgb,
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
            self.ext.format(),
        )
        .with_context(|| format!("writing {}", path.display()))?;
        self.counter += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        log::info!(
            "wrote {} frames to {}",
            self.counter,
            self.dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_pairings() {
        assert!(matches!(
            check_compatibility(Codec::Vp9, Container::Avi),
            Err(CelError::ExportConfig { .. })
        ));
        assert!(matches!(
            check_compatibility(Codec::Yuy2, Container::Mp4),
            Err(CelError::ExportConfig { .. })
        ));
        assert!(matches!(
            check_compatibility(Codec::Mjpeg, Container::Mp4),
            Err(CelError::ExportConfig { .. })
        ));
    }

    #[test]
    fn test_accepted_pairings() {
        assert!(check_compatibility(Codec::H264, Container::Mp4).is_ok());
        assert!(check_compatibility(Codec::H264, Container::Avi).is_ok());
        assert!(check_compatibility(Codec::Vp9, Container::Mp4).is_ok());
        assert!(check_compatibility(Codec::Mjpeg, Container::Avi).is_ok());
        assert!(check_compatibility(Codec::Yuy2, Container::Avi).is_ok());
    }

    #[test]
    fn test_encoder_args_shape() {
        let args = encoder_args(Codec::H264, 24, 1920, 1080, Path::new("out.mp4"));
        assert!(args.contains(&"rawvideo".to_string()));
        assert!(args.contains(&"1920x1080".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
        // Reads the stream from stdin.
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "-"));
    }

    #[test]
    fn test_sequence_sink_names_frames_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Box::new(SequenceSink::create(dir.path(), ImageExt::Png, 4, 2).unwrap());
        let frame = vec![255u8; 4 * 2 * 3];
        for _ in 0..3 {
            sink.write_frame(&frame).unwrap();
        }
        sink.finish().unwrap();
        for name in ["0.png", "1.png", "2.png"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
        assert!(!dir.path().join("3.png").exists());
    }
}
