//! The sequential background export loop.
//!
//! One dedicated worker walks frames 1..=count strictly in order: advance
//! the persisted current frame, render at full project resolution, hand
//! the raster to the sink, then report progress. Frame N+1 never starts
//! before frame N's write is accepted — both the streaming encoder and
//! the store's ordering conventions require it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::export::encoder::{
    check_compatibility, Codec, Container, FfmpegEncoder, FrameSink, ImageExt, SequenceSink,
};
use crate::mapper::Dimensions;
use crate::render::FrameRenderer;
use crate::store::settings::{Settings, SettingsPatch};
use crate::store::ProjectDb;

/// Where the exported animation goes.
#[derive(Debug, Clone)]
pub enum ExportTarget {
    Video {
        path: PathBuf,
        codec: Codec,
        container: Container,
    },
    Sequence {
        dir: PathBuf,
        ext: ImageExt,
    },
}

/// Emitted after each completed frame.
pub struct ExportProgress {
    /// 1-based counter of frames completed so far.
    pub frame: i64,
    pub total_frames: i64,
    pub frame_time: Duration,
    pub total_time: Duration,
    /// The freshly rendered frame, for live preview.
    pub preview: RgbaImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub frames_written: i64,
    pub canceled: bool,
}

/// Cooperative cancellation, checked once per frame boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A running export: progress stream, cancellation handle and the worker
/// result.
#[derive(Debug)]
pub struct ExportJob {
    progress: Receiver<ExportProgress>,
    cancel: CancelToken,
    handle: JoinHandle<Result<ExportSummary>>,
}

impl ExportJob {
    pub fn progress(&self) -> &Receiver<ExportProgress> {
        &self.progress
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker to finish and return its summary.
    pub fn join(self) -> Result<ExportSummary> {
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("export worker panicked"))?
    }
}

/// Drives FrameRenderer across all frames into a video stream or an
/// image-sequence directory.
pub struct ExportPipeline {
    ffmpeg: String,
}

impl ExportPipeline {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Validate the target, build the sink, and hand the loop to one
    /// background worker. Invalid codec/container pairings are rejected
    /// here, before any frame is rendered.
    pub fn start(&self, project: &Path, target: ExportTarget) -> Result<ExportJob> {
        self.start_with_token(project, target, CancelToken::new())
    }

    pub fn start_with_token(
        &self,
        project: &Path,
        target: ExportTarget,
        cancel: CancelToken,
    ) -> Result<ExportJob> {
        // The worker gets its own connection; the interactive one stays
        // free for discrete transactions while the export runs.
        let db = ProjectDb::open(project)?;
        let settings = db.settings().load()?;
        let sink: Box<dyn FrameSink> = match &target {
            ExportTarget::Video {
                path,
                codec,
                container,
            } => {
                check_compatibility(*codec, *container)?;
                Box::new(FfmpegEncoder::start(
                    &self.ffmpeg,
                    path,
                    *codec,
                    settings.fps,
                    settings.width,
                    settings.height,
                )?)
            }
            ExportTarget::Sequence { dir, ext } => Box::new(SequenceSink::create(
                dir,
                *ext,
                settings.width,
                settings.height,
            )?),
        };
        log::info!(
            "export started: {} frames at {}x{}",
            settings.count_of_frames,
            settings.width,
            settings.height
        );
        let (progress_tx, progress_rx) = channel();
        let worker_cancel = cancel.clone();
        let handle = std::thread::spawn(move || {
            run_worker(db, settings, sink, progress_tx, worker_cancel)
        });
        Ok(ExportJob {
            progress: progress_rx,
            cancel,
            handle,
        })
    }
}

fn run_worker(
    db: ProjectDb,
    settings: Settings,
    mut sink: Box<dyn FrameSink>,
    progress: Sender<ExportProgress>,
    cancel: CancelToken,
) -> Result<ExportSummary> {
    let full = Dimensions::new(settings.width, settings.height);
    let renderer = FrameRenderer::new(full);
    let started = Instant::now();
    let mut frames_written = 0;
    let mut canceled = false;

    for frame in 1..=settings.count_of_frames {
        if cancel.is_canceled() {
            canceled = true;
            break;
        }
        let frame_started = Instant::now();

        // Advance the persisted frame cursor; strictly 1..=N, no wrap.
        db.settings()
            .update(SettingsPatch::current_frame(frame))
            .context("advancing current frame")?;

        log::debug!("rendering frame {frame}/{}", settings.count_of_frames);
        let objects = db.objects().list_for_frame(frame)?;
        let ghost = if settings.ghost && frame > 1 {
            Some(db.objects().list_for_frame(frame - 1)?)
        } else {
            None
        };
        let buffer = renderer.render(full, &objects, ghost.as_deref());

        log::debug!("writing frame {frame}/{}", settings.count_of_frames);
        sink.write_frame(&buffer.to_rgb_bytes())
            .with_context(|| format!("writing frame {frame}"))?;
        frames_written += 1;

        // The receiver may be gone; the export still runs to completion.
        let _ = progress.send(ExportProgress {
            frame: frames_written,
            total_frames: settings.count_of_frames,
            frame_time: frame_started.elapsed(),
            total_time: started.elapsed(),
            preview: buffer.to_image(),
        });
    }

    // Finalize even when canceled so a partial video container is closed
    // cleanly.
    sink.finish()?;
    log::info!(
        "export finished: {frames_written} frames in {:.1}s{}",
        started.elapsed().as_secs_f64(),
        if canceled { " (canceled)" } else { "" }
    );
    Ok(ExportSummary {
        frames_written,
        canceled,
    })
}
