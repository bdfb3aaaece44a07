use anyhow::{Context, Result};
use celframe::export::{Codec, Container, ExportPipeline, ExportTarget, ImageExt};
use celframe::mapper::Dimensions;
use celframe::store::settings::{Dialog, SettingsPatch};
use celframe::{AppConfig, FrameRenderer, ProjectDb};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "celframe")]
#[command(about = "Frame-by-frame vector animation studio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project file with default settings
    Init {
        /// Path of the project file to create
        project: PathBuf,
    },
    /// Print project settings as JSON
    Info { project: PathBuf },
    /// Render one frame to an image file
    Frame {
        project: PathBuf,

        /// Output image path (format chosen by extension)
        output: PathBuf,

        /// Frame to render; defaults to the project's current frame
        #[arg(long)]
        frame: Option<i64>,
    },
    /// Export the animation as a video file
    Export {
        project: PathBuf,

        /// Output file name, without extension
        name: String,

        #[arg(long, value_enum, default_value = "h264")]
        codec: Codec,

        #[arg(long, value_enum, default_value = "mp4")]
        container: Container,
    },
    /// Export the animation as a numbered image sequence
    ExportSequence {
        project: PathBuf,

        /// Output directory name
        name: String,

        #[arg(long, value_enum, default_value = "png")]
        format: ImageExt,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;

    match cli.command {
        Commands::Init { project } => {
            ProjectDb::create(&project)?;
            println!("🎬 Created project {}", project.display());
        }
        Commands::Info { project } => {
            let db = ProjectDb::open(&project)?;
            let settings = db.settings().load()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Commands::Frame {
            project,
            output,
            frame,
        } => {
            let db = ProjectDb::open(&project)?;
            let settings = if let Some(frame) = frame {
                db.settings().update(SettingsPatch {
                    current_frame: Dialog::Accepted(frame),
                    ..SettingsPatch::default()
                })?
            } else {
                db.settings().load()?
            };
            let full = Dimensions::new(settings.width, settings.height);
            let objects = db.objects().list_for_frame(settings.current_frame)?;
            let ghost = if settings.ghost && settings.current_frame > 1 {
                Some(db.objects().list_for_frame(settings.current_frame - 1)?)
            } else {
                None
            };
            let buffer = FrameRenderer::new(full).render(full, &objects, ghost.as_deref());
            buffer
                .to_image()
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "🖼  Rendered frame {} to {}",
                settings.current_frame,
                output.display()
            );
        }
        Commands::Export {
            project,
            name,
            codec,
            container,
        } => {
            validate_output_name(&name, container.extension(), &config.export.output_dir)?;
            let path = config
                .export
                .output_dir
                .join(format!("{name}.{}", container.extension()));
            let target = ExportTarget::Video {
                path: path.clone(),
                codec,
                container,
            };
            run_export(&config, &project, target)?;
            println!("🎥 Video written to {}", path.display());
        }
        Commands::ExportSequence {
            project,
            name,
            format,
        } => {
            validate_output_name(&name, "", &config.export.output_dir)?;
            let dir = config.export.output_dir.join(&name);
            let target = ExportTarget::Sequence {
                dir: dir.clone(),
                ext: format,
            };
            run_export(&config, &project, target)?;
            println!("🖼  Image sequence written to {}", dir.display());
        }
    }

    Ok(())
}

fn run_export(config: &AppConfig, project: &Path, target: ExportTarget) -> Result<()> {
    let pipeline = ExportPipeline::new(config.export.ffmpeg_binary.clone());
    let job = pipeline.start(project, target)?;
    for progress in job.progress().iter() {
        println!(
            "  frame {}/{} ({:.2}s, total {:.1}s)",
            progress.frame,
            progress.total_frames,
            progress.frame_time.as_secs_f64(),
            progress.total_time.as_secs_f64(),
        );
    }
    let summary = job.join()?;
    println!("  {} frames exported", summary.frames_written);
    Ok(())
}

/// Output names come straight from the command line: alphanumeric only,
/// at most 200 characters, and never clobbering an existing path.
fn validate_output_name(name: &str, extension: &str, dir: &Path) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("output name is empty");
    }
    if name.len() > 200 {
        anyhow::bail!("output name is too long");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        anyhow::bail!("output name may only contain A-Z, a-z and 0-9");
    }
    let candidate = if extension.is_empty() {
        dir.join(name)
    } else {
        dir.join(format!("{name}.{extension}"))
    };
    if candidate.exists() {
        anyhow::bail!("{} already exists", candidate.display());
    }
    Ok(())
}
