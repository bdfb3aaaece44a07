use serde::Deserialize;
use std::path::PathBuf;

/// Application-level configuration, distinct from the per-project
/// settings row: which ffmpeg binary drives video encoding and where
/// exports land by default.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    pub ffmpeg_binary: String,
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            export: ExportConfig {
                ffmpeg_binary: "ffmpeg".to_string(),
                output_dir: PathBuf::from("."),
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("export.ffmpeg_binary", "ffmpeg")?
            .set_default("export.output_dir", ".")?
            // Load from file if exists
            .add_source(config::File::with_name("celframe").required(false))
            // Allow env var overrides (e.g. CELFRAME_EXPORT__FFMPEG_BINARY=/opt/ffmpeg)
            .add_source(
                config::Environment::with_prefix("CELFRAME")
                    .prefix_separator("_")
                    .separator("__"),
            );

        builder.build()?.try_deserialize()
    }
}
