pub mod encoder;
pub mod pipeline;

pub use encoder::{check_compatibility, Codec, Container, FfmpegEncoder, FrameSink, ImageExt, SequenceSink};
pub use pipeline::{CancelToken, ExportJob, ExportPipeline, ExportProgress, ExportSummary, ExportTarget};
