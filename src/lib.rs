pub mod config;
pub mod error;
pub mod export;
pub mod mapper;
pub mod model;
pub mod render;
pub mod store;

pub use config::AppConfig;
pub use error::{CelError, CelResult};
pub use model::{Color, DrawableObject, ObjectId, Point, Shape, Variant};
pub use render::{FrameBuffer, FrameRenderer};
pub use store::ProjectDb;
