pub mod frame_buffer;
pub mod frame_renderer;
pub mod painter;

pub use frame_buffer::FrameBuffer;
pub use frame_renderer::FrameRenderer;
