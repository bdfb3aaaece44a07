use image::RgbaImage;

/// RGBA raster target for one rendered frame.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>, // RGBA, 4 bytes per pixel
}

impl FrameBuffer {
    /// Create new frame buffer with given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height * 4) as usize;
        Self {
            width,
            height,
            pixels: vec![0; size],
        }
    }

    /// Clear buffer with color.
    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Set pixel at position.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if x < self.width && y < self.height {
            let idx = ((y * self.width + x) * 4) as usize;
            self.pixels[idx..idx + 4].copy_from_slice(&color);
        }
    }

    /// Get pixel at position.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.width && y < self.height {
            let idx = ((y * self.width + x) * 4) as usize;
            let mut pixel = [0u8; 4];
            pixel.copy_from_slice(&self.pixels[idx..idx + 4]);
            Some(pixel)
        } else {
            None
        }
    }

    /// Alpha blend a color onto the buffer at position.
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if let Some(bg) = self.get_pixel(x, y) {
            let alpha = color[3] as f32 / 255.0;
            let inv_alpha = 1.0 - alpha;

            let blended = [
                (color[0] as f32 * alpha + bg[0] as f32 * inv_alpha) as u8,
                (color[1] as f32 * alpha + bg[1] as f32 * inv_alpha) as u8,
                (color[2] as f32 * alpha + bg[2] as f32 * inv_alpha) as u8,
                255, // Output alpha is always opaque
            ];

            self.set_pixel(x, y, blended);
        }
    }

    /// Get buffer dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get raw pixel data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Pack the buffer into tightly packed RGB rows, the layout the
    /// streaming video encoder consumes.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for chunk in self.pixels.chunks_exact(4) {
            rgb.extend_from_slice(&chunk[0..3]);
        }
        rgb
    }

    /// Convert into an owned image for previews and sequence files.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .expect("buffer length matches dimensions")
    }
}
