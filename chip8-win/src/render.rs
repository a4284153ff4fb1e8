use std::{fmt, rc::Rc};

use chip8::constants::{Chip8DisplayBuffer, DISPLAY_BUFFER_SIZE, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use glow::{Context as GlowContext, HasContext};
use winit::dpi::PhysicalSize;

/// Background colour, for pixels that are off.
const BACKGROUND: [f32; 3] = [29.0 / 255.0, 33.0 / 255.0, 40.0 / 255.0];
/// Foreground colour, for pixels that are on.
const FOREGROUND: [f32; 3] = [0.8, 0.85, 0.8];

/// Draws the chip8 display by clearing one scissor rectangle per lit pixel.
pub struct Render {
    /// The interface to the loaded OpenGL function.
    gl: Rc<GlowContext>,
    info: OpenGLInfo,
    /// Size of one chip8 pixel, in logical window pixels.
    scale: u32,
}

impl Render {
    pub fn new(gl: Rc<GlowContext>, scale: u32) -> Self {
        let info = OpenGLInfo::new(&gl);
        Self { gl, info, scale }
    }

    pub fn resize_viewport(&mut self, size: PhysicalSize<u32>) {
        unsafe {
            self.gl
                .viewport(0, 0, size.width as i32, size.height as i32);
        }
    }

    pub fn clear_window(&mut self, [red, green, blue]: [f32; 3]) {
        unsafe {
            self.gl.clear_color(red, green, blue, 1.0);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Draw the display anchored to the top left of a surface with the given size.
    ///
    /// Pixels are magnified by the configured scale, times the window's DPI scale factor.
    pub fn draw_display(
        &mut self,
        display: Chip8DisplayBuffer<'_>,
        size: PhysicalSize<u32>,
        scale_factor: f64,
    ) {
        self.clear_window(BACKGROUND);

        let cell = cell_size(self.scale, scale_factor);

        unsafe {
            let [red, green, blue] = FOREGROUND;
            self.gl.clear_color(red, green, blue, 1.0);
            self.gl.enable(glow::SCISSOR_TEST);

            for (index, _) in display.iter().enumerate().filter(|(_, px)| **px) {
                let [x, y, w, h] = cell_rect(index, cell, size.height);
                self.gl.scissor(x, y, w, h);
                self.gl.clear(glow::COLOR_BUFFER_BIT);
            }

            self.gl.disable(glow::SCISSOR_TEST);
        }
    }

    pub fn opengl_info(&self) -> &OpenGLInfo {
        &self.info
    }
}

pub struct OpenGLInfo {
    pub version: String,
    pub renderer: String,
    pub vendor: String,
}

impl OpenGLInfo {
    pub fn new(gl: &GlowContext) -> Self {
        unsafe {
            Self {
                version: gl.get_parameter_string(glow::VERSION),
                renderer: gl.get_parameter_string(glow::RENDERER),
                vendor: gl.get_parameter_string(glow::VENDOR),
            }
        }
    }
}

/// Side of one chip8 pixel in physical pixels, never less than one.
fn cell_size(scale: u32, scale_factor: f64) -> i32 {
    ((scale as f64 * scale_factor).round() as i32).max(1)
}

/// Scissor rectangle `[x, y, width, height]` of the pixel at `index`.
///
/// OpenGL window coordinates start at the bottom left.
fn cell_rect(index: usize, cell: i32, surface_height: u32) -> [i32; 4] {
    let x = (index % DISPLAY_WIDTH) as i32;
    let y = (index / DISPLAY_WIDTH) as i32;
    [x * cell, surface_height as i32 - (y + 1) * cell, cell, cell]
}

impl fmt::Display for OpenGLInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Self {
            version,
            renderer,
            vendor,
        } = self;
        writeln!(f, "OpenGL Version: {version}")?;
        writeln!(f, "Renderer: {renderer}")?;
        write!(f, "Vendor: {vendor}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cell_size() {
        assert_eq!(cell_size(10, 1.0), 10);
        assert_eq!(cell_size(10, 1.5), 15);
        assert_eq!(cell_size(0, 2.0), 1);
    }

    #[test]
    fn test_cell_rect_fixed_scale() {
        let height = DISPLAY_HEIGHT as u32 * 10;

        // Top left pixel sits at the top of the surface.
        assert_eq!(cell_rect(0, 10, height), [0, 310, 10, 10]);
        // Bottom right pixel sits at the bottom.
        assert_eq!(cell_rect(DISPLAY_BUFFER_SIZE - 1, 10, height), [630, 0, 10, 10]);

        // A taller surface moves cells, but never resizes them.
        assert_eq!(cell_rect(DISPLAY_WIDTH + 1, 10, 1000), [10, 980, 10, 10]);
    }
}
