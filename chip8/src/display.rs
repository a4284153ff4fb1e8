//! Frame buffer and sprite drawing.
use std::fmt::{self, Write};

use crate::constants::*;

/// Monochrome pixel grid, row-major.
pub struct FrameBuffer {
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
    /// The grid changed since it was last presented.
    draw_flag: bool,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
            draw_flag: false,
        }
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn pixels(&self) -> Chip8DisplayBuffer<'_> {
        &self.pixels
    }

    /// Pixel at the given coordinate, wrapped around the screen edges.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[index(x, y)]
    }

    #[inline]
    pub fn draw_flag(&self) -> bool {
        self.draw_flag
    }

    /// Acknowledge that the frame was presented.
    #[inline]
    pub fn clear_draw_flag(&mut self) {
        self.draw_flag = false;
    }

    /// Turn all pixels off.
    pub fn clear(&mut self) {
        self.pixels.fill(false);
        self.draw_flag = true;
    }

    /// XOR the sprite rows onto the grid with the top left corner at (`x`, `y`).
    ///
    /// Each row is one byte, with the most significant bit drawn leftmost.
    /// Coordinates wrap around both edges of the screen.
    ///
    /// Returns `true` when any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let (x, y) = (x % DISPLAY_WIDTH, y % DISPLAY_HEIGHT);
        let mut is_erased = false;

        for (r, &row) in sprite.iter().enumerate() {
            for c in 0..SPRITE_WIDTH {
                let new_px = (row >> (7 - c)) & 1 != 0;
                if !new_px {
                    continue;
                }

                let d = index(x + c, y + r);
                let old_px = self.pixels[d];

                // XOR erases a pixel when both the old and new values are 1.
                is_erased |= old_px;
                self.pixels[d] = !old_px;
            }
        }

        self.draw_flag = true;
        is_erased
    }

    /// Render the grid as text, `#` for lit pixels and `.` for dark ones.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT);

        for row in self.pixels.chunks(DISPLAY_WIDTH) {
            for px in row {
                buf.write_char(if *px { '#' } else { '.' })?;
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}

/// Toroidal addressing into the row-major buffer.
#[inline(always)]
fn index(x: usize, y: usize) -> usize {
    (x % DISPLAY_WIDTH) + (y % DISPLAY_HEIGHT) * DISPLAY_WIDTH
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_horizontal() {
        let mut display = FrameBuffer::new();
        assert!(!display.draw_sprite(60, 0, &[0xFF]));

        for x in [60, 61, 62, 63, 0, 1, 2, 3] {
            assert!(display.pixel(x, 0), "pixel {x} must be lit");
        }
        assert!(!display.pixel(4, 0));
        assert!(!display.pixel(59, 0));
        assert_eq!(display.pixels().iter().filter(|px| **px).count(), 8);
    }

    #[test]
    fn test_wrap_vertical() {
        let mut display = FrameBuffer::new();
        display.draw_sprite(0, 30, &[0x80, 0x80, 0x80, 0x80]);

        assert!(display.pixel(0, 30));
        assert!(display.pixel(0, 31));
        assert!(display.pixel(0, 0));
        assert!(display.pixel(0, 1));
        assert!(!display.pixel(0, 2));
    }

    #[test]
    fn test_origin_wraps() {
        let mut display = FrameBuffer::new();
        display.draw_sprite(64 + 2, 32 + 1, &[0x80]);
        assert!(display.pixel(2, 1));
    }

    #[test]
    fn test_collision() {
        let mut display = FrameBuffer::new();
        let sprite = [0b1111_0000, 0b1001_0000];

        assert!(!display.draw_sprite(10, 10, &sprite));
        assert!(display.draw_sprite(10, 10, &sprite));
        assert!(display.pixels().iter().all(|px| !*px));
    }

    /// Zero bits of a sprite must not erase existing pixels.
    #[test]
    fn test_zero_bits_preserve() {
        let mut display = FrameBuffer::new();

        display.draw_sprite(4, 0, &[0b1111_0000]);
        assert!(!display.draw_sprite(0, 0, &[0b1111_0000]));

        for x in 0..8 {
            assert!(display.pixel(x, 0));
        }
    }

    #[test]
    fn test_draw_flag() {
        let mut display = FrameBuffer::new();
        assert!(!display.draw_flag());

        display.draw_sprite(0, 0, &[]);
        assert!(display.draw_flag());
        display.clear_draw_flag();

        display.clear();
        assert!(display.draw_flag());
    }

    #[test]
    fn test_dump() {
        let mut display = FrameBuffer::new();
        display.draw_sprite(0, 0, &[0b1010_0000]);

        let dump = display.dump().unwrap();
        let first = dump.lines().next().unwrap();
        assert_eq!(&first[0..4], "#.#.");
        assert_eq!(dump.lines().count(), DISPLAY_HEIGHT);
    }
}
