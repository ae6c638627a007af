use std::fmt;

use crate::definitions::display;

/// A rectangle of the display, used as a hint which part has to be redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    /// The full display.
    pub const FULL: Region = Region {
        x: 0,
        y: 0,
        width: display::WIDTH,
        height: display::HEIGHT,
    };

    /// A single pixel.
    pub fn pixel(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            width: 1,
            height: 1,
        }
    }

    /// The smallest region containing both.
    pub fn union(self, other: Region) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Self {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        (self.x..self.x + self.width).contains(&x) && (self.y..self.y + self.height).contains(&y)
    }
}

/// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
/// `(64 x 32)`, stored row by row as [`PIXEL_ON`](display::PIXEL_ON) or
/// [`PIXEL_OFF`](display::PIXEL_OFF).
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: Box<[u8; display::RESOLUTION]>,
    dirty: Option<Region>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            pixels: Box::new([display::PIXEL_OFF; display::RESOLUTION]),
            dirty: None,
        }
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsets every pixel.
    pub fn clear(&mut self) {
        self.pixels.fill(display::PIXEL_OFF);
        self.dirty = Some(Region::FULL);
    }

    /// XORs the eight bits of `row` into the display starting at `(x, y)`, the most
    /// significant bit first. Coordinates wrap around the display.
    ///
    /// Returns if a set pixel got unset.
    pub fn draw_row(&mut self, x: usize, y: usize, row: u8) -> bool {
        let mut collision = false;
        for bit in 0..8 {
            if row & (0x80 >> bit) != 0 {
                collision |= self.flip(x + bit, y);
            }
        }
        collision
    }

    /// Flips a single pixel, returns if it was set before.
    fn flip(&mut self, x: usize, y: usize) -> bool {
        let x = x % display::WIDTH;
        let y = y % display::HEIGHT;

        let pixel = &mut self.pixels[y * display::WIDTH + x];
        let was_set = *pixel == display::PIXEL_ON;
        *pixel = if was_set {
            display::PIXEL_OFF
        } else {
            display::PIXEL_ON
        };

        let touched = Region::pixel(x, y);
        self.dirty = Some(self.dirty.map_or(touched, |dirty| dirty.union(touched)));
        was_set
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < display::WIDTH
            && y < display::HEIGHT
            && self.pixels[y * display::WIDTH + x] == display::PIXEL_ON
    }

    /// All pixels row by row.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels[..]
    }

    /// A single row of the display.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = (y % display::HEIGHT) * display::WIDTH;
        &self.pixels[start..start + display::WIDTH]
    }

    /// The region touched since the last call to [`take_dirty`](Self::take_dirty).
    pub fn dirty(&self) -> Option<Region> {
        self.dirty
    }

    pub fn take_dirty(&mut self) -> Option<Region> {
        self.dirty.take()
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framebuffer")
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// Draws the display with `#` for set and `.` for unset pixels.
impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..display::HEIGHT {
            let line: String = self
                .row(y)
                .iter()
                .map(|&pixel| if pixel == display::PIXEL_ON { '#' } else { '.' })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_row() {
        let mut frame = Framebuffer::new();
        assert_eq!(frame.dirty(), None);

        assert!(!frame.draw_row(0, 0, 0b1010_0000));
        assert!(frame.is_set(0, 0));
        assert!(!frame.is_set(1, 0));
        assert!(frame.is_set(2, 0));
        assert_eq!(
            frame.take_dirty(),
            Some(Region {
                x: 0,
                y: 0,
                width: 3,
                height: 1
            })
        );
        assert_eq!(frame.take_dirty(), None);

        // drawing again unsets them and reports the collision
        assert!(frame.draw_row(0, 0, 0b1010_0000));
        assert!(frame.pixels().iter().all(|&p| p == display::PIXEL_OFF));
    }

    #[test]
    fn test_draw_wraps() {
        let mut frame = Framebuffer::new();
        frame.draw_row(display::WIDTH - 4, display::HEIGHT + 1, 0xFF);

        for x in display::WIDTH - 4..display::WIDTH {
            assert!(frame.is_set(x, 1));
        }
        for x in 0..4 {
            assert!(frame.is_set(x, 1));
        }
        assert_eq!(frame.pixels().iter().filter(|&&p| p == display::PIXEL_ON).count(), 8);
    }

    #[test]
    fn test_clear() {
        let mut frame = Framebuffer::new();
        frame.draw_row(10, 10, 0xFF);
        frame.take_dirty();

        frame.clear();
        assert!(!frame.is_set(10, 10));
        assert_eq!(frame.take_dirty(), Some(Region::FULL));
    }

    #[test]
    fn test_region_union() {
        let region = Region::pixel(3, 4).union(Region::pixel(10, 1));
        assert_eq!(
            region,
            Region {
                x: 3,
                y: 1,
                width: 8,
                height: 4
            }
        );
        assert!(region.contains(3, 4));
        assert!(region.contains(10, 1));
        assert!(!region.contains(11, 1));
    }

    #[test]
    fn test_display() {
        let mut frame = Framebuffer::new();
        frame.draw_row(0, 0, 0b1100_0000);
        let text = frame.to_string();
        let first = text.lines().next().expect("There has to be a first row.");
        assert!(first.starts_with("##."));
        assert_eq!(first.len(), display::WIDTH);
        assert_eq!(text.lines().count(), display::HEIGHT);
    }
}
