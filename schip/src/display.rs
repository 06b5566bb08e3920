//! Display buffer and resolution modes.
use crate::constants::*;

/// Active screen resolution.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayMode {
    /// Original 64×32 CHIP-8 resolution.
    #[default]
    Standard,
    /// SuperCHIP 128×64 resolution.
    Extended,
}

impl DisplayMode {
    #[inline(always)]
    pub fn width(&self) -> usize {
        match self {
            Self::Standard => DISPLAY_WIDTH,
            Self::Extended => EXT_DISPLAY_WIDTH,
        }
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        match self {
            Self::Standard => DISPLAY_HEIGHT,
            Self::Extended => EXT_DISPLAY_HEIGHT,
        }
    }

    /// Dimensions as `[width, height]`.
    #[inline]
    pub fn size(&self) -> [usize; 2] {
        [self.width(), self.height()]
    }
}

/// Monochrome frame buffer.
///
/// The storage is sized for the extended mode, and every operation
/// only touches the active rectangle at the start of the buffer,
/// with a row stride equal to the active width.
///
/// Pixels are stored one per byte, and are always either 0 or 1.
pub struct Display {
    pixels: Box<[u8; DISPLAY_BUFFER_SIZE]>,
    mode: DisplayMode,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            pixels: Box::new([0; DISPLAY_BUFFER_SIZE]),
            mode: DisplayMode::Standard,
        }
    }
}

impl Display {
    #[inline]
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Change resolution.
    ///
    /// The row stride changes with the mode, so the existing contents
    /// can't be carried over and the whole buffer is erased.
    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
        self.pixels.fill(0);
    }

    /// Pixels of the active region, row major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        let [w, h] = self.mode.size();
        &self.pixels[..w * h]
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        let w = self.mode.width();
        self.pixels[x + y * w]
    }

    /// Zero the active region.
    pub fn clear(&mut self) {
        let [w, h] = self.mode.size();
        self.pixels[..w * h].fill(0);
    }

    /// Power-on state: standard mode, blank screen.
    pub fn reset(&mut self) {
        self.set_mode(DisplayMode::Standard);
    }

    /// XOR a sprite onto the buffer with its top-left corner at `(x, y)`.
    ///
    /// Narrow sprites are one byte per row, 8 pixels wide. Wide sprites
    /// are two bytes per row, 16 pixels wide, most significant byte first.
    ///
    /// The origin wraps to the active region. Pixels that would land past
    /// the right or bottom edge are clipped.
    ///
    /// Returns `true` when a lit pixel was erased, which is the
    /// collision signal.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8], wide: bool) -> bool {
        let [w, h] = self.mode.size();
        let (x, y) = (x % w, y % h);
        let (sprite_width, bytes_per_row) = if wide { (16, 2) } else { (8, 1) };
        let mut is_erased = false;

        for (r, row_bytes) in sprite.chunks(bytes_per_row).enumerate() {
            let py = y + r;
            if py >= h {
                break;
            }

            let row = row_bytes
                .iter()
                .fold(0u16, |acc, byte| (acc << 8) | *byte as u16);

            for c in 0..sprite_width {
                let px = x + c;
                if px >= w {
                    break;
                }

                let new_px = ((row >> (sprite_width - 1 - c)) & 1) as u8;
                if new_px == 0 {
                    continue;
                }

                let d = px + py * w;
                let old_px = self.pixels[d];

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= old_px == 1;

                self.pixels[d] = old_px ^ 1;
            }
        }

        is_erased
    }

    /// Shift the active region down by `n` rows, filling the top with 0.
    pub fn scroll_down(&mut self, n: usize) {
        let [w, h] = self.mode.size();
        let n = n.min(h);
        let active = &mut self.pixels[..w * h];

        active.copy_within(0..(h - n) * w, n * w);
        active[..n * w].fill(0);
    }

    /// Shift the active region left by `n` columns, filling the right edge with 0.
    pub fn scroll_left(&mut self, n: usize) {
        let [w, h] = self.mode.size();
        let n = n.min(w);

        for row in self.pixels[..w * h].chunks_exact_mut(w) {
            row.copy_within(n.., 0);
            row[w - n..].fill(0);
        }
    }

    /// Shift the active region right by `n` columns, filling the left edge with 0.
    pub fn scroll_right(&mut self, n: usize) {
        let [w, h] = self.mode.size();
        let n = n.min(w);

        for row in self.pixels[..w * h].chunks_exact_mut(w) {
            row.copy_within(..w - n, n);
            row[..n].fill(0);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lit(display: &Display) -> usize {
        display.pixels().iter().filter(|px| **px == 1).count()
    }

    #[test]
    fn test_mode_sizes() {
        let mut display = Display::default();
        assert_eq!(display.pixels().len(), DISPLAY_WIDTH * DISPLAY_HEIGHT);

        display.set_mode(DisplayMode::Extended);
        assert_eq!(display.pixels().len(), EXT_DISPLAY_WIDTH * EXT_DISPLAY_HEIGHT);
        assert_eq!(display.mode().size(), [128, 64]);
    }

    #[test]
    fn test_draw_xor() {
        let mut display = Display::default();

        assert!(!display.draw_sprite(0, 0, &[0b1010_0000], false));
        assert_eq!(display.pixel(0, 0), 1);
        assert_eq!(display.pixel(1, 0), 0);
        assert_eq!(display.pixel(2, 0), 1);

        // Overlap only on the first pixel.
        assert!(display.draw_sprite(0, 0, &[0b1100_0000], false));
        assert_eq!(display.pixel(0, 0), 0);
        assert_eq!(display.pixel(1, 0), 1);
        assert_eq!(display.pixel(2, 0), 1);
    }

    #[test]
    fn test_draw_clips_at_edges() {
        let mut display = Display::default();

        // Bottom right corner, only the top-left pixel of the sprite is visible.
        display.draw_sprite(63, 31, &[0xFF, 0xFF], false);
        assert_eq!(lit(&display), 1);
        assert_eq!(display.pixel(63, 31), 1);
    }

    #[test]
    fn test_draw_origin_wraps() {
        let mut display = Display::default();

        display.draw_sprite(64 + 2, 32 + 1, &[0b1000_0000], false);
        assert_eq!(display.pixel(2, 1), 1);
    }

    #[test]
    fn test_draw_wide_sprite() {
        let mut display = Display::default();
        display.set_mode(DisplayMode::Extended);

        let sprite = [0xFFu8; 32];
        assert!(!display.draw_sprite(10, 10, &sprite, true));
        assert_eq!(lit(&display), 256);
        assert_eq!(display.pixel(25, 25), 1);
        assert_eq!(display.pixel(26, 25), 0);
    }

    #[test]
    fn test_scroll_down() {
        let mut display = Display::default();
        display.set_mode(DisplayMode::Extended);
        display.draw_sprite(5, 0, &[0b1000_0000], false);
        display.draw_sprite(5, 63, &[0b1000_0000], false);

        display.scroll_down(4);
        assert_eq!(display.pixel(5, 0), 0);
        assert_eq!(display.pixel(5, 4), 1);
        // Bottom row is pushed out.
        assert_eq!(lit(&display), 1);
    }

    #[test]
    fn test_scroll_horizontal() {
        let mut display = Display::default();
        display.set_mode(DisplayMode::Extended);
        display.draw_sprite(0, 3, &[0b1000_0001], false);

        display.scroll_right(SCROLL_COLUMNS);
        assert_eq!(display.pixel(4, 3), 1);
        assert_eq!(display.pixel(11, 3), 1);
        assert_eq!(lit(&display), 2);

        display.scroll_left(SCROLL_COLUMNS);
        display.scroll_left(SCROLL_COLUMNS);
        // Left-most pixel fell off the edge.
        assert_eq!(display.pixel(3, 3), 1);
        assert_eq!(lit(&display), 1);
    }

    #[test]
    fn test_clear_only_active_region() {
        let mut display = Display::default();
        display.draw_sprite(0, 0, &[0xFF], false);
        display.clear();
        assert_eq!(lit(&display), 0);
    }
}
