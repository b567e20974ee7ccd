//! Framebuffer and style types for terminal rendering.

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mix toward white by `amount` in `0..=255`
    pub const fn lighten(self, amount: u8) -> Self {
        const fn mix(c: u8, amount: u8) -> u8 {
            let c = c as u16;
            (c + ((255 - c) * amount as u16) / 255) as u8
        }
        Self::new(mix(self.r, amount), mix(self.g, amount), mix(self.b, amount))
    }
}

/// Per-cell styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
    pub fg: Rgb,
    pub bg: Rgb,
    pub bold: bool,
}

impl Style {
    pub const fn new(fg: Rgb, bg: Rgb) -> Self {
        Self {
            fg,
            bg,
            bold: false,
        }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new(Rgb::new(220, 220, 220), Rgb::new(0, 0, 0))
    }
}

/// One styled character on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Glyph {
    pub ch: char,
    pub style: Style,
}

impl Glyph {
    pub const fn new(ch: char, style: Style) -> Self {
        Self { ch, style }
    }
}

impl Default for Glyph {
    fn default() -> Self {
        Self::new(' ', Style::default())
    }
}

/// Row-major grid of glyphs. Writes outside the buffer are clipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    glyphs: Vec<Glyph>,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            glyphs: vec![Glyph::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Change the size, keeping the allocation when it is large enough.
    ///
    /// Contents are unspecified afterwards; callers redraw every frame.
    pub fn resize(&mut self, width: u16, height: u16) {
        if (self.width, self.height) == (width, height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.glyphs
            .resize(width as usize * height as usize, Glyph::default());
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// One row of glyphs, empty when `y` is out of range
    pub fn row(&self, y: u16) -> &[Glyph] {
        if y >= self.height {
            return &[];
        }
        let start = y as usize * self.width as usize;
        &self.glyphs[start..start + self.width as usize]
    }

    #[inline]
    fn offset(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Glyph> {
        self.offset(x, y).map(|i| self.glyphs[i])
    }

    pub fn set(&mut self, x: u16, y: u16, glyph: Glyph) {
        if let Some(i) = self.offset(x, y) {
            self.glyphs[i] = glyph;
        }
    }

    pub fn clear(&mut self, style: Style) {
        self.glyphs.fill(Glyph::new(' ', style));
    }

    pub fn put_char(&mut self, x: u16, y: u16, ch: char, style: Style) {
        self.set(x, y, Glyph::new(ch, style));
    }

    /// Write `s` starting at `x`; returns the column after the last char
    pub fn put_str(&mut self, x: u16, y: u16, s: &str, style: Style) -> u16 {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.put_char(cx, y, ch, style);
            cx += 1;
        }
        cx
    }

    /// Write `s` centred inside the span `x..x + w`
    pub fn put_str_centered(&mut self, x: u16, y: u16, w: u16, s: &str, style: Style) {
        let len = s.chars().count() as u16;
        let pad = w.saturating_sub(len) / 2;
        self.put_str(x.saturating_add(pad), y, s, style);
    }

    /// Write a number without allocating, right-aligned to end at `right`
    /// (exclusive).
    pub fn put_u32_right(&mut self, right: u16, y: u16, mut n: u32, style: Style) {
        let mut x = right;
        loop {
            let Some(nx) = x.checked_sub(1) else {
                return;
            };
            x = nx;
            let digit = char::from(b'0' + (n % 10) as u8);
            self.put_char(x, y, digit, style);
            n /= 10;
            if n == 0 {
                return;
            }
        }
    }

    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, ch: char, style: Style) {
        for cy in y..y.saturating_add(h) {
            for cx in x..x.saturating_add(w) {
                self.put_char(cx, cy, ch, style);
            }
        }
    }

    /// Single-line box outline
    pub fn draw_box(&mut self, x: u16, y: u16, w: u16, h: u16, style: Style) {
        if w < 2 || h < 2 {
            return;
        }
        let (right, bottom) = (x + w - 1, y + h - 1);
        for cx in x + 1..right {
            self.put_char(cx, y, '─', style);
            self.put_char(cx, bottom, '─', style);
        }
        for cy in y + 1..bottom {
            self.put_char(x, cy, '│', style);
            self.put_char(right, cy, '│', style);
        }
        self.put_char(x, y, '┌', style);
        self.put_char(right, y, '┐', style);
        self.put_char(x, bottom, '└', style);
        self.put_char(right, bottom, '┘', style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(fb: &FrameBuffer, y: u16) -> String {
        fb.row(y).iter().map(|g| g.ch).collect()
    }

    #[test]
    fn writes_are_clipped() {
        let mut fb = FrameBuffer::new(4, 1);
        let end = fb.put_str(2, 0, "abcdef", Style::default());
        assert_eq!(end, 4);
        assert_eq!(text(&fb, 0), "  ab");
        fb.put_char(9, 9, 'x', Style::default());
        assert_eq!(fb.get(9, 9), None);
    }

    #[test]
    fn numbers_right_aligned() {
        let mut fb = FrameBuffer::new(8, 1);
        fb.put_u32_right(8, 0, 2048, Style::default());
        assert_eq!(text(&fb, 0), "    2048");

        fb.clear(Style::default());
        fb.put_u32_right(3, 0, 0, Style::default());
        assert_eq!(text(&fb, 0), "  0     ");
    }

    #[test]
    fn centered_text() {
        let mut fb = FrameBuffer::new(10, 1);
        fb.put_str_centered(0, 0, 10, "GAME", Style::default());
        assert_eq!(text(&fb, 0), "   GAME   ");
    }

    #[test]
    fn box_corners() {
        let mut fb = FrameBuffer::new(3, 3);
        fb.draw_box(0, 0, 3, 3, Style::default());
        assert_eq!(text(&fb, 0), "┌─┐");
        assert_eq!(text(&fb, 1), "│ │");
        assert_eq!(text(&fb, 2), "└─┘");
    }

    #[test]
    fn lighten_moves_toward_white() {
        let c = Rgb::new(0, 100, 255).lighten(255);
        assert_eq!(c, Rgb::new(255, 255, 255));
        assert_eq!(Rgb::new(10, 20, 30).lighten(0), Rgb::new(10, 20, 30));
    }
}
