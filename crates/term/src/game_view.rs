//! GameView: draws a [`SessionSnapshot`] into a terminal framebuffer.
//!
//! Pure (no I/O), so layouts can be unit-tested against a framebuffer.

use crate::core::SessionSnapshot;
use crate::effects::TileEffects;
use crate::fb::{FrameBuffer, Rgb, Style};
use crate::types::GameState;

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// What the side panel shows about the AI adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatusView {
    pub client_count: u16,
    pub controller_id: Option<usize>,
    pub streaming_count: u16,
}

const SCREEN_BG: Rgb = Rgb::new(0, 0, 0);
const BOARD_BG: Rgb = Rgb::new(187, 173, 160);
const EMPTY_BG: Rgb = Rgb::new(205, 193, 180);
const DARK_TEXT: Rgb = Rgb::new(119, 110, 101);
const LIGHT_TEXT: Rgb = Rgb::new(249, 246, 242);

/// Background and text colour of a tile, by power.
pub fn tile_colors(power: u8) -> (Rgb, Rgb) {
    match power {
        0 => (Rgb::new(238, 228, 218), DARK_TEXT),
        1 => (Rgb::new(237, 224, 200), DARK_TEXT),
        2 => (Rgb::new(242, 177, 121), LIGHT_TEXT),
        3 => (Rgb::new(245, 149, 99), LIGHT_TEXT),
        4 => (Rgb::new(246, 124, 95), LIGHT_TEXT),
        5 => (Rgb::new(246, 94, 59), LIGHT_TEXT),
        6 => (Rgb::new(237, 207, 114), LIGHT_TEXT),
        7 => (Rgb::new(237, 204, 97), LIGHT_TEXT),
        8 => (Rgb::new(237, 200, 80), LIGHT_TEXT),
        9 => (Rgb::new(237, 197, 63), LIGHT_TEXT),
        10 => (Rgb::new(237, 194, 46), LIGHT_TEXT),
        _ => (Rgb::new(60, 58, 50), LIGHT_TEXT),
    }
}

pub struct GameView {
    /// Tile width in terminal columns
    tile_w: u16,
    /// Tile height in terminal rows
    tile_h: u16,
}

impl Default for GameView {
    fn default() -> Self {
        // Roughly square tiles with the usual 1:2 glyph aspect.
        Self::new(7, 3)
    }
}

impl GameView {
    pub fn new(tile_w: u16, tile_h: u16) -> Self {
        Self {
            tile_w: tile_w.max(1),
            tile_h: tile_h.max(1),
        }
    }

    /// Size of the board frame (tiles, one-column gutters and border)
    pub fn board_size(&self, snap: &SessionSnapshot) -> (u16, u16) {
        let cols = snap.cols as u16;
        let rows = snap.rows as u16;
        (
            cols * self.tile_w + cols + 1 + 2,
            rows * self.tile_h + 2,
        )
    }

    /// Render without effects or adapter status.
    pub fn render_into(&self, snap: &SessionSnapshot, viewport: Viewport, fb: &mut FrameBuffer) {
        self.render_into_with(snap, None, None, viewport, fb);
    }

    /// Render into a reused framebuffer.
    ///
    /// Allocation-free once `fb` has reached the viewport size.
    pub fn render_into_with(
        &self,
        snap: &SessionSnapshot,
        effects: Option<&TileEffects>,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(Style::new(LIGHT_TEXT, SCREEN_BG));

        let (frame_w, frame_h) = self.board_size(snap);
        let panel_w = 18;
        let total_w = frame_w + panel_w;
        let start_x = viewport.width.saturating_sub(total_w) / 2;
        let start_y = viewport.height.saturating_sub(frame_h) / 2;

        let board = Style::new(DARK_TEXT, BOARD_BG);
        fb.fill_rect(start_x, start_y, frame_w, frame_h, ' ', board);
        fb.draw_box(start_x, start_y, frame_w, frame_h, board);

        for y in 0..snap.rows {
            for x in 0..snap.cols {
                let value = snap.value_at(x as usize, y as usize);
                let flash = effects.and_then(|fx| fx.flash_at(x, y));
                let tx = start_x + 2 + x as u16 * (self.tile_w + 1);
                let ty = start_y + 1 + y as u16 * self.tile_h;
                self.draw_tile(fb, tx, ty, value, flash.map_or(0, |f| f.intensity()));
            }
        }

        self.draw_side_panel(
            fb,
            snap,
            effects,
            adapter,
            start_x + frame_w + 2,
            start_y,
            viewport,
        );

        if snap.state == GameState::GameOver {
            let mid = start_y + frame_h / 2;
            let style = Style::new(LIGHT_TEXT, Rgb::new(119, 110, 101)).bold();
            fb.fill_rect(start_x + 1, mid, frame_w.saturating_sub(2), 1, ' ', style);
            fb.put_str_centered(start_x, mid, frame_w, "GAME OVER", style);
            let hint = Style::new(DARK_TEXT, BOARD_BG);
            fb.put_str_centered(start_x, mid + 1, frame_w, "press r", hint);
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, snap: &SessionSnapshot, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(snap, viewport, &mut fb);
        fb
    }

    fn draw_tile(&self, fb: &mut FrameBuffer, x: u16, y: u16, value: u32, flash: u8) {
        if value == 0 {
            let style = Style::new(DARK_TEXT, EMPTY_BG);
            fb.fill_rect(x, y, self.tile_w, self.tile_h, ' ', style);
            fb.put_char(x + self.tile_w / 2, y + self.tile_h / 2, '·', style);
            return;
        }

        let power = value.trailing_zeros().saturating_sub(1) as u8;
        let (bg, fg) = tile_colors(power);
        let style = Style::new(fg, bg.lighten(flash / 2)).bold();
        fb.fill_rect(x, y, self.tile_w, self.tile_h, ' ', style);

        let mid = y + self.tile_h / 2;
        let digits = digit_count(value);
        if digits <= self.tile_w {
            let pad = (self.tile_w - digits) / 2;
            fb.put_u32_right(x + pad + digits, mid, value, style);
        } else {
            // 131072 -> "128k"
            let kilo = value / 1024;
            let digits = digit_count(kilo) + 1;
            let pad = self.tile_w.saturating_sub(digits) / 2;
            let end = x + pad + digits - 1;
            fb.put_u32_right(end, mid, kilo, style);
            fb.put_char(end, mid, 'k', style);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        snap: &SessionSnapshot,
        effects: Option<&TileEffects>,
        adapter: Option<&AdapterStatusView>,
        x: u16,
        start_y: u16,
        viewport: Viewport,
    ) {
        if x.saturating_add(12) > viewport.width {
            return;
        }
        let label = Style::new(Rgb::new(220, 220, 220), SCREEN_BG).bold();
        let value = Style::new(Rgb::new(200, 200, 200), SCREEN_BG);
        let right = x + 12;

        let mut y = start_y;
        for (name, n) in [
            ("SCORE", snap.score),
            ("BEST", snap.best_tile),
            ("TURN", snap.turn),
        ] {
            fb.put_str(x, y, name, label);
            fb.put_u32_right(right, y + 1, n, value);
            y += 3;
        }

        fb.put_str(x, y, "STATE", label);
        let state = match snap.state {
            GameState::Loaded => "loading",
            GameState::WaitingForInput => "your move",
            GameState::CheckingMatches => "spawning",
            GameState::GameOver => "over",
        };
        fb.put_str(x, y + 1, state, value);
        y += 3;

        fb.put_str(x, y, "AI", label);
        match adapter {
            Some(st) => {
                let end = fb.put_str(x + 3, y, "on c", value);
                fb.put_u32_right(end + 3, y, st.client_count as u32, value);
                let end = fb.put_str(x, y + 1, "ctrl ", value);
                match st.controller_id {
                    Some(id) => fb.put_u32_right(end + 4, y + 1, id as u32, value),
                    None => {
                        fb.put_char(end, y + 1, '-', value);
                    }
                }
            }
            None => {
                fb.put_str(x + 3, y, "off", value);
            }
        }
        y += 3;

        if let Some(reached) = effects.and_then(TileEffects::banner) {
            let win = Style::new(Rgb::new(237, 194, 46), SCREEN_BG).bold();
            let end = x + digit_count(reached);
            fb.put_u32_right(end, y, reached, win);
            fb.put_char(end, y, '!', win);
        } else if snap.max_tile_reached {
            fb.put_str(x, y, "max tile hit", value);
        }

        let hint = Style::new(Rgb::new(120, 120, 120), SCREEN_BG);
        if y + 2 < viewport.height {
            fb.put_str(x, y + 2, "arrows/hjkl", hint);
            fb.put_str(x, y + 3, "r reset q quit", hint);
        }
    }
}

fn digit_count(mut n: u32) -> u16 {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_counts() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(2), 1);
        assert_eq!(digit_count(2048), 4);
        assert_eq!(digit_count(131072), 6);
    }

    #[test]
    fn every_power_has_colors() {
        assert_ne!(tile_colors(0).0, tile_colors(1).0);
        assert_eq!(tile_colors(11), tile_colors(20));
    }

    #[test]
    fn board_size_accounts_for_gutters() {
        let view = GameView::new(5, 2);
        let snap = SessionSnapshot {
            rows: 4,
            cols: 4,
            ..SessionSnapshot::default()
        };
        assert_eq!(view.board_size(&snap), (4 * 5 + 5 + 2, 4 * 2 + 2));
    }
}
