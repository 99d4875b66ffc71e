use image::{Rgba, RgbaImage};
use vibe_contracts::models::PlayResult;

use super::color::Rgb;

pub const PANEL_WIDTH: u32 = 400;
pub const PANEL_HEIGHT: u32 = 150;
/// Pixels per second.
pub const SCROLL_SPEED: f64 = 60.0;
pub const DISPLAY_WIDTH: f64 = 360.0;
/// Space between the end of a scrolling title and its repeat.
pub const SCROLL_GAP: f64 = 50.0;
const TITLE_X: f64 = 50.0;
const TITLE_FONT_PX: u32 = 18;
const PROGRESS_BAR: (f64, f64, f64, f64) = (20.0, 70.0, 360.0, 8.0);

const BACKGROUND: u32 = 0x2a3a4a;
const PLACEHOLDER_TEXT: u32 = 0x666666;
const PRIMARY_TEXT: u32 = 0xffffff;
const SECONDARY_TEXT: u32 = 0x999999;
const TRACK: u32 = 0x333333;
const PROGRESS_FILL: u32 = 0x00aaff;

/// Track shown on the dashboard screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub duration_secs: u32,
}

impl From<&PlayResult> for NowPlaying {
    fn from(song: &PlayResult) -> Self {
        Self {
            title: song.name.clone(),
            artist: song.artist.clone(),
            duration_secs: song.duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Rgb,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        font_px: u32,
        bold: bool,
        color: Rgb,
    },
    Clip {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Unclip,
}

/// Advance-width estimate: wide glyphs take a full em, others about half.
pub fn measure_text(text: &str, font_px: u32, bold: bool) -> f64 {
    let narrow = if bold { 0.6 } else { 0.55 };
    let em = f64::from(font_px);
    text.chars()
        .map(|ch| if is_wide(ch) { em } else { em * narrow })
        .sum()
}

fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115f
        | 0x2e80..=0xa4cf
        | 0xac00..=0xd7a3
        | 0xf900..=0xfaff
        | 0xfe30..=0xfe4f
        | 0xff00..=0xff60
        | 0xffe0..=0xffe6
        | 0x1f300..=0x1faff)
}

/// `m:ss`.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Now-playing panel redrawn into a draw list whenever its inputs change.
#[derive(Debug, Clone)]
pub struct ScreenRenderer {
    song: Option<NowPlaying>,
    progress: f64,
    scroll_offset: f64,
    title_width: f64,
    ops: Vec<DrawOp>,
    redraws: u64,
}

impl Default for ScreenRenderer {
    fn default() -> Self {
        let mut screen = Self {
            song: None,
            progress: 0.0,
            scroll_offset: 0.0,
            title_width: 0.0,
            ops: Vec::new(),
            redraws: 0,
        };
        screen.draw();
        screen
    }
}

impl ScreenRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn song(&self) -> Option<&NowPlaying> {
        self.song.as_ref()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    pub fn is_scrolling(&self) -> bool {
        self.song.is_some() && self.title_width > DISPLAY_WIDTH - SCROLL_GAP
    }

    /// Resets progress and scroll.
    pub fn update_song(&mut self, song: Option<NowPlaying>) {
        self.song = song;
        self.progress = 0.0;
        self.scroll_offset = 0.0;
        self.draw();
    }

    /// `progress` is a 0..1 fraction and is clamped.
    pub fn update_progress(&mut self, progress: f64) {
        self.progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.draw();
    }

    pub fn tick(&mut self, delta: f64) {
        if !self.is_scrolling() {
            return;
        }
        self.scroll_offset += SCROLL_SPEED * delta;
        if self.scroll_offset > self.title_width + SCROLL_GAP {
            self.scroll_offset = 0.0;
        }
        self.draw();
    }

    fn draw(&mut self) {
        self.redraws += 1;
        let mut ops = vec![fill(0.0, 0.0, f64::from(PANEL_WIDTH), f64::from(PANEL_HEIGHT), BACKGROUND)];

        let Some(song) = &self.song else {
            ops.push(text("No track", 160.0, 75.0, 16, false, PLACEHOLDER_TEXT));
            self.title_width = 0.0;
            self.ops = ops;
            return;
        };

        self.title_width = measure_text(&song.title, TITLE_FONT_PX, true);
        ops.push(text("▶", 20.0, 45.0, TITLE_FONT_PX, true, PRIMARY_TEXT));
        ops.push(DrawOp::Clip {
            x: TITLE_X,
            y: 25.0,
            width: DISPLAY_WIDTH - 30.0,
            height: 30.0,
        });
        if self.title_width > DISPLAY_WIDTH - SCROLL_GAP {
            let x = TITLE_X - self.scroll_offset;
            ops.push(text(&song.title, x, 45.0, TITLE_FONT_PX, true, PRIMARY_TEXT));
            ops.push(text(
                &song.title,
                x + self.title_width + SCROLL_GAP,
                45.0,
                TITLE_FONT_PX,
                true,
                PRIMARY_TEXT,
            ));
        } else {
            ops.push(text(&song.title, TITLE_X, 45.0, TITLE_FONT_PX, true, PRIMARY_TEXT));
        }
        ops.push(DrawOp::Unclip);

        ops.push(text(&song.artist, 20.0, 130.0, 14, false, SECONDARY_TEXT));

        let (bar_x, bar_y, bar_width, bar_height) = PROGRESS_BAR;
        ops.push(fill(bar_x, bar_y, bar_width, bar_height, TRACK));
        ops.push(fill(bar_x, bar_y, bar_width * self.progress, bar_height, PROGRESS_FILL));

        let elapsed = (f64::from(song.duration_secs) * self.progress).floor() as u32;
        let clock = format!(
            "{} / {}",
            format_time(elapsed),
            format_time(song.duration_secs)
        );
        ops.push(text(&clock, 20.0, 100.0, 12, false, SECONDARY_TEXT));
        self.ops = ops;
    }

    /// Rasterizes the filled rectangles; text is left to the consumer.
    pub fn rasterize(&self) -> RgbaImage {
        let mut image = RgbaImage::new(PANEL_WIDTH, PANEL_HEIGHT);
        for op in &self.ops {
            let DrawOp::FillRect {
                x,
                y,
                width,
                height,
                color,
            } = op
            else {
                continue;
            };
            let [r, g, b] = color.to_bytes();
            let x0 = x.max(0.0).round() as u32;
            let y0 = y.max(0.0).round() as u32;
            let x1 = ((x + width).round().max(0.0) as u32).min(PANEL_WIDTH);
            let y1 = ((y + height).round().max(0.0) as u32).min(PANEL_HEIGHT);
            for py in y0..y1 {
                for px in x0..x1 {
                    image.put_pixel(px, py, Rgba([r, g, b, 255]));
                }
            }
        }
        image
    }
}

fn fill(x: f64, y: f64, width: f64, height: f64, color: u32) -> DrawOp {
    DrawOp::FillRect {
        x,
        y,
        width,
        height,
        color: Rgb::from_u32(color),
    }
}

fn text(value: &str, x: f64, y: f64, font_px: u32, bold: bool, color: u32) -> DrawOp {
    DrawOp::Text {
        text: value.to_string(),
        x,
        y,
        font_px,
        bold,
        color: Rgb::from_u32(color),
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::{
        format_time, measure_text, DrawOp, NowPlaying, ScreenRenderer, DISPLAY_WIDTH, SCROLL_GAP,
    };

    fn song(title: &str, duration_secs: u32) -> NowPlaying {
        NowPlaying {
            title: title.to_string(),
            artist: "Night Drive Ensemble".to_string(),
            duration_secs,
        }
    }

    fn texts(screen: &ScreenRenderer) -> Vec<String> {
        screen
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(600), "10:00");
    }

    #[test]
    fn empty_panel_shows_placeholder() {
        let screen = ScreenRenderer::new();
        assert_eq!(texts(&screen), vec!["No track".to_string()]);
        assert!(!screen.is_scrolling());
    }

    #[test]
    fn progress_drives_clock_and_bar() {
        let mut screen = ScreenRenderer::new();
        screen.update_song(Some(song("Rain", 200)));
        screen.update_progress(0.5);
        assert!(texts(&screen).contains(&"1:40 / 3:20".to_string()));
        let bar = screen.ops().iter().rev().find_map(|op| match op {
            DrawOp::FillRect { width, .. } => Some(*width),
            _ => None,
        });
        assert_eq!(bar, Some(180.0));

        screen.update_progress(7.0);
        assert_eq!(screen.progress(), 1.0);
    }

    #[test]
    fn long_titles_scroll_and_wrap() {
        let title = "An Exceptionally Long Song Title For A Very Small Screen";
        let width = measure_text(title, 18, true);
        assert!(width > DISPLAY_WIDTH - SCROLL_GAP);

        let mut screen = ScreenRenderer::new();
        screen.update_song(Some(song(title, 240)));
        assert!(screen.is_scrolling());
        let before = screen.redraws();
        screen.tick(0.5);
        assert_eq!(screen.scroll_offset(), 30.0);
        assert_eq!(screen.redraws(), before + 1);
        assert_eq!(texts(&screen).iter().filter(|text| text.as_str() == title).count(), 2);

        let ticks = ((width + SCROLL_GAP) / 30.0).ceil() as usize + 1;
        for _ in 0..ticks {
            screen.tick(0.5);
        }
        assert!(screen.scroll_offset() <= width + SCROLL_GAP);
    }

    #[test]
    fn short_titles_do_not_redraw_on_tick() {
        let mut screen = ScreenRenderer::new();
        screen.update_song(Some(song("Calm", 120)));
        let before = screen.redraws();
        screen.tick(1.0);
        assert_eq!(screen.redraws(), before);
        assert_eq!(screen.scroll_offset(), 0.0);
    }

    #[test]
    fn raster_paints_background_and_progress() {
        let mut screen = ScreenRenderer::new();
        screen.update_song(Some(song("Rain", 100)));
        screen.update_progress(0.25);
        let image = screen.rasterize();
        assert_eq!(image.dimensions(), (400, 150));
        assert_eq!(*image.get_pixel(5, 5), Rgba([0x2a, 0x3a, 0x4a, 255]));
        assert_eq!(*image.get_pixel(25, 72), Rgba([0x00, 0xaa, 0xff, 255]));
        assert_eq!(*image.get_pixel(300, 72), Rgba([0x33, 0x33, 0x33, 255]));
    }
}
