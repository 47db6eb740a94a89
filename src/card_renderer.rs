use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, Rgb, RgbImage};
use rusttype::{Font, Scale, point};
use thiserror::Error;
use walkdir::WalkDir;

use crate::generator::PlacedNumber;
use crate::template::NameSlot;

/// Classic bingo-ball red, with white numbers on top.
pub const BALL_FILL: Rgb<u8> = Rgb([231, 76, 60]);
pub const BALL_TEXT: Rgb<u8> = Rgb([255, 255, 255]);

// Common font family file stems, tried before falling back to scoring.
const FONT_CANDIDATES: &[&str] = &[
    "Arial",
    "Helvetica",
    "DejaVuSans",
    "LiberationSans",
    "SegoeUI",
    "Segoe UI",
    "NotoSans-Regular",
    "NotoSans",
    "Cantarell-Regular",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No usable font could be located. Transient in the sense that installing
    /// a font (or pointing BINGO_NIGHT_FONT_PATH at one) fixes it without
    /// touching the template.
    #[error("no usable system font found, set BINGO_NIGHT_FONT_PATH to a .ttf or .otf file")]
    FontUnavailable,
    #[error("font data could not be parsed")]
    InvalidFont,
    #[error("background image failed to load: {0}")]
    Background(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
}

fn font_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = dirs_next::home_dir() {
            dirs.push(home.join("Library/Fonts"));
        }
    } else if cfg!(target_os = "windows") {
        if let Some(windir) = std::env::var_os("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push(PathBuf::from("C:\\Windows\\Fonts"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = dirs_next::home_dir() {
            dirs.push(home.join(".fonts"));
            dirs.push(home.join(".local/share/fonts"));
        }
    }
    dirs
}

fn list_font_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    for dir in font_search_dirs() {
        if !dir.is_dir() { continue; }
        for entry in WalkDir::new(&dir).follow_links(true).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_file() { continue; }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else { continue };
            if ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf") {
                files.push(path.to_path_buf());
            }
        }
    }
    files
}

// How much of printable ASCII the font actually maps; glyph id 0 is .notdef.
fn ascii_coverage(font: &Font) -> usize {
    (32u8..=126).filter(|&c| font.glyph(c as char).id().0 != 0).count()
}

/// Locate font bytes: the BINGO_NIGHT_FONT_PATH override wins, then well-known
/// family names, then whichever installed font covers the most printable ASCII.
pub fn find_system_font_data() -> Option<Vec<u8>> {
    if let Ok(path) = std::env::var("BINGO_NIGHT_FONT_PATH") {
        if let Ok(bytes) = fs::read(&path) {
            return Some(bytes);
        }
    }

    let files = list_font_files();

    for candidate in FONT_CANDIDATES {
        let named = files.iter().find(|path| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case(candidate))
        });
        if let Some(path) = named {
            if let Ok(bytes) = fs::read(path) {
                return Some(bytes);
            }
        }
    }

    let mut best: Option<(usize, Vec<u8>)> = None;
    for path in &files {
        let Ok(bytes) = fs::read(path) else { continue };
        let Some(font) = Font::try_from_vec(bytes.clone()) else { continue };
        let score = ascii_coverage(&font);
        if best.as_ref().is_none_or(|(top, _)| score > *top) {
            best = Some((score, bytes));
        }
    }
    best.map(|(_, bytes)| bytes)
}

/// Stamps single lines of text onto a raster, alpha-blending glyph coverage
/// into whatever is already there.
pub struct TextPainter {
    font: Font<'static>,
}

impl TextPainter {
    pub fn new(font_data: Vec<u8>) -> Result<Self, RenderError> {
        let font = Font::try_from_vec(font_data).ok_or(RenderError::InvalidFont)?;
        Ok(Self { font })
    }

    pub fn from_system_fonts() -> Result<Self, RenderError> {
        let data = find_system_font_data().ok_or(RenderError::FontUnavailable)?;
        Self::new(data)
    }

    fn text_width(&self, text: &str, scale: Scale) -> f32 {
        let last = self.font.layout(text, scale, point(0.0, 0.0)).last();
        match last {
            Some(glyph) => glyph.position().x + glyph.unpositioned().h_metrics().advance_width,
            None => 0.0,
        }
    }

    /// Draw `text` centered on (cx, cy) at `px` pixels, clipping at the canvas
    /// edges rather than panicking on out-of-bounds glyphs.
    pub fn draw_centered(&self, img: &mut RgbImage, text: &str, cx: f32, cy: f32, px: f32, color: Rgb<u8>) {
        if px <= 0.0 { return; }
        let scale = Scale::uniform(px);
        let v_metrics = self.font.v_metrics(scale);
        let left = cx - self.text_width(text, scale) / 2.0;
        let baseline = cy + (v_metrics.ascent + v_metrics.descent) / 2.0;
        let (width, height) = img.dimensions();
        for glyph in self.font.layout(text, scale, point(left, baseline)) {
            let Some(bb) = glyph.pixel_bounding_box() else { continue };
            glyph.draw(|x, y, coverage| {
                if coverage < 0.05 { return; }
                let gx = bb.min.x + x as i32;
                let gy = bb.min.y + y as i32;
                if gx < 0 || gy < 0 || gx as u32 >= width || gy as u32 >= height { return; }
                blend(img.get_pixel_mut(gx as u32, gy as u32), color, coverage);
            });
        }
    }
}

fn blend(dst: &mut Rgb<u8>, src: Rgb<u8>, alpha: f32) {
    for i in 0..3 {
        dst[i] = ((dst[i] as f32) * (1.0 - alpha) + (src[i] as f32) * alpha) as u8;
    }
}

/// Solid disc centered on (cx, cy) with a one-pixel soft edge, using the same
/// blend as the glyph painter.
pub fn fill_circle(img: &mut RgbImage, cx: f32, cy: f32, radius: f32, color: Rgb<u8>) {
    let (width, height) = img.dimensions();
    if radius <= 0.0 || width == 0 || height == 0 { return; }
    let x0 = (cx - radius - 1.0).floor().max(0.0) as u32;
    let y0 = (cy - radius - 1.0).floor().max(0.0) as u32;
    let x1 = ((cx + radius + 1.0).ceil() as i64).clamp(0, width as i64 - 1) as u32;
    let y1 = ((cy + radius + 1.0).ceil() as i64).clamp(0, height as i64 - 1) as u32;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let cover = (radius - (dx * dx + dy * dy).sqrt() + 0.5).clamp(0.0, 1.0);
            if cover <= 0.0 { continue; }
            blend(img.get_pixel_mut(x, y), color, cover);
        }
    }
}

/// Resolve a template's background string. A path to an existing file wins;
/// anything else is treated as base64, with or without a data-URL prefix.
pub fn load_background(source: &str) -> Result<RgbImage, RenderError> {
    let bytes = if Path::new(source).is_file() {
        fs::read(source).map_err(|e| RenderError::Background(e.to_string()))?
    } else {
        let payload = match source.find("base64,") {
            Some(idx) => &source[idx + "base64,".len()..],
            None => source,
        };
        BASE64
            .decode(payload.trim())
            .map_err(|e| RenderError::Background(e.to_string()))?
    };
    let decoded = image::load_from_memory(&bytes).map_err(|e| RenderError::Background(e.to_string()))?;
    Ok(decoded.to_rgb8())
}

/// Composite one card onto `canvas`: a ball and its number for every placed
/// draw, then the player's name at each name slot. Placed numbers are already
/// in pixel space; name slot positions are fractions resolved here.
pub fn render_card(
    canvas: &mut RgbImage,
    numbers: &[PlacedNumber],
    name_slots: &[NameSlot],
    player_name: &str,
    painter: &TextPainter,
) {
    for placed in numbers {
        fill_circle(canvas, placed.x, placed.y, placed.radius, BALL_FILL);
        painter.draw_centered(canvas, &placed.value.to_string(), placed.x, placed.y, placed.radius, BALL_TEXT);
    }
    let (width, height) = canvas.dimensions();
    for slot in name_slots {
        let x = slot.x * width as f32;
        let y = slot.y * height as f32;
        painter.draw_centered(canvas, player_name, x, y, slot.size, Rgb(slot.color.0));
    }
}

pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}
