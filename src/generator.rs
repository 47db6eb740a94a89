use image::RgbImage;
use image::imageops::{self, FilterType};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card_renderer::{self, RenderError, TextPainter};
use crate::column::Column;
use crate::draw::DrawSession;
use crate::template::{CardTemplate, TemplateError};

/// One number committed to a ball slot, in canvas pixel space. The list of
/// these is the card's audit record: enough to check a winning pattern later
/// without re-reading the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedNumber {
    pub column: Column,
    pub value: u8,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// A finished card for one player: the audit record plus the encoded raster.
#[derive(Debug, Clone)]
pub struct GeneratedCard {
    pub player_name: String,
    pub numbers: Vec<PlacedNumber>,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// Permanent: the template itself cannot be satisfied.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// Environmental (fonts, background bytes, encoding); retryable once the
    /// environment is fixed.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Validate the template, run one fresh draw session, and resolve each ball
/// slot's fractional position against the canvas. No rasterization happens
/// here, which keeps the drawing rules testable without any font installed.
pub fn draw_card_numbers<R: Rng + ?Sized>(
    template: &CardTemplate,
    canvas_width: u32,
    canvas_height: u32,
    rng: &mut R,
) -> Result<Vec<PlacedNumber>, GenerateError> {
    template.validate()?;
    let mut session = DrawSession::fresh(rng);
    let mut numbers = Vec::with_capacity(template.ball_slots.len());
    for slot in &template.ball_slots {
        // validate() above makes exhaustion unreachable, but the draw layer's
        // contract stands: an empty pool is always the template's fault.
        let value = session.draw(slot.column).map_err(|exhausted| {
            let slots = count_slots(template, exhausted.0);
            TemplateError::OverAllocated { column: exhausted.0, slots }
        })?;
        numbers.push(PlacedNumber {
            column: slot.column,
            value,
            x: slot.x * canvas_width as f32,
            y: slot.y * canvas_height as f32,
            radius: slot.radius,
        });
    }
    Ok(numbers)
}

fn count_slots(template: &CardTemplate, column: Column) -> usize {
    template.ball_slots.iter().filter(|s| s.column == column).count()
}

/// Renders bingo cards from templates. Holds the loaded font; everything else
/// is per-call state, so one generator can serve concurrent generations.
pub struct CardGenerator {
    painter: TextPainter,
}

impl CardGenerator {
    /// Build a generator on whatever font the host system provides.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Self { painter: TextPainter::from_system_fonts()? })
    }

    /// Build a generator on caller-supplied font bytes (embedded fonts, tests).
    pub fn with_font_data(font_data: Vec<u8>) -> Result<Self, RenderError> {
        Ok(Self { painter: TextPainter::new(font_data)? })
    }

    /// Generate one card at the background image's natural size.
    pub fn generate(&self, template: &CardTemplate, player_name: &str) -> Result<GeneratedCard, GenerateError> {
        self.generate_with_rng(template, player_name, &mut rand::rng())
    }

    /// Same as `generate`, with an injected RNG for reproducible draws.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        template: &CardTemplate,
        player_name: &str,
        rng: &mut R,
    ) -> Result<GeneratedCard, GenerateError> {
        // layout defects are permanent, report them before touching any I/O
        template.validate()?;
        let canvas = card_renderer::load_background(&template.background_image)?;
        let (width, height) = canvas.dimensions();
        let numbers = draw_card_numbers(template, width, height, rng)?;
        self.compose(template, player_name, numbers, canvas)
    }

    /// Generate one card at an explicit canvas size, resampling the background
    /// to fit. Fractional slot positions follow the canvas; radii and font
    /// sizes stay in pixels.
    pub fn generate_sized<R: Rng + ?Sized>(
        &self,
        template: &CardTemplate,
        player_name: &str,
        width: u32,
        height: u32,
        rng: &mut R,
    ) -> Result<GeneratedCard, GenerateError> {
        template.validate()?;
        let numbers = draw_card_numbers(template, width, height, rng)?;
        let background = card_renderer::load_background(&template.background_image)?;
        let canvas = if background.dimensions() == (width, height) {
            background
        } else {
            imageops::resize(&background, width, height, FilterType::Lanczos3)
        };
        self.compose(template, player_name, numbers, canvas)
    }

    fn compose(
        &self,
        template: &CardTemplate,
        player_name: &str,
        numbers: Vec<PlacedNumber>,
        mut canvas: RgbImage,
    ) -> Result<GeneratedCard, GenerateError> {
        card_renderer::render_card(&mut canvas, &numbers, &template.name_slots, player_name, &self.painter);
        let (width, height) = canvas.dimensions();
        let png = card_renderer::encode_png(&canvas)?;
        Ok(GeneratedCard {
            player_name: player_name.to_string(),
            numbers,
            png,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::template::BallSlot;

    fn slot(x: f32, y: f32, column: Column) -> BallSlot {
        BallSlot { x, y, radius: 12.0, column }
    }

    fn template_with(slots: Vec<BallSlot>) -> CardTemplate {
        CardTemplate {
            background_image: "unused.png".to_string(),
            ball_slots: slots,
            name_slots: Vec::new(),
        }
    }

    #[test]
    fn numbers_match_slot_columns_and_ranges() {
        let template = template_with(vec![
            slot(0.1, 0.2, Column::B),
            slot(0.3, 0.2, Column::I),
            slot(0.5, 0.2, Column::N),
            slot(0.7, 0.2, Column::G),
            slot(0.9, 0.2, Column::O),
        ]);
        let mut rng = StdRng::seed_from_u64(11);
        let numbers = draw_card_numbers(&template, 200, 100, &mut rng).unwrap();
        assert_eq!(numbers.len(), 5);
        for (placed, slot) in numbers.iter().zip(&template.ball_slots) {
            assert_eq!(placed.column, slot.column);
            assert!(placed.column.range().contains(&placed.value));
        }
    }

    #[test]
    fn fractions_map_to_pixel_centers() {
        let template = template_with(vec![slot(0.5, 0.25, Column::N)]);
        let mut rng = StdRng::seed_from_u64(3);
        let numbers = draw_card_numbers(&template, 400, 200, &mut rng).unwrap();
        assert_eq!(numbers[0].x, 200.0);
        assert_eq!(numbers[0].y, 50.0);
        assert_eq!(numbers[0].radius, 12.0);
    }

    #[test]
    fn same_column_slots_get_distinct_values() {
        let slots: Vec<BallSlot> = (0..15).map(|i| slot(i as f32 / 15.0, 0.5, Column::O)).collect();
        let template = template_with(slots);
        let mut rng = StdRng::seed_from_u64(5);
        let numbers = draw_card_numbers(&template, 100, 100, &mut rng).unwrap();
        let mut values: Vec<u8> = numbers.iter().map(|n| n.value).collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), 15, "a column repeated a number on one card");
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let template = template_with(vec![
            slot(0.2, 0.2, Column::B),
            slot(0.4, 0.2, Column::B),
            slot(0.6, 0.2, Column::G),
        ]);
        let a = draw_card_numbers(&template, 100, 100, &mut StdRng::seed_from_u64(77)).unwrap();
        let b = draw_card_numbers(&template, 100, 100, &mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_vary_the_card() {
        let template = template_with(vec![
            slot(0.2, 0.2, Column::B),
            slot(0.4, 0.2, Column::I),
            slot(0.6, 0.2, Column::N),
            slot(0.7, 0.2, Column::G),
            slot(0.8, 0.2, Column::O),
        ]);
        let first: Vec<u8> = draw_card_numbers(&template, 100, 100, &mut StdRng::seed_from_u64(0))
            .unwrap()
            .iter()
            .map(|n| n.value)
            .collect();
        let varied = (1..=8u64).any(|seed| {
            let values: Vec<u8> = draw_card_numbers(&template, 100, 100, &mut StdRng::seed_from_u64(seed))
                .unwrap()
                .iter()
                .map(|n| n.value)
                .collect();
            values != first
        });
        assert!(varied, "eight reseeded draws all produced the same card");
    }

    #[test]
    fn over_allocated_template_fails_before_any_rendering() {
        let slots: Vec<BallSlot> = (0..16).map(|i| slot(i as f32 / 16.0, 0.5, Column::B)).collect();
        let mut template = template_with(slots);
        // background is garbage on purpose: the layout defect must win
        template.background_image = "definitely/not/a/file".to_string();
        let mut rng = StdRng::seed_from_u64(1);
        let err = draw_card_numbers(&template, 100, 100, &mut rng).unwrap_err();
        assert_eq!(
            err,
            GenerateError::Template(TemplateError::OverAllocated { column: Column::B, slots: 16 })
        );

        let Ok(generator) = CardGenerator::new() else { return };
        let err = generator.generate(&template, "Ada").unwrap_err();
        assert!(matches!(err, GenerateError::Template(_)));
    }

    #[test]
    fn missing_background_is_a_render_error() {
        let template = CardTemplate {
            background_image: "no/such/file/anywhere".to_string(),
            ball_slots: vec![slot(0.5, 0.5, Column::N)],
            name_slots: Vec::new(),
        };
        let Ok(generator) = CardGenerator::new() else { return };
        let err = generator.generate(&template, "Ada").unwrap_err();
        assert!(matches!(err, GenerateError::Render(RenderError::Background(_))));
    }
}
