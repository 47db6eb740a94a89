use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;

use bingo_night::chat::{self, Delivery};
use bingo_night::column::Column;
use bingo_night::generator::{CardGenerator, GeneratedCard};
use bingo_night::host::{GameHost, NewGame};
use bingo_night::template::{BallSlot, CardTemplate, Color, NameSlot};

const BG: Rgb<u8> = Rgb([24, 40, 72]);
const WIDTH: u32 = 240;
const HEIGHT: u32 = 200;

fn background_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(WIDTH, HEIGHT, BG);
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode background");
    buf.into_inner()
}

fn ball(x: f32, column: Column) -> BallSlot {
    BallSlot { x, y: 0.4, radius: 14.0, column }
}

fn five_column_template() -> CardTemplate {
    CardTemplate {
        background_image: BASE64.encode(background_png()),
        ball_slots: vec![
            ball(0.1, Column::B),
            ball(0.3, Column::I),
            ball(0.5, Column::N),
            ball(0.7, Column::G),
            ball(0.9, Column::O),
        ],
        name_slots: vec![NameSlot { x: 0.5, y: 0.85, size: 18.0, color: Color([255, 255, 255]) }],
    }
}

/// Raster assertions need a real font; hosts without one skip those tests.
fn generator() -> Option<CardGenerator> {
    CardGenerator::new().ok()
}

fn assert_standard_card(card: &GeneratedCard) {
    assert_eq!(card.numbers.len(), 5);
    for (placed, column) in card.numbers.iter().zip(Column::ALL) {
        assert_eq!(placed.column, column);
        assert!(
            column.range().contains(&placed.value),
            "{} drew {} outside {:?}",
            column,
            placed.value,
            column.range()
        );
    }
    let decoded = image::load_from_memory(&card.png).expect("card png decodes").to_rgb8();
    assert_eq!(decoded.dimensions(), (WIDTH, HEIGHT));
}

#[test]
fn generates_a_card_with_one_number_per_column() {
    let Some(generator) = generator() else { return };
    let card = generator.generate(&five_column_template(), "Alice").unwrap();
    assert_eq!(card.player_name, "Alice");
    assert_standard_card(&card);

    // balls land on the canvas: the slot centers are no longer background
    let decoded = image::load_from_memory(&card.png).unwrap().to_rgb8();
    for placed in &card.numbers {
        let px = decoded.get_pixel(placed.x as u32, placed.y as u32);
        assert_ne!(*px, BG, "ball at ({}, {}) left no ink", placed.x, placed.y);
    }
    // the name slot row picked up glyph ink too
    let name_row_ink = decoded
        .enumerate_pixels()
        .filter(|(_, y, p)| (160..190).contains(y) && **p != BG)
        .count();
    assert!(name_row_ink > 0, "expected the player name near y=170");
}

#[test]
fn template_without_name_slots_leaves_the_name_band_clean() {
    let Some(generator) = generator() else { return };
    let mut template = five_column_template();
    template.name_slots.clear();
    let card = generator.generate(&template, "Alice").unwrap();
    assert_standard_card(&card);

    let decoded = image::load_from_memory(&card.png).unwrap().to_rgb8();
    let stray = decoded
        .enumerate_pixels()
        .filter(|(_, y, p)| (160..190).contains(y) && **p != BG)
        .count();
    assert_eq!(stray, 0, "nothing should render in the name band");
}

#[test]
fn seeded_generation_is_fully_reproducible() {
    let Some(generator) = generator() else { return };
    let template = five_column_template();
    let a = generator
        .generate_with_rng(&template, "Alice", &mut StdRng::seed_from_u64(5))
        .unwrap();
    let b = generator
        .generate_with_rng(&template, "Alice", &mut StdRng::seed_from_u64(5))
        .unwrap();
    assert_eq!(a.numbers, b.numbers);
    assert_eq!(a.png, b.png);
}

#[test]
fn background_can_be_a_file_path() {
    let Some(generator) = generator() else { return };
    let mut file = tempfile::NamedTempFile::with_suffix(".png").unwrap();
    file.write_all(&background_png()).unwrap();

    let mut template = five_column_template();
    template.background_image = file.path().to_str().unwrap().to_string();
    let card = generator.generate(&template, "Bea").unwrap();
    assert_standard_card(&card);
}

#[test]
fn sized_generation_scales_positions_but_not_radii() {
    let Some(generator) = generator() else { return };
    let template = five_column_template();
    let card = generator
        .generate_sized(&template, "Cho", 480, 400, &mut StdRng::seed_from_u64(9))
        .unwrap();
    assert_eq!((card.width, card.height), (480, 400));
    assert_eq!(card.numbers[2].x, 240.0);
    assert_eq!(card.numbers[2].y, 160.0);
    assert_eq!(card.numbers[2].radius, 14.0);
}

#[derive(Default)]
struct Recorder {
    texts: Mutex<Vec<(String, String)>>,
    cards: Mutex<Vec<(String, usize)>>,
}

impl Recorder {
    fn texts_for(&self, psid: &str) -> Vec<String> {
        self.texts
            .lock()
            .iter()
            .filter(|(to, _)| to == psid)
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn cards_for(&self, psid: &str) -> usize {
        self.cards.lock().iter().filter(|(to, _)| to == psid).count()
    }
}

impl Delivery for Recorder {
    fn send_text(&self, psid: &str, text: &str) {
        self.texts.lock().push((psid.to_string(), text.to_string()));
    }

    fn send_card(&self, psid: &str, card: &GeneratedCard) {
        self.cards.lock().push((psid.to_string(), card.numbers.len()));
    }
}

fn host_with_game(gid: &str, player_limit: usize) -> Option<GameHost> {
    let host = GameHost::new(generator()?);
    host.create_game(NewGame {
        gid: gid.to_string(),
        template: five_column_template(),
        player_limit,
        max_cards_per_player: 3,
    })
    .unwrap();
    Some(host)
}

#[test]
fn chat_join_delivers_cards_pin_and_game_over() {
    let Some(host) = host_with_game("game42", 2) else { return };
    let rec = Recorder::default();

    // programmatic join for the first player
    let receipt = host.join_game("game42", "psid-1", "Bob", 2).unwrap();
    assert_eq!(receipt.pin.len(), 4);
    assert_eq!(receipt.cards.len(), 2);
    for card in &receipt.cards {
        assert_standard_card(card);
    }
    let (gid, player) = host.validate_pin(&receipt.pin).unwrap();
    assert_eq!(gid, "game42");
    assert_eq!(player.name, "Bob");
    assert_eq!(player.cards.len(), 2);

    // chat join for the second
    chat::handle_message(&host, &rec, "psid-2", "join Alice game42");
    assert_eq!(rec.cards_for("psid-2"), 1);
    let confirmations = rec.texts_for("psid-2");
    assert_eq!(confirmations.len(), 1);
    assert!(confirmations[0].contains("You're in, Alice!"), "got: {}", confirmations[0]);

    // the game is now full
    chat::handle_message(&host, &rec, "psid-3", "join Carol game42");
    assert_eq!(rec.texts_for("psid-3"), vec![chat::GAME_FULL_MSG.to_string()]);
    assert_eq!(rec.cards_for("psid-3"), 0);

    // unknown gid
    chat::handle_message(&host, &rec, "psid-4", "join Dan nosuch");
    assert_eq!(rec.texts_for("psid-4"), vec![chat::INVALID_GAME_ID_MSG.to_string()]);

    // small talk lists the open games; game42 is full so only the header shows
    chat::handle_message(&host, &rec, "psid-5", "hello");
    let listing = &rec.texts_for("psid-5")[0];
    assert!(listing.contains("Game ID: game42"));
    assert!(listing.contains("Slots Left: 0"));

    // wrap up and tell everyone
    let ended = host.end_game("game42", Some("Alice")).unwrap();
    chat::broadcast_game_over(&rec, &ended);
    let expected = chat::game_over_message("Alice");
    assert!(rec.texts_for("psid-1").contains(&expected));
    assert!(rec.texts_for("psid-2").iter().any(|t| t == &expected));

    let history = host.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].gid, "game42");
    assert_eq!(history[0].winner.as_deref(), Some("Alice"));
}

#[test]
fn failed_generation_records_no_player() {
    let Some(generator) = generator() else { return };
    let host = GameHost::new(generator);
    let mut template = five_column_template();
    template.background_image = "not/a/file/and/not/base64!!".to_string();
    host.create_game(NewGame {
        gid: "broken".to_string(),
        template,
        player_limit: 5,
        max_cards_per_player: 3,
    })
    .unwrap();

    let rec = Recorder::default();
    chat::handle_message(&host, &rec, "psid-9", "join Eve broken");
    assert_eq!(rec.texts_for("psid-9"), vec![chat::GENERATION_FAILED_MSG.to_string()]);
    assert_eq!(rec.cards_for("psid-9"), 0);
    assert!(host.store().get("broken").unwrap().players.is_empty());

    // nothing was recorded, so the same player can retry once the template is fixed
    let err = host.join_game("broken", "psid-9", "Eve", 1).unwrap_err();
    assert!(matches!(err, bingo_night::game::JoinError::Generation(_)));
}

#[test]
fn join_rejects_blank_names_before_generating() {
    let Some(host) = host_with_game("game7", 4) else { return };
    let err = host.join_game("game7", "psid-1", "   ", 1).unwrap_err();
    assert_eq!(err, bingo_night::game::JoinError::EmptyName);
    assert!(host.store().get("game7").unwrap().players.is_empty());
}

#[test]
fn over_allocated_template_is_rejected_at_join() {
    let Some(generator) = generator() else { return };
    let host = GameHost::new(generator);
    let mut template = five_column_template();
    for i in 0..16 {
        template.ball_slots.push(BallSlot {
            x: i as f32 / 16.0,
            y: 0.6,
            radius: 8.0,
            column: Column::B,
        });
    }
    host.create_game(NewGame {
        gid: "packed".to_string(),
        template,
        player_limit: 5,
        max_cards_per_player: 3,
    })
    .unwrap();

    let err = host.join_game("packed", "psid-1", "Ada", 1).unwrap_err();
    let bingo_night::game::JoinError::Generation(inner) = err else {
        panic!("expected a generation error, got {err:?}");
    };
    assert!(matches!(
        inner,
        bingo_night::generator::GenerateError::Template(
            bingo_night::template::TemplateError::OverAllocated { column: Column::B, .. }
        )
    ));
}
