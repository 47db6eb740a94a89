use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;

use bingo_night::generator::CardGenerator;
use bingo_night::template;

/// Render bingo cards from a template JSON, one PNG per card.
#[derive(Parser)]
#[command(name = "bingo-night", version, about = "Render bingo cards from a card template")]
struct Args {
    /// Card template JSON (background image, ball slots, name slots)
    template: PathBuf,
    /// Player name stamped into the template's name slots
    player: String,
    /// How many cards to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    cards: u32,
    /// Directory the PNG files are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
    /// Render at an explicit canvas width instead of the background's size
    #[arg(long, requires = "height")]
    width: Option<u32>,
    /// Render at an explicit canvas height instead of the background's size
    #[arg(long, requires = "width")]
    height: Option<u32>,
    /// Seed the number draws, for reproducible cards
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Failed to render cards: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let template = template::read_template_from_json(&args.template)?;
    template.validate()?;
    let generator = CardGenerator::new()?;

    let mut rng: Box<dyn rand::RngCore> = match args.seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(rand::rng()),
    };

    fs::create_dir_all(&args.out_dir)?;
    for i in 1..=args.cards {
        let card = match (args.width, args.height) {
            (Some(w), Some(h)) => generator.generate_sized(&template, &args.player, w, h, rng.as_mut())?,
            _ => generator.generate_with_rng(&template, &args.player, rng.as_mut())?,
        };
        let path = args.out_dir.join(format!("{}-card-{i}.png", file_stem(&args.player)));
        fs::write(&path, &card.png)?;

        // the audit trail doubles as the caller sheet
        let calls: Vec<String> = card.numbers.iter().map(|n| format!("{}-{}", n.column, n.value)).collect();
        println!("Card {i} for {}: {} -> {}", args.player, calls.join(" "), path.display());
    }
    Ok(())
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}
