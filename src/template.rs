use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error as ThisError;

use crate::column::{Column, POOL_SIZE};

/// Organizer-authored card layout. Slot positions are fractions of the canvas
/// in [0, 1], so one template renders at any resolution; ball radii and name
/// font sizes are pixel values and do not scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTemplate {
    /// Either a path to an image file, or a base64 payload (a leading
    /// `data:...;base64,` prefix is tolerated).
    pub background_image: String,
    pub ball_slots: Vec<BallSlot>,
    /// Older templates predate name slots, so the field may be absent.
    #[serde(default)]
    pub name_slots: Vec<NameSlot>,
}

/// Where one drawn number lands: fractional center, pixel radius, and the
/// column whose pool supplies the value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSlot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub column: Column,
}

/// Where the player's name is stamped: fractional center, pixel font size,
/// and fill color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NameSlot {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum TemplateError {
    /// More ball slots reference a column than its pool holds numbers. This is
    /// a layout defect; retrying can never make a 15-number pool fill 16 slots.
    #[error("column {column} appears in {slots} ball slots, its pool only holds 15")]
    OverAllocated { column: Column, slots: usize },
}

impl CardTemplate {
    /// Count ball slots per column and reject anything a 15-number pool cannot
    /// satisfy. Runs on every generation attempt, not just at authoring time,
    /// because templates arrive as caller-supplied data.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut counts = [0usize; Column::ALL.len()];
        for slot in &self.ball_slots {
            counts[slot.column.index()] += 1;
        }
        for column in Column::ALL {
            let slots = counts[column.index()];
            if slots > POOL_SIZE {
                return Err(TemplateError::OverAllocated { column, slots });
            }
        }
        Ok(())
    }
}

/// 24-bit sRGB color, written as `#rrggbb` in template JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("invalid color {0:?}, expected #rrggbb")]
pub struct InvalidColor(pub String);

impl FromStr for Color {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').ok_or_else(|| InvalidColor(s.to_string()))?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(InvalidColor(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| InvalidColor(s.to_string()))
        };
        Ok(Color([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Color, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

pub fn read_template_from_json(path: &Path) -> Result<CardTemplate, Box<dyn Error>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let template = serde_json::from_reader(reader)?;
    Ok(template)
}
