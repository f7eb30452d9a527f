use serde::{Deserialize, Serialize};

/// Canonical measurement units the ordering engine emits.
///
/// Customer text arrives with many spellings ("kilos", "pkts", "litres");
/// everything downstream of the parser only ever sees one of these tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalUnit {
    Kg,
    G,
    L,
    Ml,
    Piece,
    Pack,
    Bottle,
    Box,
    Dozen,
}

impl CanonicalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::G => "g",
            Self::L => "l",
            Self::Ml => "ml",
            Self::Piece => "piece",
            Self::Pack => "pack",
            Self::Bottle => "bottle",
            Self::Box => "box",
            Self::Dozen => "dozen",
        }
    }
}

impl std::fmt::Display for CanonicalUnit {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Recognizes a token as a known unit synonym. Returns `None` for anything
/// outside the synonym families, which is how the parser tells "unit token"
/// apart from "part of the item name".
pub fn unit_token(raw: &str) -> Option<CanonicalUnit> {
    let normalized = raw.trim().to_ascii_lowercase();
    let unit = match normalized.as_str() {
        "kg" | "kilo" | "kilos" | "kilogram" | "kilograms" => CanonicalUnit::Kg,
        "g" | "gm" | "gram" | "grams" => CanonicalUnit::G,
        "l" | "litre" | "litres" | "liter" | "liters" => CanonicalUnit::L,
        "ml" | "millilitre" | "millilitres" | "milliliter" | "milliliters" => CanonicalUnit::Ml,
        "piece" | "pieces" | "pc" | "pcs" => CanonicalUnit::Piece,
        "pack" | "packs" | "packet" | "packets" => CanonicalUnit::Pack,
        "bottle" | "bottles" => CanonicalUnit::Bottle,
        "box" | "boxes" => CanonicalUnit::Box,
        "dozen" | "dozens" => CanonicalUnit::Dozen,
        _ => return None,
    };
    Some(unit)
}

/// Maps a raw unit token to its canonical form. Unrecognized tokens
/// (including the empty string) fall back to `piece` rather than erroring;
/// the storefront would rather record "1 piece" than drop the line.
pub fn normalize_unit(raw: &str) -> CanonicalUnit {
    unit_token(raw).unwrap_or(CanonicalUnit::Piece)
}

/// Converts a quantity into the base unit of its measurement family:
/// grams to kilograms, millilitres to litres, dozens to a plain count.
/// Everything else passes through unchanged. Convenience for callers
/// aggregating quantities; the parser itself never calls this.
pub fn convert_to_base_unit(quantity: f64, unit: CanonicalUnit) -> f64 {
    match unit {
        CanonicalUnit::G | CanonicalUnit::Ml => quantity / 1000.0,
        CanonicalUnit::Dozen => quantity * 12.0,
        _ => quantity,
    }
}
