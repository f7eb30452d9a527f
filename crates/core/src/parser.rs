use serde::{Deserialize, Serialize};

use crate::units::{unit_token, CanonicalUnit};

/// One structured line of a grocery order, as extracted from free-form text.
/// The name is uncatalogued: validating it against products is a downstream
/// concern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedItem {
    pub name: String,
    pub quantity: f64,
    pub unit: CanonicalUnit,
}

/// Parse result with the fragments that failed to parse kept alongside the
/// items that succeeded, so a caller can tell "the user typed nothing" apart
/// from "nothing the user typed was understandable".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseReport {
    pub items: Vec<ParsedItem>,
    pub rejected: Vec<String>,
}

/// The four grammar shapes a fragment can take, in match priority order.
///
/// A fragment is matched against each variant in declaration order and the
/// first hit wins. There is no backtracking and no plausibility scoring: a
/// fragment holding two quantity-like tokens ("5 mangoes 2kg") resolves by
/// whichever pattern fires first, which is a documented quirk of the grammar
/// rather than something to correct here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemPattern {
    /// `<number><unit> <name...>` — "2kg rice", "2 kg rice"
    UnitFirst,
    /// `<name...> <number><unit>` anchored to the end — "rice 2kg"
    UnitLast,
    /// `<number> <name...>` with no recognizable unit token — "3 eggs"
    BareQuantity,
    /// Anything not starting with a digit — "milk" (quantity 1, piece)
    BareName,
}

const PATTERN_ORDER: [ItemPattern; 4] = [
    ItemPattern::UnitFirst,
    ItemPattern::UnitLast,
    ItemPattern::BareQuantity,
    ItemPattern::BareName,
];

impl ItemPattern {
    fn apply(self, tokens: &[&str]) -> Option<ParsedItem> {
        match self {
            Self::UnitFirst => match_unit_first(tokens),
            Self::UnitLast => match_unit_last(tokens),
            Self::BareQuantity => match_bare_quantity(tokens),
            Self::BareName => match_bare_name(tokens),
        }
    }
}

/// Splits free text into fragments and parses each independently, dropping
/// fragments that fail to parse. Fragment order is preserved; downstream
/// billing displays items in the order the customer typed them.
pub fn parse_grocery_list(text: &str) -> Vec<ParsedItem> {
    parse_grocery_list_report(text).items
}

/// Like [`parse_grocery_list`] but also returns the fragments that were
/// rejected instead of silently dropping them.
pub fn parse_grocery_list_report(text: &str) -> ParseReport {
    let normalized = text.to_lowercase();
    let mut report = ParseReport::default();

    for fragment in split_fragments(&normalized) {
        match parse_item(&fragment) {
            Some(item) => report.items.push(item),
            None => report.rejected.push(fragment),
        }
    }

    report
}

/// Parses a single fragment through the ordered grammar. Returns `None` for
/// fragments that start with a digit but fit none of the patterns; callers
/// signal that only by omission.
pub fn parse_item(fragment: &str) -> Option<ParsedItem> {
    let cleaned = strip_multiplier_markers(fragment);
    let tokens = cleaned.split_whitespace().collect::<Vec<_>>();
    if tokens.is_empty() {
        return None;
    }
    PATTERN_ORDER.iter().find_map(|pattern| pattern.apply(&tokens))
}

/// Breaks raw text on comma, semicolon, newline, or the standalone word
/// "and". Empty fragments are discarded; order is kept.
fn split_fragments(text: &str) -> Vec<String> {
    text.split(|ch: char| matches!(ch, ',' | ';' | '\n'))
        .flat_map(split_on_and)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Splits one delimiter-free chunk on the word "and" when it stands alone
/// between whitespace. "sand and gravel" becomes two fragments; "sandwich"
/// stays whole.
fn split_on_and(chunk: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = Vec::new();
    for token in chunk.split_whitespace() {
        if token == "and" {
            fragments.push(current.join(" "));
            current.clear();
        } else {
            current.push(token);
        }
    }
    fragments.push(current.join(" "));
    fragments
}

/// Drops multiplier markers so "2x rice" and "2 x rice" both read as
/// "2 rice".
fn strip_multiplier_markers(fragment: &str) -> String {
    let mut tokens = Vec::new();
    for token in fragment.split_whitespace() {
        if token == "x" {
            continue;
        }
        match token.strip_suffix('x') {
            Some(number) if is_quantity_shaped(number) => tokens.push(number),
            _ => tokens.push(token),
        }
    }
    tokens.join(" ")
}

fn match_unit_first(tokens: &[&str]) -> Option<ParsedItem> {
    let (head, rest) = tokens.split_first()?;
    if let Some((quantity, unit)) = split_glued_quantity_unit(head) {
        return build_item(rest, quantity, unit);
    }
    let quantity = parse_quantity(head)?;
    let (unit_word, name_tokens) = rest.split_first()?;
    let unit = unit_token(unit_word)?;
    build_item(name_tokens, quantity, unit)
}

fn match_unit_last(tokens: &[&str]) -> Option<ParsedItem> {
    let (tail, head) = tokens.split_last()?;
    if let Some((quantity, unit)) = split_glued_quantity_unit(tail) {
        return build_item(head, quantity, unit);
    }
    let unit = unit_token(tail)?;
    let (quantity_word, name_tokens) = head.split_last()?;
    let quantity = parse_quantity(quantity_word)?;
    build_item(name_tokens, quantity, unit)
}

fn match_bare_quantity(tokens: &[&str]) -> Option<ParsedItem> {
    let (head, rest) = tokens.split_first()?;
    if rest.iter().any(|token| unit_token(token).is_some()) {
        return None;
    }
    let quantity = parse_quantity(head)?;
    build_item(rest, quantity, CanonicalUnit::Piece)
}

fn match_bare_name(tokens: &[&str]) -> Option<ParsedItem> {
    let leading = tokens.first()?.chars().next()?;
    if leading.is_ascii_digit() {
        return None;
    }
    build_item(tokens, 1.0, CanonicalUnit::Piece)
}

fn build_item(name_tokens: &[&str], quantity: f64, unit: CanonicalUnit) -> Option<ParsedItem> {
    if name_tokens.is_empty() {
        return None;
    }
    Some(ParsedItem { name: name_tokens.join(" "), quantity, unit })
}

/// Splits tokens like "2kg" or "2.5l" into their number and unit halves.
fn split_glued_quantity_unit(token: &str) -> Option<(f64, CanonicalUnit)> {
    let boundary = token.find(|ch: char| !ch.is_ascii_digit() && ch != '.')?;
    if boundary == 0 {
        return None;
    }
    let quantity = parse_quantity(&token[..boundary])?;
    let unit = unit_token(&token[boundary..])?;
    Some((quantity, unit))
}

/// Accepts plain decimal numbers only; quantities must come out positive.
fn parse_quantity(token: &str) -> Option<f64> {
    if !is_quantity_shaped(token) {
        return None;
    }
    token.parse::<f64>().ok().filter(|quantity| quantity.is_finite() && *quantity > 0.0)
}

fn is_quantity_shaped(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|ch| ch.is_ascii_digit() || ch == '.')
        && token.chars().any(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::{
        parse_grocery_list, parse_grocery_list_report, parse_item, ItemPattern, ParsedItem,
    };
    use crate::units::CanonicalUnit;

    fn item(name: &str, quantity: f64, unit: CanonicalUnit) -> ParsedItem {
        ParsedItem { name: name.to_owned(), quantity, unit }
    }

    #[test]
    fn unit_first_list_parses_with_glued_and_spaced_units() {
        let items = parse_grocery_list("2kg rice, 1kg sugar, 500g salt");
        assert_eq!(
            items,
            vec![
                item("rice", 2.0, CanonicalUnit::Kg),
                item("sugar", 1.0, CanonicalUnit::Kg),
                item("salt", 500.0, CanonicalUnit::G),
            ]
        );

        let spaced = parse_grocery_list("2 kg rice");
        assert_eq!(spaced, vec![item("rice", 2.0, CanonicalUnit::Kg)]);
    }

    #[test]
    fn unit_last_list_parses_name_first_phrases() {
        let items = parse_grocery_list("Rice 2kg, Sugar 1kg");
        assert_eq!(
            items,
            vec![item("rice", 2.0, CanonicalUnit::Kg), item("sugar", 1.0, CanonicalUnit::Kg)]
        );

        let spaced = parse_grocery_list("milk 2 litres");
        assert_eq!(spaced, vec![item("milk", 2.0, CanonicalUnit::L)]);
    }

    #[test]
    fn bare_name_defaults_to_one_piece() {
        assert_eq!(parse_grocery_list("milk"), vec![item("milk", 1.0, CanonicalUnit::Piece)]);
    }

    #[test]
    fn multiplier_markers_are_stripped() {
        let items = parse_grocery_list("2 x rice, 3 eggs");
        assert_eq!(
            items,
            vec![item("rice", 2.0, CanonicalUnit::Piece), item("eggs", 3.0, CanonicalUnit::Piece)]
        );

        let glued = parse_grocery_list("2x rice");
        assert_eq!(glued, vec![item("rice", 2.0, CanonicalUnit::Piece)]);
    }

    #[test]
    fn decimal_quantities_are_supported() {
        assert_eq!(parse_grocery_list("2.5kg onions"), vec![item("onions", 2.5, CanonicalUnit::Kg)]);
        assert_eq!(
            parse_grocery_list("tomatoes 1.5 kg"),
            vec![item("tomatoes", 1.5, CanonicalUnit::Kg)]
        );
    }

    #[test]
    fn fragments_split_on_all_four_delimiters() {
        let items = parse_grocery_list("rice and sugar; salt\nmilk, bread");
        let names = items.iter().map(|parsed| parsed.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["rice", "sugar", "salt", "milk", "bread"]);
    }

    #[test]
    fn the_word_and_only_splits_when_standalone() {
        assert_eq!(
            parse_grocery_list("sandwich"),
            vec![item("sandwich", 1.0, CanonicalUnit::Piece)]
        );
        let split = parse_grocery_list("sand and gravel");
        assert_eq!(
            split,
            vec![item("sand", 1.0, CanonicalUnit::Piece), item("gravel", 1.0, CanonicalUnit::Piece)]
        );
    }

    #[test]
    fn unparseable_fragments_are_dropped_from_the_plain_list() {
        let items = parse_grocery_list("2kg rice, 123, 3 eggs");
        assert_eq!(
            items,
            vec![item("rice", 2.0, CanonicalUnit::Kg), item("eggs", 3.0, CanonicalUnit::Piece)]
        );
    }

    #[test]
    fn report_separates_empty_input_from_all_rejected_input() {
        let empty = parse_grocery_list_report("   ");
        assert!(empty.items.is_empty());
        assert!(empty.rejected.is_empty());

        let rejected = parse_grocery_list_report("123, 45.6");
        assert!(rejected.items.is_empty());
        assert_eq!(rejected.rejected, vec!["123".to_owned(), "45.6".to_owned()]);
    }

    #[test]
    fn quantity_without_name_is_rejected() {
        assert_eq!(parse_item("2kg"), None);
        assert_eq!(parse_item("2"), None);
        assert_eq!(parse_item("2 kg"), None);
    }

    #[test]
    fn zero_quantity_violates_the_positive_invariant_and_is_rejected() {
        assert_eq!(parse_item("0 rice"), None);
        assert_eq!(parse_item("0kg rice"), None);
    }

    #[test]
    fn two_quantity_tokens_resolve_by_pattern_priority_not_plausibility() {
        // "5 mangoes 2kg": unit-first fails ("mangoes" is not a unit), so
        // unit-last wins and the leading count is swallowed into the name.
        assert_eq!(parse_item("5 mangoes 2kg"), Some(item("5 mangoes", 2.0, CanonicalUnit::Kg)));
    }

    #[test]
    fn bare_quantity_requires_no_recognizable_unit_token() {
        // "2 diet coke bottles" carries a trailing unit token in a position
        // no pattern accepts, so the fragment is rejected outright.
        assert_eq!(parse_item("2 diet coke bottles"), None);
    }

    #[test]
    fn multi_word_names_survive_in_every_pattern() {
        assert_eq!(
            parse_item("2kg basmati rice"),
            Some(item("basmati rice", 2.0, CanonicalUnit::Kg))
        );
        assert_eq!(
            parse_item("peanut butter 1 bottle"),
            Some(item("peanut butter", 1.0, CanonicalUnit::Bottle))
        );
        assert_eq!(
            parse_item("3 green chillies"),
            Some(item("green chillies", 3.0, CanonicalUnit::Piece))
        );
        assert_eq!(
            parse_item("brown bread"),
            Some(item("brown bread", 1.0, CanonicalUnit::Piece))
        );
    }

    #[test]
    fn pattern_order_is_fixed() {
        assert_eq!(
            super::PATTERN_ORDER,
            [
                ItemPattern::UnitFirst,
                ItemPattern::UnitLast,
                ItemPattern::BareQuantity,
                ItemPattern::BareName,
            ]
        );
    }

    #[test]
    fn malformed_numbers_are_not_quantities() {
        assert_eq!(parse_item("2.. rice"), None);
        // Exponents and signs are not part of the grammar; the fragment does
        // not start with a digit either way, so "e5 rice" is a bare name.
        assert_eq!(parse_item("e5 rice"), Some(item("e5 rice", 1.0, CanonicalUnit::Piece)));
    }
}
