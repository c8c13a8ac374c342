//! Quark categories keyed by 4-digit codes.

use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Name used when a computed code has no entry in the map.
pub const UNKNOWN_NAME: &str = "Unknown Quark";
/// Description used when a computed code has no entry in the map.
pub const UNKNOWN_DESCRIPTION: &str = "This quark does not exist in the current quark map.";

/// One of the four digit pairs a question can bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairGroup {
    OneTwo,
    ThreeFour,
    FiveSix,
    SevenEight,
}

impl PairGroup {
    /// All groups in code order.
    pub const ALL: [PairGroup; 4] = [
        PairGroup::OneTwo,
        PairGroup::ThreeFour,
        PairGroup::FiveSix,
        PairGroup::SevenEight,
    ];

    pub fn index(self) -> usize {
        match self {
            PairGroup::OneTwo => 0,
            PairGroup::ThreeFour => 1,
            PairGroup::FiveSix => 2,
            PairGroup::SevenEight => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PairGroup::OneTwo => "1/2",
            PairGroup::ThreeFour => "3/4",
            PairGroup::FiveSix => "5/6",
            PairGroup::SevenEight => "7/8",
        }
    }

    /// The odd (lower) digit of the pair.
    pub fn odd(self) -> char {
        match self {
            PairGroup::OneTwo => '1',
            PairGroup::ThreeFour => '3',
            PairGroup::FiveSix => '5',
            PairGroup::SevenEight => '7',
        }
    }

    /// The even (upper) digit of the pair.
    pub fn even(self) -> char {
        match self {
            PairGroup::OneTwo => '2',
            PairGroup::ThreeFour => '4',
            PairGroup::FiveSix => '6',
            PairGroup::SevenEight => '8',
        }
    }
}

/// A code digit from 1 to 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digit(u8);

impl Digit {
    pub fn new(value: u8) -> Option<Self> {
        (1..=8).contains(&value).then_some(Self(value))
    }

    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        let c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        c.to_digit(10).and_then(|d| Self::new(d as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn group(self) -> PairGroup {
        match self.0 {
            1 | 2 => PairGroup::OneTwo,
            3 | 4 => PairGroup::ThreeFour,
            5 | 6 => PairGroup::FiveSix,
            _ => PairGroup::SevenEight,
        }
    }

    /// +1 for the odd member of the pair, -1 for the even member.
    pub fn delta(self) -> i32 {
        if self.0 % 2 == 1 { 1 } else { -1 }
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated 4-character category code such as "1357".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Code(String);

impl Code {
    /// Parse a code, requiring one digit from each pair group in order.
    pub fn parse(s: &str) -> Option<Self> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 4 {
            return None;
        }
        let valid = PairGroup::ALL
            .iter()
            .zip(&chars)
            .all(|(group, &c)| c == group.odd() || c == group.even());
        valid.then(|| Self(s.to_string()))
    }

    /// Build a code from one choice per group, `true` picking the odd digit.
    pub fn from_choices(odd: [bool; 4]) -> Self {
        let code = PairGroup::ALL
            .iter()
            .zip(odd)
            .map(|(group, pick_odd)| if pick_odd { group.odd() } else { group.even() })
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub description: String,
}

impl Category {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            description: UNKNOWN_DESCRIPTION.to_string(),
        }
    }
}

/// Static code → category map.
#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    entries: HashMap<Code, Category>,
    /// Codes in insertion order, used for deterministic iteration.
    order: Vec<Code>,
}

impl CategoryMap {
    /// Build from entries. The first entry for a code wins; later
    /// duplicates are dropped with a warning.
    pub fn from_entries(entries: impl IntoIterator<Item = (Code, Category)>) -> Self {
        let mut map = Self::default();
        for (code, category) in entries {
            if let Some(existing) = map.entries.get(&code) {
                warn!(
                    "Duplicate quark code {}: keeping {}, dropping {}",
                    code, existing.name, category.name
                );
                continue;
            }
            map.order.push(code.clone());
            map.entries.insert(code, category);
        }
        map
    }

    pub fn get(&self, code: &Code) -> Option<&Category> {
        self.entries.get(code)
    }

    /// Look up a code, substituting the "Unknown Quark" category on a miss.
    pub fn resolve(&self, code: &Code) -> Category {
        self.get(code).cloned().unwrap_or_else(Category::unknown)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Codes with no entry, in code order. A complete map has none.
    pub fn missing_codes(&self) -> Vec<Code> {
        let mut missing: Vec<Code> = (0..16u8)
            .map(|bits| Code::from_choices(std::array::from_fn(|i| bits & (8 >> i) == 0)))
            .filter(|code| !self.entries.contains_key(code))
            .collect();
        missing.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        missing
    }

    /// Category names sorted by code.
    pub fn names(&self) -> Vec<String> {
        let mut codes: Vec<&Code> = self.order.iter().collect();
        codes.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        codes
            .into_iter()
            .filter_map(|code| self.entries.get(code))
            .map(|c| c.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str) -> Category {
        Category {
            name: name.to_string(),
            description: format!("{name} things"),
        }
    }

    #[test]
    fn test_digit_group_and_delta() {
        let one = Digit::new(1).unwrap();
        let four = Digit::new(4).unwrap();
        let seven = Digit::new(7).unwrap();
        assert_eq!(one.group(), PairGroup::OneTwo);
        assert_eq!(four.group(), PairGroup::ThreeFour);
        assert_eq!(seven.group(), PairGroup::SevenEight);
        assert_eq!(one.delta(), 1);
        assert_eq!(four.delta(), -1);
        assert_eq!(seven.delta(), 1);
    }

    #[test]
    fn test_digit_rejects_out_of_range() {
        assert!(Digit::new(0).is_none());
        assert!(Digit::new(9).is_none());
        assert!(Digit::parse("12").is_none());
        assert!(Digit::parse("x").is_none());
        assert_eq!(Digit::parse(" 6 ").map(Digit::value), Some(6));
    }

    #[test]
    fn test_code_parse() {
        assert!(Code::parse("1357").is_some());
        assert!(Code::parse("2468").is_some());
        assert!(Code::parse("3157").is_none());
        assert!(Code::parse("135").is_none());
        assert!(Code::parse("13578").is_none());
    }

    #[test]
    fn test_code_from_choices() {
        assert_eq!(Code::from_choices([true, false, true, false]).as_str(), "1458");
        assert_eq!(Code::from_choices([false; 4]).as_str(), "2468");
    }

    #[test]
    fn test_duplicate_code_first_wins() {
        let code = Code::parse("2467").unwrap();
        let map = CategoryMap::from_entries([
            (code.clone(), category("Glyon")),
            (code.clone(), category("Charm")),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&code).unwrap().name, "Glyon");
    }

    #[test]
    fn test_resolve_miss_falls_back() {
        let map = CategoryMap::from_entries([(Code::parse("1357").unwrap(), category("Fynix"))]);
        let miss = map.resolve(&Code::parse("2468").unwrap());
        assert_eq!(miss.name, UNKNOWN_NAME);
        assert_eq!(miss.description, UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn test_names_sorted_by_code() {
        let map = CategoryMap::from_entries([
            (Code::parse("2468").unwrap(), category("Charm")),
            (Code::parse("1357").unwrap(), category("Fynix")),
        ]);
        assert_eq!(map.names(), vec!["Fynix".to_string(), "Charm".to_string()]);
    }

    #[test]
    fn test_missing_codes_after_duplicate() {
        let entries = (0..16u8).map(|bits| {
            let code = Code::from_choices(std::array::from_fn(|i| bits & (8 >> i) == 0));
            // 2468's entry mistyped as 2467
            let code = if code.as_str() == "2468" { Code::parse("2467").unwrap() } else { code };
            (code, category("q"))
        });
        let map = CategoryMap::from_entries(entries);
        assert_eq!(map.len(), 15);
        assert_eq!(map.missing_codes(), vec![Code::parse("2468").unwrap()]);
        assert_eq!(map.names().len(), 15);
    }

    #[test]
    fn test_complete_map_has_no_missing_codes() {
        let map = CategoryMap::from_entries(
            (0..16u8).map(|bits| (Code::from_choices(std::array::from_fn(|i| bits & (1 << i) != 0)), category("q"))),
        );
        assert!(map.missing_codes().is_empty());
    }
}
