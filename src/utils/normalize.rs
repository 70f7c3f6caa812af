//! Text normalization for name matching.
//!
//! Free text coming from field data is folded into a canonical comparison form:
//!
//! - Unicode canonical decomposition (NFD)
//! - Punctuation folding (curly quotes, dashes, exotic spaces to ASCII)
//! - Symbol spelling-out (Greek letters, hybrid and degree signs)
//! - Diacritic stripping and transliteration of letters like `æ` and `ß`
//! - Whitespace collapsing and trimming
//! - Optional case folding and stripping of one layer of surrounding quotes
//!
//! Every step can be switched off through [`NormalizerOptions`]. Characters with
//! no mapping pass through unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::core::search::{LocationSearch, Search};

/// Which normalization steps to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerOptions {
    pub spaces: bool,
    pub punctuation: bool,
    pub symbols: bool,
    pub accents: bool,
    pub case: bool,
    pub strip_quotes: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            spaces: true,
            punctuation: true,
            symbols: true,
            accents: true,
            case: false,
            strip_quotes: false,
        }
    }
}

impl NormalizerOptions {
    /// Every step enabled
    #[must_use]
    pub fn all() -> Self {
        Self {
            spaces: true,
            punctuation: true,
            symbols: true,
            accents: true,
            case: true,
            strip_quotes: true,
        }
    }
}

/// Quote pairs recognised when stripping surrounding quotes
const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('\u{201C}', '\u{201D}'),
    ('\u{2018}', '\u{2019}'),
    ('\u{00AB}', '\u{00BB}'),
];

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizerOptions,
}

impl Normalizer {
    #[must_use]
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> NormalizerOptions {
        self.options
    }

    /// Normalize optional text; `None` stays `None`
    #[must_use]
    pub fn normalize(&self, text: Option<&str>) -> Option<String> {
        text.map(|t| self.normalize_str(t))
    }

    /// Normalize a piece of text
    #[must_use]
    pub fn normalize_str(&self, text: &str) -> String {
        let opts = &self.options;
        let mut result: String = text.nfd().collect();

        if opts.punctuation {
            result = fold_punctuation(&result);
        }
        if opts.symbols {
            result = spell_out_symbols(&result);
        }
        if opts.accents {
            result = strip_accents(&result);
        }
        if opts.spaces {
            result = collapse_spaces(&result);
        }
        if opts.case {
            result = result.to_lowercase();
            // Lowercasing can reintroduce marks (e.g. dotted capital I)
            if opts.accents {
                result = strip_accents(&result);
            }
        }
        if opts.strip_quotes {
            result = strip_surrounding_quotes(&result);
            if opts.spaces {
                result = collapse_spaces(&result);
            }
        }

        result
    }

    /// Normalize every free-text field of a search into a new search.
    ///
    /// Identifiers are opaque keys and pass through untouched. Fields that
    /// normalize to an empty string are dropped.
    #[must_use]
    pub fn normalize_search(&self, search: &Search) -> Search {
        let field = |value: &Option<String>| {
            self.normalize(value.as_deref())
                .filter(|normalized| !normalized.is_empty())
        };

        let mut hints: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (rank, values) in &search.hints {
            let rank = rank.trim().to_lowercase();
            let values: Vec<String> = values
                .iter()
                .map(|v| self.normalize_str(v))
                .filter(|v| !v.is_empty())
                .collect();
            if !rank.is_empty() && !values.is_empty() {
                hints.entry(rank).or_default().extend(values);
            }
        }

        let location = search
            .location
            .as_ref()
            .map(|loc| LocationSearch {
                country: field(&loc.country),
                state_province: field(&loc.state_province),
                locality: field(&loc.locality),
            })
            .filter(|loc| !loc.is_empty());

        Search {
            kingdom: field(&search.kingdom),
            phylum: field(&search.phylum),
            class: field(&search.class),
            order: field(&search.order),
            family: field(&search.family),
            genus: field(&search.genus),
            specific_epithet: field(&search.specific_epithet),
            infraspecific_epithet: field(&search.infraspecific_epithet),
            scientific_name: field(&search.scientific_name),
            scientific_name_authorship: field(&search.scientific_name_authorship),
            vernacular_name: field(&search.vernacular_name),
            rank: field(&search.rank),
            taxon_concept_id: search.taxon_concept_id.clone(),
            taxon_id: search.taxon_id.clone(),
            location,
            hints,
            style: search.style,
            loose: search.loose,
        }
    }
}

fn fold_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{02BC}' => {
                out.push('\'');
            }
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{00AB}'
            | '\u{00BB}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}' => {
                out.push('-');
            }
            '\u{00A0}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}' => {
                out.push(' ');
            }
            '\u{2026}' => out.push_str("..."),
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => {}
            _ => out.push(c),
        }
    }
    out
}

fn greek_name(c: char) -> Option<&'static str> {
    let name = match c {
        'α' | 'Α' => "alpha",
        'β' | 'Β' => "beta",
        'γ' | 'Γ' => "gamma",
        'δ' | 'Δ' => "delta",
        'ε' | 'Ε' => "epsilon",
        'ζ' | 'Ζ' => "zeta",
        'η' | 'Η' => "eta",
        'θ' | 'Θ' => "theta",
        'ι' | 'Ι' => "iota",
        'κ' | 'Κ' => "kappa",
        'λ' | 'Λ' => "lambda",
        'μ' | 'Μ' | '\u{00B5}' => "mu",
        'ν' | 'Ν' => "nu",
        'ξ' | 'Ξ' => "xi",
        'ο' | 'Ο' => "omicron",
        'π' | 'Π' => "pi",
        'ρ' | 'Ρ' => "rho",
        'σ' | 'ς' | 'Σ' => "sigma",
        'τ' | 'Τ' => "tau",
        'υ' | 'Υ' => "upsilon",
        'φ' | 'Φ' => "phi",
        'χ' | 'Χ' => "chi",
        'ψ' | 'Ψ' => "psi",
        'ω' | 'Ω' => "omega",
        _ => return None,
    };
    Some(name)
}

fn spell_out_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some(name) = greek_name(c) {
            out.push_str(name);
            continue;
        }
        match c {
            // Hybrid marker
            '\u{00D7}' => out.push('x'),
            '\u{00B0}' => out.push_str("deg"),
            '\u{2642}' => out.push_str("male"),
            '\u{2640}' => out.push_str("female"),
            '\u{00BD}' => out.push_str("1/2"),
            '\u{00BC}' => out.push_str("1/4"),
            '\u{00BE}' => out.push_str("3/4"),
            '\u{00B1}' => out.push_str("+/-"),
            _ => out.push(c),
        }
    }
    out
}

fn strip_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'ß' => out.push_str("ss"),
            '\u{1E9E}' => out.push_str("SS"),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'đ' | 'ð' => out.push('d'),
            'Đ' | 'Ð' => out.push('D'),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("TH"),
            'ı' => out.push('i'),
            _ => out.push(c),
        }
    }
    out
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_surrounding_quotes(text: &str) -> String {
    let mut chars = text.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return text.to_string();
    };
    if QUOTE_PAIRS
        .iter()
        .any(|&(open, close)| first == open && last == close)
    {
        chars.as_str().to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_normalizer() -> Normalizer {
        Normalizer::default()
    }

    #[test]
    fn test_none_stays_none() {
        assert_eq!(default_normalizer().normalize(None), None);
    }

    #[test]
    fn test_whitespace_and_punctuation() {
        let n = default_normalizer();
        assert_eq!(n.normalize_str("  Acacia\u{00A0}\u{00A0}dealbata \t"), "Acacia dealbata");
        assert_eq!(n.normalize_str("Eucalyptus \u{2018}Blue\u{2019}"), "Eucalyptus 'Blue'");
        assert_eq!(n.normalize_str("Ptilotus \u{2013} exaltatus"), "Ptilotus - exaltatus");
        assert_eq!(n.normalize_str("zero\u{200B}width"), "zerowidth");
    }

    #[test]
    fn test_accents_and_ligatures() {
        let n = default_normalizer();
        assert_eq!(n.normalize_str("Müller"), "Muller");
        assert_eq!(n.normalize_str("Æschynomene"), "AEschynomene");
        assert_eq!(n.normalize_str("Baccharis × Ødegaard"), "Baccharis x Odegaard");
        assert_eq!(n.normalize_str("Straße"), "Strasse");
    }

    #[test]
    fn test_symbols() {
        let n = default_normalizer();
        assert_eq!(n.normalize_str("α-pinene"), "alpha-pinene");
        assert_eq!(n.normalize_str("12°S"), "12degS");
    }

    #[test]
    fn test_case_folding_is_optional() {
        let n = default_normalizer();
        assert_eq!(n.normalize_str("Acacia"), "Acacia");

        let lower = Normalizer::new(NormalizerOptions {
            case: true,
            ..NormalizerOptions::default()
        });
        assert_eq!(lower.normalize_str("Acacia DEALBATA"), "acacia dealbata");
        assert_eq!(lower.normalize_str("İstanbul"), "istanbul");
    }

    #[test]
    fn test_strip_one_layer_of_quotes() {
        let n = Normalizer::new(NormalizerOptions::all());
        assert_eq!(n.normalize_str("\"Acacia dealbata\""), "acacia dealbata");
        assert_eq!(n.normalize_str("\u{201C} Acacia \u{201D}"), "acacia");
        assert_eq!(n.normalize_str("\"unbalanced"), "\"unbalanced");
        assert_eq!(n.normalize_str("'x'"), "x");
        assert_eq!(n.normalize_str("\""), "\"");
    }

    #[test]
    fn test_disabled_steps_leave_text_alone() {
        let n = Normalizer::new(NormalizerOptions {
            spaces: false,
            punctuation: false,
            symbols: false,
            accents: false,
            case: false,
            strip_quotes: false,
        });
        // Only canonical decomposition applies
        let out = n.normalize_str("  a\u{2013}b ");
        assert_eq!(out, "  a\u{2013}b ");
    }

    #[test]
    fn test_idempotent_on_default_options() {
        let n = default_normalizer();
        let samples = [
            "",
            "   ",
            "Acacia dealbata Link",
            "Eucalyptus \u{2018}Blue Gum\u{2019}",
            "Ẓ̌ǚ̈ combining \u{0301}\u{0301} marks",
            "İIıi ẞß Ææ",
            "αβγ ΣΩ µ°× \u{00BD}",
            "\u{3000}fullwidth\u{3000}space\u{FEFF}",
            "日本語のテキスト",
            "emoji 🦘 and \u{1F1E6}\u{1F1FA}",
            "\u{0000}\u{0007} control",
            "\"quoted\"",
            "tab\tand\nnewline",
        ];
        for s in samples {
            let once = n.normalize_str(s);
            let twice = n.normalize_str(&once);
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_idempotent_with_case_folding() {
        let n = Normalizer::new(NormalizerOptions {
            case: true,
            ..NormalizerOptions::default()
        });
        // A small deterministic walk over a mixed character pool
        let pool: Vec<char> = "aZ é\u{0301}İıßẞÆøΣς×°\u{00A0}\u{2019}\u{2014}\"'日🦘\t"
            .chars()
            .collect();
        let mut state: usize = 7;
        for _ in 0..200 {
            let mut s = String::new();
            for _ in 0..12 {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345) % 2_147_483_648;
                s.push(pool[state % pool.len()]);
            }
            let once = n.normalize_str(&s);
            assert_eq!(once, n.normalize_str(&once), "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_normalize_search_keeps_identifiers() {
        let n = default_normalizer();
        let mut search = Search::named("  Acacia   dealbata ")
            .with_hint(" Kingdom ", ["  Plantae "])
            .with_kingdom("");
        search.taxon_concept_id = Some("  urn:lsid:Raw ID ".to_string());

        let normalized = n.normalize_search(&search);
        assert_eq!(normalized.scientific_name.as_deref(), Some("Acacia dealbata"));
        assert_eq!(normalized.kingdom, None);
        assert_eq!(
            normalized.taxon_concept_id.as_deref(),
            Some("  urn:lsid:Raw ID ")
        );
        assert_eq!(
            normalized.hints.get("kingdom"),
            Some(&vec!["Plantae".to_string()])
        );
        assert_eq!(n.normalize_search(&normalized), normalized);
    }
}
