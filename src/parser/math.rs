//! Math formula heuristic.
//!
//! A block is run through an ordered list of named rules; the first rule
//! that reaches a verdict decides. Blocks no rule decides on are ordinary
//! text. Rules are pure functions of the block's text and font names.

use super::options::MathConfig;

/// Font families used for typesetting formulas.
const MATH_FONTS: &[&str] = &[
    "cmmi", "cmsy", "cmex", "msbm", "wasy", "dsrom", "euclid", "stix", "symbol",
];

/// Font families used for running text.
const BODY_FONTS: &[&str] = &["nimbus", "arial", "helvetica", "times", "calibri"];

/// Phrases that only occur in prose.
const SENTENCE_INDICATORS: &[&str] = &[
    " is ", " are ", " was ", " were ", " where ", " denote ", " denotes ", " we ", " which ",
    " that ",
];

const MATH_OPERATORS: &[&str] = &[
    "≤", "≥", "∈", "∑", "∫", "∂", "√", "∏", "∇", ":=", "≈", "≠",
];

const FRAGMENT_PUNCTUATION: &str = "+-*/=<>(){}[],.";

/// What a block looks like to the heuristic.
#[derive(Debug, Clone, Copy)]
pub struct MathInput<'a> {
    /// Block text with lines joined by spaces
    pub text: &'a str,
    /// Lowercase font names of the block's spans
    pub fonts: &'a [String],
}

impl<'a> MathInput<'a> {
    pub fn new(text: &'a str, fonts: &'a [String]) -> Self {
        Self { text, fonts }
    }

    fn has_font(&self, families: &[&str]) -> bool {
        self.fonts
            .iter()
            .any(|f| families.iter().any(|family| f.contains(family)))
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Decision of a rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Treat as a formula: never rewrite.
    Protect,
    /// Ordinary text.
    Keep,
}

/// A named predicate. `None` means the rule has no opinion.
#[derive(Clone, Copy)]
pub struct MathRule {
    pub name: &'static str,
    pub check: fn(&MathInput<'_>, &MathConfig) -> Option<Verdict>,
}

impl std::fmt::Debug for MathRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MathRule").field("name", &self.name).finish()
    }
}

/// Rules in evaluation order.
pub const RULES: &[MathRule] = &[
    MathRule {
        name: "sentence",
        check: sentence,
    },
    MathRule {
        name: "long_text",
        check: long_text,
    },
    MathRule {
        name: "math_font_only",
        check: math_font_only,
    },
    MathRule {
        name: "math_font_mixed",
        check: math_font_mixed,
    },
    MathRule {
        name: "math_operator",
        check: math_operator,
    },
    MathRule {
        name: "short_fragment",
        check: short_fragment,
    },
    MathRule {
        name: "isolated_label",
        check: isolated_label,
    },
];

fn sentence(input: &MathInput<'_>, _: &MathConfig) -> Option<Verdict> {
    let padded = format!(" {} ", input.text.to_lowercase());
    SENTENCE_INDICATORS
        .iter()
        .any(|s| padded.contains(s))
        .then_some(Verdict::Keep)
}

fn long_text(input: &MathInput<'_>, config: &MathConfig) -> Option<Verdict> {
    (input.char_count() > config.long_text_chars).then_some(Verdict::Keep)
}

fn math_font_only(input: &MathInput<'_>, _: &MathConfig) -> Option<Verdict> {
    (input.has_font(MATH_FONTS) && !input.has_font(BODY_FONTS)).then_some(Verdict::Protect)
}

fn math_font_mixed(input: &MathInput<'_>, _: &MathConfig) -> Option<Verdict> {
    if !(input.has_font(MATH_FONTS) && input.has_font(BODY_FONTS)) {
        return None;
    }
    let len = input.char_count();
    if len == 0 {
        return None;
    }
    let alpha = input.text.chars().filter(|c| c.is_alphabetic()).count();
    let alpha_ratio = alpha as f32 / len as f32;
    let internal_space = input.text.trim().contains(char::is_whitespace);

    if alpha_ratio <= 0.6 || (len < 50 && !internal_space) {
        Some(Verdict::Protect)
    } else {
        None
    }
}

fn math_operator(input: &MathInput<'_>, _: &MathConfig) -> Option<Verdict> {
    MATH_OPERATORS
        .iter()
        .any(|op| input.text.contains(op))
        .then_some(Verdict::Protect)
}

fn short_fragment(input: &MathInput<'_>, _: &MathConfig) -> Option<Verdict> {
    let len = input.char_count();
    if len >= 5 {
        return None;
    }
    let has_symbol = input
        .text
        .chars()
        .any(|c| c.is_ascii_digit() || FRAGMENT_PUNCTUATION.contains(c));
    let single_letter = len == 1 && input.text.chars().all(char::is_alphabetic);
    (has_symbol || single_letter).then_some(Verdict::Protect)
}

fn isolated_label(input: &MathInput<'_>, _: &MathConfig) -> Option<Verdict> {
    let text = input.text;
    (input.char_count() < 15
        && !text.contains(char::is_whitespace)
        && text.chars().any(|c| !c.is_alphanumeric()))
    .then_some(Verdict::Protect)
}

/// First rule that reaches a verdict, with its name.
pub fn classify(input: &MathInput<'_>, config: &MathConfig) -> Option<(&'static str, Verdict)> {
    if input.text.trim().is_empty() {
        return None;
    }
    RULES
        .iter()
        .find_map(|rule| (rule.check)(input, config).map(|v| (rule.name, v)))
}

/// True when the block should be protected as a formula.
pub fn is_math_block(input: &MathInput<'_>, config: &MathConfig) -> bool {
    if !config.enabled {
        return false;
    }
    match classify(input, config) {
        Some((rule, Verdict::Protect)) => {
            log::debug!("Protecting {:?} as math ({})", input.text, rule);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fonts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn verdict(text: &str, font_names: &[&str]) -> Option<(&'static str, Verdict)> {
        let f = fonts(font_names);
        classify(&MathInput::new(text, &f), &MathConfig::default())
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "sentence",
                "long_text",
                "math_font_only",
                "math_font_mixed",
                "math_operator",
                "short_fragment",
                "isolated_label"
            ]
        );
    }

    #[test]
    fn test_axis_label_protected() {
        assert_eq!(
            verdict("x-axis", &["helvetica"]),
            Some(("isolated_label", Verdict::Protect))
        );
    }

    #[test]
    fn test_sentence_wins_over_operators() {
        assert_eq!(
            verdict("where x ≤ y holds", &["cmmi10"]),
            Some(("sentence", Verdict::Keep))
        );
    }

    #[test]
    fn test_long_text_not_protected() {
        let text = "a".repeat(60) + " ∑ " + &"b".repeat(60);
        assert_eq!(
            verdict(&text, &["cmsy10"]),
            Some(("long_text", Verdict::Keep))
        );
    }

    #[test]
    fn test_math_fonts() {
        assert_eq!(
            verdict("f(x) = y", &["cmmi10", "cmr10"]),
            Some(("math_font_only", Verdict::Protect))
        );
        // Mixed fonts, word-like without spaces
        assert_eq!(
            verdict("softmax", &["cmmi10", "times-roman"]),
            Some(("math_font_mixed", Verdict::Protect))
        );
        // Mixed fonts, mostly symbols
        assert_eq!(
            verdict("(1) + 2 = 3", &["cmsy10", "times-roman"]),
            Some(("math_font_mixed", Verdict::Protect))
        );
        // Mixed fonts, ordinary words: no verdict from the font rules
        assert_eq!(verdict("Figure caption text", &["cmmi10", "times-roman"]), None);
    }

    #[test]
    fn test_operator_and_fragments() {
        assert_eq!(
            verdict("a ≈ b", &["helvetica"]),
            Some(("math_operator", Verdict::Protect))
        );
        assert_eq!(
            verdict("(3)", &["helvetica"]),
            Some(("short_fragment", Verdict::Protect))
        );
        assert_eq!(
            verdict("x", &["helvetica"]),
            Some(("short_fragment", Verdict::Protect))
        );
        assert_eq!(verdict("Word", &["helvetica"]), None);
    }

    #[test]
    fn test_plain_text_and_disabled() {
        let f = fonts(&["times-roman"]);
        let input = MathInput::new("Introduction", &f);
        assert!(!is_math_block(&input, &MathConfig::default()));

        let axis = MathInput::new("x-axis", &f);
        assert!(is_math_block(&axis, &MathConfig::default()));
        assert!(!is_math_block(&axis, &MathConfig::disabled()));
    }
}
