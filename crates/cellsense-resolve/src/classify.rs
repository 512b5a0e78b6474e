//! Lexical classification of candidate text.
//!
//! Rules are cheap, overlap on purpose, and are evaluated independently in
//! table order. Precision comes from the scorer, not from these tests.

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

/// What a rule votes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleRole {
    Symbol,
    Label,
}

/// Combined verdict for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Symbol,
    Label,
    Both,
    Neither,
}

pub struct ClassifierRule {
    pub name: &'static str,
    pub role: RuleRole,
    pub test: fn(&str) -> bool,
}

/// Words that mark descriptive engineering text.
pub const LABEL_KEYWORDS: &[&str] = &[
    "factor",
    "modulus",
    "elasticity",
    "buckling",
    "resistance",
    "strength",
    "length",
    "inertia",
    "effective",
    "slenderness",
    "bending",
    "axial",
    "shear",
    "moment",
    "stress",
    "area",
    "radius",
    "yield",
    "load",
    "capacity",
    "ratio",
    "coefficient",
    "thickness",
    "width",
    "height",
    "depth",
    "spacing",
    "reduction",
];

pub static RULES: &[ClassifierRule] = &[
    ClassifierRule {
        name: "symbol-shape",
        role: RuleRole::Symbol,
        test: symbol_shape,
    },
    ClassifierRule {
        name: "label-long",
        role: RuleRole::Label,
        test: label_long,
    },
    ClassifierRule {
        name: "label-spaced",
        role: RuleRole::Label,
        test: label_spaced,
    },
    ClassifierRule {
        name: "label-keyword",
        role: RuleRole::Label,
        test: label_keyword,
    },
    ClassifierRule {
        name: "label-comma",
        role: RuleRole::Label,
        test: label_comma,
    },
    ClassifierRule {
        name: "label-prose",
        role: RuleRole::Label,
        test: label_prose,
    },
];

static ALPHA_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[A-Z][a-z]*$").expect("alpha word regex must compile"));

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn symbol_shape(text: &str) -> bool {
    let len = char_len(text);
    if !(2..=6).contains(&len) {
        return false;
    }
    let starts_alpha = text.chars().next().is_some_and(char::is_alphabetic);
    if !starts_alpha || text.contains(' ') {
        return false;
    }
    text.contains('_') || text.chars().any(|c| c.is_ascii_digit()) || ALPHA_WORD.is_match(text)
}

fn label_long(text: &str) -> bool {
    char_len(text) > 10
}

fn label_spaced(text: &str) -> bool {
    text.contains(' ') && char_len(text) > 5
}

fn label_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    LABEL_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn label_comma(text: &str) -> bool {
    text.contains(',') && char_len(text) > 5
}

fn label_prose(text: &str) -> bool {
    char_len(text) > 15 && !text.contains('_') && !text.chars().any(|c| c.is_ascii_digit())
}

/// Matched rules for one text, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    matched: SmallVec<[&'static ClassifierRule; 4]>,
}

impl std::fmt::Debug for ClassifierRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierRule")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

impl PartialEq for ClassifierRule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassifierRule {}

impl Classification {
    pub fn looks_like_symbol(&self) -> bool {
        self.matched.iter().any(|r| r.role == RuleRole::Symbol)
    }

    pub fn looks_like_label(&self) -> bool {
        self.matched.iter().any(|r| r.role == RuleRole::Label)
    }

    pub fn kind(&self) -> TextKind {
        match (self.looks_like_symbol(), self.looks_like_label()) {
            (true, true) => TextKind::Both,
            (true, false) => TextKind::Symbol,
            (false, true) => TextKind::Label,
            (false, false) => TextKind::Neither,
        }
    }

    /// Names of the rules that fired.
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.matched.iter().map(|r| r.name)
    }
}

pub fn classify(text: &str) -> Classification {
    let text = text.trim();
    let matched = RULES.iter().filter(|rule| (rule.test)(text)).collect();
    Classification { matched }
}
