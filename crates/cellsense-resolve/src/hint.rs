//! Layout hints: a soft prior about where labels, symbols and values sit.

use std::fmt;

use cellsense_common::letters_to_column;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutPattern {
    /// Label, symbol and value share a row.
    #[default]
    SameRow,
    /// Labels sit in the row directly above their value.
    AboveRow,
    /// A single header row names the columns below it.
    HeaderRow,
}

impl LayoutPattern {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "same-row" | "same row" => Some(Self::SameRow),
            "above-row" | "above row" => Some(Self::AboveRow),
            "header-row" | "header row" => Some(Self::HeaderRow),
            _ => None,
        }
    }

    /// Whether labels may be found in the row above the value.
    pub fn looks_above(self) -> bool {
        matches!(self, Self::AboveRow | Self::HeaderRow)
    }
}

impl fmt::Display for LayoutPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SameRow => "same-row",
            Self::AboveRow => "above-row",
            Self::HeaderRow => "header-row",
        })
    }
}

/// Columns are 1-based sheet columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutHint {
    pub pattern: LayoutPattern,
    pub label_column: Option<u32>,
    pub symbol_column: Option<u32>,
    pub value_column: Option<u32>,
}

impl Default for LayoutHint {
    /// The substitute used whenever a provider fails: same-row, B / D / G.
    fn default() -> Self {
        Self {
            pattern: LayoutPattern::SameRow,
            label_column: Some(2),
            symbol_column: Some(4),
            value_column: Some(7),
        }
    }
}

/// Wire shape of a provider answer.
#[derive(Debug, Deserialize)]
struct HintContract {
    layout_pattern: String,
    #[serde(default)]
    label_column: Option<JsonValue>,
    #[serde(default)]
    symbol_column: Option<JsonValue>,
    #[serde(default)]
    value_column: Option<JsonValue>,
}

impl LayoutHint {
    pub fn new(pattern: LayoutPattern) -> Self {
        Self {
            pattern,
            label_column: None,
            symbol_column: None,
            value_column: None,
        }
    }

    pub fn with_columns(
        mut self,
        label: Option<u32>,
        symbol: Option<u32>,
        value: Option<u32>,
    ) -> Self {
        self.label_column = label;
        self.symbol_column = symbol;
        self.value_column = value;
        self
    }

    /// Parse the provider JSON contract:
    /// `{"layout_pattern": "same-row", "label_column": "B", "symbol_column": "D", "value_column": "G"}`.
    ///
    /// Columns may be letters or 1-based integers and are optional. Models
    /// often wrap JSON in prose or code fences, so the first `{...}` object in
    /// the text is used.
    pub fn from_json_contract(text: &str) -> Result<Self, ProviderError> {
        let body = extract_json_object(text)
            .ok_or_else(|| ProviderError::InvalidResponse("no JSON object found".to_string()))?;
        let contract: HintContract = serde_json::from_str(body)?;
        let pattern = LayoutPattern::parse(&contract.layout_pattern).ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "unknown layout_pattern `{}`",
                contract.layout_pattern
            ))
        })?;
        Ok(Self {
            pattern,
            label_column: contract_column("label_column", contract.label_column)?,
            symbol_column: contract_column("symbol_column", contract.symbol_column)?,
            value_column: contract_column("value_column", contract.value_column)?,
        })
    }
}

fn contract_column(field: &str, value: Option<JsonValue>) -> Result<Option<u32>, ProviderError> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_u64()
            .filter(|n| *n >= 1)
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("{field} out of range: {n}"))),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(JsonValue::String(s)) => {
            let letters = s.trim().to_ascii_uppercase();
            letters_to_column(&letters)
                .map(Some)
                .ok_or_else(|| ProviderError::InvalidResponse(format!("{field} `{s}` is not a column")))
        }
        Some(other) => Err(ProviderError::InvalidResponse(format!(
            "{field} has unexpected type: {other}"
        ))),
    }
}

/// Slice from the first `{` to its matching `}` (string-aware).
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    extract_delimited(text, b'{', b'}')
}

/// Slice from the first `[` to its matching `]` (string-aware).
pub(crate) fn extract_json_array(text: &str) -> Option<&str> {
    extract_delimited(text, b'[', b']')
}

fn extract_delimited(text: &str, open: u8, close: u8) -> Option<&str> {
    let start = text.bytes().position(|b| b == open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if b == b'"' {
            in_string = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..=i]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hint_is_same_row_b_d_g() {
        let hint = LayoutHint::default();
        assert_eq!(hint.pattern, LayoutPattern::SameRow);
        assert_eq!(
            (hint.label_column, hint.symbol_column, hint.value_column),
            (Some(2), Some(4), Some(7))
        );
    }

    #[test]
    fn contract_accepts_letters_and_numbers() {
        let hint = LayoutHint::from_json_contract(
            r#"{"layout_pattern":"above-row","label_column":"c","symbol_column":5,"value_column":null}"#,
        )
        .unwrap();
        assert_eq!(hint.pattern, LayoutPattern::AboveRow);
        assert_eq!(hint.label_column, Some(3));
        assert_eq!(hint.symbol_column, Some(5));
        assert_eq!(hint.value_column, None);
    }

    #[test]
    fn contract_inside_code_fence() {
        let text = "Here you go:\n```json\n{\"layout_pattern\": \"header_row\", \"label_column\": \"A\"}\n```";
        let hint = LayoutHint::from_json_contract(text).unwrap();
        assert_eq!(hint.pattern, LayoutPattern::HeaderRow);
        assert_eq!(hint.label_column, Some(1));
    }

    #[test]
    fn contract_rejects_bad_pattern_and_columns() {
        assert!(matches!(
            LayoutHint::from_json_contract(r#"{"layout_pattern":"diagonal"}"#),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            LayoutHint::from_json_contract(r#"{"layout_pattern":"same-row","label_column":"B2"}"#),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            LayoutHint::from_json_contract(r#"{"layout_pattern":"same-row","label_column":0}"#),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            LayoutHint::from_json_contract("no json here"),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            LayoutHint::from_json_contract(r#"{"label_column":"B"}"#),
            Err(ProviderError::Json(_))
        ));
    }

    #[test]
    fn extract_skips_braces_in_strings() {
        let text = r#"x {"a": "}{", "b": {"c": 1}} y"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"a": "}{", "b": {"c": 1}}"#)
        );
        assert_eq!(extract_json_array("[1, [2]] tail"), Some("[1, [2]]"));
        assert_eq!(extract_json_object("{ unterminated"), None);
    }
}
