use serde::{Deserialize, Serialize};

/// How a field pair's values convert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransitionMode {
    #[default]
    Map,
    Separate,
    Enum,
}

/// Delimiter for `SEPARATE` mode, `"SPACE"`/`"COMMA"` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionDelimiter {
    #[default]
    Space,
    Comma,
}

/// Mode plus mode-specific parameters for one field pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub mode: TransitionMode,
    /// Meaningful only in `Separate` mode
    pub delimiter: TransitionDelimiter,
    /// Meaningful only in `Enum` mode
    pub lookup_table_name: Option<String>,
}

impl Transition {
    pub fn is_separate_mode(&self) -> bool {
        self.mode == TransitionMode::Separate
    }

    pub fn is_enumeration_mode(&self) -> bool {
        self.mode == TransitionMode::Enum
    }

    /// True for anything beyond a plain copy
    pub fn has_transition(&self) -> bool {
        self.is_separate_mode() || self.is_enumeration_mode()
    }

    pub fn pretty_name(&self) -> String {
        match self.mode {
            TransitionMode::Separate => match self.delimiter {
                TransitionDelimiter::Space => "Separate (Space)".to_string(),
                TransitionDelimiter::Comma => "Separate (Comma)".to_string(),
            },
            TransitionMode::Enum => format!(
                "Enum (table: {})",
                self.lookup_table_name.as_deref().unwrap_or("none")
            ),
            TransitionMode::Map => "Map".to_string(),
        }
    }
}

/// Per-field action attached to a mapped field. Only the separation
/// index is modeled; the 1-based index says which token of the split
/// source value this target receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldAction {
    Separate { index: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_names() {
        let mut transition = Transition::default();
        assert_eq!(transition.pretty_name(), "Map");
        assert!(!transition.has_transition());

        transition.mode = TransitionMode::Separate;
        transition.delimiter = TransitionDelimiter::Comma;
        assert_eq!(transition.pretty_name(), "Separate (Comma)");
        assert!(transition.has_transition());

        transition.mode = TransitionMode::Enum;
        transition.lookup_table_name = Some("table.1".to_string());
        assert_eq!(transition.pretty_name(), "Enum (table: table.1)");
    }
}
