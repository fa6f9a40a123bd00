//! Shareable state decode warnings

/// A non-fatal problem found while decoding a shareable query state.
///
/// The offending entry is dropped and the affected field falls back to its
/// default; decoding never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeWarning {
    /// The key is not known to this table.
    #[error("Unknown query key '{0}'")]
    UnknownKey(String),

    /// The value could not be parsed for this key.
    #[error("Malformed value for '{key}': '{value}'")]
    Malformed { key: String, value: String },

    /// The value names a column that is unknown or not usable for this key.
    #[error("Column '{column}' is not valid for '{key}'")]
    InvalidColumn { key: String, column: String },

    /// A multiselect value is not one of the field's options.
    #[error("Option '{value}' is not valid for '{key}'")]
    UnknownOption { key: String, value: String },
}
