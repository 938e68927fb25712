use piece_tree::EndOfLine;
use serde::{Deserialize, Serialize};

/// How line breaks are treated when a document is created.
///
/// Deserializes from editor settings such as
/// `{ "normalizeEol": true, "defaultEol": "crlf", "force": false }`; missing
/// fields take their default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateOptions {
    /// Present every line break as `default_eol`.
    pub normalize_eol: bool,
    /// Terminator used for normalization, and for documents without any line
    /// break when not normalizing.
    pub default_eol: EndOfLine,
    /// With `normalize_eol`, rewrite the stored text as well instead of only
    /// the raw content views.
    pub force: bool,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize_eol(mut self, normalize_eol: bool) -> Self {
        self.normalize_eol = normalize_eol;
        self
    }

    pub fn default_eol(mut self, default_eol: EndOfLine) -> Self {
        self.default_eol = default_eol;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_settings() {
        let options: CreateOptions =
            serde_json::from_str(r#"{ "normalizeEol": true, "defaultEol": "crlf" }"#).unwrap();
        assert_eq!(
            options,
            CreateOptions::new()
                .normalize_eol(true)
                .default_eol(EndOfLine::Crlf)
        );

        let empty: CreateOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, CreateOptions::default());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let json = serde_json::to_string(&CreateOptions::new().force(true)).unwrap();
        assert_eq!(
            json,
            r#"{"normalizeEol":false,"defaultEol":"lf","force":true}"#
        );
    }
}
