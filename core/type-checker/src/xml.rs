//! Well-formedness checks for XML literals.
//!
//! Only well-formedness is verified. A schema named by `xml<"schema">` is echoed in the
//! diagnostic through the target type but never loaded.

/// A literal that failed to parse, rendered for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlLiteralError {
    pub(crate) value: String,
    pub(crate) message: String,
}

/// Parses the body of a quoted literal (`text` includes the quotes).
pub(crate) fn validate_literal(text: &str) -> Result<(), XmlLiteralError> {
    let body = unquote(text);
    match roxmltree::Document::parse(body) {
        Ok(_) => Ok(()),
        Err(error) => Err(XmlLiteralError {
            value: display_value(text),
            message: error.to_string(),
        }),
    }
}

fn unquote(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

/// Long literals keep their first ten and last ten characters around an ellipsis.
fn display_value(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let shown: String = if chars.len() > 25 {
        let head: String = chars[1..11].iter().collect();
        let tail: String = chars[chars.len() - 11..chars.len() - 1].iter().collect();
        format!("{head}...{tail}")
    } else {
        unquote(text).to_string()
    };
    shown.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}
