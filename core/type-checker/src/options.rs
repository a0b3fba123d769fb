use serde::Deserialize;

/// Knobs that change how diagnostics are gated and which optional checks run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Warnings count toward the failure gate.
    pub warnings_as_errors: bool,
    /// Parse XML literals for well-formedness while finding types.
    pub validate_xml_literals: bool,
    /// Caps the messages joined into the driver's failure message. The diagnostics keep all.
    pub max_reported_errors: Option<usize>,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            warnings_as_errors: false,
            validate_xml_literals: true,
            max_reported_errors: None,
        }
    }
}

impl CheckerOptions {
    /// Reads options from a JSON object; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not an object of the expected shape.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
