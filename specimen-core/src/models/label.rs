use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification outcome. The set is closed: a predictor may only ever
/// return one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Plant,
    Animal,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown label: {0:?}")]
pub struct UnknownLabel(pub String);

impl Label {
    pub const ALL: [Label; 2] = [Label::Plant, Label::Animal];

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Plant => "plant",
            Label::Animal => "animal",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plant" => Ok(Label::Plant),
            "animal" => Ok(Label::Animal),
            other => Err(UnknownLabel(other.to_string())),
        }
    }
}

// Rows come back from Postgres as TEXT.
impl TryFrom<String> for Label {
    type Error = UnknownLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_strings_are_lowercase() {
        assert_eq!(Label::Plant.as_str(), "plant");
        assert_eq!(Label::Animal.to_string(), "animal");
    }

    #[test]
    fn test_parse_rejects_labels_outside_the_set() {
        assert_eq!("plant".parse::<Label>(), Ok(Label::Plant));
        assert_eq!(
            "mineral".parse::<Label>(),
            Err(UnknownLabel("mineral".to_string()))
        );
        // Case matters: the stored form is always lowercase
        assert!("Animal".parse::<Label>().is_err());
        assert!("".parse::<Label>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_value(Label::ALL).unwrap();
        assert_eq!(json, serde_json::json!(["plant", "animal"]));

        let back: Label = serde_json::from_str("\"animal\"").unwrap();
        assert_eq!(back, Label::Animal);
    }
}
