// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Record classification.

use serde::{Deserialize, Serialize};

/// What a record carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Classification {
    /// A base-10 integer reading.
    Telemetry(i64),
    /// Any other text.
    Status(String),
}

/// One decoded, trimmed unit of text read from the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub raw: String,
    pub classification: Classification,
}

impl Record {
    /// Classify a trimmed record.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let classification = classify(&raw);
        Self {
            raw,
            classification,
        }
    }

    /// Telemetry value, if this record is numeric.
    pub fn telemetry(&self) -> Option<i64> {
        match self.classification {
            Classification::Telemetry(value) => Some(value),
            Classification::Status(_) => None,
        }
    }
}

/// Classify a trimmed, non-empty record.
///
/// The whole string must be a base-10 integer with an optional sign.
/// Values outside `i64` are status text.
pub fn classify(text: &str) -> Classification {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(value) = text.parse::<i64>() {
            return Classification::Telemetry(value);
        }
    }
    Classification::Status(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_are_telemetry() {
        assert_eq!(classify("42"), Classification::Telemetry(42));
        assert_eq!(classify("-7"), Classification::Telemetry(-7));
        assert_eq!(classify("+15"), Classification::Telemetry(15));
        assert_eq!(classify("007"), Classification::Telemetry(7));
        assert_eq!(classify("0"), Classification::Telemetry(0));
    }

    #[test]
    fn test_everything_else_is_status() {
        for text in ["ok", "4.2", "1e3", "12abc", "-", "+", " 42", "42 ", "0x1F", "1_000", "--1"] {
            assert_eq!(
                classify(text),
                Classification::Status(text.to_string()),
                "{text:?}"
            );
        }
    }

    #[test]
    fn test_out_of_range_is_status() {
        let text = "99999999999999999999";
        assert_eq!(classify(text), Classification::Status(text.to_string()));
    }

    #[test]
    fn test_non_ascii_digits_are_status() {
        assert_eq!(
            classify("٤٢"),
            Classification::Status("٤٢".to_string())
        );
    }

    #[test]
    fn test_record_accessors() {
        let record = Record::new("10");
        assert_eq!(record.raw, "10");
        assert_eq!(record.telemetry(), Some(10));
        assert_eq!(Record::new("abc").telemetry(), None);
    }
}
