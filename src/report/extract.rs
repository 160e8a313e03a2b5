//! Report extraction - pull the delimited JSON block out of free-form role output

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closing marker shared by every report block
pub const END_MARKER: &str = "<<<END>>>";

/// Opening marker for a tag, e.g. `<<<BUILDER_REPORT_JSON>>>`
pub fn start_marker(tag: &str) -> String {
    format!("<<<{}>>>", tag)
}

/// Outcome of looking for a report block
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<T = Value> {
    /// No complete block in the text
    NotFound,
    /// Block found and parsed
    Parsed(T),
    /// Block found but its body is not a valid report; `raw` is the body verbatim
    Malformed { raw: String, error: String },
}

impl<T> Extraction<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Extraction::Parsed(_))
    }

    pub fn parsed(self) -> Option<T> {
        match self {
            Extraction::Parsed(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Serialize> Extraction<T> {
    /// What gets stored as the role's `lastReport` for this output
    pub fn to_last_report(&self, full_text: &str) -> LastReport {
        match self {
            Extraction::Parsed(report) => match serde_json::to_value(report) {
                Ok(value) => LastReport::Structured(value),
                Err(e) => LastReport::Malformed {
                    raw: full_text.to_string(),
                    parse_error: e.to_string(),
                },
            },
            Extraction::Malformed { raw, error } => LastReport::Malformed {
                raw: raw.clone(),
                parse_error: error.clone(),
            },
            Extraction::NotFound => LastReport::Raw(full_text.to_string()),
        }
    }
}

/// A role's most recent output as kept in the shared state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LastReport {
    Malformed {
        raw: String,
        #[serde(rename = "parseError")]
        parse_error: String,
    },
    Raw(String),
    Structured(Value),
}

/// Locate the block opened by `<<<tag>>>` and closed by the first `<<<END>>>`
/// after it. Returns the enclosed text, untrimmed.
pub fn find_block<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let start = start_marker(tag);
    let body_start = text.find(&start)? + start.len();
    let body_len = text[body_start..].find(END_MARKER)?;
    Some(&text[body_start..body_start + body_len])
}

/// Extract and parse the report block for `tag`.
pub fn extract_report<T: DeserializeOwned>(text: &str, tag: &str) -> Extraction<T> {
    let Some(block) = find_block(text, tag) else {
        return Extraction::NotFound;
    };

    match serde_json::from_str::<T>(block.trim()) {
        Ok(report) => Extraction::Parsed(report),
        Err(e) => Extraction::Malformed {
            raw: block.to_string(),
            error: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::{BuilderReport, Verdict, VerifierReport};

    const TAG: &str = "VERIFIER_REPORT_JSON";

    #[test]
    fn test_extracts_well_formed_block() {
        let text = "Ran the suite.\n<<<VERIFIER_REPORT_JSON>>>\n{\"verdict\": \"PASS\"}\n<<<END>>>\nbye";
        let extraction: Extraction = extract_report(text, TAG);
        assert_eq!(extraction, Extraction::Parsed(serde_json::json!({"verdict": "PASS"})));
    }

    #[test]
    fn test_extracts_typed_report() {
        let text = "<<<VERIFIER_REPORT_JSON>>>{\"verdict\":\"FAIL\",\"blockers\":[{\"summary\":\"x\"}]}<<<END>>>";
        let report = extract_report::<VerifierReport>(text, TAG).parsed().unwrap();
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.blockers.len(), 1);
    }

    #[test]
    fn test_corrupted_json_keeps_raw_and_error() {
        let text = "<<<VERIFIER_REPORT_JSON>>>\n{\"verdict\": \"PASS\",,}\n<<<END>>>";
        match extract_report::<Value>(text, TAG) {
            Extraction::Malformed { raw, error } => {
                assert_eq!(raw, "\n{\"verdict\": \"PASS\",,}\n");
                assert!(!error.is_empty());
            }
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let text = "<<<BUILDER_REPORT_JSON>>>{\"exitCriteriaMet\": \"yes\"}<<<END>>>";
        let extraction = extract_report::<BuilderReport>(text, "BUILDER_REPORT_JSON");
        assert!(matches!(extraction, Extraction::Malformed { .. }));
    }

    #[test]
    fn test_no_markers_is_not_found() {
        let extraction: Extraction = extract_report("just some prose, no report", TAG);
        assert_eq!(extraction, Extraction::NotFound);
    }

    #[test]
    fn test_missing_end_marker_is_not_found() {
        let extraction: Extraction = extract_report("<<<VERIFIER_REPORT_JSON>>>{\"verdict\":\"PASS\"}", TAG);
        assert_eq!(extraction, Extraction::NotFound);
    }

    #[test]
    fn test_end_marker_before_start_is_ignored() {
        let text = "<<<END>>> preamble <<<VERIFIER_REPORT_JSON>>>{\"a\":1}<<<END>>>";
        let extraction: Extraction = extract_report(text, TAG);
        assert_eq!(extraction, Extraction::Parsed(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_first_start_and_first_following_end_win() {
        let text = "<<<VERIFIER_REPORT_JSON>>>{\"a\":1}<<<END>>>\n<<<VERIFIER_REPORT_JSON>>>{\"a\":2}<<<END>>>";
        let extraction: Extraction = extract_report(text, TAG);
        assert_eq!(extraction, Extraction::Parsed(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_other_tag_is_not_found() {
        let text = "<<<BUILDER_REPORT_JSON>>>{}<<<END>>>";
        let extraction: Extraction = extract_report(text, TAG);
        assert_eq!(extraction, Extraction::NotFound);
    }

    #[test]
    fn test_last_report_variants() {
        let parsed: Extraction = Extraction::Parsed(serde_json::json!({"verdict": "PASS"}));
        assert_eq!(
            parsed.to_last_report("ignored"),
            LastReport::Structured(serde_json::json!({"verdict": "PASS"}))
        );

        let missing: Extraction = Extraction::NotFound;
        assert_eq!(missing.to_last_report("raw output"), LastReport::Raw("raw output".to_string()));

        let malformed: Extraction = Extraction::Malformed {
            raw: "{oops".to_string(),
            error: "EOF".to_string(),
        };
        let value = serde_json::to_value(malformed.to_last_report("full")).unwrap();
        assert_eq!(value["raw"], "{oops");
        assert_eq!(value["parseError"], "EOF");
    }
}
