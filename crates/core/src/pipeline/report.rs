use serde::{Deserialize, Serialize};

use crate::catalog::domain::resolver::Resolution;

/// One resolved face inside a report.
///
/// Field names are PascalCase on the wire; downstream consumers of the
/// notification queue already speak that format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedPerson {
    pub guid: String,
    pub last_photo_path: String,
    pub validated: bool,
    pub most_similar_guid: String,
    pub most_similar_photo_path: String,
    pub similarity: f32,
}

impl From<Resolution> for DetectedPerson {
    fn from(res: Resolution) -> Self {
        Self {
            guid: res.guid,
            last_photo_path: res.last_photo_path,
            validated: res.validated,
            most_similar_guid: res.most_similar_guid,
            most_similar_photo_path: res.most_similar_photo_path,
            similarity: res.similarity,
        }
    }
}

/// Result record emitted once per tick with at least one resolved face.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
    pub source_id: String,
    pub time: String,
    pub validation_threshold: f32,
    pub detected_persons: Vec<DetectedPerson>,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        Report {
            source_id: "cam1".into(),
            time: "2026-01-01-10.00.00.000000".into(),
            validation_threshold: 0.5,
            detected_persons: vec![DetectedPerson {
                guid: "abc".into(),
                last_photo_path: "events/cam1/t/abc.png".into(),
                validated: true,
                most_similar_guid: "abc".into(),
                most_similar_photo_path: "data/abc/1.png".into(),
                similarity: 0.87,
            }],
        }
    }

    #[test]
    fn test_wire_field_names_are_pascal_case() {
        let json = report().to_json().unwrap();
        for field in [
            "\"SourceId\"",
            "\"Time\"",
            "\"ValidationThreshold\"",
            "\"DetectedPersons\"",
            "\"Guid\"",
            "\"LastPhotoPath\"",
            "\"Validated\"",
            "\"MostSimilarGuid\"",
            "\"MostSimilarPhotoPath\"",
            "\"Similarity\"",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let original = report();
        let json = original.to_json().unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_detected_person_from_resolution() {
        let res = Resolution {
            guid: "g".into(),
            last_photo_path: "e.png".into(),
            validated: false,
            most_similar_guid: "m".into(),
            most_similar_photo_path: "m.png".into(),
            similarity: 0.42,
        };
        let person = DetectedPerson::from(res);
        assert_eq!(person.guid, "g");
        assert!(!person.validated);
        assert_eq!(person.most_similar_guid, "m");
    }
}
