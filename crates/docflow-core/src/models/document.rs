use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Number of text fields carried by every document.
pub const FIELD_COUNT: usize = 11;

/// Maximum length (in characters) of a single field value.
pub const MAX_FIELD_LEN: usize = 255;

const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "field1", "field2", "field3", "field4", "field5", "field6", "field7", "field8", "field9",
    "field10", "field11",
];

// ─── Fields ─────────────────────────────────────────────────────────────────

/// One of the eleven named document fields (`field1`..`field11`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentField(u8);

impl DocumentField {
    /// Field by its 1-based number.
    pub const fn new(number: u8) -> Option<Self> {
        if number >= 1 && number as usize <= FIELD_COUNT {
            Some(Self(number))
        } else {
            None
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        FIELD_NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FIELD_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self(i as u8 + 1))
    }

    /// All fields in order.
    pub fn all() -> impl Iterator<Item = DocumentField> {
        (1..=FIELD_COUNT as u8).map(Self)
    }

    fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for DocumentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The values of all eleven fields. Serializes flat as `field1`..`field11`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues([Option<String>; FIELD_COUNT]);

impl FieldValues {
    pub fn get(&self, field: DocumentField) -> Option<&str> {
        self.0[field.index()].as_deref()
    }

    /// Store a value; empty strings are normalized to "not filled".
    pub fn set(&mut self, field: DocumentField, value: Option<String>) {
        self.0[field.index()] = value.filter(|v| !v.is_empty());
    }

    pub fn is_filled(&self, field: DocumentField) -> bool {
        self.get(field).is_some_and(|v| !v.is_empty())
    }

    pub fn all_filled(&self) -> bool {
        DocumentField::all().all(|f| self.is_filled(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocumentField, Option<&str>)> {
        DocumentField::all().map(move |f| (f, self.get(f)))
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FIELD_COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.name(), &value)?;
        }
        map.end()
    }
}

// ─── Stage / step ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Filling,
    Approval,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filling => "FILLING",
            Self::Approval => "APPROVAL",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FILLING" => Some(Self::Filling),
            "APPROVAL" => Some(Self::Approval),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position within the filling stage. Serialized as its number (1..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FillerStep {
    One,
    Two,
    Three,
}

impl FillerStep {
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }

    /// The following step, or `None` after the last one.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::One => Some(Self::Two),
            Self::Two => Some(Self::Three),
            Self::Three => None,
        }
    }
}

impl Serialize for FillerStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

// ─── Document ───────────────────────────────────────────────────────────────

/// A workflow document moving through filling and approval.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: FieldValues,
    pub current_stage: Stage,
    pub current_filler_step: FillerStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every persisted change; used for compare-and-swap writes.
    pub version: i64,
}

impl Document {
    pub fn new(id: String, created_by: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            fields: FieldValues::default(),
            current_stage: Stage::Filling,
            current_filler_step: FillerStep::One,
            created_by,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn all_fields_filled(&self) -> bool {
        self.fields.all_filled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        let names: Vec<&str> = DocumentField::all().map(|f| f.name()).collect();
        assert_eq!(names.len(), FIELD_COUNT);
        assert_eq!(names[0], "field1");
        assert_eq!(names[10], "field11");
        assert_eq!(DocumentField::from_name("field10").map(|f| f.number()), Some(10));
        assert!(DocumentField::from_name("field12").is_none());
        assert!(DocumentField::from_name("title").is_none());
        assert!(DocumentField::new(0).is_none());
    }

    #[test]
    fn test_empty_string_is_not_filled() {
        let mut values = FieldValues::default();
        let f1 = DocumentField::new(1).unwrap();
        values.set(f1, Some(String::new()));
        assert!(!values.is_filled(f1));
        assert_eq!(values.get(f1), None);
        values.set(f1, Some("a".into()));
        assert!(values.is_filled(f1));
    }

    #[test]
    fn test_new_document_serializes_flat_fields() {
        let doc = Document::new("doc-1".into(), Some("u1".into()));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["id"], "doc-1");
        assert_eq!(json["current_stage"], "FILLING");
        assert_eq!(json["current_filler_step"], 1);
        for field in DocumentField::all() {
            assert!(json[field.name()].is_null());
        }
        assert!(!doc.all_fields_filled());
    }

    #[test]
    fn test_step_ordering() {
        assert_eq!(FillerStep::One.next(), Some(FillerStep::Two));
        assert_eq!(FillerStep::Three.next(), None);
        assert!(FillerStep::One < FillerStep::Three);
        assert_eq!(FillerStep::from_number(4), None);
    }
}
