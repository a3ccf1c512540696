//! Weekday sets describing when a recurring course repeats.

use chrono::Weekday;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchedulingError;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A closed set of weekdays.
///
/// Serialized as a JSON array of lowercase day names (`["monday", "friday"]`).
/// Deserialization also accepts the older `{"days": [...]}` object and a JSON
/// string that itself holds either form, which is how clients used to send it.
/// Day names are matched case-insensitively and may be abbreviated (`"Mon"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RecurrencePattern(u8);

impl RecurrencePattern {
    pub fn from_days(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut pattern = Self::default();
        for day in days {
            pattern.insert(day);
        }
        pattern
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= bit(day);
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & bit(day) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Days in the set, Monday first.
    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.into_iter().filter(move |day| self.contains(*day))
    }

    /// Parses a stored or client-supplied pattern.
    pub fn parse(raw: &str) -> Result<Self, SchedulingError> {
        serde_json::from_str(raw).map_err(|e| {
            SchedulingError::invalid_request(format!("invalid recurrence pattern: {e}"))
        })
    }

    pub fn to_json(&self) -> String {
        let names: Vec<&str> = self.days().map(day_name).collect();
        serde_json::Value::from(names).to_string()
    }

    fn from_names<E: de::Error>(names: &[String]) -> Result<Self, E> {
        let mut pattern = Self::default();
        for name in names {
            let day = name
                .trim()
                .parse::<Weekday>()
                .map_err(|_| E::custom(format!("unknown weekday `{name}`")))?;
            pattern.insert(day);
        }
        Ok(pattern)
    }
}

fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.days().map(day_name).collect();
        write!(f, "{}", names.join(","))
    }
}

impl Serialize for RecurrencePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for day in self.days() {
            seq.serialize_element(day_name(day))?;
        }
        seq.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPattern {
    List(Vec<String>),
    Legacy { days: Vec<String> },
    Encoded(String),
}

impl<'de> Deserialize<'de> for RecurrencePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawPattern::deserialize(deserializer)? {
            RawPattern::List(names) | RawPattern::Legacy { days: names } => {
                Self::from_names(&names)
            }
            RawPattern::Encoded(inner) => {
                let names = match serde_json::from_str::<RawPattern>(&inner) {
                    Ok(RawPattern::List(names)) | Ok(RawPattern::Legacy { days: names }) => names,
                    _ => return Err(de::Error::custom("malformed encoded recurrence pattern")),
                };
                Self::from_names(&names)
            }
        }
    }
}

impl ToSql for RecurrencePattern {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_json()))
    }
}

impl FromSql for RecurrencePattern {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        RecurrencePattern::parse(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercase_array() {
        let pattern = RecurrencePattern::parse(r#"["monday", "wednesday"]"#).unwrap();
        assert!(pattern.contains(Weekday::Mon));
        assert!(pattern.contains(Weekday::Wed));
        assert!(!pattern.contains(Weekday::Fri));
        assert_eq!(pattern.len(), 2);
    }

    #[test]
    fn test_parse_accepts_legacy_and_encoded_forms() {
        let legacy = RecurrencePattern::parse(r#"{"days": ["Monday", "Friday"]}"#).unwrap();
        let encoded = RecurrencePattern::parse(r#""[\"monday\",\"fri\"]""#).unwrap();
        assert_eq!(legacy, encoded);
        assert_eq!(legacy.to_json(), r#"["monday","friday"]"#);
    }

    #[test]
    fn test_parse_rejects_unknown_day() {
        let err = RecurrencePattern::parse(r#"["monday", "someday"]"#).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidRequest { .. }));
    }

    #[test]
    fn test_days_are_monday_first() {
        let pattern = RecurrencePattern::from_days([Weekday::Sun, Weekday::Tue]);
        let days: Vec<_> = pattern.days().collect();
        assert_eq!(days, vec![Weekday::Tue, Weekday::Sun]);
    }
}
