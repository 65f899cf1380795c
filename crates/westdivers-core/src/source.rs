use serde::{Deserialize, Serialize};

// Records as the document store hands them over. Every field is optional and
// decoded leniently so a sloppy record still reaches normalization.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    #[serde(default, with = "lenient::text")]
    pub id: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub title: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub name: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub date: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub location: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub site: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub required_level: Option<String>,

    #[serde(default, with = "lenient::flag")]
    pub published: Option<bool>,

    #[serde(default, with = "lenient::text")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    #[serde(default, with = "lenient::text")]
    pub id: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub title: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub name: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub start_date: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub date: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub schedule: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub required_level: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub location: Option<String>,

    #[serde(default, with = "lenient::flag")]
    pub published: Option<bool>,

    #[serde(default, with = "lenient::text")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialEventRecord {
    #[serde(default, with = "lenient::text")]
    pub id: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub title: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub name: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub date: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub time: Option<String>,

    #[serde(default, with = "lenient::text")]
    pub location: Option<String>,

    #[serde(default, with = "lenient::flag")]
    pub published: Option<bool>,

    #[serde(default, with = "lenient::text")]
    pub status: Option<String>,
}

/// The three lists the calendar merges, as last pushed by the suppliers.
#[derive(Debug, Clone, Default)]
pub struct SourceLists {
    pub trips: Vec<TripRecord>,
    pub courses: Vec<CourseRecord>,
    pub events: Vec<SocialEventRecord>,
}

impl SourceLists {
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty() && self.courses.is_empty() && self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trips.len() + self.courses.len() + self.events.len()
    }
}

pub mod lenient {
    pub mod text {
        use serde::{Deserialize, Deserializer, Serializer};
        use serde_json::Value;

        pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(text) => serializer.serialize_str(text),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Value::deserialize(deserializer)?;
            Ok(match raw {
                Value::String(text) => Some(text),
                Value::Number(num) => Some(num.to_string()),
                Value::Bool(flag) => Some(flag.to_string()),
                Value::Null | Value::Array(_) | Value::Object(_) => None,
            })
        }
    }

    pub mod flag {
        use serde::{Deserialize, Deserializer, Serializer};
        use serde_json::Value;

        pub fn serialize<S>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(flag) => serializer.serialize_bool(*flag),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Value::deserialize(deserializer)?;
            Ok(match raw {
                Value::Bool(flag) => Some(flag),
                Value::Number(num) => num.as_f64().map(|n| n != 0.0),
                Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "1" | "on" => Some(true),
                    "false" | "no" | "0" | "off" => Some(false),
                    _ => None,
                },
                Value::Null | Value::Array(_) | Value::Object(_) => None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CourseRecord, SocialEventRecord, TripRecord};

    #[test]
    fn trip_accepts_camel_case_and_alternate_names() {
        let trip: TripRecord = serde_json::from_str(
            r#"{"id":"t1","name":"Wreck dive","date":"2025-04-12","site":"Porthkerris","requiredLevel":"AOWD","published":true}"#,
        )
        .expect("parse trip");

        assert_eq!(trip.id.as_deref(), Some("t1"));
        assert_eq!(trip.title, None);
        assert_eq!(trip.name.as_deref(), Some("Wreck dive"));
        assert_eq!(trip.site.as_deref(), Some("Porthkerris"));
        assert_eq!(trip.required_level.as_deref(), Some("AOWD"));
        assert_eq!(trip.published, Some(true));
        assert_eq!(trip.status, None);
    }

    #[test]
    fn title_and_name_together_still_decode() {
        let trip: TripRecord = serde_json::from_str(
            r#"{"id":"t1","title":"Wreck","name":"Wreck","location":"Manacles","site":"Manacles reef","date":"2025-04-12","published":true}"#,
        )
        .expect("parse trip");

        assert_eq!(trip.title.as_deref(), Some("Wreck"));
        assert_eq!(trip.name.as_deref(), Some("Wreck"));
        assert_eq!(trip.location.as_deref(), Some("Manacles"));
        assert_eq!(trip.site.as_deref(), Some("Manacles reef"));
        assert_eq!(trip.published, Some(true));
    }

    #[test]
    fn malformed_fields_degrade_instead_of_failing() {
        let course: CourseRecord = serde_json::from_str(
            r#"{"id":42,"title":["not","text"],"date":"2025-05-01","published":"yes","status":null,"unknown":{"x":1}}"#,
        )
        .expect("parse course");

        assert_eq!(course.id.as_deref(), Some("42"));
        assert_eq!(course.title, None);
        assert_eq!(course.start_date, None);
        assert_eq!(course.date.as_deref(), Some("2025-05-01"));
        assert_eq!(course.published, Some(true));
        assert_eq!(course.status, None);
    }

    #[test]
    fn unrecognised_published_values_are_absent() {
        let event: SocialEventRecord =
            serde_json::from_str(r#"{"id":"e1","published":"maybe","time":1900}"#)
                .expect("parse event");

        assert_eq!(event.published, None);
        assert_eq!(event.time.as_deref(), Some("1900"));
    }

    #[test]
    fn empty_object_is_a_valid_record() {
        let event: SocialEventRecord = serde_json::from_str("{}").expect("parse empty");
        assert_eq!(event, SocialEventRecord::default());
    }
}
