//! How values without a single canonical BSON form are stored.
//!
//! UUIDs can be written as standard binaries (subtype 4) or in one of the legacy byte orders
//! (subtype 3), and naive timestamps can be read as UTC or as local time. The conventions are
//! registered once per process, when the first client is constructed, and are then used by the
//! [`uuid`] and [`naive_datetime`] serde adapters and by [`normalize`].

use crate::{Error, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use mongodb::bson::{
    self, Binary, Bson, Document, Uuid, spec::BinarySubtype, uuid::UuidRepresentation,
};
use serde::Deserialize;
use std::{fmt, str::FromStr, sync::OnceLock};
use tracing::debug;

static REGISTERED: OnceLock<Conventions> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum UuidFormat {
    #[default]
    Standard,
    CSharpLegacy,
    JavaLegacy,
    PythonLegacy,
}

impl UuidFormat {
    pub fn representation(self) -> UuidRepresentation {
        match self {
            Self::Standard => UuidRepresentation::Standard,
            Self::CSharpLegacy => UuidRepresentation::CSharpLegacy,
            Self::JavaLegacy => UuidRepresentation::JavaLegacy,
            Self::PythonLegacy => UuidRepresentation::PythonLegacy,
        }
    }

    /// Tag of the shell helper that builds a UUID literal in this representation.
    pub fn shell_tag(self) -> &'static str {
        match self {
            Self::Standard => "UUID",
            Self::CSharpLegacy => "CSUUID",
            Self::JavaLegacy => "JUUID",
            Self::PythonLegacy => "PYUUID",
        }
    }

    pub fn encode(self, uuid: Uuid) -> Binary {
        Binary::from_uuid_with_representation(uuid, self.representation())
    }

    pub fn decode(self, binary: &Binary) -> Result<Uuid> {
        binary
            .to_uuid_with_representation(self.representation())
            .map_err(|err| {
                Error::Configuration(format!(
                    "binary value does not decode as a {self} uuid: {err}"
                ))
            })
    }
}

impl fmt::Display for UuidFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Standard => "standard",
            Self::CSharpLegacy => "csharpLegacy",
            Self::JavaLegacy => "javaLegacy",
            Self::PythonLegacy => "pythonLegacy",
        })
    }
}

impl FromStr for UuidFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match canonical(s).as_str() {
            "standard" => Ok(Self::Standard),
            "csharplegacy" => Ok(Self::CSharpLegacy),
            "javalegacy" => Ok(Self::JavaLegacy),
            "pythonlegacy" => Ok(Self::PythonLegacy),
            _ => Err(Error::Configuration(format!(
                "unrecognized uuid representation `{s}`"
            ))),
        }
    }
}

impl TryFrom<String> for UuidFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum DateTimeKind {
    #[default]
    Utc,
    Local,
}

impl DateTimeKind {
    /// Returns `None` for a local time that does not exist, such as one inside a DST gap.
    pub fn to_bson(self, value: NaiveDateTime) -> Option<bson::DateTime> {
        let utc = match self {
            Self::Utc => value.and_utc(),
            Self::Local => Local
                .from_local_datetime(&value)
                .earliest()?
                .with_timezone(&Utc),
        };

        Some(bson::DateTime::from_millis(utc.timestamp_millis()))
    }

    pub fn from_bson(self, value: bson::DateTime) -> Option<NaiveDateTime> {
        let utc = DateTime::<Utc>::from_timestamp_millis(value.timestamp_millis())?;

        Some(match self {
            Self::Utc => utc.naive_utc(),
            Self::Local => utc.with_timezone(&Local).naive_local(),
        })
    }
}

impl fmt::Display for DateTimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utc => "utc",
            Self::Local => "local",
        })
    }
}

impl FromStr for DateTimeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match canonical(s).as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(Error::Configuration(format!(
                "unrecognized date time kind `{s}`"
            ))),
        }
    }
}

impl TryFrom<String> for DateTimeKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

fn canonical(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Conventions {
    pub uuid_format: UuidFormat,
    pub date_time_kind: DateTimeKind,
}

impl Conventions {
    /// Makes these conventions the process-wide ones.
    ///
    /// Registering the same conventions again is a no-op; registering different ones fails,
    /// because documents written under the first set would no longer be matched.
    pub fn register(self) -> Result<()> {
        let registered = REGISTERED.get_or_init(|| {
            debug!(
                uuid_format = %self.uuid_format,
                date_time_kind = %self.date_time_kind,
                "registered conventions"
            );
            self
        });

        if *registered == self {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "conventions already registered as {} uuids and {} timestamps, cannot switch to {} and {}",
                registered.uuid_format,
                registered.date_time_kind,
                self.uuid_format,
                self.date_time_kind
            )))
        }
    }

    /// The registered conventions, or the defaults when no client was constructed yet.
    pub fn current() -> Self {
        REGISTERED.get().copied().unwrap_or_default()
    }
}

/// Rewrites standard UUID binaries in a filter or update value into the registered
/// representation, so they compare equal to values written through [`uuid`].
pub fn normalize(value: Bson) -> Bson {
    normalize_with(value, Conventions::current().uuid_format)
}

pub fn normalize_document(document: Document) -> Document {
    let format = Conventions::current().uuid_format;

    document
        .into_iter()
        .map(|(key, value)| (key, normalize_with(value, format)))
        .collect()
}

fn normalize_with(value: Bson, format: UuidFormat) -> Bson {
    match value {
        Bson::Binary(binary)
            if format != UuidFormat::Standard && binary.subtype == BinarySubtype::Uuid =>
        {
            match binary.to_uuid() {
                Ok(uuid) => Bson::Binary(format.encode(uuid)),
                Err(_) => Bson::Binary(binary),
            }
        }
        Bson::Array(values) => Bson::Array(
            values
                .into_iter()
                .map(|value| normalize_with(value, format))
                .collect(),
        ),
        Bson::Document(document) => Bson::Document(
            document
                .into_iter()
                .map(|(key, value)| (key, normalize_with(value, format)))
                .collect(),
        ),
        other => other,
    }
}

/// Serde adapter storing a [`Uuid`] in the registered representation.
///
/// ```ignore
/// #[serde(rename = "_id", with = "arca::uuid")]
/// id: Uuid,
/// ```
pub mod uuid {
    use super::Conventions;
    use mongodb::bson::{Binary, Uuid};
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(uuid: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        Conventions::current()
            .uuid_format
            .encode(*uuid)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let binary = Binary::deserialize(deserializer)?;

        Conventions::current()
            .uuid_format
            .decode(&binary)
            .map_err(D::Error::custom)
    }
}

/// Serde adapter storing a [`NaiveDateTime`] as a BSON date, reading and writing it in the
/// registered timezone kind.
pub mod naive_datetime {
    use super::Conventions;
    use chrono::NaiveDateTime;
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let kind = Conventions::current().date_time_kind;

        kind.to_bson(*value)
            .ok_or_else(|| {
                <S::Error as ser::Error>::custom(format!("`{value}` does not exist as {kind} time"))
            })?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let value = bson::DateTime::deserialize(deserializer)?;

        Conventions::current()
            .date_time_kind
            .from_bson(value)
            .ok_or_else(|| de::Error::custom(format!("`{value}` is out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn parses_uuid_formats() {
        assert_eq!("standard".parse::<UuidFormat>().unwrap(), UuidFormat::Standard);
        assert_eq!(
            "CSharpLegacy".parse::<UuidFormat>().unwrap(),
            UuidFormat::CSharpLegacy
        );
        assert_eq!(
            "java_legacy".parse::<UuidFormat>().unwrap(),
            UuidFormat::JavaLegacy
        );
        assert_eq!(
            "python-legacy".parse::<UuidFormat>().unwrap(),
            UuidFormat::PythonLegacy
        );
    }

    #[test]
    fn unrecognized_formats_are_configuration_errors() {
        assert!("unspecified".parse::<UuidFormat>().unwrap_err().is_configuration());
        assert!("utc+2".parse::<DateTimeKind>().unwrap_err().is_configuration());
    }

    #[test]
    fn every_format_has_its_own_tag() {
        let formats = [
            UuidFormat::Standard,
            UuidFormat::CSharpLegacy,
            UuidFormat::JavaLegacy,
            UuidFormat::PythonLegacy,
        ];

        for (i, a) in formats.iter().enumerate() {
            for b in &formats[i + 1..] {
                assert_ne!(a.shell_tag(), b.shell_tag());
            }
        }
    }

    #[test]
    fn legacy_formats_use_the_old_subtype() {
        let uuid = Uuid::new();

        assert_eq!(UuidFormat::Standard.encode(uuid).subtype, BinarySubtype::Uuid);

        let legacy = UuidFormat::CSharpLegacy.encode(uuid);
        assert_eq!(legacy.subtype, BinarySubtype::UuidOld);
        assert_eq!(UuidFormat::CSharpLegacy.decode(&legacy).unwrap(), uuid);
        assert!(UuidFormat::Standard.decode(&legacy).unwrap_err().is_configuration());
    }

    #[test]
    fn normalize_rewrites_nested_uuids() {
        let uuid = Uuid::new();
        let value = Bson::Document(doc! { "$in": [uuid, "other"] });

        let Bson::Document(normalized) = normalize_with(value, UuidFormat::JavaLegacy) else {
            panic!("expected a document");
        };

        let values = normalized.get_array("$in").unwrap();
        assert_eq!(values[0], Bson::Binary(UuidFormat::JavaLegacy.encode(uuid)));
        assert_eq!(values[1], Bson::String("other".into()));
    }

    #[test]
    fn normalize_keeps_standard_uuids() {
        let uuid = Uuid::new();

        assert_eq!(
            normalize_with(Bson::from(uuid), UuidFormat::Standard),
            Bson::from(uuid)
        );
    }

    #[test]
    fn utc_kind_keeps_wall_clock() {
        let value = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123)
            .unwrap()
            .naive_utc();

        let stored = DateTimeKind::Utc.to_bson(value).unwrap();

        assert_eq!(stored.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(DateTimeKind::Utc.from_bson(stored).unwrap(), value);
    }

    #[test]
    fn local_kind_converts_through_local_time() {
        let stored = bson::DateTime::from_millis(1_700_000_000_000);

        let local = DateTimeKind::Local.from_bson(stored).unwrap();

        let expected = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(local, expected);
        assert_eq!(DateTimeKind::Local.to_bson(local).unwrap(), stored);
    }

    #[test]
    fn conflicting_registration_fails() {
        Conventions::default().register().unwrap();
        Conventions::default().register().unwrap();

        let err = Conventions {
            uuid_format: UuidFormat::PythonLegacy,
            ..Conventions::default()
        }
        .register()
        .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(Conventions::current(), Conventions::default());
    }
}
