use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::error::AppError;

pub const EVENT_TYPE: &str = "event";

/// Fields a caller may change through an update.
pub const MUTABLE_FIELDS: [&str; 8] = [
    "name",
    "tagline",
    "schedule",
    "description",
    "moderator",
    "category",
    "sub_category",
    "rigor_rank",
];

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 5;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFiles {
    pub image: String,
}

/// An event as stored in the `events` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "type", default = "event_type")]
    pub kind: String,
    #[serde(default)]
    pub uid: i64,
    pub name: String,
    pub tagline: String,
    pub schedule: bson::DateTime,
    pub description: String,
    #[serde(default)]
    pub moderator: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub rigor_rank: i64,
    #[serde(default)]
    pub attendees: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<EventFiles>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

fn event_type() -> String {
    EVENT_TYPE.to_string()
}

/// JSON representation returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventView {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: i64,
    pub name: String,
    pub tagline: String,
    pub schedule: DateTime<Utc>,
    pub description: String,
    pub moderator: String,
    pub category: String,
    pub sub_category: String,
    pub rigor_rank: i64,
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<EventFiles>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.to_hex(),
            kind: event.kind,
            uid: event.uid,
            name: event.name,
            tagline: event.tagline,
            schedule: to_chrono(event.schedule),
            description: event.description,
            moderator: event.moderator,
            category: event.category,
            sub_category: event.sub_category,
            rigor_rank: event.rigor_rank,
            attendees: event.attendees.iter().map(|id| id.to_hex()).collect(),
            files: event.files,
            created_at: to_chrono(event.created_at),
            updated_at: to_chrono(event.updated_at),
        }
    }
}

/// Validated input for creating an event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub tagline: String,
    pub schedule: DateTime<Utc>,
    pub description: String,
    pub moderator: String,
    pub category: String,
    pub sub_category: String,
    pub rigor_rank: i64,
}

impl NewEvent {
    /// Fields outside the known set are ignored.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, AppError> {
        let require = |key: &str| -> Result<String, AppError> {
            field_text(fields, key)?
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    AppError::ValidationError("Please fill all the required fields.".to_string())
                })
        };
        let name = require("name")?;
        let tagline = require("tagline")?;
        let schedule = require("schedule")?;
        let description = require("description")?;

        let schedule = parse_schedule_value(fields.get("schedule"))
            .ok_or_else(|| invalid_schedule(&schedule))?;

        Ok(Self {
            name,
            tagline,
            schedule,
            description,
            moderator: field_text(fields, "moderator")?.unwrap_or_default(),
            category: field_text(fields, "category")?.unwrap_or_default(),
            sub_category: field_text(fields, "sub_category")?.unwrap_or_default(),
            rigor_rank: fields.get("rigor_rank").and_then(parse_rigor_rank).unwrap_or(0),
        })
    }

    pub fn into_event(self, uid: i64, image: Option<String>, now: DateTime<Utc>) -> Event {
        let now = to_bson(now);
        Event {
            id: ObjectId::new(),
            kind: event_type(),
            uid,
            name: self.name,
            tagline: self.tagline,
            schedule: to_bson(self.schedule),
            description: self.description,
            moderator: self.moderator,
            category: self.category,
            sub_category: self.sub_category,
            rigor_rank: self.rigor_rank,
            attendees: Vec::new(),
            files: image.map(|image| EventFiles { image }),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update restricted to [`MUTABLE_FIELDS`] plus the uploaded image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventChanges {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub schedule: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub moderator: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub rigor_rank: Option<i64>,
    pub image: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EventChanges {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, AppError> {
        if let Some(unknown) = fields.keys().find(|k| !MUTABLE_FIELDS.contains(&k.as_str())) {
            return Err(AppError::ValidationError(format!(
                "Field '{}' cannot be updated",
                unknown
            )));
        }

        let mut changes = Self {
            moderator: field_text(fields, "moderator")?,
            category: field_text(fields, "category")?,
            sub_category: field_text(fields, "sub_category")?,
            ..Self::default()
        };

        for (key, slot) in [
            ("name", &mut changes.name),
            ("tagline", &mut changes.tagline),
            ("description", &mut changes.description),
        ] {
            match field_text(fields, key)? {
                Some(value) if value.is_empty() => {
                    return Err(AppError::ValidationError(format!("'{}' cannot be empty", key)))
                }
                value => *slot = value,
            }
        }

        if let Some(raw) = supplied(fields, "schedule") {
            let schedule = parse_schedule_value(Some(raw))
                .ok_or_else(|| invalid_schedule(&raw.to_string()))?;
            changes.schedule = Some(schedule);
        }

        if let Some(raw) = supplied(fields, "rigor_rank") {
            let rank = parse_rigor_rank(raw).ok_or_else(|| {
                AppError::ValidationError("'rigor_rank' must be an integer".to_string())
            })?;
            changes.rigor_rank = Some(rank);
        }

        Ok(changes)
    }

    /// Stamps `updated_at`, always strictly after `previous`.
    pub fn touched(mut self, previous: bson::DateTime, now: DateTime<Utc>) -> Self {
        let floor = previous.timestamp_millis().saturating_add(1);
        let millis = now.timestamp_millis().max(floor);
        self.updated_at = Some(to_chrono(bson::DateTime::from_millis(millis)));
        self
    }

    /// `$set` body for the store; `updated_at` is always included.
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        let strings = [
            ("name", &self.name),
            ("tagline", &self.tagline),
            ("description", &self.description),
            ("moderator", &self.moderator),
            ("category", &self.category),
            ("sub_category", &self.sub_category),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                set.insert(key, value.clone());
            }
        }
        if let Some(schedule) = self.schedule {
            set.insert("schedule", to_bson(schedule));
        }
        if let Some(rank) = self.rigor_rank {
            set.insert("rigor_rank", rank);
        }
        if let Some(image) = &self.image {
            set.insert("files", doc! { "image": image.clone() });
        }
        set.insert("updated_at", to_bson(self.updated_at.unwrap_or_else(Utc::now)));
        set
    }

    /// Applies the changes to an in-memory document, mirroring `$set`.
    pub fn apply_to(&self, event: &mut Event) {
        let strings = [
            (&self.name, &mut event.name),
            (&self.tagline, &mut event.tagline),
            (&self.description, &mut event.description),
            (&self.moderator, &mut event.moderator),
            (&self.category, &mut event.category),
            (&self.sub_category, &mut event.sub_category),
        ];
        for (change, field) in strings {
            if let Some(value) = change {
                *field = value.clone();
            }
        }
        if let Some(schedule) = self.schedule {
            event.schedule = to_bson(schedule);
        }
        if let Some(rank) = self.rigor_rank {
            event.rigor_rank = rank;
        }
        if let Some(image) = &self.image {
            event.files = Some(EventFiles {
                image: image.clone(),
            });
        }
        event.updated_at = to_bson(self.updated_at.unwrap_or_else(Utc::now));
    }
}

/// One page of the `latest` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Result<Self, AppError> {
        let page = positive_or(page, "page", DEFAULT_PAGE)?;
        let limit = positive_or(limit, "limit", DEFAULT_LIMIT)?.min(MAX_LIMIT);

        // The store takes `skip` as a signed 64-bit value.
        let in_range = (page - 1)
            .checked_mul(limit)
            .is_some_and(|offset| i64::try_from(offset).is_ok());
        if !in_range {
            return Err(AppError::ValidationError(
                "'page' is out of range".to_string(),
            ));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn positive_or(raw: Option<&str>, name: &str, default: u64) -> Result<u64, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => s.parse::<u64>().ok().filter(|n| *n > 0).ok_or_else(|| {
            AppError::ValidationError(format!("'{}' must be a positive integer", name))
        }),
    }
}

pub fn parse_event_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| AppError::ValidationError("Invalid event ID format".to_string()))
}

/// Reads a text field; numbers and booleans are taken in their JSON text form.
fn field_text(fields: &Map<String, Value>, key: &str) -> Result<Option<String>, AppError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(AppError::ValidationError(format!(
            "'{}' must be a string",
            key
        ))),
    }
}

/// Null and empty-string values count as not supplied.
fn supplied<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields
        .get(key)
        .filter(|v| !v.is_null() && v.as_str() != Some(""))
}

fn invalid_schedule(raw: &str) -> AppError {
    AppError::ValidationError(format!("Invalid schedule '{}'", raw.trim_matches('"')))
}

/// Integer prefix semantics: `"12abc"` is 12, `7.9` is 7.
pub fn parse_rigor_rank(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_schedule_value(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => parse_schedule(s),
        Value::Number(n) => DateTime::<Utc>::from_timestamp_millis(n.as_i64()?),
        _ => None,
    }
}

/// Accepts RFC 3339, a naive date-time (UTC) or a bare date (midnight UTC).
pub fn parse_schedule(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn to_bson(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

pub fn to_chrono(dt: bson::DateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}
