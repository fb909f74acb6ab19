use crate::validation::{parse_date, validate_name, validate_price};
use crate::Result;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Category used when the user doesn't pick one
pub const DEFAULT_CATEGORY: &str = "general";

/// A tracked recurring subscription, as it lives on disk
///
/// Status and days remaining are never stored. They are derived from
/// `renewal_date` and whatever "today" the caller passes in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub name: String,
    #[serde(rename = "date", with = "date_format")]
    pub renewal_date: NaiveDate,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, with = "timestamp_format")]
    pub created_at: NaiveDateTime,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Subscription {
    /// Whole days until renewal. Negative once the date has passed.
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.renewal_date - today).num_days()
    }

    pub fn status(&self, today: NaiveDate) -> Status {
        Status::from_days_remaining(self.days_remaining(today))
    }

    pub fn status_color(&self, today: NaiveDate) -> &'static str {
        self.status(today).color()
    }

    /// Renewal date in its canonical text form
    pub fn date_str(&self) -> String {
        self.renewal_date.format(date_format::FORMAT).to_string()
    }

    /// Case-insensitive substring match on the name
    pub fn name_contains(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Lifecycle stage derived from days remaining
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    /// Renewal date already passed
    Expired,
    DueToday,
    /// 1-3 days left
    Urgent,
    /// 4-7 days left
    ExpiringSoon,
    /// More than a week left
    Active,
}

impl Status {
    pub fn from_days_remaining(days: i64) -> Self {
        match days {
            i64::MIN..=-1 => Status::Expired,
            0 => Status::DueToday,
            1..=3 => Status::Urgent,
            4..=7 => Status::ExpiringSoon,
            _ => Status::Active,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Expired => "Expired",
            Status::DueToday => "Due today",
            Status::Urgent => "Urgent",
            Status::ExpiringSoon => "Expiring soon",
            Status::Active => "Active",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Status::Expired => "#ff4444",
            Status::DueToday => "#ff8800",
            Status::Urgent => "#ff4444",
            Status::ExpiringSoon => "#ffaa00",
            Status::Active => "#44ff44",
        }
    }

    /// Due today, urgent or expiring soon - the "deal with this" bucket
    pub fn is_expiring(&self) -> bool {
        matches!(
            self,
            Status::DueToday | Status::Urgent | Status::ExpiringSoon
        )
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// User-entered values for a subscription that doesn't exist yet
///
/// Construction never fails, even with a nonsense date. The store
/// validates everything right before it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub id: Option<i64>,
    pub name: String,
    pub date: String,
    pub price: f64,
    pub category: String,
    pub notes: String,
}

impl NewSubscription {
    pub fn new(name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            date: date.into(),
            price: 0.0,
            category: default_category(),
            notes: String::new(),
        }
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Validate and turn into a storable subscription
    pub(crate) fn into_subscription(
        self,
        id: i64,
        created_at: NaiveDateTime,
    ) -> Result<Subscription> {
        validate_name(&self.name)?;
        let renewal_date = parse_date(&self.date)?;
        validate_price(self.price)?;

        Ok(Subscription {
            id,
            name: self.name.trim().to_string(),
            renewal_date,
            price: self.price,
            category: normalize_category(self.category),
            notes: self.notes,
            created_at,
        })
    }
}

/// New values for the mutable fields of an existing subscription
///
/// `id` and `created_at` are deliberately absent - they never change.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionUpdate {
    pub name: String,
    pub date: String,
    pub price: f64,
    pub category: String,
    pub notes: String,
}

impl SubscriptionUpdate {
    /// Check the fields and hand back the parsed renewal date
    pub(crate) fn validate(&self) -> Result<NaiveDate> {
        validate_name(&self.name)?;
        let date = parse_date(&self.date)?;
        validate_price(self.price)?;
        Ok(date)
    }
}

impl From<&Subscription> for SubscriptionUpdate {
    fn from(sub: &Subscription) -> Self {
        Self {
            name: sub.name.clone(),
            date: sub.date_str(),
            price: sub.price,
            category: sub.category.clone(),
            notes: sub.notes.clone(),
        }
    }
}

pub(crate) fn normalize_category(category: String) -> String {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        default_category()
    } else {
        trimmed.to_string()
    }
}

/// `YYYY-MM-DD` on the wire, nothing fancier
mod date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// ISO-8601 timestamps. Offsets are accepted on read and dropped, keeping
/// the wall-clock time they were written with.
mod timestamp_format {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        at.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse::<NaiveDateTime>()
            .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|at| at.naive_local()))
            .map_err(serde::de::Error::custom)
    }
}
