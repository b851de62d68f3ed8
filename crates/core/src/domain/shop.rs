use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShopId(pub String);

/// How long a confirmed order may sit before the owner gets a reminder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderPeriod {
    Hours8,
    Hours12,
    Days1,
    Days2,
    Days3,
}

impl ReminderPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hours8 => "8h",
            Self::Hours12 => "12h",
            Self::Days1 => "1d",
            Self::Days2 => "2d",
            Self::Days3 => "3d",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "8h" => Some(Self::Hours8),
            "12h" => Some(Self::Hours12),
            "1d" => Some(Self::Days1),
            "2d" => Some(Self::Days2),
            "3d" => Some(Self::Days3),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            Self::Hours8 => Duration::hours(8),
            Self::Hours12 => Duration::hours(12),
            Self::Days1 => Duration::days(1),
            Self::Days2 => Duration::days(2),
            Self::Days3 => Duration::days(3),
        }
    }
}

impl Default for ReminderPeriod {
    fn default() -> Self {
        Self::Days1
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub owner_id: UserId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub reminder_period: ReminderPeriod,
    pub created_at: DateTime<Utc>,
}

/// Lowercased, hyphen-separated slug derived from a shop name. Collisions are
/// resolved by the storage layer, not here.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
