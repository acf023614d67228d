//! Timezone resolution and UTC/local conversion.
//!
//! Identifiers are IANA names (`Asia/Tokyo`) or fixed-offset labels
//! (`UTC+9`), the latter mapped onto the `Etc/GMT∓N` zones. Conversions use
//! the zone's rules at the instant being converted, so daylight-saving
//! transitions are honoured rather than assuming a fixed offset.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use habitlog_types::error::HabitError;
use habitlog_types::user::UserId;
use serde::Serialize;

use crate::repository::preference::TimezonePreferenceRepository;

/// Westernmost fixed offset offered as a preset.
const MIN_PRESET_OFFSET: i32 = -12;
/// Easternmost fixed offset offered as a preset.
const MAX_PRESET_OFFSET: i32 = 14;

/// A selectable fixed-offset timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimezoneOption {
    /// Display label, e.g. `UTC+9`.
    pub label: String,
    /// IANA identifier, e.g. `Etc/GMT-9`.
    pub iana: String,
}

/// The `UTC-12` .. `UTC+14` preset list, west to east.
pub fn presets() -> Vec<TimezoneOption> {
    (MIN_PRESET_OFFSET..=MAX_PRESET_OFFSET)
        .map(|hours| TimezoneOption {
            label: offset_label(hours),
            iana: etc_gmt_name(hours),
        })
        .collect()
}

fn offset_label(hours: i32) -> String {
    if hours < 0 {
        format!("UTC{hours}")
    } else {
        format!("UTC+{hours}")
    }
}

/// `Etc/GMT` zones use POSIX sign convention: east of Greenwich is negative.
fn etc_gmt_name(hours: i32) -> String {
    match hours {
        0 => "Etc/GMT".to_string(),
        h if h > 0 => format!("Etc/GMT-{h}"),
        h => format!("Etc/GMT+{}", -h),
    }
}

/// Parse a user-supplied identifier into a zone.
///
/// Accepts IANA names and `UTC±N` / `GMT±N` labels with whole-hour offsets
/// between -12 and +14. Anything else is `InvalidTimezone`.
pub fn parse_timezone(input: &str) -> Result<Tz, HabitError> {
    let invalid = || HabitError::InvalidTimezone(input.to_string());
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let upper = trimmed.to_uppercase();
    if upper == "UTC" || upper == "GMT" {
        return Ok(Tz::UTC);
    }

    if let Some(hours) = offset_label_hours(&upper) {
        if !(MIN_PRESET_OFFSET..=MAX_PRESET_OFFSET).contains(&hours) {
            return Err(invalid());
        }
        return etc_gmt_name(hours).parse::<Tz>().map_err(|_| invalid());
    }

    trimmed.parse::<Tz>().map_err(|_| invalid())
}

/// Hours of a signed `UTC±N` / `GMT±N` label, or `None` if `s` is not one.
fn offset_label_hours(s: &str) -> Option<i32> {
    let rest = s.strip_prefix("UTC").or_else(|| s.strip_prefix("GMT"))?;
    if !rest.starts_with('+') && !rest.starts_with('-') {
        return None;
    }
    rest.parse().ok()
}

/// Human-facing label for a stored identifier.
///
/// `Etc/GMT-9` renders as `UTC+9`; non-preset zones render as their name.
pub fn timezone_label(identifier: &str) -> String {
    match identifier {
        "UTC" | "Etc/UTC" | "Etc/GMT" | "GMT" => return offset_label(0),
        _ => {}
    }
    if let Some(rest) = identifier.strip_prefix("Etc/GMT") {
        if let Ok(posix_hours) = rest.parse::<i32>() {
            let hours = -posix_hours;
            if (MIN_PRESET_OFFSET..=MAX_PRESET_OFFSET).contains(&hours) {
                return offset_label(hours);
            }
        }
    }
    identifier.to_string()
}

/// Wall-clock time of `instant` in `tz`.
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

/// The UTC instant a local wall-clock time denotes in `tz`.
///
/// A time repeated by a backward DST shift resolves to its earlier
/// occurrence. A time skipped by a forward shift is `NonexistentLocalTime`.
pub fn to_utc(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, HabitError> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(HabitError::NonexistentLocalTime(local)),
    }
}

/// Resolves users to their timezone, falling back to a configured default.
pub struct TimezoneResolver<P: TimezonePreferenceRepository> {
    preferences: P,
    default: Tz,
}

impl<P: TimezonePreferenceRepository> TimezoneResolver<P> {
    pub fn new(preferences: P, default: Tz) -> Self {
        Self {
            preferences,
            default,
        }
    }

    /// Zone used for users without a stored preference.
    pub fn default_timezone(&self) -> Tz {
        self.default
    }

    /// The user's zone, or the default if none was stored.
    ///
    /// A stored identifier that no longer parses is logged and ignored.
    pub async fn resolve(&self, user_id: UserId) -> Result<Tz, HabitError> {
        let stored = self.preferences.get(user_id).await?;
        let Some(identifier) = stored else {
            return Ok(self.default);
        };

        match parse_timezone(&identifier) {
            Ok(tz) => Ok(tz),
            Err(_) => {
                tracing::warn!(
                    %user_id,
                    timezone = %identifier,
                    "stored timezone is not recognized, using default"
                );
                Ok(self.default)
            }
        }
    }

    /// Validate `identifier` and persist its canonical IANA name.
    pub async fn set(&self, user_id: UserId, identifier: &str) -> Result<Tz, HabitError> {
        let tz = parse_timezone(identifier)?;
        self.preferences.set(user_id, tz.name()).await?;
        tracing::info!(%user_id, timezone = tz.name(), "timezone preference updated");
        Ok(tz)
    }
}
