use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire/storage value meaning "never expires".
pub const NEVER_EXPIRES: i64 = -1;

/// When a robot account stops being usable.
///
/// Stored and serialized as epoch seconds, with `-1` meaning [`Expiration::Never`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Expiration {
    Never,
    /// Absolute instant, in seconds since the Unix epoch.
    At(i64),
}

impl Expiration {
    /// Interpret a raw epoch-seconds value. Anything below `-1` is rejected.
    pub fn from_epoch(value: i64) -> Option<Self> {
        match value {
            NEVER_EXPIRES => Some(Expiration::Never),
            v if v >= 0 => Some(Expiration::At(v)),
            _ => None,
        }
    }

    pub fn as_epoch(&self) -> i64 {
        match self {
            Expiration::Never => NEVER_EXPIRES,
            Expiration::At(secs) => *secs,
        }
    }

    /// An account expires once `now` is strictly past the expiration second.
    pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiration::Never => false,
            Expiration::At(secs) => now.timestamp() > *secs,
        }
    }
}

impl From<Expiration> for i64 {
    fn from(value: Expiration) -> Self {
        value.as_epoch()
    }
}

impl TryFrom<i64> for Expiration {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Expiration::from_epoch(value).ok_or_else(|| {
            format!(
                "expiration must be a non-negative epoch second or {} for never, got {}",
                NEVER_EXPIRES, value
            )
        })
    }
}

/// A robot account: a non-human identity bound to exactly one project.
///
/// The bearer secret is never part of this struct. It exists only in the
/// [`RobotCredential`](super::RobotCredential) returned when it is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    pub id: i64,
    /// Bare name, unique among visible robots of the project
    pub name: String,
    pub description: Option<String>,
    pub project_id: i64,
    pub expires_at: Expiration,
    pub disabled: bool,
    /// Hidden robots are internal and skipped by default listings
    #[serde(skip, default = "default_visible")]
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_visible() -> bool {
    true
}

/// Lifecycle state derived from the stored flags and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Active,
    Disabled,
    Expired,
}

impl fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotStatus::Active => f.write_str("active"),
            RobotStatus::Disabled => f.write_str("disabled"),
            RobotStatus::Expired => f.write_str("expired"),
        }
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("robot account expired at {expires_at} and cannot be enabled")]
    Expired { expires_at: i64 },
}

impl Robot {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.has_passed(now)
    }

    /// The one predicate authentication must pass before honoring a request
    /// made with this robot's credential.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.disabled && !self.is_expired(now)
    }

    pub fn status(&self, now: DateTime<Utc>) -> RobotStatus {
        if self.is_expired(now) {
            RobotStatus::Expired
        } else if self.disabled {
            RobotStatus::Disabled
        } else {
            RobotStatus::Active
        }
    }

    /// Mark the account disabled. Disabling twice is not an error.
    pub fn disable(mut self, now: DateTime<Utc>) -> Self {
        self.disabled = true;
        self.updated_at = now;
        self
    }

    /// Re-enable the account unless it has already expired.
    pub fn enable(mut self, now: DateTime<Utc>) -> Result<Self, LifecycleError> {
        if self.is_expired(now) {
            return Err(LifecycleError::Expired {
                expires_at: self.expires_at.as_epoch(),
            });
        }
        self.disabled = false;
        self.updated_at = now;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn robot(expires_at: Expiration, disabled: bool) -> Robot {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Robot {
            id: 1,
            name: "ci-bot".to_string(),
            description: None,
            project_id: 5,
            expires_at,
            disabled,
            visible: true,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_from_epoch_sentinel_asymmetry() {
        assert_eq!(Expiration::from_epoch(-1), Some(Expiration::Never));
        assert_eq!(Expiration::from_epoch(0), Some(Expiration::At(0)));
        assert_eq!(Expiration::from_epoch(30), Some(Expiration::At(30)));
        assert_eq!(Expiration::from_epoch(-2), None);
        assert_eq!(Expiration::from_epoch(i64::MIN), None);
    }

    #[test]
    fn test_never_is_not_expired_at_any_time() {
        let r = robot(Expiration::Never, false);
        for now in [
            DateTime::<Utc>::MIN_UTC,
            Utc::now(),
            Utc::now() + Duration::days(365 * 100),
            DateTime::<Utc>::MAX_UTC,
        ] {
            assert!(!r.is_expired(now));
        }
    }

    #[test]
    fn test_expired_iff_now_past_expiration() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let r = robot(Expiration::At(at.timestamp()), false);

        assert!(!r.is_expired(at - Duration::seconds(1)));
        assert!(!r.is_expired(at));
        assert!(!r.is_expired(at + Duration::milliseconds(999)));
        assert!(r.is_expired(at + Duration::seconds(1)));
    }

    #[test]
    fn test_disable_is_idempotent() {
        let t1 = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let t2 = t1 + Duration::minutes(5);
        let once = robot(Expiration::Never, false).disable(t1);
        let twice = once.clone().disable(t2);

        assert!(once.disabled);
        assert_eq!(
            Robot {
                updated_at: once.updated_at,
                ..twice.clone()
            },
            once
        );
        assert_eq!(twice.updated_at, t2);
    }

    #[test]
    fn test_enable_fails_when_expired() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let r = robot(Expiration::At(now.timestamp() - 10), true);

        let err = r.enable(now).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Expired {
                expires_at: now.timestamp() - 10
            }
        );
    }

    #[test]
    fn test_enable_clears_disabled() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let r = robot(Expiration::At(now.timestamp() + 3600), true)
            .enable(now)
            .unwrap();
        assert!(!r.disabled);
        assert_eq!(r.updated_at, now);
        assert!(r.is_usable(now));
    }

    #[test]
    fn test_status_expired_dominates_disabled() {
        let now = Utc::now();
        assert_eq!(robot(Expiration::Never, false).status(now), RobotStatus::Active);
        assert_eq!(robot(Expiration::Never, true).status(now), RobotStatus::Disabled);
        assert_eq!(
            robot(Expiration::At(0), true).status(now),
            RobotStatus::Expired
        );
        assert!(!robot(Expiration::At(0), false).is_usable(now));
    }

    #[test]
    fn test_expiration_serializes_as_epoch() {
        assert_eq!(serde_json::to_string(&Expiration::Never).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Expiration::At(42)).unwrap(), "42");
        assert!(serde_json::from_str::<Expiration>("-5").is_err());
    }

    #[test]
    fn test_visible_flag_not_serialized() {
        let json = serde_json::to_value(robot(Expiration::Never, false)).unwrap();
        assert!(json.get("visible").is_none());
        assert_eq!(json["expires_at"], -1);
    }
}
