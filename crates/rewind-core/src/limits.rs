//! Retention policy normalization
//!
//! A record declares how many snapshots it keeps and/or how old they may be.
//! The declaration comes in several shapes; `resolve` folds every shape into
//! one canonical `RetentionLimits` pair.

use chrono::{DateTime, Utc};

/// Number of snapshots kept when a record does not override its policy
pub const DEFAULT_RETENTION_COUNT: u32 = 10;

/// Retention declared by a record
///
/// The pair variants accept either order; the integer is always the count.
/// A zero count counts as "no count bound", so `Count(0)` is unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep everything, never prune
    Unlimited,
    /// Keep the N most recent snapshots
    Count(u32),
    /// Keep snapshots created at or after the timestamp
    Age(DateTime<Utc>),
    CountAndAge(u32, DateTime<Utc>),
    AgeAndCount(DateTime<Utc>, u32),
}

impl RetentionPolicy {
    /// Canonical limits for this policy
    pub fn resolve(&self) -> RetentionLimits {
        resolve(self)
    }

    /// True when no bound applies and pruning must not run
    pub fn is_unlimited(&self) -> bool {
        self.resolve().is_unlimited()
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::Count(DEFAULT_RETENTION_COUNT)
    }
}

impl From<u32> for RetentionPolicy {
    fn from(count: u32) -> Self {
        RetentionPolicy::Count(count)
    }
}

impl From<DateTime<Utc>> for RetentionPolicy {
    fn from(since: DateTime<Utc>) -> Self {
        RetentionPolicy::Age(since)
    }
}

impl From<(u32, DateTime<Utc>)> for RetentionPolicy {
    fn from((count, since): (u32, DateTime<Utc>)) -> Self {
        RetentionPolicy::CountAndAge(count, since)
    }
}

impl From<(DateTime<Utc>, u32)> for RetentionPolicy {
    fn from((since, count): (DateTime<Utc>, u32)) -> Self {
        RetentionPolicy::AgeAndCount(since, count)
    }
}

impl<T: Into<RetentionPolicy>> From<Option<T>> for RetentionPolicy {
    fn from(value: Option<T>) -> Self {
        value.map_or(RetentionPolicy::Unlimited, Into::into)
    }
}

/// Canonical `(max_count, min_created_at)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionLimits {
    pub max_count: Option<u32>,
    pub min_created_at: Option<DateTime<Utc>>,
}

impl RetentionLimits {
    pub const UNLIMITED: RetentionLimits = RetentionLimits {
        max_count: None,
        min_created_at: None,
    };

    pub fn is_unlimited(&self) -> bool {
        self.max_count.is_none() && self.min_created_at.is_none()
    }
}

/// Normalize a retention policy into canonical limits
pub fn resolve(policy: &RetentionPolicy) -> RetentionLimits {
    let nonzero = |count: u32| (count > 0).then_some(count);

    match *policy {
        RetentionPolicy::Unlimited => RetentionLimits::UNLIMITED,
        RetentionPolicy::Count(count) => RetentionLimits {
            max_count: nonzero(count),
            min_created_at: None,
        },
        RetentionPolicy::Age(since) => RetentionLimits {
            max_count: None,
            min_created_at: Some(since),
        },
        RetentionPolicy::CountAndAge(count, since) | RetentionPolicy::AgeAndCount(since, count) => {
            RetentionLimits {
                max_count: nonzero(count),
                min_created_at: Some(since),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_unlimited_resolves_to_nothing() {
        assert_eq!(resolve(&RetentionPolicy::Unlimited), RetentionLimits::UNLIMITED);
        assert!(RetentionPolicy::Unlimited.is_unlimited());
    }

    #[test]
    fn test_count_only() {
        let limits = resolve(&RetentionPolicy::Count(5));
        assert_eq!(limits.max_count, Some(5));
        assert_eq!(limits.min_created_at, None);
    }

    #[test]
    fn test_age_only() {
        let limits = resolve(&RetentionPolicy::Age(ts()));
        assert_eq!(limits.max_count, None);
        assert_eq!(limits.min_created_at, Some(ts()));
    }

    #[test]
    fn test_pair_order_does_not_matter() {
        let a = resolve(&RetentionPolicy::CountAndAge(3, ts()));
        let b = resolve(&RetentionPolicy::AgeAndCount(ts(), 3));
        assert_eq!(a, b);
        assert_eq!(a.max_count, Some(3));
        assert_eq!(a.min_created_at, Some(ts()));
    }

    #[test]
    fn test_zero_count_is_unbounded() {
        assert!(RetentionPolicy::Count(0).is_unlimited());

        let limits = resolve(&RetentionPolicy::CountAndAge(0, ts()));
        assert_eq!(limits.max_count, None);
        assert_eq!(limits.min_created_at, Some(ts()));
        assert!(!limits.is_unlimited());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(RetentionPolicy::from(4u32), RetentionPolicy::Count(4));
        assert_eq!(RetentionPolicy::from(ts()), RetentionPolicy::Age(ts()));
        assert_eq!(
            RetentionPolicy::from((ts(), 2u32)),
            RetentionPolicy::AgeAndCount(ts(), 2)
        );
        assert_eq!(
            RetentionPolicy::from(None::<u32>),
            RetentionPolicy::Unlimited
        );
        assert_eq!(RetentionPolicy::from(Some(8u32)), RetentionPolicy::Count(8));
    }

    #[test]
    fn test_default_keeps_ten() {
        assert_eq!(RetentionPolicy::default(), RetentionPolicy::Count(10));
    }
}
