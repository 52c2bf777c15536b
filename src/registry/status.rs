use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Certificates within this many days of expiry are flagged as expiring soon.
pub const EXPIRY_WARNING_WINDOW_DAYS: i64 = 30;

/// Temporal state of a certificate, without the day delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Valid,
}

impl ExpiryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "Vencido",
            ExpiryStatus::ExpiringSoon => "Vencendo",
            ExpiryStatus::Valid => "Válido",
        }
    }
}

/// Classification of a certificate's expiry date against a reference date.
///
/// Computed on every read from the stored expiry date and never persisted,
/// so it cannot go stale. Both dates are calendar dates, so the delta is a
/// whole-day difference with no time-of-day component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExpiryAssessment {
    Expired { days_overdue: i64 },
    ExpiringSoon { days_remaining: i64 },
    Valid { days_remaining: i64 },
}

impl ExpiryAssessment {
    /// Classify `expiry` against `reference`.
    ///
    /// Expiring exactly on the reference date or exactly 30 days out both
    /// count as expiring soon; the boundaries are inclusive.
    pub fn classify(expiry: NaiveDate, reference: NaiveDate) -> Self {
        let delta = (expiry - reference).num_days();
        if delta < 0 {
            ExpiryAssessment::Expired {
                days_overdue: -delta,
            }
        } else if delta <= EXPIRY_WARNING_WINDOW_DAYS {
            ExpiryAssessment::ExpiringSoon {
                days_remaining: delta,
            }
        } else {
            ExpiryAssessment::Valid {
                days_remaining: delta,
            }
        }
    }

    pub const fn status(&self) -> ExpiryStatus {
        match self {
            ExpiryAssessment::Expired { .. } => ExpiryStatus::Expired,
            ExpiryAssessment::ExpiringSoon { .. } => ExpiryStatus::ExpiringSoon,
            ExpiryAssessment::Valid { .. } => ExpiryStatus::Valid,
        }
    }

    /// Signed day delta: negative when overdue, non-negative otherwise.
    pub const fn day_delta(&self) -> i64 {
        match *self {
            ExpiryAssessment::Expired { days_overdue } => -days_overdue,
            ExpiryAssessment::ExpiringSoon { days_remaining }
            | ExpiryAssessment::Valid { days_remaining } => days_remaining,
        }
    }

    pub const fn days_overdue(&self) -> Option<i64> {
        match *self {
            ExpiryAssessment::Expired { days_overdue } => Some(days_overdue),
            _ => None,
        }
    }

    pub const fn days_remaining(&self) -> Option<i64> {
        match *self {
            ExpiryAssessment::ExpiringSoon { days_remaining }
            | ExpiryAssessment::Valid { days_remaining } => Some(days_remaining),
            ExpiryAssessment::Expired { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn expiry_before_reference_is_expired() {
        let assessment = ExpiryAssessment::classify(date(2023, 12, 31), date(2024, 1, 1));
        assert_eq!(
            assessment,
            ExpiryAssessment::Expired { days_overdue: 1 }
        );
    }

    #[test]
    fn expiry_on_reference_day_is_expiring_soon_not_expired() {
        let assessment = ExpiryAssessment::classify(date(2024, 1, 1), date(2024, 1, 1));
        assert_eq!(
            assessment,
            ExpiryAssessment::ExpiringSoon { days_remaining: 0 }
        );
    }

    #[test]
    fn thirty_day_boundary_is_inclusive() {
        let assessment = ExpiryAssessment::classify(date(2024, 1, 31), date(2024, 1, 1));
        assert_eq!(
            assessment,
            ExpiryAssessment::ExpiringSoon { days_remaining: 30 }
        );
    }

    #[test]
    fn thirty_one_days_out_is_valid() {
        let assessment = ExpiryAssessment::classify(date(2024, 2, 1), date(2024, 1, 1));
        assert_eq!(
            assessment,
            ExpiryAssessment::Valid { days_remaining: 31 }
        );
    }

    #[test]
    fn classification_ignores_month_and_year_boundaries() {
        let assessment = ExpiryAssessment::classify(date(2025, 1, 10), date(2024, 12, 29));
        assert_eq!(
            assessment,
            ExpiryAssessment::ExpiringSoon { days_remaining: 12 }
        );
    }

    #[test]
    fn day_delta_round_trips_through_status() {
        let expired = ExpiryAssessment::classify(date(2024, 1, 1), date(2024, 2, 10));
        assert_eq!(expired.status(), ExpiryStatus::Expired);
        assert_eq!(expired.day_delta(), -40);
        assert_eq!(expired.days_overdue(), Some(40));
        assert_eq!(expired.days_remaining(), None);
    }
}
