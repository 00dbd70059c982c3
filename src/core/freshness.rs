//! Fixed-threshold staleness rules for cached records.

use chrono::NaiveDate;

/// How long a cached record may be served before it is fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Once present, never refetched.
    Permanent,
    /// Refetched once `today - last_update` reaches the given number of days.
    MaxAgeDays(i64),
}

pub const ETF_FRESHNESS: Freshness = Freshness::MaxAgeDays(30);
pub const EPS_FRESHNESS: Freshness = Freshness::MaxAgeDays(10);
pub const NEWS_FRESHNESS: Freshness = Freshness::MaxAgeDays(1);

impl Freshness {
    pub fn is_stale(&self, last_update: Option<NaiveDate>, today: NaiveDate) -> bool {
        match self {
            Freshness::Permanent => false,
            Freshness::MaxAgeDays(days) => match last_update {
                Some(updated) => (today - updated).num_days() >= *days,
                None => true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_permanent_never_stale() {
        let today = date(2021, 6, 1);
        assert!(!Freshness::Permanent.is_stale(Some(date(2000, 1, 1)), today));
        assert!(!Freshness::Permanent.is_stale(None, today));
    }

    #[test]
    fn test_eps_boundary_is_inclusive() {
        let today = date(2021, 6, 1);
        assert!(EPS_FRESHNESS.is_stale(Some(today - Duration::days(10)), today));
        assert!(!EPS_FRESHNESS.is_stale(Some(today - Duration::days(9)), today));
    }

    #[test]
    fn test_etf_and_news_thresholds() {
        let today = date(2021, 6, 1);
        assert!(!ETF_FRESHNESS.is_stale(Some(today - Duration::days(29)), today));
        assert!(ETF_FRESHNESS.is_stale(Some(today - Duration::days(30)), today));
        assert!(!NEWS_FRESHNESS.is_stale(Some(today), today));
        assert!(NEWS_FRESHNESS.is_stale(Some(today - Duration::days(1)), today));
    }

    #[test]
    fn test_missing_update_date_is_stale() {
        assert!(EPS_FRESHNESS.is_stale(None, date(2021, 6, 1)));
    }
}
