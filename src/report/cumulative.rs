use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use super::ledger::{ConvertedLot, round2, tax_year};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    /// Gain or loss realized from January 1st up to and including `date`.
    pub cumulative: f64,
}

/// Running gain and loss for every calendar day of the ledger's tax year.
/// Days without a disposal carry the previous total. Disposals outside the
/// tax year are left out.
pub fn cumulative_gain_loss(lots: &[ConvertedLot]) -> Vec<DailyTotal> {
    let Some(year) = tax_year(lots) else {
        return Vec::new();
    };
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Vec::new();
    };

    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for lot in lots.iter().filter(|lot| lot.date_sold.year() == year) {
        *by_day.entry(lot.date_sold).or_default() += lot.gain_loss;
    }

    let mut running = 0.0;
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|date| {
            running += by_day.get(&date).copied().unwrap_or(0.0);
            DailyTotal {
                date,
                cumulative: round2(running),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(date_sold: NaiveDate, gain_loss: f64) -> ConvertedLot {
        ConvertedLot {
            symbol: "AAPL".to_string(),
            quantity: 1.0,
            date_acquired: date_sold,
            cost: 0.0,
            rate_acquired: 1.0,
            converted_cost: 0.0,
            date_sold,
            sales: 0.0,
            rate_sold: 1.0,
            converted_sales: 0.0,
            gain_loss,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_every_day_of_year_is_present() {
        let lots = vec![
            lot(date(2021, 3, 1), -50.0),
            lot(date(2021, 1, 1), 100.0),
            lot(date(2021, 1, 1), 20.5),
        ];
        let series = cumulative_gain_loss(&lots);

        assert_eq!(series.len(), 365);
        assert_eq!(series[0].date, date(2021, 1, 1));
        assert_eq!(series[364].date, date(2021, 12, 31));
        assert!(series.windows(2).all(|w| w[1].date == w[0].date.succ_opt().unwrap()));

        assert_eq!(series[0].cumulative, 120.5);
        // Feb 28 still carries the January total
        assert_eq!(series[58].cumulative, 120.5);
        assert!(series[59..].iter().all(|day| day.cumulative == 70.5));
    }

    #[test]
    fn test_leap_year_and_out_of_year_disposals() {
        let lots = vec![lot(date(2020, 6, 1), 10.0), lot(date(2021, 1, 4), 99.0)];
        let series = cumulative_gain_loss(&lots);
        assert_eq!(series.len(), 366);
        assert_eq!(series.last().unwrap().cumulative, 10.0);
    }

    #[test]
    fn test_empty_ledger() {
        assert!(cumulative_gain_loss(&[]).is_empty());
    }
}
