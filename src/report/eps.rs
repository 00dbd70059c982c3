use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Display;

use crate::core::earnings::EpsRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EpsKind {
    Expected,
    Reported,
}

impl Display for EpsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpsKind::Expected => write!(f, "Expected"),
            EpsKind::Reported => write!(f, "Reported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpsPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
    pub kind: EpsKind,
}

/// One point per quarter and kind, ordered by kind then date.
pub fn eps_long(record: &EpsRecord) -> Vec<EpsPoint> {
    let mut points: Vec<EpsPoint> = record
        .quarters
        .iter()
        .flat_map(|quarter| {
            [
                EpsPoint {
                    date: quarter.fiscal_date,
                    value: quarter.reported,
                    kind: EpsKind::Reported,
                },
                EpsPoint {
                    date: quarter.fiscal_date,
                    value: quarter.expected,
                    kind: EpsKind::Expected,
                },
            ]
        })
        .collect();
    points.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.date.cmp(&b.date)));
    points
}
