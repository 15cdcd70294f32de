use core::fmt;

use chrono::{Days, Duration, Months, NaiveDate, NaiveTime};

use crate::LinkyError;

pub mod consumption;
pub mod series;

pub trait FormatToApiFmt {
    fn to_api_format(&self) -> String;
}

impl FormatToApiFmt for NaiveDate {
    fn to_api_format(&self) -> String {
        // The portal expects request dates as day/month/year
        self.format("%d/%m/%Y").to_string()
    }
}

/// Requested window, sent as the portlet's dateDebut/dateFin form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Sampling resolution of a consumption series.
///
/// Displays as the provider's resource identifier. Hourly series are a
/// provider quirk: the offset and sample index are counted in half-hour
/// units even though the label says "hour".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hour,
    Day,
    Month,
    Year,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rid = match self {
            Granularity::Hour => "urlCdcHeure",
            Granularity::Day => "urlCdcJour",
            Granularity::Month => "urlCdcMois",
            Granularity::Year => "urlCdcAn",
        };
        write!(f, "{}", rid)
    }
}

impl Granularity {
    /// Timestamp of sample `index`, shifted back by the provider's lead-in
    /// `offset`, formatted for display.
    ///
    /// Offset and index move in the granularity's own step: half hours for
    /// `Hour`, whole days/months/years otherwise. Month and year steps use
    /// calendar arithmetic, so month-end dates clamp instead of assuming a
    /// fixed month length.
    pub(crate) fn sample_time(
        self,
        start: NaiveDate,
        offset: u32,
        index: u32,
    ) -> Result<String, LinkyError> {
        let out_of_range = || LinkyError::parse("sample date out of range");

        match self {
            Granularity::Hour => {
                let base = start.and_time(NaiveTime::MIN);
                let t = base - Duration::minutes(30 * i64::from(offset))
                    + Duration::minutes(30 * i64::from(index));
                Ok(t.format("%H:%M").to_string())
            }
            Granularity::Day => {
                let d = start
                    .checked_sub_days(Days::new(u64::from(offset)))
                    .and_then(|d| d.checked_add_days(Days::new(u64::from(index))))
                    .ok_or_else(out_of_range)?;
                Ok(d.format("%d %b").to_string())
            }
            Granularity::Month => {
                let d = start
                    .checked_sub_months(Months::new(offset))
                    .and_then(|d| d.checked_add_months(Months::new(index)))
                    .ok_or_else(out_of_range)?;
                Ok(d.format("%b").to_string())
            }
            Granularity::Year => {
                let back = offset.checked_mul(12).ok_or_else(out_of_range)?;
                let fwd = index.checked_mul(12).ok_or_else(out_of_range)?;
                let d = start
                    .checked_sub_months(Months::new(back))
                    .and_then(|d| d.checked_add_months(Months::new(fwd)))
                    .ok_or_else(out_of_range)?;
                Ok(d.format("%Y").to_string())
            }
        }
    }
}
