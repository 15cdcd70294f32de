use chrono::{Days, Local, Months, NaiveDate};
use serde::Serialize;

use crate::LinkyError;
use crate::PortalClient;

use super::series::{normalize, Sample};
use super::{DateRange, Granularity};

/// Fetches normalized consumption series through a [`PortalClient`].
pub struct ConsumptionHistory<'a> {
    client: &'a dyn PortalClient,
}

/// All four series of one account, ordered chronologically ascending.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumptionReport {
    pub hourly: Vec<Sample>,
    pub daily: Vec<Sample>,
    pub monthly: Vec<Sample>,
    pub yearly: Vec<Sample>,
}

impl<'a> ConsumptionHistory<'a> {
    pub fn new(client: &'a dyn PortalClient) -> Self {
        Self { client }
    }

    /// Hourly consumption between the two dates, in half-hour samples.
    pub fn per_hour(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Sample>, LinkyError> {
        self.fetch(Granularity::Hour, Some(DateRange { start, end }))
    }

    /// Daily consumption between the two dates.
    pub fn per_day(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Sample>, LinkyError> {
        self.fetch(Granularity::Day, Some(DateRange { start, end }))
    }

    /// Monthly consumption between the two dates.
    pub fn per_month(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Sample>, LinkyError> {
        self.fetch(Granularity::Month, Some(DateRange { start, end }))
    }

    /// Yearly consumption; the portal returns every available year.
    pub fn per_year(&self) -> Result<Vec<Sample>, LinkyError> {
        self.fetch(Granularity::Year, None)
    }

    /// Fetches the latest data at every granularity.
    ///
    /// Windows are relative to the local calendar date: the last two days
    /// hourly, the last 30 days daily, the last 12 months monthly, and all
    /// available years. The first failing fetch aborts the rest; there is no
    /// partial aggregation.
    pub fn fetch_all(&self) -> Result<ConsumptionReport, LinkyError> {
        let today = Local::now().date_naive();
        let ancient = || LinkyError::parse("system clock out of range");

        let yesterday = today
            .checked_sub_days(Days::new(1))
            .ok_or_else(ancient)?;
        let month_ago = today
            .checked_sub_days(Days::new(30))
            .ok_or_else(ancient)?;
        let year_ago = today
            .checked_sub_months(Months::new(12))
            .ok_or_else(ancient)?;

        Ok(ConsumptionReport {
            hourly: self.per_hour(yesterday, today)?,
            daily: self.per_day(month_ago, yesterday)?,
            monthly: self.per_month(year_ago, yesterday)?,
            yearly: self.per_year()?,
        })
    }

    fn fetch(
        &self,
        granularity: Granularity,
        range: Option<DateRange>,
    ) -> Result<Vec<Sample>, LinkyError> {
        let raw = self.client.fetch_raw(granularity, range.as_ref())?;
        normalize(raw.as_ref(), granularity)
    }
}
