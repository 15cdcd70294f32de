use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::Granularity;
use crate::LinkyError;

/// Raw series payload, the portal's `graphe` object.
///
/// `offset` (`decalage` on the wire) is the number of lead-in steps the
/// provider padded before the first meaningful sample; it is subtracted from
/// `period.start_date` to find the true first-sample timestamp.
#[derive(Deserialize, Debug)]
pub struct RawPayload {
    #[serde(rename = "periode")]
    pub period: Period,

    #[serde(rename = "decalage", default)]
    pub offset: u32,

    #[serde(rename = "data", default)]
    pub values: Vec<RawValue>,
}

#[derive(Deserialize, Debug)]
pub struct Period {
    /// Start of the period, formatted "dd/mm/yyyy".
    #[serde(rename = "dateDebut")]
    pub start_date: String,
}

#[derive(Deserialize, Debug)]
pub struct RawValue {
    #[serde(rename = "valeur", default)]
    pub value: Option<f64>,
}

/// One normalized data point of a consumption series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Display timestamp, formatted per granularity ("%H:%M", "%d %b",
    /// "%b" or "%Y").
    pub time: String,
    /// Consumed energy, never negative.
    pub conso: f64,
}

const START_DATE_FMT: &str = "%d/%m/%Y";

/// Normalizes a raw payload into an ordered sample sequence.
///
/// An absent payload (the portal has no data yet for the window) yields an
/// empty sequence, not an error. Missing or non-positive readings clamp to
/// zero; the provider reports negatives for samples it could not measure and
/// the portal charts them as zero, so legitimate zero readings and negatives
/// come out identical. Input order is preserved, duplicate timestamps on
/// window boundaries pass through unchanged.
///
/// Pure: no I/O, no shared state, identical inputs give identical output.
pub fn normalize(
    raw: Option<&RawPayload>,
    granularity: Granularity,
) -> Result<Vec<Sample>, LinkyError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    if raw.values.is_empty() {
        return Ok(Vec::new());
    }

    let start = NaiveDate::parse_from_str(&raw.period.start_date, START_DATE_FMT)
        .map_err(|e| {
            LinkyError::parse(format!(
                "bad start date {:?}: {}",
                raw.period.start_date, e
            ))
        })?;

    let mut samples = Vec::with_capacity(raw.values.len());
    for (i, v) in raw.values.iter().enumerate() {
        let time = granularity.sample_time(start, raw.offset, i as u32)?;
        let conso = v.value.filter(|&x| x > 0.0).unwrap_or(0.0);
        samples.push(Sample { time, conso });
    }

    Ok(samples)
}

/// Converts a normalized series to a two-column DataFrame (time, conso).
pub fn as_polars_df(samples: &[Sample]) -> Result<DataFrame, PolarsError> {
    let times: Vec<&str> = samples.iter().map(|s| s.time.as_str()).collect();
    let consos: Vec<f64> = samples.iter().map(|s| s.conso).collect();

    let times_series = Series::new("time".into(), times);
    let consos_series = Series::new("conso".into(), consos);

    DataFrame::new(vec![times_series, consos_series])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(start_date: &str, offset: u32, values: &[Option<f64>]) -> RawPayload {
        let data: Vec<serde_json::Value> = values
            .iter()
            .map(|v| match v {
                Some(x) => json!({ "valeur": x }),
                None => json!({}),
            })
            .collect();

        serde_json::from_value(json!({
            "periode": { "dateDebut": start_date },
            "decalage": offset,
            "data": data,
        }))
        .unwrap()
    }

    fn times(samples: &[Sample]) -> Vec<&str> {
        samples.iter().map(|s| s.time.as_str()).collect()
    }

    #[test]
    fn absent_payload_is_empty_for_all_granularities() {
        for g in [
            Granularity::Hour,
            Granularity::Day,
            Granularity::Month,
            Granularity::Year,
        ] {
            assert!(normalize(None, g).unwrap().is_empty());
        }
    }

    #[test]
    fn empty_data_array_is_empty() {
        let raw = payload("01/01/2020", 0, &[]);
        assert!(normalize(Some(&raw), Granularity::Day).unwrap().is_empty());
    }

    #[test]
    fn malformed_start_date_is_a_parse_error() {
        let raw = payload("2020-01-01", 0, &[Some(1.0)]);
        let err = normalize(Some(&raw), Granularity::Day).unwrap_err();
        assert!(matches!(err, LinkyError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn negative_and_missing_values_clamp_to_zero() {
        let raw = payload(
            "01/01/2020",
            0,
            &[Some(-3.2), Some(0.0), Some(2.5), None],
        );
        let samples = normalize(Some(&raw), Granularity::Day).unwrap();
        let consos: Vec<f64> = samples.iter().map(|s| s.conso).collect();
        assert_eq!(consos, vec![0.0, 0.0, 2.5, 0.0]);
    }

    #[test]
    fn output_length_equals_input_length() {
        let raw = payload("15/06/2019", 3, &[Some(1.0); 17]);
        let samples = normalize(Some(&raw), Granularity::Day).unwrap();
        assert_eq!(samples.len(), 17);
    }

    #[test]
    fn hourly_offset_counts_half_hours() {
        // offset of 2 shifts back one full hour from midnight of 01/01
        let raw = payload("01/01/2020", 2, &[Some(1.0); 4]);
        let samples = normalize(Some(&raw), Granularity::Hour).unwrap();
        assert_eq!(times(&samples), vec!["23:00", "23:30", "00:00", "00:30"]);
    }

    #[test]
    fn daily_offset_crosses_leap_february() {
        let raw = payload("01/03/2020", 4, &[Some(1.5), Some(-2.0), Some(3.0)]);
        let samples = normalize(Some(&raw), Granularity::Day).unwrap();
        assert_eq!(
            samples,
            vec![
                Sample { time: "26 Feb".into(), conso: 1.5 },
                Sample { time: "27 Feb".into(), conso: 0.0 },
                Sample { time: "28 Feb".into(), conso: 3.0 },
            ]
        );
    }

    #[test]
    fn monthly_offset_uses_calendar_rollover() {
        // 31/01 minus one month is 31/12 of the prior year, not "31 days ago"
        let raw = payload("31/01/2020", 1, &[Some(1.0), Some(1.0), Some(1.0)]);
        let samples = normalize(Some(&raw), Granularity::Month).unwrap();
        assert_eq!(times(&samples), vec!["Dec", "Jan", "Feb"]);
    }

    #[test]
    fn monthly_step_clamps_to_month_end() {
        // 31/03 minus one month lands on the (leap) February month-end
        let raw = payload("31/03/2020", 1, &[Some(1.0), Some(1.0)]);
        let samples = normalize(Some(&raw), Granularity::Month).unwrap();
        assert_eq!(times(&samples), vec!["Feb", "Mar"]);
    }

    #[test]
    fn yearly_series_formats_years() {
        let raw = payload("01/01/2020", 2, &[Some(1.0), Some(2.0), Some(3.0)]);
        let samples = normalize(Some(&raw), Granularity::Year).unwrap();
        assert_eq!(times(&samples), vec!["2018", "2019", "2020"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = payload("05/03/2020", 1, &[Some(0.4), Some(-1.0), Some(2.0)]);
        let first = normalize(Some(&raw), Granularity::Day).unwrap();
        let second = normalize(Some(&raw), Granularity::Day).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn positive_values_pass_through_unchanged() {
        let raw = payload("01/01/2020", 0, &[Some(0.123), Some(45.6)]);
        let samples = normalize(Some(&raw), Granularity::Day).unwrap();
        assert_eq!(samples[0].conso, 0.123);
        assert_eq!(samples[1].conso, 45.6);
    }

    #[test]
    fn series_converts_to_dataframe() {
        let raw = payload("01/03/2020", 0, &[Some(1.5), Some(3.0)]);
        let samples = normalize(Some(&raw), Granularity::Day).unwrap();
        let df = as_polars_df(&samples).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert!(df.column("time").is_ok());
        assert!(df.column("conso").is_ok());
    }
}
