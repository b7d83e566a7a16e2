//! Turns the provider's 3-hour forecast samples into the hourly strip and
//! the multi-day summary shown on the detail screen.
//!
//! The constants assume OpenWeather's free forecast: 40 samples, 3 hours
//! apart, so 8 samples cover about a day and 5 distinct dates cover the
//! whole window. Another upstream needs these revisited.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::{
    error::WeatherError,
    model::{
        Coordinates, DailyWeather, ForecastResult, ForecastSample, HourlyWeather,
        WeatherDescriptor, round_half_up,
    },
    provider::WeatherFetch,
};

pub const HOURLY_LIMIT: usize = 8;
pub const DAILY_LIMIT: usize = 5;
/// Samples closer than this to "now" are labelled as the current hour.
pub const NOW_WINDOW_SECS: u64 = 3600;
/// The provider's midday sample, preferred as a day's representative.
pub const MIDDAY_MARKER: &str = "12:00:00";

const ENGLISH_WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Display labels for the relative entries and weekdays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayLabels {
    pub now: String,
    pub today: String,
    /// Sunday first.
    pub weekdays: [String; 7],
}

impl Default for DayLabels {
    fn default() -> Self {
        Self {
            now: "Now".to_string(),
            today: "Today".to_string(),
            weekdays: ENGLISH_WEEKDAYS.map(String::from),
        }
    }
}

impl DayLabels {
    pub fn weekday(&self, day: Weekday) -> &str {
        &self.weekdays[day.num_days_from_sunday() as usize]
    }
}

#[derive(Debug, Clone)]
pub struct ForecastAggregator {
    timezone: Tz,
    labels: DayLabels,
}

impl ForecastAggregator {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            labels: DayLabels::default(),
        }
    }

    pub fn with_labels(mut self, labels: DayLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Fetch the forecast at `(lat, lon)` and aggregate it. Errors propagate.
    pub async fn fetch<F: WeatherFetch + ?Sized>(
        &self,
        fetcher: &F,
        lat: f64,
        lon: f64,
        now: DateTime<Utc>,
    ) -> Result<ForecastResult, WeatherError> {
        let samples = fetcher.fetch_forecast(Coordinates::new(lat, lon)?).await?;
        Ok(self.aggregate(&samples, now))
    }

    pub fn aggregate(&self, samples: &[ForecastSample], now: DateTime<Utc>) -> ForecastResult {
        ForecastResult {
            hourly: self.hourly(samples, now),
            daily: self.daily(samples),
        }
    }

    /// First [`HOURLY_LIMIT`] samples, in input order.
    pub fn hourly(&self, samples: &[ForecastSample], now: DateTime<Utc>) -> Vec<HourlyWeather> {
        let now_ts = now.timestamp();
        samples
            .iter()
            .take(HOURLY_LIMIT)
            .map(|sample| {
                let weather = WeatherDescriptor::primary(&sample.weather);
                HourlyWeather {
                    label: self.hour_label(sample.dt, now_ts),
                    temp: round_half_up(sample.temp),
                    icon: weather.icon,
                    description: weather.description,
                }
            })
            .collect()
    }

    /// One entry per calendar date, first [`DAILY_LIMIT`] dates in first-seen order.
    pub fn daily(&self, samples: &[ForecastSample]) -> Vec<DailyWeather> {
        group_by_date(samples)
            .into_iter()
            .take(DAILY_LIMIT)
            .enumerate()
            .map(|(index, (date, day))| {
                let high = day
                    .iter()
                    .map(|s| round_half_up(s.temp_max))
                    .max()
                    .unwrap_or(0);
                let low = day
                    .iter()
                    .map(|s| round_half_up(s.temp_min))
                    .min()
                    .unwrap_or(0);
                let weather = day
                    .iter()
                    .find(|s| s.dt_txt.contains(MIDDAY_MARKER))
                    .or_else(|| day.first())
                    .map(|s| WeatherDescriptor::primary(&s.weather))
                    .unwrap_or_else(|| WeatherDescriptor::primary(&[]));

                let label = if index == 0 {
                    self.labels.today.clone()
                } else {
                    self.day_label(date)
                };

                DailyWeather {
                    label,
                    high,
                    low,
                    icon: weather.icon,
                    description: weather.description,
                }
            })
            .collect()
    }

    fn hour_label(&self, dt: i64, now_ts: i64) -> String {
        if dt.abs_diff(now_ts) < NOW_WINDOW_SECS {
            return self.labels.now.clone();
        }
        match self.timezone.timestamp_opt(dt, 0).single() {
            Some(local) => local.format("%H").to_string(),
            None => dt.to_string(),
        }
    }

    /// Weekday label for a `yyyy-MM-dd` date, or the raw string if it doesn't parse.
    pub fn day_label(&self, date: &str) -> String {
        match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(d) => self.labels.weekday(d.weekday()).to_string(),
            Err(_) => date.to_string(),
        }
    }
}

fn group_by_date(samples: &[ForecastSample]) -> Vec<(&str, Vec<&ForecastSample>)> {
    let mut groups: Vec<(&str, Vec<&ForecastSample>)> = Vec::new();
    for sample in samples {
        let key = sample.date_key();
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, day)) => day.push(sample),
            None => groups.push((key, vec![sample])),
        }
    }
    groups
}
