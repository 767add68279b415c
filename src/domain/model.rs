use crate::utils::error::{EtlError, FailureKind};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Calendar month, keyed by the month names used on the source pages.
///
/// Variant order is chronological, so ordered maps keyed by `Month` iterate
/// January to December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    #[serde(rename = "січень")]
    January,
    #[serde(rename = "лютий")]
    February,
    #[serde(rename = "березень")]
    March,
    #[serde(rename = "квітень")]
    April,
    #[serde(rename = "травень")]
    May,
    #[serde(rename = "червень")]
    June,
    #[serde(rename = "липень")]
    July,
    #[serde(rename = "серпень")]
    August,
    #[serde(rename = "вересень")]
    September,
    #[serde(rename = "жовтень")]
    October,
    #[serde(rename = "листопад")]
    November,
    #[serde(rename = "грудень")]
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Zero-based position in the year.
    pub fn index(self) -> usize {
        self as usize
    }

    /// 1..=12, as used in calendar dates.
    pub fn number(self) -> u32 {
        self as u32 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "січень",
            Month::February => "лютий",
            Month::March => "березень",
            Month::April => "квітень",
            Month::May => "травень",
            Month::June => "червень",
            Month::July => "липень",
            Month::August => "серпень",
            Month::September => "вересень",
            Month::October => "жовтень",
            Month::November => "листопад",
            Month::December => "грудень",
        }
    }

    /// The three months of an extraction quarter (0..=3).
    pub fn quarter_months(quarter: usize) -> [Month; 3] {
        let q = quarter.min(3) * 3;
        [Self::ALL[q], Self::ALL[q + 1], Self::ALL[q + 2]]
    }

    /// True for the last month of a quarter block (March, June, September, December).
    pub fn closes_quarter(self) -> bool {
        self.index() % 3 == 2
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Salaries of one region in one year.
///
/// Values only enter through [`MonthMap::assign_next`], so the number of
/// entries is also the month-assignment state: the next value always goes to
/// `Month::ALL[len]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MonthMap {
    values: BTreeMap<Month, f64>,
}

impl MonthMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= Month::ALL.len()
    }

    /// Quarter block the next value belongs to (0..=3).
    pub fn quarter(&self) -> usize {
        (self.len() / 3).min(3)
    }

    /// Position of the next value inside its quarter (0..=2).
    pub fn slot(&self) -> usize {
        self.len() % 3
    }

    /// Month that the next value would be assigned to.
    pub fn next_month(&self) -> Option<Month> {
        if self.is_full() {
            return None;
        }
        Some(Month::quarter_months(self.quarter())[self.slot()])
    }

    /// Stores `value` under the next unfilled month and returns that month, or
    /// `None` once all twelve months are filled.
    pub fn assign_next(&mut self, value: f64) -> Option<Month> {
        let month = self.next_month()?;
        self.values.insert(month, value);
        Some(month)
    }

    pub fn get(&self, month: Month) -> Option<f64> {
        self.values.get(&month).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Month, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }
}

/// Region name to [`MonthMap`] for one year, in the order regions first
/// appeared on the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryYearRecord {
    regions: Vec<(String, MonthMap)>,
}

impl SalaryYearRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the month map for `name`, creating it only if the region has not
    /// been seen in this record yet.
    pub fn region_mut(&mut self, name: &str) -> &mut MonthMap {
        let idx = match self.regions.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.regions.push((name.to_string(), MonthMap::new()));
                self.regions.len() - 1
            }
        };
        &mut self.regions[idx].1
    }

    pub fn region(&self, name: &str) -> Option<&MonthMap> {
        self.regions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, months)| months)
    }

    pub fn contains_region(&self, name: &str) -> bool {
        self.region(name).is_some()
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MonthMap)> {
        self.regions.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Serialize for SalaryYearRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.regions.len()))?;
        for (name, months) in &self.regions {
            map.serialize_entry(name, months)?;
        }
        map.end()
    }
}

/// Buy/sell exchange rate for one sampled day. A side is `None` when it could
/// not be extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatePair {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell: Option<f64>,
}

impl RatePair {
    pub fn new(buy: f64, sell: f64) -> Self {
        Self {
            buy: Some(buy),
            sell: Some(sell),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.buy.is_some() && self.sell.is_some()
    }
}

pub type CurrencyYearRecord = BTreeMap<Month, RatePair>;

/// Year to year-record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IndicatorSeries<R> {
    years: BTreeMap<i32, R>,
}

impl<R> Default for IndicatorSeries<R> {
    fn default() -> Self {
        Self {
            years: BTreeMap::new(),
        }
    }
}

impl<R> IndicatorSeries<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole bucket for `year`. Nothing from a previous fetch of
    /// the same year survives.
    pub fn merge_year(&mut self, year: i32, record: R) {
        self.years.insert(year, record);
    }

    pub fn get(&self, year: i32) -> Option<&R> {
        self.years.get(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &R)> {
        self.years.iter().map(|(y, r)| (*y, r))
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

pub type SalarySeries = IndicatorSeries<SalaryYearRecord>;
pub type CurrencySeries = IndicatorSeries<CurrencyYearRecord>;
pub type UnemploymentSeries = IndicatorSeries<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Salary,
    Currency,
    Unemployment,
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Indicator::Salary => "salary",
            Indicator::Currency => "currency",
            Indicator::Unemployment => "unemployment",
        };
        f.write_str(name)
    }
}

/// One failed year/month/region and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEntry {
    pub indicator: Indicator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionManifest {
    pub failures: Vec<FailureEntry>,
}

impl ExtractionManifest {
    pub fn record(
        &mut self,
        indicator: Indicator,
        year: Option<i32>,
        month: Option<Month>,
        error: &EtlError,
    ) {
        tracing::warn!(
            "{} {}{}: {}",
            indicator,
            year.map(|y| y.to_string()).unwrap_or_default(),
            month.map(|m| format!(" {}", m)).unwrap_or_default(),
            error
        );
        self.failures.push(FailureEntry {
            indicator,
            year,
            month,
            row: None,
            kind: error.failure_kind(),
            message: error.to_string(),
        });
    }

    pub fn record_row(&mut self, indicator: Indicator, year: i32, row: usize, error: &EtlError) {
        tracing::warn!("{} {} row {}: {}", indicator, year, row, error);
        self.failures.push(FailureEntry {
            indicator,
            year: Some(year),
            month: None,
            row: Some(row),
            kind: error.failure_kind(),
            message: error.to_string(),
        });
    }

    pub fn for_indicator(&self, indicator: Indicator) -> impl Iterator<Item = &FailureEntry> {
        self.failures.iter().filter(move |f| f.indicator == indicator)
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

/// Everything one extraction run produced. Owned by the run, never shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorBundle {
    pub salary: SalarySeries,
    pub currency: CurrencySeries,
    pub unemployment: UnemploymentSeries,
    pub manifest: ExtractionManifest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryTuple {
    pub year: i32,
    pub region: String,
    pub month: Month,
    pub average_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyTuple {
    pub year: i32,
    pub month: Month,
    pub buy_rate: f64,
    pub sell_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnemploymentTuple {
    pub year: i32,
    pub rate: f64,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub salary_rows: Vec<SalaryTuple>,
    pub currency_rows: Vec<CurrencyTuple>,
    pub unemployment_rows: Vec<UnemploymentTuple>,
    pub salary_csv: String,
    pub currency_csv: String,
    pub unemployment_csv: String,
    pub series_json: String,
    pub manifest_json: String,
}
