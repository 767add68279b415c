use crate::config::toml_config::{CurrencyConfig, SalaryConfig, UnemploymentConfig};
use crate::core::{ConfigProvider, DocumentFetcher};
use crate::domain::model::{
    CurrencyYearRecord, Indicator, IndicatorBundle, Month, RatePair, SalaryYearRecord,
};
use crate::extract::currency::extract_rate_document;
use crate::extract::salary::extract_salary_document;
use crate::extract::unemployment::{extract_series_document, series_from_values};
use crate::utils::error::{EtlError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use std::fmt::Write;

pub fn year_url(template: &str, year: i32) -> String {
    template.replace("{year}", &year.to_string())
}

pub fn sample_url(template: &str, date: NaiveDate, date_format: &str) -> Result<String> {
    if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
        return Err(EtlError::InvalidConfigValueError {
            field: "currency.date_format".to_string(),
            value: date_format.to_string(),
            reason: "not a valid strftime format".to_string(),
        });
    }
    let mut formatted = String::new();
    write!(formatted, "{}", date.format(date_format)).map_err(|e| {
        EtlError::ConfigValidationError {
            field: "currency.date_format".to_string(),
            message: e.to_string(),
        }
    })?;

    Ok(template
        .replace("{year}", &date.format("%Y").to_string())
        .replace("{month}", &date.format("%m").to_string())
        .replace("{day}", &date.format("%d").to_string())
        .replace("{date}", &formatted))
}

/// Every URL a run with `config` would request, in fetch order.
pub fn planned_urls<C: ConfigProvider>(config: &C) -> Result<Vec<(Indicator, String)>> {
    let mut urls = Vec::new();

    if let Some(salary) = config.salary() {
        for year in salary.start_year..=salary.end_year {
            urls.push((Indicator::Salary, year_url(&salary.url_template, year)));
        }
    }

    if let Some(currency) = config.currency() {
        for year in currency.start_year..=currency.end_year {
            for month in Month::ALL {
                let day = NaiveDate::from_ymd_opt(year, month.number(), currency.sample_day);
                if let Some(date) = day {
                    urls.push((
                        Indicator::Currency,
                        sample_url(&currency.url_template, date, &currency.date_format)?,
                    ));
                }
            }
        }
    }

    if let Some(unemployment) = config.unemployment() {
        urls.push((Indicator::Unemployment, unemployment.url.clone()));
    }

    Ok(urls)
}

/// Drives the per-year extraction loops. Fetches strictly one after another;
/// a failed year or month is written to the manifest and the loop moves on.
pub struct YearAggregator<'a, F: DocumentFetcher> {
    fetcher: &'a F,
}

impl<'a, F: DocumentFetcher> YearAggregator<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self { fetcher }
    }

    pub async fn collect_all<C: ConfigProvider>(&self, config: &C) -> IndicatorBundle {
        let mut bundle = IndicatorBundle::default();

        if let Some(salary) = config.salary() {
            self.collect_salaries(salary, &mut bundle).await;
        }
        if let Some(currency) = config.currency() {
            self.collect_currency(currency, &mut bundle).await;
        }
        if let Some(unemployment) = config.unemployment() {
            self.collect_unemployment(unemployment, &mut bundle).await;
        }

        bundle
    }

    pub async fn collect_salaries(&self, config: &SalaryConfig, bundle: &mut IndicatorBundle) {
        for year in config.start_year..=config.end_year {
            let url = year_url(&config.url_template, year);
            let record = match self.fetcher.fetch(&url).await {
                Ok(body) => match extract_salary_document(&body, config) {
                    Ok(extraction) => {
                        for (row, e) in &extraction.row_failures {
                            bundle.manifest.record_row(Indicator::Salary, year, *row, e);
                        }
                        extraction.record
                    }
                    Err(e) => {
                        bundle.manifest.record(Indicator::Salary, Some(year), None, &e);
                        SalaryYearRecord::new()
                    }
                },
                Err(e) => {
                    bundle.manifest.record(Indicator::Salary, Some(year), None, &e);
                    SalaryYearRecord::new()
                }
            };

            tracing::info!("salary {}: {} regions", year, record.len());
            bundle.salary.merge_year(year, record);
        }
    }

    pub async fn collect_currency(&self, config: &CurrencyConfig, bundle: &mut IndicatorBundle) {
        for year in config.start_year..=config.end_year {
            let mut record = CurrencyYearRecord::new();

            for month in Month::ALL {
                let pair = match self.sample_rate(config, year, month).await {
                    Ok(pair) => pair,
                    Err(e) => {
                        bundle
                            .manifest
                            .record(Indicator::Currency, Some(year), Some(month), &e);
                        RatePair::missing()
                    }
                };
                record.insert(month, pair);
            }

            let complete = record.values().filter(|p| p.is_complete()).count();
            tracing::info!("currency {}: {}/12 months", year, complete);
            bundle.currency.merge_year(year, record);
        }
    }

    async fn sample_rate(
        &self,
        config: &CurrencyConfig,
        year: i32,
        month: Month,
    ) -> Result<RatePair> {
        let date = NaiveDate::from_ymd_opt(year, month.number(), config.sample_day)
            .ok_or_else(|| EtlError::InvalidConfigValueError {
                field: "currency.sample_day".to_string(),
                value: config.sample_day.to_string(),
                reason: format!("no such day in {} {}", month, year),
            })?;
        let url = sample_url(&config.url_template, date, &config.date_format)?;
        let body = self.fetcher.fetch(&url).await?;
        extract_rate_document(&body, config)
    }

    pub async fn collect_unemployment(
        &self,
        config: &UnemploymentConfig,
        bundle: &mut IndicatorBundle,
    ) {
        let values = match self.fetcher.fetch(&config.url).await {
            Ok(body) => extract_series_document(&body, config),
            Err(e) => Err(e),
        };

        match values {
            Ok(values) => {
                tracing::info!(
                    "unemployment: {} years from {}",
                    values.len(),
                    config.base_year
                );
                bundle.unemployment = series_from_values(config.base_year, &values);
            }
            Err(e) => bundle
                .manifest
                .record(Indicator::Unemployment, None, None, &e),
        }
    }
}
