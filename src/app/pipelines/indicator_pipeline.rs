use crate::config::toml_config::{MissingRatePolicy, OutputFormat};
use crate::core::aggregator::YearAggregator;
use crate::core::{
    ConfigProvider, DocumentFetcher, IndicatorBundle, Pipeline, Storage, TransformResult,
};
use crate::domain::model::{
    CurrencySeries, CurrencyTuple, SalarySeries, SalaryTuple, UnemploymentSeries, UnemploymentTuple,
};
use crate::utils::error::{EtlError, Result};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const SALARY_CSV: &str = "salary.csv";
pub const CURRENCY_CSV: &str = "currency.csv";
pub const UNEMPLOYMENT_CSV: &str = "unemployment.csv";
pub const SERIES_JSON: &str = "indicators.json";
pub const MANIFEST_JSON: &str = "manifest.json";

pub struct IndicatorPipeline<S: Storage, C: ConfigProvider, F: DocumentFetcher> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) fetcher: F,
}

impl<S: Storage, C: ConfigProvider, F: DocumentFetcher> IndicatorPipeline<S, C, F> {
    pub fn new(storage: S, config: C, fetcher: F) -> Self {
        Self {
            storage,
            config,
            fetcher,
        }
    }
}

/// The nested series as handed to API consumers.
#[derive(Serialize)]
struct NestedSeries<'a> {
    salary: &'a SalarySeries,
    currency: &'a CurrencySeries,
    unemployment: &'a UnemploymentSeries,
}

pub fn flatten_salary(series: &SalarySeries) -> Vec<SalaryTuple> {
    let mut rows = Vec::new();
    for (year, record) in series.iter() {
        for (region, months) in record.iter() {
            for (month, value) in months.iter() {
                rows.push(SalaryTuple {
                    year,
                    region: region.to_string(),
                    month,
                    average_salary: value,
                });
            }
        }
    }
    rows
}

/// Months with a missing side are zero-filled or dropped according to `policy`.
pub fn flatten_currency(series: &CurrencySeries, policy: MissingRatePolicy) -> Vec<CurrencyTuple> {
    let mut rows = Vec::new();
    let mut defaulted = 0;

    for (year, record) in series.iter() {
        for (month, pair) in record {
            if !pair.is_complete() {
                if policy == MissingRatePolicy::Skip {
                    continue;
                }
                defaulted += 1;
            }
            rows.push(CurrencyTuple {
                year,
                month: *month,
                buy_rate: pair.buy.unwrap_or(0.0),
                sell_rate: pair.sell.unwrap_or(0.0),
            });
        }
    }

    if defaulted > 0 {
        tracing::warn!("{} currency months written with 0.0 for a missing rate", defaulted);
    }
    rows
}

pub fn flatten_unemployment(series: &UnemploymentSeries) -> Vec<UnemploymentTuple> {
    series
        .iter()
        .map(|(year, rate)| UnemploymentTuple { year, rate: *rate })
        .collect()
}

fn to_csv<T: Serialize>(headers: &[&str], rows: &[T]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))?;
    String::from_utf8(data)
        .map_err(|e| EtlError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, F: DocumentFetcher> Pipeline for IndicatorPipeline<S, C, F> {
    async fn extract(&self) -> Result<IndicatorBundle> {
        let aggregator = YearAggregator::new(&self.fetcher);
        Ok(aggregator.collect_all(&self.config).await)
    }

    async fn transform(&self, bundle: IndicatorBundle) -> Result<TransformResult> {
        let salary_rows = flatten_salary(&bundle.salary);
        let currency_rows =
            flatten_currency(&bundle.currency, self.config.load().missing_rate_policy);
        let unemployment_rows = flatten_unemployment(&bundle.unemployment);

        let salary_csv = to_csv(&["year", "region", "month", "average_salary"], &salary_rows)?;
        let currency_csv = to_csv(&["year", "month", "buy_rate", "sell_rate"], &currency_rows)?;
        let unemployment_csv = to_csv(&["year", "rate"], &unemployment_rows)?;

        let series_json = serde_json::to_string_pretty(&NestedSeries {
            salary: &bundle.salary,
            currency: &bundle.currency,
            unemployment: &bundle.unemployment,
        })?;
        let manifest_json = serde_json::to_string_pretty(&bundle.manifest)?;

        Ok(TransformResult {
            salary_rows,
            currency_rows,
            unemployment_rows,
            salary_csv,
            currency_csv,
            unemployment_csv,
            series_json,
            manifest_json,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let load = self.config.load();

        let mut files: Vec<(&str, &str)> = Vec::new();
        if load.output_formats.contains(&OutputFormat::Csv) {
            files.push((SALARY_CSV, result.salary_csv.as_str()));
            files.push((CURRENCY_CSV, result.currency_csv.as_str()));
            files.push((UNEMPLOYMENT_CSV, result.unemployment_csv.as_str()));
        }
        if load.output_formats.contains(&OutputFormat::Json) {
            files.push((SERIES_JSON, result.series_json.as_str()));
        }
        files.push((MANIFEST_JSON, result.manifest_json.as_str()));

        if !load.compression.enabled {
            for (name, content) in &files {
                self.storage.write_file(name, content.as_bytes()).await?;
            }
            tracing::debug!("wrote {} files", files.len());
            return Ok(load.output_path.clone());
        }

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, content) in &files {
                zip.start_file::<_, ()>(*name, FileOptions::default())?;
                zip.write_all(content.as_bytes())?;
            }
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!(
            "writing {} ({} bytes, {} files)",
            load.compression.filename,
            zip_data.len(),
            files.len()
        );
        self.storage
            .write_file(&load.compression.filename, &zip_data)
            .await?;

        Ok(format!("{}/{}", load.output_path, load.compression.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::TomlConfig;
    use crate::domain::model::{
        CurrencyYearRecord, Indicator, Month, RatePair, SalaryYearRecord,
    };
    use std::collections::HashMap;
    use std::io::Read;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct PageFetcher {
        pages: HashMap<String, String>,
    }

    impl DocumentFetcher for PageFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| EtlError::transport(url, "HTTP status 404 Not Found"))
        }
    }

    fn no_pages() -> PageFetcher {
        PageFetcher {
            pages: HashMap::new(),
        }
    }

    fn sample_bundle() -> IndicatorBundle {
        let mut bundle = IndicatorBundle::default();

        let mut salary = SalaryYearRecord::new();
        for v in [4100.0, 4200.0, 4300.0] {
            salary.region_mut("Київ").assign_next(v);
        }
        salary.region_mut("Волинська").assign_next(2100.0);
        bundle.salary.merge_year(2014, salary);

        let mut rates = CurrencyYearRecord::new();
        rates.insert(Month::January, RatePair::new(8.1, 8.3));
        rates.insert(Month::February, RatePair::missing());
        bundle.currency.merge_year(2014, rates);

        bundle.unemployment.merge_year(2000, 11.6);
        bundle.unemployment.merge_year(2001, 10.9);

        bundle.manifest.record(
            Indicator::Currency,
            Some(2014),
            Some(Month::February),
            &EtlError::missing_rate("no row for 'Долар США'"),
        );
        bundle
    }

    fn config_with(policy: MissingRatePolicy, compressed: bool) -> TomlConfig {
        let mut config = TomlConfig::default();
        config.load.output_path = "test_output".to_string();
        config.load.missing_rate_policy = policy;
        config.load.compression.enabled = compressed;
        config
    }

    #[tokio::test]
    async fn test_extract_with_everything_unreachable_returns_manifest() {
        let mut config = config_with(MissingRatePolicy::Zero, true);
        config.restrict_to_year(2015);
        let pipeline = IndicatorPipeline::new(MockStorage::new(), config, no_pages());

        let bundle = pipeline.extract().await.unwrap();

        assert!(bundle.salary.get(2015).unwrap().is_empty());
        assert_eq!(bundle.currency.get(2015).unwrap().len(), 12);
        assert!(bundle.unemployment.is_empty());
        // 1 salary year + 12 currency months + 1 unemployment page
        assert_eq!(bundle.manifest.len(), 14);
    }

    #[tokio::test]
    async fn test_transform_flattens_in_order() {
        let pipeline = IndicatorPipeline::new(
            MockStorage::new(),
            config_with(MissingRatePolicy::Zero, true),
            no_pages(),
        );

        let result = pipeline.transform(sample_bundle()).await.unwrap();

        assert_eq!(result.salary_rows.len(), 4);
        assert_eq!(result.salary_rows[0].region, "Київ");
        assert_eq!(result.salary_rows[2].month, Month::March);
        assert_eq!(result.salary_rows[3].region, "Волинська");

        let csv_lines: Vec<&str> = result.salary_csv.lines().collect();
        assert_eq!(csv_lines[0], "year,region,month,average_salary");
        assert_eq!(csv_lines[1], "2014,Київ,січень,4100.0");

        assert_eq!(result.currency_rows.len(), 2);
        assert_eq!(result.currency_rows[1].buy_rate, 0.0);
        assert_eq!(result.currency_rows[1].sell_rate, 0.0);

        let unemployment: Vec<&str> = result.unemployment_csv.lines().collect();
        assert_eq!(unemployment, vec!["year,rate", "2000,11.6", "2001,10.9"]);

        let json: serde_json::Value = serde_json::from_str(&result.series_json).unwrap();
        assert_eq!(json["salary"]["2014"]["Київ"]["березень"], 4300.0);
        assert_eq!(json["currency"]["2014"]["січень"]["buy"], 8.1);
        assert_eq!(json["unemployment"]["2001"], 10.9);

        let manifest: serde_json::Value = serde_json::from_str(&result.manifest_json).unwrap();
        assert_eq!(manifest["failures"][0]["kind"], "missing_rate");
        assert_eq!(manifest["failures"][0]["month"], "лютий");
    }

    #[tokio::test]
    async fn test_transform_skip_policy_drops_missing_months() {
        let pipeline = IndicatorPipeline::new(
            MockStorage::new(),
            config_with(MissingRatePolicy::Skip, true),
            no_pages(),
        );

        let result = pipeline.transform(sample_bundle()).await.unwrap();
        assert_eq!(result.currency_rows.len(), 1);
        assert_eq!(result.currency_rows[0].month, Month::January);
    }

    #[tokio::test]
    async fn test_transform_empty_bundle_keeps_headers() {
        let pipeline = IndicatorPipeline::new(
            MockStorage::new(),
            config_with(MissingRatePolicy::Zero, true),
            no_pages(),
        );

        let result = pipeline.transform(IndicatorBundle::default()).await.unwrap();
        assert_eq!(result.salary_csv.trim_end(), "year,region,month,average_salary");
        assert_eq!(result.unemployment_csv.trim_end(), "year,rate");
        assert!(result.salary_rows.is_empty());
    }

    #[tokio::test]
    async fn test_load_writes_zip_archive() {
        let storage = MockStorage::new();
        let pipeline = IndicatorPipeline::new(
            storage.clone(),
            config_with(MissingRatePolicy::Zero, true),
            no_pages(),
        );

        let result = pipeline.transform(sample_bundle()).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();
        assert_eq!(output_path, "test_output/indicators.zip");

        let zip_bytes = storage.get_file("indicators.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();

        let mut file_names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        file_names.sort();
        assert_eq!(
            file_names,
            vec![
                "currency.csv",
                "indicators.json",
                "manifest.json",
                "salary.csv",
                "unemployment.csv"
            ]
        );

        let mut content = String::new();
        archive
            .by_name("currency.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.contains("2014,лютий,0.0,0.0"));
    }

    #[tokio::test]
    async fn test_load_uncompressed_json_only() {
        let storage = MockStorage::new();
        let mut config = config_with(MissingRatePolicy::Zero, false);
        config.load.output_formats = vec![OutputFormat::Json];
        let pipeline = IndicatorPipeline::new(storage.clone(), config, no_pages());

        let result = pipeline.transform(sample_bundle()).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(output_path, "test_output");
        assert!(storage.get_file(SERIES_JSON).await.is_some());
        assert!(storage.get_file(MANIFEST_JSON).await.is_some());
        assert!(storage.get_file(SALARY_CSV).await.is_none());
        assert!(storage.get_file("indicators.zip").await.is_none());
    }
}
