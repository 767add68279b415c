use crate::core::aggregator::sample_url;
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, validate_url_template,
    validate_year_range, Validate,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full run configuration. Every section has defaults matching the published
/// sources, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub salary: SalaryConfig,
    pub currency: CurrencyConfig,
    pub unemployment: UnemploymentConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "indicator-etl".to_string(),
            description: "Average salary, exchange rate and unemployment series".to_string(),
            version: "1.0".to_string(),
        }
    }
}

/// HTTP fetch settings shared by all indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 1,
            retry_delay_seconds: 2,
            user_agent: concat!("indicator-etl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryConfig {
    pub enabled: bool,
    /// `{year}` is replaced by the four-digit year.
    pub url_template: String,
    pub table_selector: String,
    pub label_class: String,
    pub start_year: i32,
    pub end_year: i32,
}

impl Default for SalaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_template: "https://index.minfin.com.ua/ua/labour/salary/average/{year}".to_string(),
            table_selector: ".glue-table".to_string(),
            label_class: "first-column".to_string(),
            start_year: 2010,
            end_year: 2022,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    pub enabled: bool,
    /// Placeholders: `{year}`, `{month}`, `{day}` (zero padded) and `{date}`
    /// rendered with `date_format`.
    pub url_template: String,
    pub date_format: String,
    pub table_selector: String,
    pub caption_marker: String,
    pub currency_marker: String,
    /// Zero-based cell positions inside the currency row.
    pub buy_column: usize,
    pub sell_column: usize,
    pub start_year: i32,
    pub end_year: i32,
    /// Day of month sampled for every calendar month.
    pub sample_day: u32,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_template: "https://index.minfin.com.ua/ua/exchange/archive/{date}/".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            table_selector: "#idx-wrapper table".to_string(),
            caption_marker: "Середній курс".to_string(),
            currency_marker: "Долар США".to_string(),
            buy_column: 2,
            sell_column: 5,
            start_year: 2010,
            end_year: 2021,
            sample_day: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnemploymentConfig {
    pub enabled: bool,
    pub url: String,
    pub table_selector: String,
    /// Zero-based index among the tables matched by `table_selector`.
    pub table_index: usize,
    pub value_selector: String,
    pub base_year: i32,
}

impl Default for UnemploymentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://index.minfin.com.ua/ua/labour/unemploy/".to_string(),
            table_selector: "#idx-wrapper table".to_string(),
            table_index: 1,
            value_selector: "big".to_string(),
            base_year: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

/// What to persist for a month whose exchange rate could not be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingRatePolicy {
    /// Write 0.0 for the missing side. Lossy, but keeps one row per month.
    #[default]
    Zero,
    /// Leave the month out of the flat table.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<OutputFormat>,
    pub missing_rate_policy: MissingRatePolicy,
    pub compression: CompressionConfig,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            output_formats: vec![OutputFormat::Csv, OutputFormat::Json],
            missing_rate_policy: MissingRatePolicy::Zero,
            compression: CompressionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filename: "indicators.zip".to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MINFIN_HOST})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_range("source.timeout_seconds", self.source.timeout_seconds, 1, 600)?;
        validate_range("source.retry_attempts", self.source.retry_attempts, 1, 10)?;

        if self.salary.enabled {
            let s = &self.salary;
            validate_url_template("salary.url_template", &s.url_template, &["{year}"])?;
            validate_non_empty_string("salary.table_selector", &s.table_selector)?;
            validate_non_empty_string("salary.label_class", &s.label_class)?;
            validate_year_range("salary", s.start_year, s.end_year)?;
        }

        if self.currency.enabled {
            let c = &self.currency;
            validate_url_template("currency.url_template", &c.url_template, &[])?;
            if !["{date}", "{year}"].iter().any(|p| c.url_template.contains(p)) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "currency.url_template".to_string(),
                    value: c.url_template.clone(),
                    reason: "Template must contain {date} or {year}".to_string(),
                });
            }
            validate_non_empty_string("currency.table_selector", &c.table_selector)?;
            validate_non_empty_string("currency.caption_marker", &c.caption_marker)?;
            validate_non_empty_string("currency.currency_marker", &c.currency_marker)?;
            validate_year_range("currency", c.start_year, c.end_year)?;
            // every month has a 28th
            validate_range("currency.sample_day", c.sample_day, 1, 28)?;
            if c.buy_column == c.sell_column {
                return Err(EtlError::InvalidConfigValueError {
                    field: "currency.sell_column".to_string(),
                    value: c.sell_column.to_string(),
                    reason: "buy and sell columns must differ".to_string(),
                });
            }
            if let Some(date) = NaiveDate::from_ymd_opt(c.start_year, 1, c.sample_day) {
                sample_url(&c.url_template, date, &c.date_format)?;
            }
        }

        if self.unemployment.enabled {
            let u = &self.unemployment;
            validate_url("unemployment.url", &u.url)?;
            validate_non_empty_string("unemployment.table_selector", &u.table_selector)?;
            validate_non_empty_string("unemployment.value_selector", &u.value_selector)?;
            validate_range("unemployment.base_year", u.base_year, 1900, 2100)?;
        }

        validate_path("load.output_path", &self.load.output_path)?;
        if self.load.output_formats.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "load.output_formats".to_string(),
            });
        }
        if self.load.compression.enabled {
            validate_non_empty_string(
                "load.compression.filename",
                &self.load.compression.filename,
            )?;
        }

        Ok(())
    }

    /// 取得輸出路徑
    pub fn output_path(&self) -> &str {
        &self.load.output_path
    }

    /// Restricts salary and currency extraction to a single year.
    pub fn restrict_to_year(&mut self, year: i32) {
        self.salary.start_year = year;
        self.salary.end_year = year;
        self.currency.start_year = year;
        self.currency.end_year = year;
    }
}

impl ConfigProvider for TomlConfig {
    fn source(&self) -> &SourceConfig {
        &self.source
    }

    fn salary(&self) -> Option<&SalaryConfig> {
        self.salary.enabled.then_some(&self.salary)
    }

    fn currency(&self) -> Option<&CurrencyConfig> {
        self.currency.enabled.then_some(&self.currency)
    }

    fn unemployment(&self) -> Option<&UnemploymentConfig> {
        self.unemployment.enabled.then_some(&self.unemployment)
    }

    fn load(&self) -> &LoadConfig {
        &self.load
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_source_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(config.salary.start_year, 2010);
        assert_eq!(config.salary.end_year, 2022);
        assert_eq!(config.salary.table_selector, ".glue-table");
        assert_eq!(config.currency.end_year, 2021);
        assert_eq!(config.currency.buy_column, 2);
        assert_eq!(config.currency.sell_column, 5);
        assert_eq!(config.unemployment.base_year, 2000);
        assert_eq!(config.load.missing_rate_policy, MissingRatePolicy::Zero);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[pipeline]
name = "salary-only"

[salary]
start_year = 2015
end_year = 2016

[currency]
enabled = false

[unemployment]
enabled = false

[load]
output_path = "./test-output"
output_formats = ["json"]
missing_rate_policy = "skip"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.pipeline.name, "salary-only");
        assert_eq!(config.salary.start_year, 2015);
        assert_eq!(config.salary.label_class, "first-column");
        assert!(config.currency().is_none());
        assert!(config.unemployment().is_none());
        assert!(config.salary().is_some());
        assert_eq!(config.load.output_formats, vec![OutputFormat::Json]);
        assert_eq!(config.load.missing_rate_policy, MissingRatePolicy::Skip);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("INDICATOR_ETL_TEST_HOST", "https://mirror.example.com");

        let toml_content = r#"
[unemployment]
url = "${INDICATOR_ETL_TEST_HOST}/unemploy/"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.unemployment.url, "https://mirror.example.com/unemploy/");

        std::env::remove_var("INDICATOR_ETL_TEST_HOST");
    }

    #[test]
    fn test_config_validation() {
        let invalid = [
            "[salary]\nurl_template = \"https://example.com/salary/\"",
            "[salary]\nstart_year = 2023\nend_year = 2010",
            "[currency]\nsample_day = 31",
            "[currency]\nsell_column = 2",
            "[currency]\ndate_format = \"%Y-%m-%\"",
            "[unemployment]\nurl = \"invalid-url\"",
            "[load]\noutput_formats = []",
        ];
        for content in invalid {
            let config = TomlConfig::from_toml_str(content).unwrap();
            assert!(config.validate().is_err(), "expected invalid: {}", content);
        }
    }

    #[test]
    fn test_restrict_to_year() {
        let mut config = TomlConfig::default();
        config.restrict_to_year(2018);
        assert_eq!((config.salary.start_year, config.salary.end_year), (2018, 2018));
        assert_eq!((config.currency.start_year, config.currency.end_year), (2018, 2018));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[pipeline]
name = "file-test"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "file-test");
    }
}
