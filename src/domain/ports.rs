use crate::config::toml_config::{
    CurrencyConfig, LoadConfig, SalaryConfig, SourceConfig, UnemploymentConfig,
};
use crate::domain::model::{IndicatorBundle, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Retrieves raw page text. Non-2xx responses are transport failures.
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> &SourceConfig;
    /// `None` when the indicator is disabled for this run.
    fn salary(&self) -> Option<&SalaryConfig>;
    fn currency(&self) -> Option<&CurrencyConfig>;
    fn unemployment(&self) -> Option<&UnemploymentConfig>;
    fn load(&self) -> &LoadConfig;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<IndicatorBundle>;
    async fn transform(&self, bundle: IndicatorBundle) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
