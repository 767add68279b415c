use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Runs extract, transform and load in order and returns where the output
    /// was written. Per-year failures do not fail the run; they end up in the
    /// manifest written next to the data.
    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting extraction run");

        let phase = Instant::now();
        let bundle = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} salary years, {} currency years, {} unemployment years in {:?}",
            bundle.salary.len(),
            bundle.currency.len(),
            bundle.unemployment.len(),
            phase.elapsed()
        );
        if !bundle.manifest.is_empty() {
            tracing::warn!(
                "{} entries failed during extraction, see manifest.json",
                bundle.manifest.len()
            );
        }

        let phase = Instant::now();
        let result = self.pipeline.transform(bundle).await?;
        tracing::info!(
            "Flattened {} salary, {} currency, {} unemployment rows in {:?}",
            result.salary_rows.len(),
            result.currency_rows.len(),
            result.unemployment_rows.len(),
            phase.elapsed()
        );

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to {} (total {:?})", output_path, started.elapsed());

        Ok(output_path)
    }
}
