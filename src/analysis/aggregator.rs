//! Per-period insight collection.
//!
//! [`InsightAggregator`] runs the role's analytics script once per
//! requested period and turns each script's output into an
//! [`InsightRecord`]. Multi-period collection is best-effort; the
//! single-period calls propagate every failure.

use crate::analysis::fan_out::best_effort;
use crate::analysis::filters::InsightFilter;
use crate::config::RunnerConfig;
use crate::error::{InsightError, Result};
use crate::models::{InsightDataset, InsightRecord, PeriodKey, Role};
use crate::runner::{extract_record, extract_value, ProcessInvocation};
use serde_json::Value;
use tracing::{info, warn};

/// Runs the analytics scripts described by a [`RunnerConfig`].
#[derive(Debug, Clone)]
pub struct InsightAggregator {
    runner: RunnerConfig,
    concurrent: bool,
}

impl InsightAggregator {
    pub fn new(runner: RunnerConfig) -> Self {
        Self {
            runner,
            concurrent: true,
        }
    }

    /// Run per-period scripts concurrently (default) or one after another.
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Build the invocation `<program> <script> <args...>` with the
    /// script's directory as working directory.
    fn invocation(&self, script: &str, args: Vec<String>) -> Result<ProcessInvocation> {
        let script_path = self.runner.script_path(script)?;

        let mut invocation = ProcessInvocation::new(self.runner.program.clone())
            .arg(script_path.display().to_string())
            .args(args)
            .envs(&self.runner.env)
            .timeout(self.runner.timeout());

        if let Some(dir) = script_path.parent() {
            invocation = invocation.current_dir(dir);
        }

        Ok(invocation)
    }

    /// Fetch one period's insights for `role`.
    pub async fn fetch(&self, period: PeriodKey, role: Role) -> Result<InsightRecord> {
        let script = self.runner.script_for(role);
        info!("Running {} insights script for {}: {}", role, period, script);

        let mut args = vec![period.as_arg().to_string()];
        args.extend(self.runner.extra_args.iter().cloned());

        let output = self.invocation(script, args)?.run().await?;
        let record = extract_record(&output)?;

        info!("Insights {} ({}) received", role, period);
        Ok(record)
    }

    /// Fetch one period and narrow its store list with `filter`.
    pub async fn fetch_filtered(
        &self,
        period: PeriodKey,
        role: Role,
        filter: &InsightFilter,
    ) -> Result<InsightRecord> {
        let record = self.fetch(period, role).await?;
        Ok(filter.apply(record))
    }

    /// Collect insights for every period, tolerating per-period failures.
    ///
    /// Each requested period appears exactly once in the result; repeated
    /// periods keep their first position. Only an empty period list is
    /// rejected.
    pub async fn collect(&self, periods: &[PeriodKey], role: Role) -> Result<InsightDataset> {
        if periods.is_empty() {
            return Err(InsightError::UnrecognizedInput(
                "at least one period must be requested".to_string(),
            ));
        }

        let mut unique: Vec<PeriodKey> = Vec::with_capacity(periods.len());
        for &period in periods {
            if !unique.contains(&period) {
                unique.push(period);
            }
        }

        let results =
            best_effort(&unique, self.concurrent, |period| self.fetch(period, role)).await;

        let mut dataset = InsightDataset::new();
        for (period, record) in results {
            dataset.insert(period, record);
        }

        let missing = dataset.missing();
        if !missing.is_empty() {
            warn!(
                "{} of {} periods have no data: {:?}",
                missing.len(),
                dataset.len(),
                missing
            );
        }

        Ok(dataset)
    }

    /// Run the alerts script for one period, forwarding the period as its
    /// only argument. The result may be any JSON document, not only an
    /// object.
    pub async fn alerts(&self, period: PeriodKey) -> Result<Value> {
        info!("Running alerts script for {}", period);
        let output = self
            .invocation(&self.runner.alerts_script, vec![period.as_arg().to_string()])?
            .run()
            .await?;
        extract_value(&output)
    }
}
