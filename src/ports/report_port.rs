//! Report rendering port trait.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::FlatlandError;

/// Port for turning a backtest report into a visual artifact.
pub trait ReportPort {
    /// Render the report. An empty string means there was nothing to draw.
    fn render(&self, report: &BacktestReport) -> Result<String, FlatlandError>;

    fn write(&self, report: &BacktestReport, output_path: &str) -> Result<(), FlatlandError> {
        let content = self.render(report)?;
        std::fs::write(output_path, content)?;
        Ok(())
    }
}
