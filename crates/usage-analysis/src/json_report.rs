use std::io::Write;

use anyhow::{Context, Result};
use usage::WindowReport;

/// Writes a window report as a single line JSON object
pub fn render_json<W: Write>(out: &mut W, report: &WindowReport) -> Result<()> {
    serde_json::to_writer(&mut *out, report)
        .with_context(|| "Failed to serialize window report")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
