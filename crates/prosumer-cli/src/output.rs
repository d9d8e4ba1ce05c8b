//! Report rendering for the command handlers.

use anyhow::{Context, Result};
use prosumer_algo::DispatchSolution;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tabwriter::TabWriter;
use tracing::info;

use crate::cli::OutputFormat;

/// Renders `report` as JSON or through `table`, then writes it to `out`
/// or stdout.
pub fn emit<T, F>(format: OutputFormat, out: Option<&Path>, report: &T, table: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let rendered = render(format, report, table)?;
    match out {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => io::stdout()
            .write_all(&rendered)
            .context("writing report to stdout")?,
    }
    Ok(())
}

pub fn render<T, F>(format: OutputFormat, report: &T, table: F) -> Result<Vec<u8>>
where
    T: Serialize,
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let mut buffer = Vec::new();
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut buffer, report).context("serializing report")?;
            buffer.push(b'\n');
        }
        OutputFormat::Table => {
            let mut writer = TabWriter::new(&mut buffer).padding(2);
            table(&mut writer).context("formatting table")?;
            writer.flush().context("formatting table")?;
        }
    }
    Ok(buffer)
}

/// Hour-by-hour dispatch, optionally next to a reference demand.
pub fn write_dispatch(
    w: &mut dyn Write,
    dispatch: &DispatchSolution,
    reference: Option<&[f64]>,
) -> io::Result<()> {
    match reference {
        Some(_) => writeln!(w, "HOUR\tBASE\tDEMAND\tPV\tSOC\tIN\tOUT\tBUY\tSELL\tNET")?,
        None => writeln!(w, "HOUR\tDEMAND\tPV\tSOC\tIN\tOUT\tBUY\tSELL\tNET")?,
    }
    let net = dispatch.net_import();
    for i in 0..dispatch.hours() {
        write!(w, "{i}\t")?;
        if let Some(base) = reference {
            write!(w, "{:.3}\t", base[i])?;
        }
        writeln!(
            w,
            "{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{:.3}",
            dispatch.demand[i],
            dispatch.pv[i],
            dispatch.soc[i],
            dispatch.battery_in[i],
            dispatch.battery_out[i],
            dispatch.buy[i],
            dispatch.sell[i],
            net[i],
        )?;
    }
    Ok(())
}

/// `key<TAB>value` summary rows followed by a blank line.
pub fn write_summary(w: &mut dyn Write, rows: &[(&str, String)]) -> io::Result<()> {
    for (key, value) in rows {
        writeln!(w, "{key}\t{value}")?;
    }
    writeln!(w)
}
