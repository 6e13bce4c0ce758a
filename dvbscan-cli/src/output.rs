//! Channel list and table printers.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use dvbscan::plan::{Country, Satellite};
use dvbscan::Channel;

use crate::context::OutputFormat;
use crate::error::CliError;

pub(crate) fn write_channels<W: Write>(
    mut w: W,
    channels: &[Channel],
    format: OutputFormat,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Vdr => {
            for channel in channels {
                writeln!(w, "{}", channel.to_vdr_line())?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut w, channels)?;
            writeln!(w)?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Write to `path`, or stdout without one.
pub(crate) fn save_channels(
    path: Option<&Path>,
    channels: &[Channel],
    format: OutputFormat,
) -> Result<(), CliError> {
    match path {
        Some(path) => write_channels(BufWriter::new(File::create(path)?), channels, format),
        None => write_channels(io::stdout().lock(), channels, format),
    }
}

pub(crate) fn write_countries<W: Write>(mut w: W, countries: &[Country]) -> io::Result<()> {
    writeln!(w, "{:<4} {:<5} NAME", "CODE", "ISO3")?;
    for c in countries {
        writeln!(w, "{:<4} {:<5} {}", c.alpha2, c.alpha3, c.name)?;
    }
    Ok(())
}

pub(crate) fn write_satellites<W: Write>(mut w: W, satellites: &[Satellite]) -> io::Result<()> {
    writeln!(w, "{:<8} {:<8} {:>4} NAME", "NAME", "SOURCE", "TPS")?;
    for s in satellites {
        writeln!(
            w,
            "{:<8} {:<8} {:>4} {}",
            s.short_name,
            s.source().to_string(),
            s.transponders.len(),
            s.full_name
        )?;
    }
    Ok(())
}
