//! Dataset persistence and run artefacts
//!
//! ISW dataset layout:
//!
//! ```text
//! <description>
//! 0 <size>
//! <value>
//! ...
//! ```
//!
//! Values are written with the shortest representation that parses back to
//! the same `f64`.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::influence::InfluenceRow;
use crate::monte_carlo::TrialRecord;
use crate::params::DistributionParams;
use crate::{EstimationError, Result};

/// A dataset read back from an ISW file.
#[derive(Debug, Clone, PartialEq)]
pub struct IswDataset {
    pub description: String,
    pub values: Vec<f64>,
}

/// `Log(0, 1)x{1 - c}_mixt_scale{scale}_{n}.dat`
pub fn isw_file_name(params: &DistributionParams, size: usize) -> String {
    format!(
        "Log(0, 1)x{}_mixt_scale{}_{}.dat",
        1.0 - params.contamination,
        params.scale,
        size
    )
}

pub fn isw_description(params: &DistributionParams) -> String {
    format!(
        "Logistic(0,1) contaminated with probability {} by logistic({},{})",
        params.contamination, params.shift, params.scale
    )
}

/// Write `values` to `path`, replacing any existing file.
pub fn write_isw(path: &Path, description: &str, values: &[f64]) -> Result<()> {
    if description.contains('\n') {
        return Err(EstimationError::InvalidParameter(
            "ISW description must be a single line".to_string(),
        ));
    }

    let mut writer = BufWriter::new(fs::File::create(path)?);
    writeln!(writer, "{description}")?;
    writeln!(writer, "0 {}", values.len())?;
    for value in values {
        writeln!(writer, "{value}")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_isw(path: &Path) -> Result<IswDataset> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut lines = reader.lines();

    let description = lines
        .next()
        .transpose()?
        .ok_or_else(|| malformed("missing description line"))?;
    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| malformed("missing size line"))?;
    let declared = parse_size_line(&header)?;

    let mut values = Vec::with_capacity(declared);
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = trimmed
            .parse::<f64>()
            .map_err(|_| malformed(format!("value {} is not a number: {trimmed:?}", idx + 1)))?;
        values.push(value);
    }

    if values.len() != declared {
        return Err(malformed(format!(
            "declared {declared} values, found {}",
            values.len()
        )));
    }

    Ok(IswDataset {
        description,
        values,
    })
}

fn parse_size_line(line: &str) -> Result<usize> {
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some("0"), Some(size), None) => size
            .parse()
            .map_err(|_| malformed(format!("invalid size {size:?}"))),
        _ => Err(malformed(format!("expected `0 <size>`, got {line:?}"))),
    }
}

fn malformed(message: impl Into<String>) -> EstimationError {
    EstimationError::MalformedDataset(message.into())
}

pub fn ensure_outdir(outdir: &Path) -> Result<()> {
    fs::create_dir_all(outdir)?;
    Ok(())
}

/// Create a fresh `<root>/<label>-<UTC timestamp>` run directory.
///
/// Runs started within the same second get a `-2`, `-3`, ... suffix; the
/// directory is claimed with `create_dir`, so two runs never share one.
pub fn create_run_dir(root: &Path, label: &str) -> Result<PathBuf> {
    if label.is_empty() || label.contains(std::path::is_separator) {
        return Err(EstimationError::InvalidParameter(format!(
            "run label must be a non-empty path component, got {label:?}"
        )));
    }
    fs::create_dir_all(root)?;

    let stem = format!("{label}-{}", Utc::now().format("%Y%m%dT%H%M%SZ"));
    let mut attempt = 1_u32;
    loop {
        let name = if attempt == 1 {
            stem.clone()
        } else {
            format!("{stem}-{attempt}")
        };
        let dir = root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => return Err(err.into()),
        }
    }
}

pub fn write_trials_csv(path: &Path, records: &[TrialRecord]) -> Result<()> {
    write_rows(path, records)
}

pub fn write_influence_csv(path: &Path, rows: &[InfluenceRow]) -> Result<()> {
    write_rows(path, rows)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
