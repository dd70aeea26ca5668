//! Bar loading for the runner.
//!
//! Bars come either from a CSV file with the columns
//! `open_time, close_time, open, high, low, close, buy_volume, sell_volume, volume`
//! (RFC 3339 timestamps) or from the synthetic generator. Either way the
//! result is validated before any run sees it, and tagged with a dataset
//! hash for fingerprinting.

use std::io::Read;
use std::path::{Path, PathBuf};

use shockflip_core::domain::{validate_bars, Bar};
use shockflip_core::CoreError;
use thiserror::Error;
use tracing::info;

use crate::config::DataSource;
use crate::fingerprint::dataset_hash;
use crate::synthetic::generate_bars;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed bars: {0}")]
    Malformed(#[from] CoreError),
    #[error("no bars in {0}")]
    Empty(PathBuf),
    #[error("invalid synthetic spec: {0}")]
    Synthetic(#[source] CoreError),
}

/// Bars plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    /// BLAKE3 over every bar field, in order.
    pub dataset_hash: String,
    pub synthetic: bool,
}

/// Resolve a data source to validated bars.
pub fn load_bars(source: &DataSource) -> Result<LoadedBars, LoadError> {
    let (bars, synthetic) = match source {
        DataSource::Csv { path } => (read_bars_csv(path)?, false),
        DataSource::Synthetic(spec) => {
            spec.validate().map_err(LoadError::Synthetic)?;
            info!(bars = spec.bars, seed = spec.seed, "generating synthetic bars");
            (generate_bars(spec), true)
        }
    };
    validate_bars(&bars)?;
    Ok(LoadedBars {
        dataset_hash: dataset_hash(&bars),
        bars,
        synthetic,
    })
}

/// Read a bar CSV file. Rows are not validated here.
pub fn read_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = read_bars(file)?;
    if bars.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    info!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Parse bar rows from any reader with a header line.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let bars = rdr.deserialize::<Bar>().collect::<Result<Vec<_>, _>>()?;
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticSpec;

    const HEADER: &str = "open_time,close_time,open,high,low,close,buy_volume,sell_volume,volume\n";

    fn csv_text(rows: &[&str]) -> String {
        let mut s = HEADER.to_string();
        for r in rows {
            s.push_str(r);
            s.push('\n');
        }
        s
    }

    #[test]
    fn parses_rfc3339_rows() {
        let text = csv_text(&[
            "2024-01-02T00:00:00Z,2024-01-02T00:01:00Z,100,101,99.5,100.5,60,40,100",
            "2024-01-02T00:01:00Z,2024-01-02T00:02:00Z,100.5,100.8,100.1,100.2,30,70,100",
        ]);
        let bars = read_bars(text.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].high, 101.0);
        assert_eq!(bars[1].sell_volume, 70.0);
        assert_eq!(bars[1].open_time.to_rfc3339(), "2024-01-02T00:01:00+00:00");
        validate_bars(&bars).unwrap();
    }

    #[test]
    fn bad_number_is_csv_error() {
        let text = csv_text(&["2024-01-02T00:00:00Z,2024-01-02T00:01:00Z,abc,101,99,100,1,1,2"]);
        assert!(matches!(read_bars(text.as_bytes()), Err(LoadError::Csv(_))));
    }

    #[test]
    fn out_of_order_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(
            &path,
            csv_text(&[
                "2024-01-02T00:01:00Z,2024-01-02T00:02:00Z,100,101,99,100,1,1,2",
                "2024-01-02T00:00:00Z,2024-01-02T00:01:00Z,100,101,99,100,1,1,2",
            ]),
        )
        .unwrap();
        let err = load_bars(&DataSource::Csv { path }).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Malformed(CoreError::MalformedInput { index: 1, .. })
        ));
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, HEADER).unwrap();
        assert!(matches!(read_bars_csv(&path), Err(LoadError::Empty(_))));
    }

    #[test]
    fn nan_shock_probability_is_rejected() {
        let source = DataSource::Synthetic(SyntheticSpec {
            bars: 10,
            shock_probability: f64::NAN,
            ..SyntheticSpec::default()
        });
        assert!(matches!(
            load_bars(&source),
            Err(LoadError::Synthetic(CoreError::InvalidConfiguration {
                field: "data.shock_probability",
                ..
            }))
        ));
    }

    #[test]
    fn synthetic_source_is_tagged_and_hashed() {
        let source = DataSource::Synthetic(SyntheticSpec {
            bars: 300,
            ..SyntheticSpec::default()
        });
        let a = load_bars(&source).unwrap();
        let b = load_bars(&source).unwrap();
        assert!(a.synthetic);
        assert_eq!(a.bars.len(), 300);
        assert_eq!(a.dataset_hash, b.dataset_hash);
    }
}
