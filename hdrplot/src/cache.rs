//! JSON side-file holding measured light levels, so a title is only measured once.
//!
//! The file is a two-element array `[[cll...], [fall...]]` in nits. There is no
//! invalidation: if the file exists for an identifier it is reused.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::measure::LightLevels;

pub fn cache_path(output_dir: &Path, identifier: &str) -> PathBuf {
    output_dir.join(format!("lightLevel-{}.json", identifier))
}

pub fn load(path: &Path) -> Result<LightLevels> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let (cll, fall): (Vec<f64>, Vec<f64>) = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse light level cache {}", path.display()))?;
    if cll.len() != fall.len() {
        anyhow::bail!(
            "Light level cache {} is inconsistent: {} CLL values but {} FALL values",
            path.display(),
            cll.len(),
            fall.len()
        );
    }
    Ok(LightLevels { cll, fall })
}

/// Written next to its final location and renamed, so an interrupted run never
/// leaves a truncated cache behind.
pub fn store(path: &Path, levels: &LightLevels) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, &(&levels.cll, &levels.fall))
            .context("Failed to serialize light levels")?;
        writer.flush()?;
    }
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path() {
        assert_eq!(
            cache_path(Path::new("out"), "DEFAULT"),
            Path::new("out").join("lightLevel-DEFAULT.json")
        );
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(dir.path(), "movie");
        let levels = LightLevels {
            cll: vec![120.5, 998.25, 0.0],
            fall: vec![20.0, 140.125, 0.0],
        };
        store(&path, &levels).unwrap();
        assert_eq!(load(&path).unwrap(), levels);
    }

    #[test]
    fn test_reads_python_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lightLevel-py.json");
        std::fs::write(&path, "[[100.0, 203.5], [10.0, 20.25]]").unwrap();
        let levels = load(&path).unwrap();
        assert_eq!(levels.cll, vec![100.0, 203.5]);
        assert_eq!(levels.fall, vec![10.0, 20.25]);
    }

    #[test]
    fn test_written_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lightLevel-x.json");
        let levels = LightLevels {
            cll: vec![1.5],
            fall: vec![0.5],
        };
        store(&path, &levels).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[[1.5],[0.5]]");
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lightLevel-bad.json");
        std::fs::write(&path, "[[1.0, 2.0], [1.0]]").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lightLevel-bad.json");
        std::fs::write(&path, "{\"cll\": []}").unwrap();
        assert!(load(&path).is_err());
    }
}
