//! CSV recording loader
//!
//! One file per recording: a header row of channel names followed by one
//! row per sample. Cells that do not parse as numbers load as NaN and are
//! reported per channel by the batch runner.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::{debug, warn};

use nlid_native::Recording;

/// Load one CSV file or every `*.csv` file in a directory (sorted by name).
///
/// Unreadable files inside a directory are logged and skipped.
pub fn load_input(path: &Path) -> anyhow::Result<Vec<Recording>> {
    if path.is_file() {
        return Ok(vec![read_recording(path)?]);
    }
    if !path.is_dir() {
        bail!("Input path {} does not exist", path.display());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .with_context(|| format!("Failed to list {}", path.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    files.sort();

    let mut recordings = Vec::with_capacity(files.len());
    for file in &files {
        match read_recording(file) {
            Ok(recording) => recordings.push(recording),
            Err(err) => warn!(file = %file.display(), "skipping unreadable file: {err:#}"),
        }
    }
    debug!(dir = %path.display(), found = files.len(), loaded = recordings.len());
    Ok(recordings)
}

/// Read one CSV file; the recording is named after the file.
pub fn read_recording(path: &Path) -> anyhow::Result<Recording> {
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    parse_recording(&name, file).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse CSV text into a recording.
///
/// Short rows are padded with NaN; extra cells are ignored.
pub fn parse_recording<R: Read>(name: &str, reader: R) -> Result<Recording, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let channels: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); channels.len()];

    for record in reader.records() {
        let record = record?;
        for (i, column) in columns.iter_mut().enumerate() {
            let value = record.get(i).and_then(|cell| cell.parse::<f64>().ok()).unwrap_or(f64::NAN);
            column.push(value);
        }
    }

    let mut recording = Recording::new(name);
    for (channel, samples) in channels.into_iter().zip(columns) {
        recording.insert_channel(channel, samples);
    }
    Ok(recording)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use nlid_core::DataError;

    use super::*;

    #[test]
    fn test_parse_columns_by_header() {
        let text = "Cz, F3 ,F4\n1.0,2.0,3.0\n4.0,5.0,6.0\n";
        let rec = parse_recording("s01.csv", text.as_bytes()).unwrap();

        assert_eq!(rec.name(), "s01.csv");
        assert_eq!(rec.channel_names().collect::<Vec<_>>(), ["Cz", "F3", "F4"]);
        assert_eq!(rec.signal("F3").unwrap().samples(), &[2.0, 5.0]);
    }

    #[test]
    fn test_bad_cells_become_malformed_samples() {
        let text = "Cz,F3\n1.0,2.0\n1.5,oops\n2.0\n";
        let rec = parse_recording("bad.csv", text.as_bytes()).unwrap();

        assert_eq!(rec.signal("Cz").unwrap().len(), 3);
        assert_eq!(
            rec.signal("F3"),
            Err(DataError::MalformedSample { channel: "F3".into(), index: 1 })
        );
    }

    #[test]
    fn test_load_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [("b.csv", "Cz\n1\n"), ("a.csv", "Cz\n2\n"), ("notes.txt", "hello")] {
            let mut f = File::create(dir.path().join(name)).unwrap();
            f.write_all(body.as_bytes()).unwrap();
        }

        let recordings = load_input(dir.path()).unwrap();
        let names: Vec<&str> = recordings.iter().map(Recording::name).collect();
        assert_eq!(names, ["a.csv", "b.csv"]);
    }

    #[test]
    fn test_load_single_file_and_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.csv");
        std::fs::write(&path, "Cz,Pz\n0.5,0.25\n").unwrap();

        let recordings = load_input(&path).unwrap();
        assert_eq!(recordings.len(), 1);
        assert_eq!(recordings[0].signal("Pz").unwrap().samples(), &[0.25]);

        assert!(load_input(&dir.path().join("absent")).is_err());
    }
}
