//! Name lists in, per-name TSV verdicts out.
use crate::cache::ValidationStats;
use crate::error::{CrateError, Result};
use crate::filter::NameCheck;
use chrono::NaiveDate;
use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const HEADER: [&str; 5] = ["raw", "normalized", "verdict", "accepted_name", "checked_at"];

/// One name per line. Blank lines and `#` comments are skipped.
pub fn read_names<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        names.push(trimmed.to_string());
    }
    Ok(names)
}

pub fn load_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    read_names(BufReader::new(file))
}

/// `names.txt` -> `names_taxofilter.tsv`, next to the input.
pub fn build_report_path(input_path: &Path) -> PathBuf {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("names");
    input_path.with_file_name(format!("{}_taxofilter.tsv", stem))
}

fn verdict_label(valid: bool) -> &'static str {
    if valid { "valid" } else { "rejected" }
}

pub fn write_report<W: Write>(checks: &[NameCheck], checked_at: NaiveDate, out: W) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(out);
    writer.write_record(HEADER)?;

    let date = checked_at.format("%Y-%m-%d").to_string();
    for check in checks {
        writer.write_record([
            check.raw.as_str(),
            check.normalized.as_deref().unwrap_or(""),
            verdict_label(check.is_valid),
            check.accepted_name.as_deref().unwrap_or(""),
            date.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_report_file(checks: &[NameCheck], checked_at: NaiveDate, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_report(checks, checked_at, file)
}

pub fn write_stats<W: Write>(stats: &ValidationStats, out: W) -> Result<()> {
    serde_json::to_writer_pretty(out, stats).map_err(CrateError::SerializeError)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub valid: usize,
    pub rejected: usize,
    /// Valid names whose accepted name differs from the canonical form.
    pub renamed: usize,
}

pub fn summarize(checks: &[NameCheck]) -> ReportSummary {
    let mut summary = ReportSummary {
        total: checks.len(),
        ..ReportSummary::default()
    };
    for check in checks {
        if !check.is_valid {
            summary.rejected += 1;
            continue;
        }
        summary.valid += 1;
        if check.accepted_name.is_some() && check.accepted_name != check.normalized {
            summary.renamed += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn check(raw: &str, normalized: Option<&str>, valid: bool, accepted: Option<&str>) -> NameCheck {
        NameCheck {
            raw: raw.to_string(),
            normalized: normalized.map(str::to_string),
            is_valid: valid,
            accepted_name: accepted.map(str::to_string),
        }
    }

    fn sample() -> Vec<NameCheck> {
        vec![
            check("rosa damascena", Some("Rosa damascena"), true, Some("Rosa damascena")),
            check(
                "Chamaerops excelsa",
                Some("Chamaerops excelsa"),
                true,
                Some("Trachycarpus fortunei"),
            ),
            check("Bare root stock", None, false, None),
        ]
    }

    #[test]
    fn reads_names_skipping_blanks_and_comments() {
        let input = Cursor::new("Rosa canina\n\n  # nursery list\n  Acer palmatum  \n");
        let names = read_names(input).unwrap();
        assert_eq!(names, vec!["Rosa canina", "Acer palmatum"]);
    }

    #[test]
    fn loads_names_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Ginkgo\nOlea europaea").unwrap();
        let names = load_names(file.path()).unwrap();
        assert_eq!(names, vec!["Ginkgo", "Olea europaea"]);
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let result = load_names(Path::new("/nonexistent/names.txt"));
        assert!(matches!(result, Err(CrateError::IoError(_))));
    }

    #[test]
    fn report_path_sits_next_to_input() {
        assert_eq!(
            build_report_path(Path::new("/data/nursery.txt")),
            PathBuf::from("/data/nursery_taxofilter.tsv")
        );
    }

    #[test]
    fn writes_tab_separated_rows() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let mut out = Vec::new();
        write_report(&sample(), date, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "raw\tnormalized\tverdict\taccepted_name\tchecked_at");
        assert_eq!(
            lines[1],
            "rosa damascena\tRosa damascena\tvalid\tRosa damascena\t2024-05-17"
        );
        assert_eq!(lines[3], "Bare root stock\t\trejected\t\t2024-05-17");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn report_file_round_trips_through_csv_reader() {
        let file = NamedTempFile::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        write_report_file(&sample(), date, file.path()).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(file.path())
            .unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][3], "Trachycarpus fortunei");
    }

    #[test]
    fn summary_counts_renames() {
        let summary = summarize(&sample());
        assert_eq!(
            summary,
            ReportSummary {
                total: 3,
                valid: 2,
                rejected: 1,
                renamed: 1
            }
        );
    }

    #[test]
    fn stats_serialize_as_json() {
        let mut stats = ValidationStats::default();
        stats
            .per_authority
            .insert("lookup-a".to_string(), CacheStats { hits: 3, misses: 1 });
        let mut out = Vec::new();
        write_stats(&stats, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["per_authority"]["lookup-a"]["hits"], 3);
        assert_eq!(value["per_authority"]["lookup-a"]["misses"], 1);
    }
}
