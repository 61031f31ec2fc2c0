//! JaCoCo coverage report discovery and merging.
//!
//! Each Maven module writes `target/site/jacoco/jacoco.csv` during
//! `mvn verify`; the coverage stage wants one line ratio across all modules.

use std::fs;
use std::path::Path;

use tracing::debug;

/// Line counters of one module report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JacocoReport {
    pub missed_lines: u64,
    pub covered_lines: u64,
}

impl JacocoReport {
    pub fn ratio(&self) -> f64 {
        let total = self.missed_lines + self.covered_lines;
        if total == 0 {
            0.0
        } else {
            self.covered_lines as f64 / total as f64
        }
    }
}

/// Sums the line counters of all reports into one.
pub fn merge(reports: &[JacocoReport]) -> JacocoReport {
    reports.iter().fold(JacocoReport::default(), |acc, r| {
        JacocoReport {
            missed_lines: acc.missed_lines + r.missed_lines,
            covered_lines: acc.covered_lines + r.covered_lines,
        }
    })
}

/// Finds and parses every `target/site/jacoco/jacoco.csv` under `root`.
///
/// Unreadable or malformed reports are skipped; an empty result means no
/// usable report was produced.
pub fn collect_reports(root: &Path) -> Vec<JacocoReport> {
    let mut reports = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if path.file_name().is_some_and(|n| n == ".git") {
                    continue;
                }
                stack.push(path);
            } else if path.ends_with("target/site/jacoco/jacoco.csv") {
                if let Some(report) = parse_csv_report(&path) {
                    debug!(?path, ?report, "parsed jacoco report");
                    reports.push(report);
                }
            }
        }
    }
    reports
}

fn parse_csv_report(path: &Path) -> Option<JacocoReport> {
    let content = fs::read_to_string(path).ok()?;
    parse_csv(&content)
}

fn parse_csv(content: &str) -> Option<JacocoReport> {
    let mut lines = content.lines();
    let header: Vec<&str> = lines.next()?.split(',').collect();
    let missed_idx = header.iter().position(|c| *c == "LINE_MISSED")?;
    let covered_idx = header.iter().position(|c| *c == "LINE_COVERED")?;

    let mut report = JacocoReport::default();
    for line in lines {
        let cells: Vec<&str> = line.split(',').collect();
        let missed = cells.get(missed_idx)?.parse::<u64>().ok()?;
        let covered = cells.get(covered_idx)?.parse::<u64>().ok()?;
        report.missed_lines += missed;
        report.covered_lines += covered;
    }
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "GROUP,PACKAGE,CLASS,INSTRUCTION_MISSED,INSTRUCTION_COVERED,BRANCH_MISSED,BRANCH_COVERED,LINE_MISSED,LINE_COVERED,COMPLEXITY_MISSED,COMPLEXITY_COVERED,METHOD_MISSED,METHOD_COVERED";

    #[test]
    fn csv_lines_are_summed_per_report() {
        let csv = format!(
            "{HEADER}\nsite,fr.lernejo,A,0,0,0,0,10,30,0,0,0,0\nsite,fr.lernejo,B,0,0,0,0,5,15,0,0,0,0"
        );
        let report = parse_csv(&csv).unwrap();
        assert_eq!(report.missed_lines, 15);
        assert_eq!(report.covered_lines, 45);
        assert!((report.ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn merge_combines_modules() {
        let merged = merge(&[
            JacocoReport {
                missed_lines: 45,
                covered_lines: 55,
            },
            JacocoReport {
                missed_lines: 0,
                covered_lines: 0,
            },
        ]);
        assert!((merged.ratio() - 0.55).abs() < 1e-9);
    }

    #[test]
    fn reports_are_discovered_per_module() {
        let root = tempfile::tempdir().unwrap();
        for module in ["site", "prediction-engine"] {
            let dir = root.path().join(module).join("target/site/jacoco");
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join("jacoco.csv"),
                format!("{HEADER}\nm,p,C,0,0,0,0,1,3,0,0,0,0"),
            )
            .unwrap();
        }
        let reports = collect_reports(root.path());
        assert_eq!(reports.len(), 2);
        assert!((merge(&reports).ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn empty_tree_yields_no_reports() {
        let root = tempfile::tempdir().unwrap();
        assert!(collect_reports(root.path()).is_empty());
    }
}
