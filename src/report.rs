//! Text, CSV and JSON rendering of a [`DatasetReport`].
//!
//! Classes without ground truth are shown as undefined (`-` in text, an empty
//! field in CSV, `null` in JSON), never as zero.

use crate::error::Result;
use crate::types::DatasetReport;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// File name of the plain-text report.
pub const RESULTS_TXT: &str = "results.txt";

/// File name of the CSV history, one row per evaluation run.
pub const RESULTS_CSV: &str = "results.csv";

/// Metric label such as `mAP@0.5`.
fn map_label(report: &DatasetReport) -> String {
    format!("mAP@{}", report.iou_threshold)
}

fn class_name(names: &[String], class_id: usize) -> String {
    names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("cls{class_id}"))
}

/// Console summary: one line per class, then the mean.
///
/// Labels carry the report's `IoU` threshold.
///
/// # Example
///
/// ```
/// use fedeval::report::format_summary;
/// use fedeval::types::{ClassEvaluation, DatasetReport};
///
/// let report = DatasetReport {
///     iou_threshold: 0.5,
///     mean_ap: 0.5,
///     per_class: vec![ClassEvaluation::undefined(0, 0)],
/// };
/// let text = format_summary(&report, &["car".to_string()]);
/// assert!(text.contains("(no GT)"));
/// assert!(text.contains("mAP@0.5: 50.00%"));
/// ```
pub fn format_summary(report: &DatasetReport, names: &[String]) -> String {
    let mut out = format!("---------- Results (IoU={}) ----------\n", report.iou_threshold);
    for class in &report.per_class {
        let name = class_name(names, class.class_id);
        if class.is_defined() {
            out.push_str(&format!("{:<16} AP: {:6.2}%\n", name, class.ap * 100.0));
        } else {
            out.push_str(&format!("{name:<16} AP:  -   (no GT)\n"));
        }
    }
    out.push_str(&format!("===> {}: {:.2}%\n", map_label(report), report.mean_ap * 100.0));
    out
}

/// Contents of `results.txt`.
pub fn format_results_txt(report: &DatasetReport, names: &[String]) -> String {
    let mut out = format!("{}: {:.4}%\n", map_label(report), report.mean_ap * 100.0);
    for class in &report.per_class {
        let name = class_name(names, class.class_id);
        if class.is_defined() {
            out.push_str(&format!("{}: {:.4}%\n", name, class.ap * 100.0));
        } else {
            out.push_str(&format!("{name}: -\n"));
        }
    }
    out
}

/// CSV header matching [`csv_row`]; the first column is `map50` at `IoU` 0.5.
pub fn csv_header(report: &DatasetReport, names: &[String]) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let percent = (report.iou_threshold * 100.0).round() as i64;
    let mut fields = vec![format!("map{percent}")];
    fields.extend(
        report
            .per_class
            .iter()
            .map(|c| format!("AP_{}", class_name(names, c.class_id))),
    );
    fields.join(",")
}

/// Machine-readable row: `mean_ap,ap_0,ap_1,...`, empty for undefined classes.
///
/// # Example
///
/// ```
/// use fedeval::report::csv_row;
/// use fedeval::types::{ClassEvaluation, DatasetReport};
///
/// let mut defined = ClassEvaluation::undefined(1, 0);
/// defined.ap = 0.25;
/// let report = DatasetReport {
///     iou_threshold: 0.5,
///     mean_ap: 0.25,
///     per_class: vec![ClassEvaluation::undefined(0, 3), defined],
/// };
/// assert_eq!(csv_row(&report), "0.250000,,0.250000");
/// ```
pub fn csv_row(report: &DatasetReport) -> String {
    let mut fields = vec![format!("{:.6}", report.mean_ap)];
    fields.extend(report.per_class.iter().map(|c| {
        if c.is_defined() {
            format!("{:.6}", c.ap)
        } else {
            String::new()
        }
    }));
    fields.join(",")
}

/// Serialize the report as pretty JSON. Undefined values become `null`.
pub fn to_json(report: &DatasetReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write (overwrite) `results.txt` at `path`.
pub fn write_results_txt<P: AsRef<Path>>(path: P, report: &DatasetReport, names: &[String]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(format_results_txt(report, names).as_bytes())?;
    Ok(())
}

/// Append one row to the CSV at `path`, writing the header first if the file is new.
pub fn append_results_csv<P: AsRef<Path>>(path: P, report: &DatasetReport, names: &[String]) -> Result<()> {
    let path = path.as_ref();
    let need_header = !path.exists();

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if need_header {
        writeln!(file, "{}", csv_header(report, names))?;
    }
    writeln!(file, "{}", csv_row(report))?;
    Ok(())
}

/// Write `results.txt` and append to `results.csv` inside `dir`.
pub fn save_reports<P: AsRef<Path>>(dir: P, report: &DatasetReport, names: &[String]) -> Result<()> {
    let dir = dir.as_ref();
    write_results_txt(dir.join(RESULTS_TXT), report, names)?;
    append_results_csv(dir.join(RESULTS_CSV), report, names)?;
    info!(dir = %dir.display(), mean_ap = report.mean_ap, "results saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassEvaluation;

    fn sample_report() -> DatasetReport {
        let mut car = ClassEvaluation::undefined(0, 0);
        car.ap = 0.75;
        car.precision = 1.0;
        car.recall = 0.75;
        car.num_ground_truth = 4;
        DatasetReport {
            iou_threshold: 0.5,
            mean_ap: 0.75,
            per_class: vec![car, ClassEvaluation::undefined(1, 2)],
        }
    }

    fn names() -> Vec<String> {
        vec!["car".to_string(), "van".to_string()]
    }

    #[test]
    fn test_summary() {
        let text = format_summary(&sample_report(), &names());
        assert!(text.contains("car              AP:  75.00%"));
        assert!(text.contains("van              AP:  -   (no GT)"));
        assert!(text.ends_with("===> mAP@0.5: 75.00%\n"));
    }

    #[test]
    fn test_results_txt() {
        let text = format_results_txt(&sample_report(), &names());
        assert_eq!(text, "mAP@0.5: 75.0000%\ncar: 75.0000%\nvan: -\n");
    }

    #[test]
    fn test_default_names() {
        let text = format_results_txt(&sample_report(), &[]);
        assert!(text.contains("cls0: 75.0000%"));
        assert!(text.contains("cls1: -"));
    }

    #[test]
    fn test_csv() {
        let report = sample_report();
        assert_eq!(csv_header(&report, &names()), "map50,AP_car,AP_van");
        assert_eq!(csv_row(&report), "0.750000,0.750000,");
    }

    #[test]
    fn test_labels_follow_threshold() {
        let mut report = sample_report();
        report.iou_threshold = 0.75;

        let summary = format_summary(&report, &names());
        assert!(summary.starts_with("---------- Results (IoU=0.75) ----------\n"));
        assert!(summary.ends_with("===> mAP@0.75: 75.00%\n"));
        assert!(format_results_txt(&report, &names()).starts_with("mAP@0.75: 75.0000%\n"));
        assert_eq!(csv_header(&report, &names()), "map75,AP_car,AP_van");
    }

    #[test]
    fn test_json_null_for_undefined() {
        let json = to_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["per_class"][1]["ap"].is_null());
        assert_eq!(value["per_class"][0]["ap"], 0.75);
    }
}
