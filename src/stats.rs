/// Statistics tracking for label record loading
///
/// Malformed lines are skipped instead of aborting a whole evaluation; these
/// counters say how much was skipped and why.

use serde::{Deserialize, Serialize};

/// Statistics collected while reading label files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadStats {
    /// Number of label files read
    pub files_read: usize,

    /// Number of non-empty lines seen
    pub total_lines: usize,

    /// Number of lines skipped for having fewer than five fields
    pub skipped_short_lines: usize,

    /// Number of lines skipped because a field was not a number
    pub skipped_unparseable: usize,

    /// Number of lines skipped because the class id was out of range
    pub skipped_invalid_classes: usize,

    /// Number of lines skipped because the box had negative size or non-finite coordinates
    pub skipped_invalid_boxes: usize,

    /// Number of prediction lines that had no confidence and got the default
    pub defaulted_confidence: usize,
}

impl LoadStats {
    /// Create a new `LoadStats` with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the number of lines that became records
    pub fn loaded_records(&self) -> usize {
        self.total_lines.saturating_sub(self.total_skipped())
    }

    /// Calculate the total number of skipped lines
    pub fn total_skipped(&self) -> usize {
        self.skipped_short_lines
            + self.skipped_unparseable
            + self.skipped_invalid_classes
            + self.skipped_invalid_boxes
    }

    /// Add the counters of another run into this one
    pub fn merge(&mut self, other: &LoadStats) {
        self.files_read += other.files_read;
        self.total_lines += other.total_lines;
        self.skipped_short_lines += other.skipped_short_lines;
        self.skipped_unparseable += other.skipped_unparseable;
        self.skipped_invalid_classes += other.skipped_invalid_classes;
        self.skipped_invalid_boxes += other.skipped_invalid_boxes;
        self.defaulted_confidence += other.defaulted_confidence;
    }

    /// Get a formatted string summary of the statistics
    pub fn summary_string(&self) -> String {
        format!(
            "LoadStats {{ files: {}, lines: {}, loaded: {}, skipped: {}, defaulted_confidence: {} }}",
            self.files_read,
            self.total_lines,
            self.loaded_records(),
            self.total_skipped(),
            self.defaulted_confidence
        )
    }
}
