use std::fs;
use std::path::PathBuf;

use time::{OffsetDateTime, UtcOffset};

use crate::error::CrawlerResult;

/// Local date and hour captured once when the process starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStamp {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
}

impl RunStamp {
    pub fn new(year: i32, month: u8, day: u8, hour: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
        }
    }

    pub fn now(offset: UtcOffset) -> Self {
        Self::from_datetime(OffsetDateTime::now_utc().to_offset(offset))
    }

    pub fn from_datetime(at: OffsetDateTime) -> Self {
        Self::new(at.year(), u8::from(at.month()), at.day(), at.hour())
    }

    /// `2024_1_5`
    pub fn date_label(&self) -> String {
        format!("{}_{}_{}", self.year, self.month, self.day)
    }

    /// `2024_1_5_9`
    pub fn hour_label(&self) -> String {
        format!("{}_{}", self.date_label(), self.hour)
    }
}

/// Writes one run's lines under `<root>/<category>/<date>/<date>_<hour>.txt`.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
    category: String,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>, category: &str) -> Self {
        Self {
            root: root.into(),
            category: category.to_string(),
        }
    }

    pub fn output_dir(&self, stamp: &RunStamp) -> PathBuf {
        self.root.join(&self.category).join(stamp.date_label())
    }

    pub fn output_path(&self, stamp: &RunStamp) -> PathBuf {
        self.output_dir(stamp)
            .join(format!("{}.txt", stamp.hour_label()))
    }

    /// Replaces any file already written for the same hour.
    pub fn write(&self, lines: &[String], stamp: &RunStamp) -> CrawlerResult<PathBuf> {
        fs::create_dir_all(self.output_dir(stamp))?;
        let path = self.output_path(stamp);
        fs::write(&path, lines.join("\n"))?;
        Ok(path)
    }
}
