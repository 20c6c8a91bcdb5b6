//! Run output naming
//!
//! Each collection pass writes next to `out_base`, stamped with the local
//! time the pass started: `{out_base}_{YYYYMMDD_HHMMSS}.csv`.

use chrono::NaiveDateTime;
use std::path::PathBuf;

use crate::downloader::config::RUN_STAMP_FORMAT;

/// Timestamp used in run file names
pub fn run_stamp(started: NaiveDateTime) -> String {
    started.format(RUN_STAMP_FORMAT).to_string()
}

/// Path of a run artifact: `{out_base}_{stamp}.{extension}`
pub fn run_output_path(out_base: &str, started: NaiveDateTime, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}.{}", out_base, run_stamp(started), extension))
}
