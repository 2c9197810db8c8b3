//! Stitching overlapping snapshots into one transcript.
//!
//! Successive snapshots of a live transcript overlap: the tail of one capture
//! reappears at the head of the next. [`merge_lines`] aligns two captures
//! with a line-level Myers diff and keeps each line once.
//!
//! Only equal runs of at least `min_match_length` lines count as real
//! overlap. Short runs are usually coincidences ("Okay", "Thanks") and are
//! never used on their own to decide the two captures line up. When no run
//! is long enough the captures are treated as unrelated and appended.

use std::fs;
use std::path::{Path, PathBuf};

use similar::{capture_diff_slices, Algorithm, DiffTag};

use crate::types::RecorderError;

/// Shortest equal run accepted as genuine overlap.
pub const DEFAULT_MIN_MATCH_LENGTH: usize = 5;

/// Merged lines plus how many of them were matched as overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    pub lines: Vec<String>,
    pub overlap_count: usize,
}

/// Merge two captures.
///
/// With at least one equal run of `min_match_length` lines:
///
/// - equal runs (any length) are emitted once, from `new`
/// - replaced and inserted runs are emitted from `new`
/// - runs present only in `old` are kept
///
/// Without one, the result is `old` followed by the lines of `new` that the
/// diff did not align with `old`, which is plain concatenation whenever the
/// two share nothing.
///
/// # Examples
///
/// ```
/// use transcript_recorder::merge::merge_lines;
///
/// let old: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
/// let new: Vec<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
/// let merged = merge_lines(&old, &new, 5);
/// assert_eq!(merged.lines, vec!["a", "b", "x", "y"]);
/// assert_eq!(merged.overlap_count, 0);
/// ```
pub fn merge_lines(old: &[String], new: &[String], min_match_length: usize) -> MergeResult {
    let ops = capture_diff_slices(Algorithm::Myers, old, new);
    let ops: Vec<_> = ops.iter().map(|op| op.as_tag_tuple()).collect();

    let overlap_count: usize = ops
        .iter()
        .filter(|(tag, old_range, _)| *tag == DiffTag::Equal && old_range.len() >= min_match_length)
        .map(|(_, old_range, _)| old_range.len())
        .sum();

    let mut lines = Vec::with_capacity(old.len() + new.len());
    if overlap_count == 0 {
        lines.extend_from_slice(old);
        for (tag, _, new_range) in &ops {
            if matches!(tag, DiffTag::Insert | DiffTag::Replace) {
                lines.extend_from_slice(&new[new_range.clone()]);
            }
        }
        return MergeResult { lines, overlap_count };
    }

    for (tag, old_range, new_range) in ops {
        match tag {
            DiffTag::Equal | DiffTag::Insert | DiffTag::Replace => {
                lines.extend_from_slice(&new[new_range]);
            }
            DiffTag::Delete => lines.extend_from_slice(&old[old_range]),
        }
    }

    MergeResult { lines, overlap_count }
}

/// Read a snapshot or transcript file as lines.
pub fn read_transcript_lines(path: &Path) -> Result<Vec<String>, RecorderError> {
    let content = fs::read_to_string(path).map_err(|e| RecorderError::io(path, e))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Write lines in the snapshot format: one per line, each LF-terminated.
pub fn write_transcript_lines(path: &Path, lines: &[String]) -> Result<(), RecorderError> {
    let mut content = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(path, content).map_err(|e| RecorderError::io(path, e))
}

/// Merge two transcript files into `output`.
pub fn merge_files(
    old: &Path,
    new: &Path,
    output: &Path,
    min_match_length: usize,
) -> Result<MergeResult, RecorderError> {
    let result = merge_lines(
        &read_transcript_lines(old)?,
        &read_transcript_lines(new)?,
        min_match_length,
    );
    write_transcript_lines(output, &result.lines)?;
    log::info!(
        "[AX-MERGE] Merged {} + {} -> {} ({} overlapping lines)",
        old.display(),
        new.display(),
        output.display(),
        result.overlap_count
    );
    Ok(result)
}

/// Fold any number of transcript files, oldest first, into `output`.
///
/// The first file seeds the accumulator and every later one is merged into
/// it; `overlap_count` is summed across merges. A single file is copied
/// as-is. Returns `None` without writing anything when `paths` is empty.
pub fn merge_transcript_files(
    paths: &[PathBuf],
    output: &Path,
    min_match_length: usize,
) -> Result<Option<MergeResult>, RecorderError> {
    let Some((first, rest)) = paths.split_first() else {
        return Ok(None);
    };

    let mut merged = MergeResult {
        lines: read_transcript_lines(first)?,
        overlap_count: 0,
    };
    for path in rest {
        let next = merge_lines(&merged.lines, &read_transcript_lines(path)?, min_match_length);
        log::debug!(
            "[AX-MERGE] {}: {} overlapping lines",
            path.display(),
            next.overlap_count
        );
        merged = MergeResult {
            lines: next.lines,
            overlap_count: merged.overlap_count + next.overlap_count,
        };
    }

    write_transcript_lines(output, &merged.lines)?;
    log::info!(
        "[AX-MERGE] Merged {} file(s) into {} ({} lines, {} overlapping)",
        paths.len(),
        output.display(),
        merged.lines.len(),
        merged.overlap_count
    );
    Ok(Some(merged))
}
