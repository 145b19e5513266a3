//! Identifier list loading from CSV

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PipelineError;

/// Column that must be present in the input header
pub const ID_COLUMN: &str = "id";

fn clean_header(h: &str) -> &str {
    h.trim_start_matches('\u{feff}').trim()
}

/// Read identifiers from the `id` column, in file order.
///
/// Header names are matched after stripping a UTF-8 BOM and whitespace.
/// Blank cells are skipped; duplicates are kept since each position is
/// fetched and recorded separately.
///
/// Skipping blanks shifts every later batch boundary relative to a reader
/// that keeps them as placeholder ids. Resuming into an output directory
/// written by such a reader from an input with blank ids would misalign
/// batches, so start those runs from an empty directory.
pub fn read_ids<R: Read>(reader: R, path: Option<&Path>) -> Result<Vec<String>, PipelineError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let column = rdr
        .headers()?
        .iter()
        .position(|h| clean_header(h) == ID_COLUMN)
        .ok_or_else(|| PipelineError::MissingIdColumn {
            path: path.map(Path::to_path_buf),
        })?;

    let mut ids = Vec::new();
    let mut blank = 0usize;
    for row in rdr.records() {
        let row = row?;
        match row.get(column).map(str::trim) {
            Some(id) if !id.is_empty() => ids.push(id.to_string()),
            _ => blank += 1,
        }
    }
    if blank > 0 {
        log::warn!(
            "Skipped {blank} rows with an empty id; batch boundaries count only non-empty ids"
        );
    }
    Ok(ids)
}

/// Load identifiers from a CSV file
pub fn load_ids(path: &Path) -> Result<Vec<String>, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::Input(e.into()))?;
    read_ids(file, Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_id_column_in_order() {
        let data = "title,id,price\nF3,38122211,1850\nF4,38122212,2400\n";
        let ids = read_ids(data.as_bytes(), None).unwrap();
        assert_eq!(ids, vec!["38122211", "38122212"]);
    }

    #[test]
    fn bom_prefixed_header() {
        let data = "\u{feff}id,title\n1,a\n2,b\n";
        assert_eq!(read_ids(data.as_bytes(), None).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn blank_ids_skipped() {
        let data = "id,title\n1,a\n,b\n 3 ,c\n";
        assert_eq!(read_ids(data.as_bytes(), None).unwrap(), vec!["1", "3"]);
    }

    #[test]
    fn blank_ids_do_not_occupy_batch_positions() {
        let data = "id,t\n1,a\n,b\n3,c\n4,d\n";
        let ids = read_ids(data.as_bytes(), None).unwrap();
        // Batch 2 of size 2 starts at the fourth row, not the third
        let plan = crate::runner::plan_batches(ids.len(), 2, 1);
        assert_eq!(plan, vec![(1, 0..2), (2, 2..3)]);
        assert_eq!(ids[plan[1].1.clone()], ["4"]);
    }

    #[test]
    fn duplicates_kept() {
        let data = "id\n7\n7\n";
        assert_eq!(read_ids(data.as_bytes(), None).unwrap(), vec!["7", "7"]);
    }

    #[test]
    fn missing_column() {
        let data = "title,price\nF3,1850\n";
        let err = read_ids(data.as_bytes(), Some(Path::new("ads.csv"))).unwrap_err();
        assert!(matches!(err, PipelineError::MissingIdColumn { .. }));
        assert_eq!(err.to_string(), "ads.csv must contain column 'id'");
    }

    #[test]
    fn header_only() {
        assert!(read_ids("id\n".as_bytes(), None).unwrap().is_empty());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.csv");
        std::fs::write(&path, "id\n10\n11\n").unwrap();
        assert_eq!(load_ids(&path).unwrap(), vec!["10", "11"]);
    }
}
