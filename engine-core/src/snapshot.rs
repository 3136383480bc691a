//! Periodic book-state snapshot writer: serialize, write to a temp file,
//! then `rename` over the published path so readers never see a
//! half-written file.

use std::path::Path;

use crate::engine::types::OrderBookLevelInfos;

pub const SNAPSHOT_FILE_NAME: &str = "book_state.json";
pub const SNAPSHOT_TMP_FILE_NAME: &str = "book_state.json.tmp";

/// Serialize `infos` and atomically publish it as `book_state.json` inside
/// `dir`.
pub fn write_snapshot(dir: &Path, infos: &OrderBookLevelInfos) -> std::io::Result<()> {
    let tmp_path = dir.join(SNAPSHOT_TMP_FILE_NAME);
    let final_path = dir.join(SNAPSHOT_FILE_NAME);

    let json = serde_json::to_string(infos).expect("OrderBookLevelInfos always serializes");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, &final_path)?;
    Ok(())
}
