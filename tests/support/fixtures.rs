use std::path::{Path, PathBuf};

/// Header used by every master dataset fixture.
pub const MASTER_HEADER: &str = "ResponseId,type,item,value";

/// Write a master dataset CSV from `(id, type, item, value)` rows.
pub fn write_master_csv(dir: &Path, name: &str, rows: &[(&str, &str, &str, &str)]) -> PathBuf {
    let mut text = String::from(MASTER_HEADER);
    text.push('\n');
    for (id, kind, item, value) in rows {
        text.push_str(&format!("{id},{kind},{item},\"{value}\"\n"));
    }
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write master csv");
    path
}

/// The three-row dataset used by the resumption scenarios.
pub fn three_row_master(dir: &Path) -> PathBuf {
    write_master_csv(
        dir,
        "master.csv",
        &[
            ("R1", "positive", "1", "They fill skills gaps"),
            ("R2", "negative", "1", "Housing is scarce"),
            ("R3", "positive", "2", "Food, music and friends"),
        ],
    )
}
