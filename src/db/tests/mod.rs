use super::*;
use tempfile::NamedTempFile;


/// Open a fresh SQLite-backed database in a temporary file.
///
/// The file handle must outlive the database.
pub(super) async fn temp_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let url = sqlite_url(temp_file.path());
    let db = Database::connect(&url, 4).await.unwrap();
    (db, temp_file)
}

pub(super) fn sqlite_url(path: &std::path::Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}
