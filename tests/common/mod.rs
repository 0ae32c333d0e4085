//! Common test utilities for batch-fetch integration tests

use std::io::Write;

use batch_fetch::Database;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Open a SQLite results database inside `dir`
pub async fn sqlite_db(dir: &TempDir) -> Database {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("results.db").display());
    Database::connect(&url, 8)
        .await
        .expect("failed to open test database")
}

/// Mount a GET route answering 200 with `body`
pub async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Write `lines` to a temp file, one per line
pub fn url_file(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create url file");
    for line in lines {
        writeln!(file, "{}", line).expect("failed to write url file");
    }
    file
}

/// A URL on a local port that was bound and released, so connecting is refused
pub fn refused_url(route: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind port");
    let addr = listener.local_addr().expect("failed to read local address");
    drop(listener);
    format!("http://{}{}", addr, route)
}
