//! Line source: turns the input file into an ordered list of URL entries.

use crate::Result;
use crate::config::BlankLinePolicy;
use crate::types::UrlEntry;
use std::path::Path;

/// Read `path` and return its lines as URL entries.
pub async fn read_urls(path: &Path, blank_lines: BlankLinePolicy) -> Result<Vec<UrlEntry>> {
    let text = tokio::fs::read_to_string(path).await?;
    let entries = parse_urls(&text, blank_lines);

    tracing::debug!(
        path = %path.display(),
        entries = entries.len(),
        "Read URL list"
    );

    Ok(entries)
}

/// Split `text` into URL entries.
///
/// `\n` and `\r\n` terminators are removed and each line is trimmed. A
/// trailing newline does not produce an extra entry. Line numbers are 1-based
/// and always refer to the original text, also when blank lines are skipped.
pub fn parse_urls(text: &str, blank_lines: BlankLinePolicy) -> Vec<UrlEntry> {
    text.lines()
        .enumerate()
        .map(|(i, line)| UrlEntry::new(i + 1, line.trim()))
        .filter(|entry| match blank_lines {
            BlankLinePolicy::Skip => !entry.url.is_empty(),
            BlankLinePolicy::Keep => true,
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn strips_terminators_and_whitespace() {
        let entries = parse_urls(
            "http://a.example\r\n  http://b.example  \nhttp://c.example\n",
            BlankLinePolicy::Skip,
        );

        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["http://a.example", "http://b.example", "http://c.example"]
        );
    }

    #[test]
    fn skip_policy_drops_blank_lines_but_keeps_line_numbers() {
        let entries = parse_urls("http://a\n\n   \nhttp://b\n", BlankLinePolicy::Skip);

        assert_eq!(
            entries,
            vec![UrlEntry::new(1, "http://a"), UrlEntry::new(4, "http://b")]
        );
    }

    #[test]
    fn keep_policy_passes_blank_lines_through() {
        let entries = parse_urls("http://a\n\nhttp://b", BlankLinePolicy::Keep);

        assert_eq!(
            entries,
            vec![
                UrlEntry::new(1, "http://a"),
                UrlEntry::new(2, ""),
                UrlEntry::new(3, "http://b"),
            ]
        );
    }

    #[test]
    fn empty_text_has_no_entries() {
        assert!(parse_urls("", BlankLinePolicy::Keep).is_empty());
        assert!(parse_urls("\n\n", BlankLinePolicy::Skip).is_empty());
    }

    #[tokio::test]
    async fn read_urls_reads_file_in_order() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "http://one.example").unwrap();
        writeln!(file, "http://two.example").unwrap();

        let entries = read_urls(file.path(), BlankLinePolicy::Skip)
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "http://one.example");
        assert_eq!(entries[1].line, 2);
    }

    #[tokio::test]
    async fn read_urls_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_urls(&dir.path().join("missing.txt"), BlankLinePolicy::Skip).await;

        assert!(
            matches!(result, Err(crate::Error::Io(_))),
            "missing file should surface as Io error, got {result:?}"
        );
    }
}
