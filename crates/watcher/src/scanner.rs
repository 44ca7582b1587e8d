//! 증분 로그 스캐너
//!
//! 마지막으로 읽은 바이트 오프셋부터 파일 끝까지 라인 단위로 읽고,
//! 검색어와 매칭되는 라인 중 무시어와 매칭되지 않는 라인만 돌려줍니다.
//!
//! # 로테이션 감지
//! 현재 파일 크기가 저장된 오프셋보다 작으면 파일이 잘렸거나 교체된 것으로 보고
//! 0부터 다시 읽습니다 ([`effective_start_offset`]). 내용 해시는 비교하지 않습니다.

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, warn};

use crate::error::WatcherError;
use crate::matcher::{TermSet, filter_ignored};

/// 한 번의 스캔 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// 무시어 필터를 통과한 매치 라인 (파일 순서)
    pub matches: Vec<String>,
    /// 스캔을 시작한 오프셋
    pub start_offset: u64,
    /// 마지막으로 소비한 바이트 다음 오프셋
    pub end_offset: u64,
}

impl ScanReport {
    /// 이번 스캔에서 소비한 바이트 수를 반환합니다.
    pub fn bytes_consumed(&self) -> u64 {
        self.end_offset - self.start_offset
    }
}

/// 잘림/로테이션을 고려한 실제 시작 오프셋을 계산합니다.
///
/// 파일 크기가 저장된 오프셋보다 작으면 0을 반환합니다.
pub fn effective_start_offset(stored: u64, file_len: u64) -> u64 {
    if file_len < stored { 0 } else { stored }
}

/// 파일 크기를 반환합니다. 파일이 없으면 `None`입니다.
pub async fn file_len(path: &Path) -> Result<Option<u64>, WatcherError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(WatcherError::Scan {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

/// `start_offset`부터 파일을 스캔합니다.
///
/// 파일이 없으면 경고를 남기고 `Ok(None)`을 반환합니다 (이번 사이클은 건너뜀).
/// 호출자는 [`effective_start_offset`]으로 잘림 여부를 먼저 반영해야 합니다.
///
/// 라인 종결자(`\n`, `\r\n`)를 포함해 소비한 모든 바이트를 오프셋에 더하며,
/// 종결자가 없는 마지막 라인도 소비합니다.
pub async fn scan(
    path: &Path,
    search: &TermSet,
    ignore: &TermSet,
    start_offset: u64,
) -> Result<Option<ScanReport>, WatcherError> {
    let scan_err = |source: std::io::Error| WatcherError::Scan {
        path: path.display().to_string(),
        source,
    };

    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "log file does not exist, skipping");
            return Ok(None);
        }
        Err(e) => return Err(scan_err(e)),
    };

    file.seek(SeekFrom::Start(start_offset))
        .await
        .map_err(scan_err)?;

    let mut reader = BufReader::new(file);
    let mut buf = Vec::with_capacity(1024);
    let mut offset = start_offset;
    let mut matched = Vec::new();

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await.map_err(scan_err)?;
        if read == 0 {
            break;
        }
        offset += read as u64;

        let line = String::from_utf8_lossy(trim_line_ending(&buf));
        if search.matches(&line) {
            matched.push(line.into_owned());
        }
    }

    let found = matched.len();
    let matches = filter_ignored(matched, ignore);

    debug!(
        path = %path.display(),
        start_offset,
        end_offset = offset,
        found,
        kept = matches.len(),
        "scan finished"
    );

    Ok(Some(ScanReport {
        matches,
        start_offset,
        end_offset: offset,
    }))
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_log(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn truncated_file_resets_offset() {
        assert_eq!(effective_start_offset(500, 200), 0);
        assert_eq!(effective_start_offset(200, 200), 200);
        assert_eq!(effective_start_offset(100, 200), 100);
        assert_eq!(effective_start_offset(0, 0), 0);
    }

    #[tokio::test]
    async fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan(
            &dir.path().join("absent.log"),
            &TermSet::compile(&["error"]),
            &TermSet::default(),
            0,
        )
        .await
        .unwrap();
        assert!(result.is_none());
        assert_eq!(file_len(&dir.path().join("absent.log")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn offset_counts_line_terminators() {
        let file = write_log(b"one\r\ntwo\nthree");
        let report = scan(
            file.path(),
            &TermSet::compile(&["o"]),
            &TermSet::default(),
            0,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(report.end_offset, 14);
        assert_eq!(report.bytes_consumed(), 14);
        assert_eq!(report.matches, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn scan_starts_at_offset() {
        let file = write_log(b"ERROR old\nERROR new\n");
        let report = scan(
            file.path(),
            &TermSet::compile(&["error"]),
            &TermSet::default(),
            10,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(report.matches, vec!["ERROR new"]);
        assert_eq!(report.start_offset, 10);
        assert_eq!(report.end_offset, 20);
    }

    #[tokio::test]
    async fn ignore_wins_over_search() {
        let file = write_log(b"INFO started\nERROR: disk full\nERROR: transient blip\n");
        let report = scan(
            file.path(),
            &TermSet::compile(&["ERROR"]),
            &TermSet::compile(&["ERROR: transient"]),
            0,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(report.matches, vec!["ERROR: disk full"]);
    }

    #[tokio::test]
    async fn scan_at_end_consumes_nothing() {
        let file = write_log(b"ERROR once\n");
        let report = scan(
            file.path(),
            &TermSet::compile(&["error"]),
            &TermSet::default(),
            11,
        )
        .await
        .unwrap()
        .unwrap();
        assert!(report.matches.is_empty());
        assert_eq!(report.bytes_consumed(), 0);
    }

    #[tokio::test]
    async fn scanning_twice_is_idempotent() {
        let file = write_log(b"a ERROR\nb\nc error\n");
        let search = TermSet::compile(&["error"]);
        let ignore = TermSet::default();
        let first = scan(file.path(), &search, &ignore, 0).await.unwrap();
        let second = scan(file.path(), &search, &ignore, 0).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let file = write_log(b"ERROR \xff\xfe bytes\n");
        let report = scan(
            file.path(),
            &TermSet::compile(&["error"]),
            &TermSet::default(),
            0,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.end_offset, 15);
    }
}
