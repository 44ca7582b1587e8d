//! 보존 기간 정리
//!
//! [`RetentionSweeper`]는 오프셋 레코드 디렉토리를 훑어 마지막 수정 시각이
//! 보존 기간보다 오래된 레코드를 삭제합니다. 미전송 매치는 대상이 아닙니다.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use logalert_core::metrics as m;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::store::OffsetStore;

/// 한 번의 정리 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 삭제된 레코드 이름
    pub removed: Vec<String>,
    /// 검사 또는 삭제에 실패한 레코드 수
    pub failed: usize,
}

/// 오래된 오프셋 레코드 정리기
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    /// 정리 대상 디렉토리
    dir: PathBuf,
    /// 보존 기간
    max_age: Duration,
}

impl RetentionSweeper {
    /// 오프셋 저장소를 대상으로 하는 정리기를 만듭니다.
    pub fn new(offsets: &OffsetStore, max_age: Duration) -> Self {
        Self {
            dir: offsets.dir().to_path_buf(),
            max_age,
        }
    }

    /// `now - max_age`보다 먼저 수정된 레코드를 삭제합니다.
    ///
    /// 디렉토리가 없으면 빈 결과를 반환합니다. 개별 파일의 실패는 로그를 남기고
    /// 계속 진행합니다.
    pub async fn sweep(&self, now: SystemTime) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport::default();
        let cutoff = now.checked_sub(self.max_age).unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            let modified = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta.modified(),
                Ok(_) => continue,
                Err(e) => Err(e),
            };

            let modified = match modified {
                Ok(time) => time,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read record mtime");
                    report.failed += 1;
                    continue;
                }
            };

            if modified >= cutoff {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    info!(
                        record = %name,
                        age_secs = now.duration_since(modified).map(|d| d.as_secs()).unwrap_or(0),
                        "removed stale offset record"
                    );
                    report.removed.push(name);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove stale offset record");
                    report.failed += 1;
                }
            }
        }

        metrics::counter!(m::OFFSETS_SWEPT_TOTAL).increment(report.removed.len() as u64);
        Ok(report)
    }
}
