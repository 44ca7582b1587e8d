//! 미전송 매치 저장소
//!
//! 메일 전송에 끝내 실패한 매치 라인을 로그 식별자별 파일에 이어 씁니다.
//! 각 라인은 CRLF로 끝나며, append 후 `sync_all`로 디스크에 반영합니다.
//! 전송이 확인된 뒤에만 [`PendingStore::clear`]로 비웁니다.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::MATCHES_DIR;
use crate::error::StoreError;

const LINE_END: &str = "\r\n";

/// 로그 식별자별 미전송 매치 저장소
#[derive(Debug, Clone)]
pub struct PendingStore {
    /// 레코드 디렉토리 (`<storage_root>/matches`)
    dir: PathBuf,
}

impl PendingStore {
    /// 저장 루트 아래에 미전송 매치 저장소를 만듭니다.
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        Self {
            dir: storage_root.as_ref().join(MATCHES_DIR),
        }
    }

    /// 레코드 디렉토리 경로를 반환합니다.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, identity: &str) -> PathBuf {
        self.dir.join(identity)
    }

    /// 라인들을 식별자의 백로그 끝에 추가합니다. 백로그가 없으면 만듭니다.
    pub async fn append(&self, identity: &str, lines: &[String]) -> Result<(), StoreError> {
        if lines.is_empty() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.record_path(identity);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        // 한 번의 write로 기록해 라인 중간에서 끊기는 경우를 줄인다
        let mut payload = String::new();
        for line in lines {
            payload.push_str(line);
            payload.push_str(LINE_END);
        }

        file.write_all(payload.as_bytes())
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        debug!(identity, lines = lines.len(), "pending matches appended");
        Ok(())
    }

    /// 백로그의 모든 라인을 추가된 순서대로 반환합니다. 없으면 빈 목록입니다.
    pub async fn read_all(&self, identity: &str) -> Result<Vec<String>, StoreError> {
        let path = self.record_path(identity);
        let content = match tokio::fs::read(&path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        Ok(content
            .split(LINE_END)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// 백로그를 통째로 삭제합니다. 없으면 아무 일도 하지 않습니다.
    pub async fn clear(&self, identity: &str) -> Result<(), StoreError> {
        let path = self.record_path(identity);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(identity, "pending matches cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}
