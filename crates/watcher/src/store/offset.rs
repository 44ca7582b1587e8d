//! 오프셋 저장소
//!
//! 로그 식별자(파일 base name)마다 파일 하나에 마지막으로 소비한 바이트 오프셋을
//! 10진수 텍스트로 저장합니다. 쓰기는 별도의 스테이징 디렉토리에 기록한 뒤
//! rename으로 교체하므로 크래시가 나도 레코드가 부분적으로 기록된 상태로 남지 않습니다.
//! 스테이징 파일은 레코드 디렉토리 밖에 있으므로 어떤 식별자와도 이름이 겹치지 않고
//! 보존 정리 대상도 아닙니다.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{OFFSETS_DIR, OFFSETS_STAGING_DIR};
use crate::error::StoreError;

/// 로그 식별자별 스캔 오프셋 저장소
#[derive(Debug, Clone)]
pub struct OffsetStore {
    /// 레코드 디렉토리 (`<storage_root>/offsets`)
    dir: PathBuf,
    /// 쓰기 중인 레코드 (`<storage_root>/offsets.staging`)
    staging: PathBuf,
}

impl OffsetStore {
    /// 저장 루트 아래에 오프셋 저장소를 만듭니다.
    ///
    /// 디렉토리는 첫 쓰기 때 생성됩니다.
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        let root = storage_root.as_ref();
        Self {
            dir: root.join(OFFSETS_DIR),
            staging: root.join(OFFSETS_STAGING_DIR),
        }
    }

    /// 레코드 디렉토리 경로를 반환합니다.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, identity: &str) -> PathBuf {
        self.dir.join(identity)
    }

    /// 저장된 오프셋을 반환합니다. 레코드가 없으면 0입니다.
    pub async fn get(&self, identity: &str) -> Result<u64, StoreError> {
        let path = self.record_path(identity);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        content
            .trim()
            .parse::<u64>()
            .map_err(|_| StoreError::CorruptOffset {
                path: path.display().to_string(),
                content,
            })
    }

    /// 오프셋을 기록합니다 (레코드 전체를 원자적으로 교체).
    pub async fn put(&self, identity: &str, offset: u64) -> Result<(), StoreError> {
        for dir in [&self.dir, &self.staging] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
        }

        let path = self.record_path(identity);
        let tmp_path = self.staging.join(identity);

        let mut tmp = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        tmp.write_all(offset.to_string().as_bytes())
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        tmp.sync_all()
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        drop(tmp);

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        debug!(identity, offset, "offset saved");
        Ok(())
    }
}
