//! 파일 기반 영속 저장소
//!
//! - [`OffsetStore`]: 로그 식별자별 마지막 스캔 오프셋 (레코드당 파일 하나, 10진수 텍스트)
//! - [`PendingStore`]: 전송에 실패한 매치 라인 (식별자당 append 전용 파일, CRLF 구분)
//!
//! 두 저장소 모두 주입된 `storage_root` 아래 고정된 하위 디렉토리를 사용합니다.
//!
//! ```text
//! <storage_root>/
//!   offsets/<basename>   "10432"
//!   offsets.staging/     (쓰기 중인 오프셋 레코드)
//!   matches/<basename>   "line 1\r\nline 2\r\n"
//! ```

pub mod offset;
pub mod pending;

pub use offset::OffsetStore;
pub use pending::PendingStore;

/// 오프셋 레코드 하위 디렉토리 이름
pub const OFFSETS_DIR: &str = "offsets";

/// 오프셋 레코드를 교체하기 전 기록하는 하위 디렉토리 이름
pub const OFFSETS_STAGING_DIR: &str = "offsets.staging";

/// 미전송 매치 하위 디렉토리 이름
pub const MATCHES_DIR: &str = "matches";
