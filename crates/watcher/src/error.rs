//! 감시 엔진 에러 타입
//!
//! 검증 계열([`TargetError`])만 [`CycleError`]로 사이클을 중단시킵니다.
//! 스캔, 저장소, 메일 전송 에러는 대상 단위로 격리되어 로그를 남기고
//! 다음 대상으로 진행합니다.

use logalert_core::error::{LogAlertError, TargetError};

/// 로그 파일 스캔 에러
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// 로그 파일 읽기 실패
    #[error("scan error: {path}: {source}")]
    Scan {
        /// 스캔 중이던 파일 경로
        path: String,
        /// 원인 I/O 에러
        #[source]
        source: std::io::Error,
    },
}

/// 사이클 실행 에러
///
/// 사이클을 중단시키는 에러만 담습니다. 대상 단위의 운영 에러는
/// [`TargetReport`](crate::cycle::TargetReport)에 기록됩니다.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// 감시 대상 설정이 잘못되어 프로세스를 중단해야 함
    #[error("fatal: {0}")]
    Fatal(#[from] TargetError),
}

impl From<CycleError> for LogAlertError {
    fn from(err: CycleError) -> Self {
        match err {
            CycleError::Fatal(e) => LogAlertError::Target(e),
        }
    }
}

/// 파일 기반 저장소 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 레코드 파일 I/O 실패
    #[error("{path}: {source}")]
    Io {
        /// 레코드 파일 경로
        path: String,
        /// 원인 I/O 에러
        #[source]
        source: std::io::Error,
    },

    /// 오프셋 레코드 내용이 10진수가 아님
    #[error("corrupt offset record {path}: '{content}'")]
    CorruptOffset {
        /// 레코드 파일 경로
        path: String,
        /// 읽은 내용
        content: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// 메일 전송 에러
///
/// 어떤 단계에서 실패하든 전송 전체가 실패한 것으로 취급합니다.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// 서버 연결 실패
    #[error("connect to {addr} failed: {reason}")]
    Connect {
        /// 서버 주소
        addr: String,
        /// 실패 사유
        reason: String,
    },

    /// 응답 대기 시간 초과
    #[error("timed out during {stage}")]
    Timeout {
        /// SMTP 단계 (greeting, MAIL, RCPT ...)
        stage: String,
    },

    /// 서버가 명령을 거부함 (수신자 거부 포함)
    #[error("{stage} rejected: {code} {message}")]
    Rejected {
        /// SMTP 단계
        stage: String,
        /// 응답 코드
        code: u16,
        /// 응답 메시지
        message: String,
    },

    /// 응답 형식 오류
    #[error("protocol error: {0}")]
    Protocol(String),

    /// 소켓 I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
