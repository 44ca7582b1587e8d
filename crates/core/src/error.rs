//! 에러 타입 (도메인별 에러 정의)

/// logalert 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogAlertError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 감시 대상 검증 에러 (검색어/무시어 충돌, 경로 플레이스홀더)
    #[error("target error: {0}")]
    Target(#[from] TargetError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 감시 대상 단위 검증 에러
///
/// 두 에러 모두 사이클 시작 전 검증 단계에서 발생하며 프로세스를 중단시킵니다.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// 검색어와 무시어가 같은 문자열을 포함
    #[error("ignore term '{term}' is also a search term for {location}")]
    TermConflict { location: String, term: String },

    /// 지원하지 않거나 잘못된 날짜 플레이스홀더
    #[error("improper date placeholder in {location}: {reason}")]
    PlaceholderFormat { location: String, reason: String },

    /// 경로가 파일 이름으로 끝나지 않음 (`/var/log/..`, `/`)
    #[error("file location {location} does not name a file")]
    NoFileName { location: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_conflict_display() {
        let err = TargetError::TermConflict {
            location: "/var/log/app.log".to_owned(),
            term: "error".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("error"));
        assert!(msg.contains("/var/log/app.log"));
    }

    #[test]
    fn config_error_converts_to_top_level() {
        let err: LogAlertError = ConfigError::ParseFailed {
            reason: "bad toml".to_owned(),
        }
        .into();
        assert!(matches!(err, LogAlertError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn placeholder_error_converts_to_top_level() {
        let err: LogAlertError = TargetError::PlaceholderFormat {
            location: "/logs/{{{ddMM}}}.log".to_owned(),
            reason: "unsupported token 'ddMM'".to_owned(),
        }
        .into();
        assert!(matches!(err, LogAlertError::Target(_)));
    }
}
