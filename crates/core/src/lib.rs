//! logalert 공통 크레이트
//!
//! 데몬과 감시 엔진이 함께 사용하는 설정 모델, 에러 타입, 메트릭 이름을 제공합니다.
//!
//! - [`config`]: `logalert.toml` / 레거시 `config.json` 로딩, 환경변수 오버라이드, 검증
//! - [`error`]: 최상위 에러 타입
//! - [`metrics`]: Prometheus 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, LogAlertError, TargetError};

// 설정
pub use config::{
    GeneralConfig, LogAlertConfig, LogTarget, MetricsConfig, RetentionConfig, RetryConfig,
    ScheduleConfig, SmtpConfig,
};
