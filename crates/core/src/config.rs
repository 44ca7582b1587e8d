//! 설정 관리: logalert.toml 파싱 및 런타임 설정
//!
//! [`LogAlertConfig`]는 데몬 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 로그 레벨/형식만)
//! 2. 환경변수 (`LOGALERT_SMTP_ADDRESS=mail.local` 형식)
//! 3. 설정 파일 (`logalert.toml` 또는 레거시 `config.json`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logalert_core::error::LogAlertError> {
//! use logalert_core::config::LogAlertConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogAlertConfig::load("logalert.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogAlertConfig::parse("[schedule]\nminutes_to_sleep = 1")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogAlertError, TargetError};

/// logalert 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogAlertConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 사이클 주기 설정
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// SMTP 설정
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// 메일 재시도 정책
    #[serde(default)]
    pub retry: RetryConfig,
    /// 오프셋 레코드 보존 정책
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 감시 대상 목록
    #[serde(default)]
    pub targets: Vec<LogTarget>,
}

impl LogAlertConfig {
    /// 설정 파일을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    ///
    /// 확장자가 `.json`이면 레거시 JSON 형식으로, 그 외에는 TOML로 해석합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogAlertError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일을 읽어 파싱합니다 (환경변수 오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogAlertError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogAlertError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogAlertError::Io(e)
            }
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::parse_legacy_json(&content)
        } else {
            Self::parse(&content)
        }
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogAlertError> {
        toml::from_str(toml_str).map_err(|e| {
            LogAlertError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 레거시 JSON 설정(`minutesToSleep`, `logLocations` ...)을 파싱합니다.
    ///
    /// JSON에 없는 섹션은 기본값을 사용합니다.
    pub fn parse_legacy_json(json_str: &str) -> Result<Self, LogAlertError> {
        let legacy: LegacyJsonConfig = serde_json::from_str(json_str).map_err(|e| {
            LogAlertError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })?;
        legacy.into_config()
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGALERT_{SECTION}_{FIELD}`
    /// 예: `LOGALERT_SMTP_PORT=2525`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGALERT_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGALERT_GENERAL_LOG_FORMAT");
        override_path(
            &mut self.general.storage_root,
            "LOGALERT_GENERAL_STORAGE_ROOT",
        );

        // Schedule
        override_u64(
            &mut self.schedule.minutes_to_sleep,
            "LOGALERT_SCHEDULE_MINUTES_TO_SLEEP",
        );

        // SMTP
        override_string(&mut self.smtp.address, "LOGALERT_SMTP_ADDRESS");
        override_u16(&mut self.smtp.port, "LOGALERT_SMTP_PORT");
        override_string(&mut self.smtp.sender, "LOGALERT_SMTP_SENDER");
        override_u64(&mut self.smtp.timeout_secs, "LOGALERT_SMTP_TIMEOUT_SECS");
        override_string(&mut self.smtp.helo_name, "LOGALERT_SMTP_HELO_NAME");

        // Retry
        override_u32(&mut self.retry.max_retries, "LOGALERT_RETRY_MAX_RETRIES");
        override_u64(&mut self.retry.backoff_secs, "LOGALERT_RETRY_BACKOFF_SECS");

        // Retention
        override_u64(
            &mut self.retention.max_age_hours,
            "LOGALERT_RETENTION_MAX_AGE_HOURS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGALERT_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGALERT_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGALERT_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 검색어/무시어 충돌은 여기서 검사하지 않습니다.
    /// 사이클마다 [`LogTarget::check_term_conflicts`]로 검사합니다.
    pub fn validate(&self) -> Result<(), LogAlertError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.general.storage_root.as_os_str().is_empty() {
            return Err(invalid("general.storage_root", "must not be empty"));
        }

        if self.schedule.minutes_to_sleep == 0 {
            return Err(invalid(
                "schedule.minutes_to_sleep",
                "must be greater than 0",
            ));
        }

        if self.smtp.address.trim().is_empty() {
            return Err(invalid("smtp.address", "must not be empty"));
        }
        if self.smtp.sender.trim().is_empty() {
            return Err(invalid("smtp.sender", "must not be empty"));
        }
        if self.smtp.timeout_secs == 0 {
            return Err(invalid("smtp.timeout_secs", "must be greater than 0"));
        }

        if self.retention.max_age_hours == 0 {
            return Err(invalid(
                "retention.max_age_hours",
                "must be greater than 0",
            ));
        }

        for (idx, target) in self.targets.iter().enumerate() {
            if target.file_location.trim().is_empty() {
                return Err(invalid(
                    &format!("targets[{idx}].file_location"),
                    "must not be empty",
                ));
            }
            if target.recipients.is_empty() {
                return Err(invalid(
                    &format!("targets[{idx}].recipients"),
                    "at least one recipient is required",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LogAlertError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 오프셋/미전송 매치 저장 루트 디렉토리
    pub storage_root: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            storage_root: PathBuf::from("/var/lib/logalert"),
        }
    }
}

/// 사이클 주기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// 사이클 사이 대기 시간 (분)
    pub minutes_to_sleep: u64,
}

impl ScheduleConfig {
    /// 대기 시간을 `Duration`으로 반환합니다. 표현 범위를 넘으면 최댓값에 고정됩니다.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.minutes_to_sleep.saturating_mul(60))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            minutes_to_sleep: 5,
        }
    }
}

/// SMTP 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// SMTP 서버 호스트
    pub address: String,
    /// SMTP 서버 포트
    pub port: u16,
    /// 발신자 주소
    pub sender: String,
    /// 연결 및 명령 응답 타임아웃 (초)
    pub timeout_secs: u64,
    /// EHLO/HELO에 사용할 호스트 이름
    pub helo_name: String,
}

impl SmtpConfig {
    /// `host:port` 형식의 서버 주소를 반환합니다.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_owned(),
            port: 25,
            sender: "logalert@localhost".to_owned(),
            timeout_secs: 30,
            helo_name: "localhost".to_owned(),
        }
    }
}

/// 메일 재시도 정책 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 첫 시도 이후 최대 재시도 횟수
    pub max_retries: u32,
    /// 재시도 사이 대기 시간 (초)
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_secs: 120,
        }
    }
}

/// 오프셋 레코드 보존 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// 마지막 수정 후 이 시간이 지난 오프셋 레코드를 삭제 (시간)
    pub max_age_hours: u64,
}

impl RetentionConfig {
    /// 보존 기간을 `Duration`으로 반환합니다. 표현 범위를 넘으면 최댓값에 고정됩니다.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(3600))
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_hours: 7 * 24,
        }
    }
}

/// Prometheus 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9187,
        }
    }
}

/// 감시 대상 로그 파일 하나의 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogTarget {
    /// 파일 경로 (`{{{yyyyMMdd}}}` 날짜 플레이스홀더 허용)
    pub file_location: String,
    /// 알림 수신자 목록
    pub recipients: Vec<String>,
    /// 검색어 (정규식, 대소문자 무시)
    pub search_terms: Vec<String>,
    /// 무시어 (정규식, 대소문자 무시, 검색어보다 우선)
    pub ignore_terms: Vec<String>,
}

impl LogTarget {
    /// 무시어 중 검색어와 문자열이 완전히 같은 항목이 있으면 에러를 반환합니다.
    pub fn check_term_conflicts(&self) -> Result<(), TargetError> {
        let search: HashSet<&str> = self.search_terms.iter().map(String::as_str).collect();
        match self
            .ignore_terms
            .iter()
            .find(|term| search.contains(term.as_str()))
        {
            Some(term) => Err(TargetError::TermConflict {
                location: self.file_location.clone(),
                term: term.clone(),
            }),
            None => Ok(()),
        }
    }
}

// --- 레거시 JSON 설정 ---

/// 숫자 또는 숫자 문자열 (`"5"` / `5`)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

impl NumberOrString {
    fn parse(&self, field: &str) -> Result<u64, LogAlertError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(field, format!("'{s}' is not a number: {e}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyJsonConfig {
    minutes_to_sleep: NumberOrString,
    smtp_address: String,
    smtp_port: NumberOrString,
    smtp_sender: String,
    #[serde(default)]
    log_locations: Vec<LegacyLogLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyLogLocation {
    file_location: String,
    #[serde(default)]
    smtp_recipients: Vec<String>,
    #[serde(default)]
    search_terms: Vec<String>,
    #[serde(default)]
    ignore_terms: Vec<String>,
}

impl LegacyJsonConfig {
    fn into_config(self) -> Result<LogAlertConfig, LogAlertError> {
        let minutes_to_sleep = self.minutes_to_sleep.parse("minutesToSleep")?;
        let port = self.smtp_port.parse("smtpPort")?;
        let port = u16::try_from(port)
            .map_err(|_| invalid("smtpPort", format!("{port} is out of range")))?;

        Ok(LogAlertConfig {
            schedule: ScheduleConfig { minutes_to_sleep },
            smtp: SmtpConfig {
                address: self.smtp_address,
                port,
                sender: self.smtp_sender,
                ..SmtpConfig::default()
            },
            targets: self
                .log_locations
                .into_iter()
                .map(|loc| LogTarget {
                    file_location: loc.file_location,
                    recipients: loc.smtp_recipients,
                    search_terms: loc.search_terms,
                    ignore_terms: loc.ignore_terms,
                })
                .collect(),
            ..LogAlertConfig::default()
        })
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_path(target: &mut PathBuf, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = PathBuf::from(val);
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
