//! 파일 경로 날짜 플레이스홀더 치환
//!
//! `"/var/log/app-{{{yyyyMMdd}}}.log"` 처럼 `{{{` 와 `}}}` 사이에 날짜 형식
//! 토큰을 하나 적으면 스캔 시점의 현지 날짜로 치환합니다.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use logalert_core::error::TargetError;

const OPEN: &str = "{{{";
const CLOSE: &str = "}}}";

/// 지원하는 토큰과 chrono 형식 문자열
const SUPPORTED_TOKENS: &[(&str, &str)] = &[("yyyyMMdd", "%Y%m%d")];

/// 파일 경로의 플레이스홀더를 주어진 날짜로 치환합니다.
///
/// 플레이스홀더가 없으면 경로를 그대로 반환합니다.
/// 닫는 구분자가 없거나, 토큰이 지원되지 않거나, 플레이스홀더가 두 개 이상이면
/// [`TargetError::PlaceholderFormat`]을 반환합니다.
pub fn resolve_location(location: &str, date: NaiveDate) -> Result<PathBuf, TargetError> {
    let Some(open) = location.find(OPEN) else {
        return Ok(PathBuf::from(location));
    };

    let prefix = &location[..open];
    let rest = &location[open + OPEN.len()..];
    let close = rest
        .find(CLOSE)
        .ok_or_else(|| placeholder_error(location, "missing closing '}}}'"))?;
    let token = &rest[..close];
    let suffix = &rest[close + CLOSE.len()..];

    if suffix.contains(OPEN) {
        return Err(placeholder_error(
            location,
            "only one date placeholder is supported",
        ));
    }

    let (_, format) = SUPPORTED_TOKENS
        .iter()
        .find(|(name, _)| *name == token)
        .ok_or_else(|| placeholder_error(location, format!("unsupported token '{token}'")))?;

    Ok(PathBuf::from(format!(
        "{prefix}{}{suffix}",
        date.format(format)
    )))
}

/// 오프셋/미전송 저장소 키로 쓰이는 로그 식별자 (파일 base name)
///
/// 다른 디렉토리의 같은 이름 파일은 같은 식별자를 갖습니다.
/// 파일 이름이 없는 경로(`..`로 끝나거나 루트)는 [`TargetError::NoFileName`]입니다.
pub fn log_identity(path: &Path) -> Result<String, TargetError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| TargetError::NoFileName {
            location: path.display().to_string(),
        })
}

fn placeholder_error(location: &str, reason: impl Into<String>) -> TargetError {
    TargetError::PlaceholderFormat {
        location: location.to_owned(),
        reason: reason.into(),
    }
}
