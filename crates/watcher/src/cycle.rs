//! 사이클 실행기
//!
//! [`CycleRunner`]는 설정된 감시 대상을 순서대로 하나씩 처리합니다.
//!
//! ```text
//! RESOLVE_PATH -> VALIDATE_TERMS -> LOAD_OFFSET -> CHECK_TRUNCATION -> SCAN
//!   -> LOAD_PENDING -> DISPATCH (매치 또는 미전송 매치가 있을 때) -> SAVE_OFFSET
//! ```
//!
//! 경로 해석과 검색어 검증 실패만 [`CycleError::Fatal`]로 사이클을 중단합니다.
//! 저장소, 스캔, 전송 에러는 로그를 남기고 해당 대상의 [`TargetReport`]에 반영합니다.
//! 매치를 전송하지도 미전송 저장소에 보관하지도 못했다면 오프셋을 저장하지 않아
//! 다음 사이클에 같은 범위를 다시 스캔합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use logalert_core::config::{LogAlertConfig, LogTarget};
use logalert_core::metrics as m;
use tracing::{error, info, warn};

use crate::dispatch::{AlertBatch, AlertDispatcher, DeliveryOutcome, RetryPolicy};
use crate::error::CycleError;
use crate::mail::MailSender;
use crate::matcher::TermSet;
use crate::placeholder::{log_identity, resolve_location};
use crate::scanner::{self, effective_start_offset};
use crate::store::{OffsetStore, PendingStore};

/// 대상 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// 파일이 없어 건너뜀 (오프셋 기록 안 함)
    Skipped,
    /// 스캔 실패 (오프셋 기록 안 함)
    ScanFailed {
        /// 실패 사유
        reason: String,
    },
    /// 보낼 매치가 없음
    Quiet,
    /// 전송 시도함
    Dispatched(DeliveryOutcome),
}

/// 대상 하나에 대한 사이클 보고서
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    /// 로그 식별자 (파일 base name)
    pub identity: String,
    /// 플레이스홀더를 치환한 경로
    pub path: PathBuf,
    /// 스캔 시작 오프셋
    pub start_offset: u64,
    /// 스캔이 끝난 오프셋 (전송과 보관이 모두 실패하면 저장하지 않음)
    pub end_offset: u64,
    /// 이번 사이클의 새 매치 수
    pub new_matches: usize,
    /// 함께 전송한 미전송 매치 수
    pub pending_matches: usize,
    /// 처리 결과
    pub outcome: TargetOutcome,
}

impl TargetReport {
    fn new(identity: String, path: PathBuf, outcome: TargetOutcome) -> Self {
        Self {
            identity,
            path,
            start_offset: 0,
            end_offset: 0,
            new_matches: 0,
            pending_matches: 0,
            outcome,
        }
    }
}

/// 감시 대상 순차 처리기
pub struct CycleRunner<M: MailSender> {
    offsets: OffsetStore,
    dispatcher: AlertDispatcher<M>,
}

impl<M: MailSender> CycleRunner<M> {
    /// 저장소와 전송기로 실행기를 만듭니다.
    pub fn new(offsets: OffsetStore, dispatcher: AlertDispatcher<M>) -> Self {
        Self {
            offsets,
            dispatcher,
        }
    }

    /// 설정에서 저장소, 재시도 정책, 발신자를 읽어 실행기를 만듭니다.
    pub fn from_config(config: &LogAlertConfig, sender: Arc<M>) -> Self {
        let root = &config.general.storage_root;
        let dispatcher = AlertDispatcher::new(
            sender,
            PendingStore::new(root),
            RetryPolicy::from_config(&config.retry),
            config.smtp.sender.clone(),
        );
        Self::new(OffsetStore::new(root), dispatcher)
    }

    /// 오프셋 저장소를 반환합니다.
    pub fn offsets(&self) -> &OffsetStore {
        &self.offsets
    }

    /// 미전송 매치 저장소를 반환합니다.
    pub fn pending(&self) -> &PendingStore {
        self.dispatcher.pending_store()
    }

    /// 오늘 날짜로 모든 대상을 한 번 처리합니다.
    pub async fn run_cycle(&self, targets: &[LogTarget]) -> Result<Vec<TargetReport>, CycleError> {
        self.run_cycle_on(targets, chrono::Local::now().date_naive())
            .await
    }

    /// 주어진 날짜로 플레이스홀더를 치환해 모든 대상을 한 번 처리합니다.
    ///
    /// 치명적 에러가 나면 남은 대상은 처리하지 않습니다.
    pub async fn run_cycle_on(
        &self,
        targets: &[LogTarget],
        date: NaiveDate,
    ) -> Result<Vec<TargetReport>, CycleError> {
        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            reports.push(self.run_target(target, date).await?);
        }
        Ok(reports)
    }

    /// 대상 하나를 처리합니다.
    pub async fn run_target(
        &self,
        target: &LogTarget,
        date: NaiveDate,
    ) -> Result<TargetReport, CycleError> {
        let path = resolve_location(&target.file_location, date)?;
        target.check_term_conflicts()?;

        let identity = log_identity(&path)?;
        let search = TermSet::compile(&target.search_terms);
        let ignore = TermSet::compile(&target.ignore_terms);

        let stored = match self.offsets.get(&identity).await {
            Ok(offset) => offset,
            Err(e) => {
                metrics::counter!(m::STORE_ERRORS_TOTAL).increment(1);
                error!(identity = %identity, error = %e, "failed to read offset, scanning from start");
                0
            }
        };

        let file_len = match scanner::file_len(&path).await {
            Ok(Some(len)) => len,
            Ok(None) => return Ok(self.skip(identity, path)),
            Err(e) => return Ok(scan_failed(identity, path, e.to_string())),
        };

        let start_offset = effective_start_offset(stored, file_len);
        if start_offset != stored {
            metrics::counter!(m::OFFSET_RESETS_TOTAL).increment(1);
            info!(
                path = %path.display(),
                stored,
                file_len,
                "file is smaller than stored offset, rescanning from start"
            );
        }

        let scan = match scanner::scan(&path, &search, &ignore, start_offset).await {
            Ok(Some(scan)) => scan,
            // 크기 확인 후 스캔 전에 파일이 사라진 경우
            Ok(None) => return Ok(self.skip(identity, path)),
            Err(e) => return Ok(scan_failed(identity, path, e.to_string())),
        };

        metrics::counter!(m::BYTES_SCANNED_TOTAL).increment(scan.bytes_consumed());
        metrics::counter!(m::LINES_MATCHED_TOTAL).increment(scan.matches.len() as u64);

        let pending = match self.pending().read_all(&identity).await {
            Ok(lines) => lines,
            Err(e) => {
                metrics::counter!(m::STORE_ERRORS_TOTAL).increment(1);
                error!(identity = %identity, error = %e, "failed to read pending matches, sending new matches only");
                Vec::new()
            }
        };

        info!(
            path = %path.display(),
            matches = scan.matches.len(),
            pending = pending.len(),
            "scanned log target"
        );

        let outcome = if scan.matches.is_empty() && pending.is_empty() {
            TargetOutcome::Quiet
        } else {
            let subject = absolute_subject(&path);
            let batch = AlertBatch {
                identity: &identity,
                subject: &subject,
                recipients: &target.recipients,
                search: &search,
                new_matches: &scan.matches,
                pending: &pending,
            };
            TargetOutcome::Dispatched(self.dispatcher.deliver(&batch).await)
        };

        if matches!(outcome, TargetOutcome::Dispatched(DeliveryOutcome::Lost { .. })) {
            // 전송도 보관도 못 한 라인은 다음 사이클에 다시 스캔한다
            warn!(
                identity = %identity,
                start_offset = scan.start_offset,
                end_offset = scan.end_offset,
                "matches were neither delivered nor stored, offset kept for rescan"
            );
        } else if let Err(e) = self.offsets.put(&identity, scan.end_offset).await {
            metrics::counter!(m::STORE_ERRORS_TOTAL).increment(1);
            error!(identity = %identity, offset = scan.end_offset, error = %e, "failed to save offset");
        }

        Ok(TargetReport {
            identity,
            path,
            start_offset: scan.start_offset,
            end_offset: scan.end_offset,
            new_matches: scan.matches.len(),
            pending_matches: pending.len(),
            outcome,
        })
    }

    fn skip(&self, identity: String, path: PathBuf) -> TargetReport {
        metrics::counter!(m::TARGETS_SKIPPED_TOTAL).increment(1);
        warn!(path = %path.display(), "log file not found, skipping target");
        TargetReport::new(identity, path, TargetOutcome::Skipped)
    }
}

fn scan_failed(identity: String, path: PathBuf, reason: String) -> TargetReport {
    error!(path = %path.display(), error = %reason, "failed to scan log target");
    TargetReport::new(identity, path, TargetOutcome::ScanFailed { reason })
}

/// 메일 제목으로 쓰는 절대 경로
fn absolute_subject(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
