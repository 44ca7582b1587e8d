//! 알림 전송 및 재시도 정책
//!
//! [`AlertDispatcher`]는 새 매치와 미전송 매치를 한 통의 메일로 묶어 보냅니다.
//!
//! # 재시도 정책
//! 전송이 실패하면 [`RetryPolicy::backoff`]만큼 기다린 뒤 같은 메일을 다시 보냅니다.
//! `max_retries`번 재시도해도 실패하면 이번 사이클에서 새로 찾은 매치만
//! [`PendingStore`]에 추가합니다. 이미 저장된 미전송 매치는 그대로 남아
//! 다음 사이클에 함께 전송됩니다.
//!
//! 재시도 대기는 호출자를 그대로 멈춥니다. 대기 중에는 다른 대상도 처리되지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use logalert_core::config::RetryConfig;
use logalert_core::metrics as m;
use tracing::{error, info, warn};

use crate::mail::{MailSender, OutgoingMail, render_body};
use crate::matcher::TermSet;
use crate::store::PendingStore;

/// 전송 실패 시 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 첫 시도 이후 최대 재시도 횟수
    pub max_retries: u32,
    /// 재시도 사이 대기 시간
    pub backoff: Duration,
}

impl RetryPolicy {
    /// 설정에서 정책을 만듭니다.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_secs(config.backoff_secs),
        }
    }

    /// 첫 시도를 포함한 최대 시도 횟수
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// 한 대상에 대한 전송 요청
#[derive(Debug, Clone, Copy)]
pub struct AlertBatch<'a> {
    /// 로그 식별자 (미전송 저장소 키)
    pub identity: &'a str,
    /// 메일 제목 (스캔한 파일의 절대 경로)
    pub subject: &'a str,
    /// 수신자
    pub recipients: &'a [String],
    /// 하이라이트에 사용할 검색어
    pub search: &'a TermSet,
    /// 이번 사이클에서 새로 찾은 매치
    pub new_matches: &'a [String],
    /// 이전 사이클에서 전송하지 못한 매치
    pub pending: &'a [String],
}

/// 전송 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 전송 성공, 미전송 저장소는 비워짐
    Delivered {
        /// 성공까지의 시도 횟수
        attempts: u32,
    },
    /// 재시도 소진, 새 매치를 미전송 저장소에 보관함
    Deferred {
        /// 총 시도 횟수
        attempts: u32,
        /// 저장소에 추가한 라인 수
        persisted: usize,
    },
    /// 재시도 소진 후 보관마저 실패함
    Lost {
        /// 총 시도 횟수
        attempts: u32,
        /// 보관 실패 사유
        reason: String,
    },
}

impl DeliveryOutcome {
    /// 전송에 성공했는지 확인합니다.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// 총 시도 횟수를 반환합니다.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Delivered { attempts }
            | Self::Deferred { attempts, .. }
            | Self::Lost { attempts, .. } => *attempts,
        }
    }
}

/// 알림 전송기
pub struct AlertDispatcher<M: MailSender> {
    /// 메일 전송 수단
    sender: Arc<M>,
    /// 미전송 매치 저장소
    pending: PendingStore,
    /// 재시도 정책
    policy: RetryPolicy,
    /// 발신자 주소
    from: String,
}

impl<M: MailSender> AlertDispatcher<M> {
    /// 새 전송기를 만듭니다.
    pub fn new(
        sender: Arc<M>,
        pending: PendingStore,
        policy: RetryPolicy,
        from: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            pending,
            policy,
            from: from.into(),
        }
    }

    /// 미전송 매치 저장소를 반환합니다.
    pub fn pending_store(&self) -> &PendingStore {
        &self.pending
    }

    /// 매치를 한 통의 메일로 전송합니다.
    ///
    /// 성공하면 `batch.pending`이 비어 있지 않은 경우에만 미전송 저장소를 비웁니다.
    /// 저장소 읽기에 실패해 `pending`을 빈 목록으로 넘긴 경우에도 보관된 라인이
    /// 지워지지 않습니다.
    pub async fn deliver(&self, batch: &AlertBatch<'_>) -> DeliveryOutcome {
        let mail = OutgoingMail {
            from: self.from.clone(),
            recipients: batch.recipients.to_vec(),
            subject: batch.subject.to_owned(),
            html_body: render_body(batch.new_matches, batch.pending, batch.search),
        };

        info!(
            identity = batch.identity,
            recipients = %batch.recipients.join(","),
            new = batch.new_matches.len(),
            pending = batch.pending.len(),
            "sending alert mail"
        );

        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.sender.send(&mail).await {
                Ok(()) => {
                    metrics::counter!(m::MAIL_ATTEMPTS_TOTAL, m::LABEL_RESULT => "success")
                        .increment(1);
                    info!(identity = batch.identity, attempt, "alert mail delivered");
                    self.clear_delivered(batch).await;
                    return DeliveryOutcome::Delivered { attempts: attempt };
                }
                Err(e) => {
                    metrics::counter!(m::MAIL_ATTEMPTS_TOTAL, m::LABEL_RESULT => "failure")
                        .increment(1);
                    warn!(
                        identity = batch.identity,
                        attempt,
                        max_attempts,
                        error = %e,
                        "alert mail delivery failed"
                    );
                }
            }

            if attempt >= max_attempts {
                break;
            }
            tokio::time::sleep(self.policy.backoff).await;
        }

        self.persist_undelivered(batch, attempt).await
    }

    async fn clear_delivered(&self, batch: &AlertBatch<'_>) {
        if batch.pending.is_empty() {
            return;
        }
        if let Err(e) = self.pending.clear(batch.identity).await {
            metrics::counter!(m::STORE_ERRORS_TOTAL).increment(1);
            error!(
                identity = batch.identity,
                error = %e,
                "failed to clear delivered pending matches, they will be sent again"
            );
        }
    }

    async fn persist_undelivered(&self, batch: &AlertBatch<'_>, attempts: u32) -> DeliveryOutcome {
        info!(
            identity = batch.identity,
            lines = batch.new_matches.len(),
            "writing undelivered matches to pending store"
        );

        match self.pending.append(batch.identity, batch.new_matches).await {
            Ok(()) => {
                metrics::counter!(m::PENDING_PERSISTED_TOTAL)
                    .increment(batch.new_matches.len() as u64);
                DeliveryOutcome::Deferred {
                    attempts,
                    persisted: batch.new_matches.len(),
                }
            }
            Err(e) => {
                metrics::counter!(m::STORE_ERRORS_TOTAL).increment(1);
                error!(
                    identity = batch.identity,
                    lines = batch.new_matches.len(),
                    error = %e,
                    "failed to persist undelivered matches"
                );
                DeliveryOutcome::Lost {
                    attempts,
                    reason: e.to_string(),
                }
            }
        }
    }
}
