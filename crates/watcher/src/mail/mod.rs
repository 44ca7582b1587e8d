//! 메일 전송 추상화
//!
//! [`MailSender`] trait은 실제 전송 수단을 감춥니다. 운영 환경에서는
//! [`SmtpMailSender`]를, 테스트에서는 `MockMailSender`를 사용합니다.
//!
//! ```text
//! ┌─────────────────┐
//! │ AlertDispatcher │
//! └────────┬────────┘
//!          │
//!          ▼
//!   ┌────────────┐
//!   │ MailSender │ (trait)
//!   └────────────┘
//!       │      │
//!       ▼      ▼
//!   ┌──────┐ ┌──────┐
//!   │ SMTP │ │ Mock │
//!   └──────┘ └──────┘
//! ```

pub mod message;
pub mod smtp;

pub use message::{OutgoingMail, render_body};
pub use smtp::SmtpMailSender;

use std::future::Future;

use crate::error::MailError;

/// 메일 전송 수단
///
/// 한 번의 호출은 모든 수신자에 대한 하나의 트랜잭션입니다.
/// 수신자 하나라도 거부되면 전체가 실패해야 합니다.
pub trait MailSender: Send + Sync + 'static {
    /// 메일을 전송합니다.
    fn send(&self, mail: &OutgoingMail) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// 테스트용 Mock 메일 전송기
///
/// 처음 `fail_first`번의 호출은 실패하고 이후 호출은 성공합니다.
/// 전송된 메일과 총 호출 횟수를 기록합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockMailSender {
    /// 실패시킬 초기 호출 수
    pub fail_first: usize,
    /// 총 호출 횟수
    pub attempts: std::sync::atomic::AtomicUsize,
    /// 성공적으로 전송된 메일
    pub sent: std::sync::Mutex<Vec<OutgoingMail>>,
}

#[cfg(test)]
impl MockMailSender {
    /// 항상 성공하는 전송기를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 처음 `n`번의 호출이 실패하도록 설정합니다.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// 항상 실패하도록 설정합니다.
    pub fn always_failing(self) -> Self {
        self.failing_first(usize::MAX)
    }

    /// 총 호출 횟수를 반환합니다.
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// 전송된 메일 목록을 복사해 반환합니다.
    pub fn sent_mails(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl MailSender for MockMailSender {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let attempt = self
            .attempts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(MailError::Rejected {
                stage: "RCPT".to_owned(),
                code: 450,
                message: "mock failure".to_owned(),
            });
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}
