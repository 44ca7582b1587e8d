//! logalert 감시 엔진
//!
//! 로그 파일을 마지막 오프셋부터 증분 스캔하고, 검색어와 매칭되는 라인을
//! 메일로 전송합니다. 전송에 실패한 라인은 미전송 저장소에 보관했다가
//! 다음 사이클에 함께 보냅니다.
//!
//! # 모듈 구성
//!
//! - [`matcher`]: 검색어/무시어 정규식 매칭 및 HTML 하이라이트
//! - [`placeholder`]: 파일 경로 날짜 플레이스홀더 치환, 로그 식별자
//! - [`scanner`]: 오프셋 기반 증분 스캔, 잘림 감지
//! - [`store`]: 오프셋/미전송 매치 파일 저장소
//! - [`mail`]: 메일 메시지 생성, `MailSender` trait, SMTP 클라이언트
//! - [`dispatch`]: 알림 전송 및 재시도 정책
//! - [`cycle`]: 감시 대상 순차 처리
//! - [`sweeper`]: 오래된 오프셋 레코드 정리
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! LogTarget -> placeholder -> scanner -> matcher -> dispatch -> MailSender
//!                               |                     |
//!                          OffsetStore           PendingStore
//! ```

pub mod cycle;
pub mod dispatch;
pub mod error;
pub mod mail;
pub mod matcher;
pub mod placeholder;
pub mod scanner;
pub mod store;
pub mod sweeper;

// --- 주요 타입 re-export ---

// 사이클
pub use cycle::{CycleRunner, TargetOutcome, TargetReport};

// 전송
pub use dispatch::{AlertBatch, AlertDispatcher, DeliveryOutcome, RetryPolicy};
pub use mail::{MailSender, OutgoingMail, SmtpMailSender};

// 에러
pub use error::{CycleError, MailError, StoreError, WatcherError};

// 매칭
pub use matcher::TermSet;

// 저장소
pub use store::{OffsetStore, PendingStore};

// 정리
pub use sweeper::{RetentionSweeper, SweepReport};
