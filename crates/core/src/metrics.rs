//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logalert_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logalert_core::metrics::LINES_MATCHED_TOTAL).increment(3);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── 사이클 메트릭 ──────────────────────────────────────────────────

/// 완료된 사이클 수 (counter)
pub const CYCLES_TOTAL: &str = "logalert_cycles_total";

/// 한 사이클 처리 시간 (histogram, 초)
pub const CYCLE_DURATION_SECONDS: &str = "logalert_cycle_duration_seconds";

/// 파일이 없어 건너뛴 대상 수 (counter)
pub const TARGETS_SKIPPED_TOTAL: &str = "logalert_targets_skipped_total";

// ─── 스캔 / 매칭 메트릭 ─────────────────────────────────────────────

/// 스캔한 바이트 수 (counter)
pub const BYTES_SCANNED_TOTAL: &str = "logalert_bytes_scanned_total";

/// 무시어 필터 후 남은 매치 라인 수 (counter)
pub const LINES_MATCHED_TOTAL: &str = "logalert_lines_matched_total";

/// 잘림/로테이션으로 오프셋이 0으로 리셋된 횟수 (counter)
pub const OFFSET_RESETS_TOTAL: &str = "logalert_offset_resets_total";

// ─── 전송 메트릭 ────────────────────────────────────────────────────

/// 메일 전송 시도 수 (counter, label: result)
pub const MAIL_ATTEMPTS_TOTAL: &str = "logalert_mail_attempts_total";

/// 전송 실패 후 미전송 저장소에 기록된 라인 수 (counter)
pub const PENDING_PERSISTED_TOTAL: &str = "logalert_pending_persisted_total";

// ─── 저장소 메트릭 ──────────────────────────────────────────────────

/// 보존 기간이 지나 삭제된 오프셋 레코드 수 (counter)
pub const OFFSETS_SWEPT_TOTAL: &str = "logalert_offsets_swept_total";

/// 오프셋/미전송 저장소 I/O 에러 수 (counter)
pub const STORE_ERRORS_TOTAL: &str = "logalert_store_errors_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(CYCLES_TOTAL, "Total number of completed watch cycles");
    describe_histogram!(
        CYCLE_DURATION_SECONDS,
        "Time to process all targets of one cycle in seconds"
    );
    describe_counter!(
        TARGETS_SKIPPED_TOTAL,
        "Total number of targets skipped because the log file was missing"
    );
    describe_counter!(
        BYTES_SCANNED_TOTAL,
        "Total number of log bytes consumed by the incremental scanner"
    );
    describe_counter!(
        LINES_MATCHED_TOTAL,
        "Total number of lines matching search terms after ignore filtering"
    );
    describe_counter!(
        OFFSET_RESETS_TOTAL,
        "Total number of offset resets caused by truncation or rotation"
    );
    describe_counter!(
        MAIL_ATTEMPTS_TOTAL,
        "Total number of mail delivery attempts by result"
    );
    describe_counter!(
        PENDING_PERSISTED_TOTAL,
        "Total number of matched lines written to the pending store after delivery failure"
    );
    describe_counter!(
        OFFSETS_SWEPT_TOTAL,
        "Total number of stale offset records removed by the retention sweep"
    );
    describe_counter!(
        STORE_ERRORS_TOTAL,
        "Total number of offset or pending store I/O failures"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_use_prefix() {
        for name in [
            CYCLES_TOTAL,
            CYCLE_DURATION_SECONDS,
            TARGETS_SKIPPED_TOTAL,
            BYTES_SCANNED_TOTAL,
            LINES_MATCHED_TOTAL,
            OFFSET_RESETS_TOTAL,
            MAIL_ATTEMPTS_TOTAL,
            PENDING_PERSISTED_TOTAL,
            OFFSETS_SWEPT_TOTAL,
            STORE_ERRORS_TOTAL,
        ] {
            assert!(name.starts_with("logalert_"), "{name}");
        }
    }

    #[test]
    fn describe_all_without_recorder_is_noop() {
        describe_all();
    }
}
