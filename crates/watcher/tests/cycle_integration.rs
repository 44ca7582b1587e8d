//! 통합 테스트 -- 설정에서 사이클, 전송, 정리까지의 흐름 검증

use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use logalert_core::config::{LogAlertConfig, LogTarget};
use logalert_watcher::{
    CycleRunner, DeliveryOutcome, MailError, MailSender, OutgoingMail, RetentionSweeper,
    SmtpMailSender, TargetOutcome,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// 전송된 메일을 기록하는 전송기. `fail`이 켜져 있으면 모든 호출이 실패합니다.
#[derive(Default)]
struct RecordingSender {
    fail: Mutex<bool>,
    attempts: Mutex<usize>,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingSender {
    fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

impl MailSender for RecordingSender {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        *self.attempts.lock().unwrap() += 1;
        if *self.fail.lock().unwrap() {
            return Err(MailError::Connect {
                addr: "127.0.0.1:25".to_owned(),
                reason: "connection refused".to_owned(),
            });
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

fn config_for(storage_root: &std::path::Path, targets: Vec<LogTarget>) -> LogAlertConfig {
    let mut config = LogAlertConfig::default();
    config.general.storage_root = storage_root.to_path_buf();
    config.smtp.sender = "logalert@example.com".to_owned();
    config.targets = targets;
    config
}

fn target(path: &std::path::Path, search: &[&str], ignore: &[&str]) -> LogTarget {
    LogTarget {
        file_location: path.display().to_string(),
        recipients: vec!["ops@example.com".to_owned()],
        search_terms: search.iter().map(|s| (*s).to_owned()).collect(),
        ignore_terms: ignore.iter().map(|s| (*s).to_owned()).collect(),
    }
}

fn append(path: &std::path::Path, text: &str) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

/// 여러 대상, 여러 사이클에 걸친 증분 스캔
#[tokio::test(start_paused = true)]
async fn test_incremental_cycles_over_two_targets() {
    let logs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let app = logs.path().join("app.log");
    let web = logs.path().join("web.log");
    append(&app, "boot ok\nERROR db down\n");
    append(&web, "GET / 200\n");

    let config = config_for(
        storage.path(),
        vec![
            target(&app, &["error"], &[]),
            target(&web, &["5\\d\\d$"], &[]),
        ],
    );
    let sender = Arc::new(RecordingSender::default());
    let runner = CycleRunner::from_config(&config, Arc::clone(&sender));

    let reports = runner.run_cycle(&config.targets).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].new_matches, 1);
    assert_eq!(reports[1].outcome, TargetOutcome::Quiet);

    append(&web, "GET /api 503\n");
    let reports = runner.run_cycle(&config.targets).await.unwrap();
    assert_eq!(reports[0].outcome, TargetOutcome::Quiet);
    assert_eq!(reports[1].new_matches, 1);

    let sent = sender.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].subject.ends_with("app.log"));
    assert!(sent[1].subject.ends_with("web.log"));
}

/// 서버 장애 동안 쌓인 매치는 복구 후 한 통으로 전송된다
#[tokio::test(start_paused = true)]
async fn test_outage_backlog_is_flushed_after_recovery() {
    let logs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let app = logs.path().join("app.log");
    append(&app, "ERROR one\n");

    let config = config_for(storage.path(), vec![target(&app, &["error"], &[])]);
    let sender = Arc::new(RecordingSender::default());
    sender.set_failing(true);
    let runner = CycleRunner::from_config(&config, Arc::clone(&sender));

    let first = runner.run_cycle(&config.targets).await.unwrap();
    assert!(matches!(
        first[0].outcome,
        TargetOutcome::Dispatched(DeliveryOutcome::Deferred { attempts: 6, .. })
    ));
    assert_eq!(sender.attempts(), 6);

    append(&app, "ERROR two\n");
    let second = runner.run_cycle(&config.targets).await.unwrap();
    assert!(matches!(
        second[0].outcome,
        TargetOutcome::Dispatched(DeliveryOutcome::Deferred { attempts: 6, .. })
    ));
    assert_eq!(
        runner.pending().read_all("app.log").await.unwrap(),
        vec!["ERROR one", "ERROR two"]
    );

    sender.set_failing(false);
    append(&app, "ERROR three\n");
    runner.run_cycle(&config.targets).await.unwrap();

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    let body = &sent[0].html_body;
    let three = body.find("three").unwrap();
    let one = body.find("one").unwrap();
    let two = body.find("two").unwrap();
    assert!(three < one && one < two);
    assert!(runner.pending().read_all("app.log").await.unwrap().is_empty());
}

/// 로그 로테이션 후에는 새 파일을 처음부터 읽는다
#[tokio::test(start_paused = true)]
async fn test_rotation_rescans_replaced_file() {
    let logs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let app = logs.path().join("app.log");
    append(&app, &"filler line\n".repeat(50));

    let config = config_for(storage.path(), vec![target(&app, &["panic"], &[])]);
    let sender = Arc::new(RecordingSender::default());
    let runner = CycleRunner::from_config(&config, Arc::clone(&sender));
    runner.run_cycle(&config.targets).await.unwrap();

    std::fs::write(&app, "panic: short\n").unwrap();
    let reports = runner.run_cycle(&config.targets).await.unwrap();

    assert_eq!(reports[0].start_offset, 0);
    assert_eq!(reports[0].new_matches, 1);
    assert_eq!(sender.sent().len(), 1);
}

/// 정리기는 오래된 오프셋만 지우고, 지워진 대상은 처음부터 다시 스캔된다
#[tokio::test]
async fn test_swept_offset_restarts_scan() {
    let logs = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let app = logs.path().join("app.log");
    append(&app, "ERROR once\n");

    let config = config_for(storage.path(), vec![target(&app, &["error"], &[])]);
    let sender = Arc::new(RecordingSender::default());
    let runner = CycleRunner::from_config(&config, Arc::clone(&sender));
    runner.run_cycle(&config.targets).await.unwrap();
    assert_eq!(runner.offsets().get("app.log").await.unwrap(), 11);

    let sweeper = RetentionSweeper::new(runner.offsets(), config.retention.max_age());
    let later = SystemTime::now() + config.retention.max_age() + Duration::from_secs(60);
    let report = sweeper.sweep(later).await.unwrap();
    assert_eq!(report.removed, vec!["app.log".to_owned()]);

    runner.run_cycle(&config.targets).await.unwrap();
    assert_eq!(sender.sent().len(), 2);
}

/// 가짜 SMTP 서버로 실제 TCP 전송 경로 검증
#[tokio::test]
async fn test_smtp_sender_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut stream = BufReader::new(socket);
        let mut transcript = Vec::new();
        let mut in_data = false;
        stream.write_all(b"220 fake ESMTP\r\n").await.unwrap();
        loop {
            let mut line = String::new();
            if stream.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            if in_data {
                if line == ".\r\n" {
                    in_data = false;
                    stream.write_all(b"250 queued\r\n").await.unwrap();
                } else {
                    transcript.push(line);
                }
                continue;
            }
            let reply: &[u8] = if line.starts_with("DATA") {
                in_data = true;
                b"354 go ahead\r\n"
            } else if line.starts_with("QUIT") {
                stream.write_all(b"221 bye\r\n").await.unwrap();
                break;
            } else {
                b"250 ok\r\n"
            };
            stream.write_all(reply).await.unwrap();
        }
        transcript.concat()
    });

    let mut config = LogAlertConfig::default();
    config.smtp.address = "127.0.0.1".to_owned();
    config.smtp.port = port;
    let sender = SmtpMailSender::from_config(&config.smtp);

    let mail = OutgoingMail {
        from: "logalert@example.com".to_owned(),
        recipients: vec!["ops@example.com".to_owned()],
        subject: "/var/log/app.log".to_owned(),
        html_body: "ERROR disk full<br><br>".to_owned(),
    };
    sender.send(&mail).await.unwrap();

    let message = server.await.unwrap();
    assert!(message.contains("Subject: /var/log/app.log\r\n"));
    assert!(message.contains("Content-Transfer-Encoding: base64\r\n"));
}
