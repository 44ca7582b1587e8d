//! 평문 SMTP 클라이언트
//!
//! 알림 메일 한 통을 한 번의 연결로 보냅니다.
//!
//! ```text
//! S: 220 greeting
//! C: EHLO <helo_name>        (거부되면 HELO)
//! C: MAIL FROM:<sender>
//! C: RCPT TO:<recipient>     (수신자마다, 하나라도 거부되면 전체 실패)
//! C: DATA
//! C: <dot-stuffed message>
//! C: .
//! C: QUIT
//! ```
//!
//! 모든 응답 대기는 설정된 타임아웃으로 제한됩니다.

use std::time::Duration;

use logalert_core::config::SmtpConfig;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::{MailSender, OutgoingMail};
use crate::error::MailError;

/// TCP 기반 SMTP 전송기
#[derive(Debug, Clone)]
pub struct SmtpMailSender {
    /// `host:port`
    server_addr: String,
    /// EHLO/HELO 호스트 이름
    helo_name: String,
    /// 연결 및 응답 타임아웃
    timeout: Duration,
}

impl SmtpMailSender {
    /// SMTP 설정으로 전송기를 만듭니다.
    pub fn from_config(config: &SmtpConfig) -> Self {
        Self {
            server_addr: config.server_addr(),
            helo_name: config.helo_name.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// 서버 주소를 반환합니다.
    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }
}

impl MailSender for SmtpMailSender {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let stream = timeout(self.timeout, TcpStream::connect(&self.server_addr))
            .await
            .map_err(|_| MailError::Timeout {
                stage: "connect".to_owned(),
            })?
            .map_err(|e| MailError::Connect {
                addr: self.server_addr.clone(),
                reason: e.to_string(),
            })?;

        let date = chrono::Local::now().to_rfc2822();
        let mut session = SmtpSession::new(stream, self.timeout);
        session.deliver(&self.helo_name, mail, &date).await
    }
}

/// 연결 하나에 대한 SMTP 대화 상태
pub(crate) struct SmtpSession<S> {
    stream: BufReader<S>,
    timeout: Duration,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S, timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            timeout,
        }
    }

    /// 인사부터 QUIT까지 전체 트랜잭션을 수행합니다.
    pub(crate) async fn deliver(
        &mut self,
        helo_name: &str,
        mail: &OutgoingMail,
        date: &str,
    ) -> Result<(), MailError> {
        self.expect("greeting", &[220]).await?;

        match self
            .command("EHLO", &format!("EHLO {helo_name}"), &[250])
            .await
        {
            Ok(()) => {}
            Err(MailError::Rejected { .. }) => {
                self.command("HELO", &format!("HELO {helo_name}"), &[250])
                    .await?;
            }
            Err(e) => return Err(e),
        }

        self.command("MAIL", &format!("MAIL FROM:<{}>", mail.from), &[250])
            .await?;

        for recipient in &mail.recipients {
            self.command("RCPT", &format!("RCPT TO:<{recipient}>"), &[250, 251])
                .await?;
        }

        self.command("DATA", "DATA", &[354]).await?;
        self.write_raw(&dot_stuff(&mail.to_message(date))).await?;
        self.expect("end of data", &[250]).await?;

        // 메시지는 이미 수락됨. QUIT 실패는 전송 결과에 영향을 주지 않는다
        if let Err(e) = self.command("QUIT", "QUIT", &[221]).await {
            debug!(error = %e, "QUIT failed after successful delivery");
        }
        Ok(())
    }

    async fn command(&mut self, stage: &str, line: &str, accept: &[u16]) -> Result<(), MailError> {
        self.write_raw(&format!("{line}\r\n")).await?;
        self.expect(stage, accept).await
    }

    async fn write_raw(&mut self, data: &str) -> Result<(), MailError> {
        self.stream.write_all(data.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn expect(&mut self, stage: &str, accept: &[u16]) -> Result<(), MailError> {
        let (code, message) = self.read_reply(stage).await?;
        if accept.contains(&code) {
            debug!(stage, code, "smtp reply accepted");
            Ok(())
        } else {
            Err(MailError::Rejected {
                stage: stage.to_owned(),
                code,
                message,
            })
        }
    }

    /// 여러 줄 응답(`250-...`)을 마지막 줄(`250 ...`)까지 읽습니다.
    async fn read_reply(&mut self, stage: &str) -> Result<(u16, String), MailError> {
        let mut message = String::new();
        loop {
            let mut line = String::new();
            let read = timeout(self.timeout, self.stream.read_line(&mut line))
                .await
                .map_err(|_| MailError::Timeout {
                    stage: stage.to_owned(),
                })??;
            if read == 0 {
                return Err(MailError::Protocol(format!(
                    "connection closed during {stage}"
                )));
            }

            let line = line.trim_end();
            let code = line
                .get(..3)
                .and_then(|c| c.parse::<u16>().ok())
                .ok_or_else(|| MailError::Protocol(format!("malformed reply: '{line}'")))?;

            if !message.is_empty() {
                message.push('\n');
            }
            message.push_str(line.get(4..).unwrap_or(""));

            if line.as_bytes().get(3) != Some(&b'-') {
                return Ok((code, message));
            }
        }
    }
}

/// DATA 본문: `.`로 시작하는 줄은 `..`로 바꾸고 종료 시퀀스를 붙입니다.
fn dot_stuff(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 8);
    for line in message.split_inclusive("\r\n") {
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
    }
    if !out.ends_with("\r\n") {
        out.push_str("\r\n");
    }
    out.push_str(".\r\n");
    out
}
