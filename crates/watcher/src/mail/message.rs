//! 알림 메일 본문 및 RFC 5322 메시지 생성

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::matcher::{TermSet, highlight};

/// 매치 라인 뒤에 붙는 시각적 줄바꿈
const LINE_BREAK: &str = "<br><br>";

/// base64 본문 한 줄의 최대 길이 (RFC 2045)
const BASE64_LINE_WIDTH: usize = 76;

/// 전송할 알림 메일
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// 발신자 주소
    pub from: String,
    /// 수신자 주소 (한 트랜잭션으로 전송)
    pub recipients: Vec<String>,
    /// 제목 (스캔한 파일의 절대 경로)
    pub subject: String,
    /// HTML 본문
    pub html_body: String,
}

impl OutgoingMail {
    /// 헤더와 base64 인코딩된 본문을 포함한 전체 메시지를 만듭니다.
    ///
    /// 모든 줄은 CRLF로 끝납니다.
    pub fn to_message(&self, date: &str) -> String {
        let mut message = String::with_capacity(self.html_body.len() * 4 / 3 + 512);
        message.push_str(&format!("To: {}\r\n", self.recipients.join(",")));
        message.push_str(&format!("From: {}\r\n", self.from));
        message.push_str(&format!("Subject: {}\r\n", self.subject));
        message.push_str(&format!("Date: {date}\r\n"));
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/html; charset=\"UTF-8\"\r\n");
        message.push_str("Content-Transfer-Encoding: base64\r\n");
        message.push_str("\r\n");

        let encoded = STANDARD.encode(self.html_body.as_bytes());
        // base64 출력은 ASCII이므로 바이트 단위로 잘라도 안전하다
        for chunk in encoded.as_bytes().chunks(BASE64_LINE_WIDTH) {
            message.push_str(&String::from_utf8_lossy(chunk));
            message.push_str("\r\n");
        }
        message
    }
}

/// 새 매치 다음에 미전송 매치를 이어 붙인 HTML 본문을 만듭니다.
///
/// 각 라인은 검색어 토큰이 강조 표시되고 `<br><br>`로 끝납니다.
pub fn render_body(new_matches: &[String], pending: &[String], search: &TermSet) -> String {
    let mut body = String::new();
    for line in new_matches.iter().chain(pending) {
        body.push_str(&highlight(line, search));
        body.push_str(LINE_BREAK);
    }
    body
}
