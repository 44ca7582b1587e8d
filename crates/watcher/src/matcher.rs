//! 검색어/무시어 매칭 -- 정규식 컴파일 캐싱 및 하이라이트
//!
//! [`TermSet`]은 설정의 검색어(또는 무시어) 목록을 한 번만 컴파일해 보관합니다.
//! 각 항목은 소문자로 변환한 뒤 정규식으로 컴파일하며, 평가할 라인도 소문자로
//! 변환하므로 매칭은 대소문자를 구분하지 않습니다.
//!
//! 잘못된 정규식은 경고를 남기고 매칭에서 제외합니다 (절대 매칭되지 않음).

use regex::Regex;
use tracing::warn;

/// 하이라이트 시 토큰을 감싸는 시작 태그
const HIGHLIGHT_OPEN: &str = r#"<span style="color:#EC5C46">"#;
/// 하이라이트 종료 태그
const HIGHLIGHT_CLOSE: &str = "</span>";

/// 컴파일에 실패한 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTerm {
    /// 설정에 적힌 원본 항목
    pub term: String,
    /// 정규식 컴파일 에러 메시지
    pub reason: String,
}

/// 컴파일된 검색어/무시어 집합
#[derive(Debug, Clone, Default)]
pub struct TermSet {
    /// 컴파일에 성공한 정규식 (설정 순서 유지)
    patterns: Vec<Regex>,
    /// 컴파일에 실패한 항목
    rejected: Vec<RejectedTerm>,
}

impl TermSet {
    /// 항목 목록을 컴파일합니다.
    ///
    /// 실패한 항목은 [`rejected`](Self::rejected)에 기록되고 매칭에서 빠집니다.
    pub fn compile<S: AsRef<str>>(terms: &[S]) -> Self {
        let mut patterns = Vec::with_capacity(terms.len());
        let mut rejected = Vec::new();

        for term in terms {
            let term = term.as_ref();
            match Regex::new(&term.to_lowercase()) {
                Ok(regex) => patterns.push(regex),
                Err(e) => {
                    warn!(term, error = %e, "invalid term pattern, it will never match");
                    rejected.push(RejectedTerm {
                        term: term.to_owned(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Self { patterns, rejected }
    }

    /// 라인이 하나 이상의 항목과 매칭되면 `true`를 반환합니다.
    ///
    /// 집합이 비어 있으면 항상 `false`입니다.
    pub fn matches(&self, line: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let lowered = line.to_lowercase();
        self.patterns.iter().any(|re| re.is_match(&lowered))
    }

    /// 유효한 패턴이 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// 유효한 패턴 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// 컴파일에 실패한 항목을 반환합니다.
    pub fn rejected(&self) -> &[RejectedTerm] {
        &self.rejected
    }
}

/// 무시어와 매칭되는 라인을 모두 제거합니다 (순서 유지).
pub fn filter_ignored(lines: Vec<String>, ignore: &TermSet) -> Vec<String> {
    if ignore.is_empty() {
        return lines;
    }
    lines.into_iter().filter(|line| !ignore.matches(line)).collect()
}

/// 검색어와 매칭되는 토큰을 강조 표시합니다.
///
/// 공백 기준으로 토큰을 나누고, 각 토큰을 독립적으로 검색어와 비교합니다.
/// 결과는 단일 공백으로 다시 연결되므로 원래의 연속 공백/탭은 보존되지 않습니다.
/// 모든 토큰은 HTML 이스케이프됩니다.
pub fn highlight(line: &str, search: &TermSet) -> String {
    line.split_whitespace()
        .map(|token| {
            let escaped = escape_html(token);
            if search.matches(token) {
                format!("{HIGHLIGHT_OPEN}{escaped}{HIGHLIGHT_CLOSE}")
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn matches_case_insensitive() {
        let set = TermSet::compile(&["ERROR"]);
        assert!(set.matches("2024-01-01 error: disk full"));
        assert!(set.matches("Error happened"));
        assert!(!set.matches("all good"));
    }

    #[test]
    fn terms_are_regular_expressions() {
        let set = TermSet::compile(&[r"timeout after \d+ms"]);
        assert!(set.matches("request timeout after 350ms"));
        assert!(!set.matches("request timeout after ms"));
    }

    #[test]
    fn metacharacters_are_interpreted() {
        // "." 는 임의 문자와 매칭
        let set = TermSet::compile(&["a.c"]);
        assert!(set.matches("abc"));
    }

    #[test]
    fn empty_set_never_matches() {
        let set = TermSet::compile::<&str>(&[]);
        assert!(set.is_empty());
        assert!(!set.matches("error"));
        assert!(!set.matches(""));
    }

    #[test]
    fn invalid_pattern_is_rejected_and_never_matches() {
        let set = TermSet::compile(&["(unclosed", "panic"]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.rejected().len(), 1);
        assert_eq!(set.rejected()[0].term, "(unclosed");
        assert!(!set.matches("(unclosed"));
        assert!(set.matches("kernel panic"));
    }

    #[test]
    fn filter_removes_ignored_lines() {
        let ignore = TermSet::compile(&["ERROR: transient"]);
        let lines = vec![
            "ERROR: disk full".to_owned(),
            "ERROR: transient network blip".to_owned(),
        ];
        let kept = filter_ignored(lines, &ignore);
        assert_eq!(kept, vec!["ERROR: disk full".to_owned()]);
    }

    #[test]
    fn filter_with_empty_ignore_keeps_all() {
        let lines = vec!["a".to_owned(), "b".to_owned()];
        let kept = filter_ignored(lines.clone(), &TermSet::default());
        assert_eq!(kept, lines);
    }

    #[test]
    fn highlight_wraps_matching_tokens_only() {
        let search = TermSet::compile(&["error"]);
        let out = highlight("disk ERROR on sda", &search);
        assert_eq!(
            out,
            r#"disk <span style="color:#EC5C46">ERROR</span> on sda"#
        );
    }

    #[test]
    fn highlight_collapses_whitespace() {
        let search = TermSet::compile(&["nomatch"]);
        assert_eq!(highlight("a   b\tc", &search), "a b c");
    }

    #[test]
    fn highlight_escapes_html() {
        let search = TermSet::compile(&["fail"]);
        let out = highlight("<script> failed", &search);
        assert!(out.starts_with("&lt;script&gt; "));
        assert!(out.contains(">failed</span>"));
    }

    proptest! {
        #[test]
        fn empty_term_set_never_matches_any_line(line in ".*") {
            prop_assert!(!TermSet::default().matches(&line));
        }

        #[test]
        fn filtered_lines_are_subset_of_input(
            lines in proptest::collection::vec("[a-z ]{0,20}", 0..20),
            ignore in proptest::collection::vec("[a-z]{1,3}", 0..4),
        ) {
            let ignore = TermSet::compile(&ignore);
            let kept = filter_ignored(lines.clone(), &ignore);
            prop_assert!(kept.len() <= lines.len());
            for line in &kept {
                prop_assert!(lines.contains(line));
                prop_assert!(!ignore.matches(line));
            }
        }
    }
}
