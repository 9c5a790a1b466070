//! 검증 규칙 (순수 함수, 상태 없음)
//!
//! - credential: 비어있지 않고 10자 이하, 서버 설정값과 정확히 일치
//! - filename: NUL 종료 ASCII, 길이 4~10자

/// 최대 credential 길이 (바이트)
pub const MAX_CREDENTIAL_LEN: usize = 10;

/// filename 길이 범위 (NUL 제외)
pub const MIN_FILENAME_LEN: usize = 4;
pub const MAX_FILENAME_LEN: usize = 10;

/// 거부 사유. ACK 페이로드에 실리는 짧은 ASCII 메시지로 변환된다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyCredential,
    CredentialTooLong,
    CredentialMismatch,
    MissingNul,
    FilenameTooShort,
    FilenameTooLong,
    FilenameNotAscii,
    FilenameUnsafe,
}

impl RejectReason {
    /// ACK 에러 페이로드용 메시지
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::EmptyCredential => "empty credential",
            RejectReason::CredentialTooLong => "credential too long",
            RejectReason::CredentialMismatch => "invalid credential",
            RejectReason::MissingNul => "filename not terminated",
            RejectReason::FilenameTooShort => "filename too short",
            RejectReason::FilenameTooLong => "filename too long",
            RejectReason::FilenameNotAscii => "filename not ascii",
            RejectReason::FilenameUnsafe => "filename not allowed",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HELLO 페이로드의 credential 검증
///
/// 끝의 NUL은 필수가 아니지만 하나 붙어 있으면 잘라낸다.
pub fn check_credential(payload: &[u8], expected: &str) -> Result<(), RejectReason> {
    let payload = match payload.split_last() {
        Some((0, rest)) => rest,
        _ => payload,
    };

    if payload.is_empty() {
        return Err(RejectReason::EmptyCredential);
    }
    if payload.len() > MAX_CREDENTIAL_LEN {
        return Err(RejectReason::CredentialTooLong);
    }
    if payload != expected.as_bytes() {
        return Err(RejectReason::CredentialMismatch);
    }

    Ok(())
}

/// WRQ 페이로드의 filename 검증
///
/// NUL 이전 부분이 filename. 길이 [4,10], ASCII 한정.
/// 경로 구분자와 선행 '.'은 방어적으로 거부 (디렉터리 탈출 방지).
pub fn check_filename(payload: &[u8]) -> Result<&str, RejectReason> {
    let end = payload
        .iter()
        .position(|&b| b == 0)
        .ok_or(RejectReason::MissingNul)?;
    let name = &payload[..end];

    if name.len() < MIN_FILENAME_LEN {
        return Err(RejectReason::FilenameTooShort);
    }
    if name.len() > MAX_FILENAME_LEN {
        return Err(RejectReason::FilenameTooLong);
    }
    if !name.is_ascii() {
        return Err(RejectReason::FilenameNotAscii);
    }
    if name.contains(&b'/') || name.contains(&b'\\') || name[0] == b'.' {
        return Err(RejectReason::FilenameUnsafe);
    }

    // ASCII 확인 완료
    Ok(std::str::from_utf8(name).map_err(|_| RejectReason::FilenameNotAscii)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_exact_match() {
        assert_eq!(check_credential(b"g21-0e29", "g21-0e29"), Ok(()));
    }

    #[test]
    fn test_credential_trailing_nul_tolerated() {
        assert_eq!(check_credential(b"g21-0e29\0", "g21-0e29"), Ok(()));
    }

    #[test]
    fn test_credential_empty() {
        assert_eq!(check_credential(b"", "secret"), Err(RejectReason::EmptyCredential));
        assert_eq!(check_credential(b"\0", "secret"), Err(RejectReason::EmptyCredential));
    }

    #[test]
    fn test_credential_too_long() {
        assert_eq!(
            check_credential(b"abcdefghijk", "abcdefghijk"),
            Err(RejectReason::CredentialTooLong)
        );
    }

    #[test]
    fn test_credential_mismatch() {
        assert_eq!(
            check_credential(b"g21-0e30", "g21-0e29"),
            Err(RejectReason::CredentialMismatch)
        );
        // 접두사 일치만으로는 불충분
        assert_eq!(
            check_credential(b"g21", "g21-0e29"),
            Err(RejectReason::CredentialMismatch)
        );
    }

    #[test]
    fn test_filename_ok() {
        assert_eq!(check_filename(b"data.bin\0"), Ok("data.bin"));
        assert_eq!(check_filename(b"abcd\0"), Ok("abcd"));
        assert_eq!(check_filename(b"abcdefghij\0"), Ok("abcdefghij"));
    }

    #[test]
    fn test_filename_length_bounds() {
        assert_eq!(check_filename(b"abc\0"), Err(RejectReason::FilenameTooShort));
        assert_eq!(
            check_filename(b"abcdefghijk\0"),
            Err(RejectReason::FilenameTooLong)
        );
    }

    #[test]
    fn test_filename_missing_nul() {
        assert_eq!(check_filename(b"data.bin"), Err(RejectReason::MissingNul));
    }

    #[test]
    fn test_filename_path_traversal() {
        assert_eq!(check_filename(b"a/b.txt\0"), Err(RejectReason::FilenameUnsafe));
        assert_eq!(check_filename(b"..\\ab\0"), Err(RejectReason::FilenameUnsafe));
        assert_eq!(check_filename(b".hide\0"), Err(RejectReason::FilenameUnsafe));
    }

    #[test]
    fn test_filename_non_ascii() {
        assert_eq!(
            check_filename("데이터.bin\0".as_bytes()),
            Err(RejectReason::FilenameNotAscii)
        );
    }
}
