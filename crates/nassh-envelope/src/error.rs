//! nassh-envelope エラー型

/// Envelope デコードのエラー（メッセージは破棄され、ログのみ残る）
#[derive(Debug)]
pub enum DecodeError {
    /// JSON として解析できない
    Malformed(serde_json::Error),
    /// トップレベルがオブジェクトでない
    NotAnObject,
    /// `name` が無い、空、または文字列でない
    MissingName,
    /// `arguments` が無い、または配列でない
    ArgumentsNotArray,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DecodeError::Malformed(e) => write!(f, "Malformed message: {}", e),
            DecodeError::NotAnObject => write!(f, "Message is not a JSON object"),
            DecodeError::MissingName => write!(f, "Message has no call name"),
            DecodeError::ArgumentsNotArray => write!(f, "Message arguments are not an array"),
        }
    }
}

/// Base64 ペイロードのデコードエラー
///
/// 受信側では致命的エラーとして扱う（ローカルのエンコードバグでしか起こらない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Base64 として不正
    InvalidBase64,
}

impl core::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PayloadError::InvalidBase64 => write!(f, "Invalid Base64 payload"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PayloadError {}
