//! read/write ペイロードの Base64 フレーミング
//!
//! JS 側は文字列しか受け渡せないため、ストリームのバイト列は必ず
//! 標準 Base64（パディングあり）で文字列化して Envelope に載せる。

use alloc::string::String;
use alloc::vec::Vec;

use base64::Engine as _;

use crate::error::PayloadError;

/// バイト列を Base64 文字列にエンコードする
pub fn encode_payload(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Base64 文字列をバイト列にデコードする
///
/// # エラー
/// - `PayloadError::InvalidBase64`: Base64 として不正な文字列
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>, PayloadError> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| PayloadError::InvalidBase64)
}
