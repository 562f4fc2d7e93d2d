//! # nassh-envelope
//!
//! JS ホストとネイティブ ssh クライアントの間でやり取りされる Envelope の
//! エンコード/デコード、および read/write ペイロードの Base64 フレーミング。
//!
//! ## Envelope の Wire Format
//!
//! ```text
//! {"name": "<call name>", "arguments": [<value>, ...]}
//! ```
//!
//! JS → ネイティブ（`startSession`, `onRead` など）と
//! ネイティブ → JS（`printLog`, `write` など）の両方向で同じ形式を使う。
//! 1 呼び出し = 1 テキストメッセージ。
//!
//! ## 不変条件
//!
//! - `name` は空でない文字列
//! - `arguments` は常に配列（スカラーは不可）
//! - バイナリは生バイトで埋め込まない。必ず [`encode_payload`] で Base64 化する

#![no_std]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;
use serde_json::{Map, Value};

pub mod call;
pub mod error;
pub mod payload;

pub use call::{Descriptor, OutboundCall, Outbox};
pub use error::{DecodeError, PayloadError};
pub use payload::{decode_payload, encode_payload};

/// Envelope の呼び出し名フィールド
pub const NAME_ATTR: &str = "name";

/// Envelope の引数フィールド
pub const ARGUMENTS_ATTR: &str = "arguments";

/// 1 回の呼び出しを表すメッセージ単位
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// 呼び出し名（空でない）
    pub name: String,
    /// 順序付き引数リスト
    pub arguments: Vec<Value>,
}

impl Envelope {
    /// Envelope を組み立てる
    pub fn new(name: impl Into<String>, arguments: Vec<Value>) -> Self {
        Envelope {
            name: name.into(),
            arguments,
        }
    }

    /// Wire テキストに変換する
    pub fn to_wire(&self) -> String {
        // Value と String だけで構成されるため失敗しない
        serde_json::to_string(self).unwrap_or_default()
    }

    /// `index` 番目の引数（無ければ `Value::Null`）
    pub fn argument(&self, index: usize) -> &Value {
        self.arguments.get(index).unwrap_or(&Value::Null)
    }
}

/// 呼び出し名と引数から Wire テキストを生成する
pub fn encode(name: &str, arguments: Vec<Value>) -> String {
    Envelope::new(name, arguments).to_wire()
}

/// Wire テキストを Envelope にデコードする
///
/// # エラー
/// - `DecodeError::Malformed`: JSON として解析できない
/// - `DecodeError::NotAnObject`: トップレベルがオブジェクトでない
/// - `DecodeError::MissingName`: `name` が無い・空・文字列でない
/// - `DecodeError::ArgumentsNotArray`: `arguments` が配列でない
pub fn decode(text: &str) -> Result<Envelope, DecodeError> {
    let root: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;

    let mut object: Map<String, Value> = match root {
        Value::Object(object) => object,
        _ => return Err(DecodeError::NotAnObject),
    };

    let name = match object.remove(NAME_ATTR) {
        Some(Value::String(name)) if !name.is_empty() => name,
        _ => return Err(DecodeError::MissingName),
    };

    let arguments = match object.remove(ARGUMENTS_ATTR) {
        Some(Value::Array(arguments)) => arguments,
        _ => return Err(DecodeError::ArgumentsNotArray),
    };

    Ok(Envelope { name, arguments })
}

/// JSON の数値を整数として取り出す
///
/// 浮動小数は小数部を切り捨てる（JS の Number は常に double のため）。
/// 数値以外は `None`。
pub fn as_int(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    if let Some(v) = value.as_u64() {
        return i64::try_from(v).ok();
    }
    value
        .as_f64()
        .filter(|v| v.is_finite() && *v >= i64::MIN as f64 && *v <= i64::MAX as f64)
        .map(|v| v as i64)
}
