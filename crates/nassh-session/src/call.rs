//! JS → ネイティブ方向の呼び出し
//!
//! 認識する呼び出し名は固定の集合。Envelope を受け取った時点で
//! 引数の個数と型を検証し、型付きの [`InboundCall`] に変換する。
//! 各ハンドラは検証済みの値だけを扱う。

use serde_json::{Map, Value};

use nassh_envelope::{as_int, Descriptor, Envelope};

/// JS 側から見たネイティブのメソッド名
pub mod names {
    pub const START_SESSION: &str = "startSession";
    pub const ON_OPEN_FILE: &str = "onOpenFile";
    pub const ON_OPEN_SOCKET: &str = "onOpenSocket";
    pub const ON_READ: &str = "onRead";
    pub const ON_WRITE_ACKNOWLEDGE: &str = "onWriteAcknowledge";
    pub const ON_CLOSE: &str = "onClose";
    pub const ON_READ_READY: &str = "onReadReady";
    pub const ON_RESIZE: &str = "onResize";
    pub const ON_EXIT_ACKNOWLEDGE: &str = "onExitAcknowledge";
}

/// 検証済みの受信呼び出し
#[derive(Debug, Clone, PartialEq)]
pub enum InboundCall {
    /// セッション開始（唯一の引数はオブジェクト）
    StartSession(Map<String, Value>),
    /// `onOpenFile` / `onOpenSocket` の結果
    OpenResult {
        fd: Descriptor,
        success: bool,
        is_tty: bool,
    },
    /// 受信データ（Base64 のまま）
    Read { fd: Descriptor, payload: String },
    /// 書き込み完了バイト数
    WriteAcknowledge { fd: Descriptor, count: u32 },
    /// JS 側でストリームが閉じられた
    Close { fd: Descriptor },
    /// 読み込み可否
    ReadReady { fd: Descriptor, ready: bool },
    /// 端末サイズ変更
    Resize { width: i32, height: i32 },
    /// `exit` を JS 側が受け取った
    ExitAcknowledge,
}

/// 引数の個数・型が不正
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    /// 呼び出し名
    pub call: &'static str,
    /// 何が不正だったか
    pub reason: &'static str,
}

impl core::fmt::Display for CallError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: invalid arguments ({})", self.call, self.reason)
    }
}

impl std::error::Error for CallError {}

impl InboundCall {
    /// Envelope を検証して InboundCall に変換する
    ///
    /// # 戻り値
    /// - `Ok(Some(call))`: 認識できる呼び出し
    /// - `Ok(None)`: 未知の呼び出し名（新しい JS 側との前方互換のため黙って無視する）
    ///
    /// # エラー
    /// - `CallError`: 認識できる呼び出しだが引数が不正
    pub fn parse(envelope: &Envelope) -> Result<Option<Self>, CallError> {
        let args = Args {
            call: match known_name(&envelope.name) {
                Some(name) => name,
                None => return Ok(None),
            },
            values: &envelope.arguments,
        };

        let call = match args.call {
            names::START_SESSION => {
                if args.values.len() != 1 {
                    return Err(args.error("expected exactly one argument"));
                }
                match &args.values[0] {
                    Value::Object(params) => InboundCall::StartSession(params.clone()),
                    _ => return Err(args.error("session parameters must be an object")),
                }
            }
            names::ON_OPEN_FILE | names::ON_OPEN_SOCKET => {
                args.require(3)?;
                InboundCall::OpenResult {
                    fd: args.descriptor(0)?,
                    success: args.boolean(1, "success must be a boolean")?,
                    is_tty: args.boolean(2, "isTty must be a boolean")?,
                }
            }
            names::ON_READ => {
                args.require(2)?;
                InboundCall::Read {
                    fd: args.descriptor(0)?,
                    payload: args.string(1, "payload must be a string")?,
                }
            }
            names::ON_WRITE_ACKNOWLEDGE => {
                args.require(2)?;
                let count = as_int(&args.values[1])
                    .and_then(|count| u32::try_from(count).ok())
                    .ok_or_else(|| args.error("count must be a uint32"))?;
                InboundCall::WriteAcknowledge {
                    fd: args.descriptor(0)?,
                    count,
                }
            }
            names::ON_CLOSE => {
                args.require(1)?;
                InboundCall::Close {
                    fd: args.descriptor(0)?,
                }
            }
            names::ON_READ_READY => {
                args.require(2)?;
                InboundCall::ReadReady {
                    fd: args.descriptor(0)?,
                    ready: args.boolean(1, "ready must be a boolean")?,
                }
            }
            names::ON_RESIZE => {
                args.require(2)?;
                InboundCall::Resize {
                    width: args.int32(0, "width must be an integer")?,
                    height: args.int32(1, "height must be an integer")?,
                }
            }
            names::ON_EXIT_ACKNOWLEDGE => InboundCall::ExitAcknowledge,
            _ => return Ok(None),
        };

        Ok(Some(call))
    }

    /// 対応する呼び出し名（`OpenResult` は `onOpenFile` として扱う）
    pub fn name(&self) -> &'static str {
        match self {
            InboundCall::StartSession(_) => names::START_SESSION,
            InboundCall::OpenResult { .. } => names::ON_OPEN_FILE,
            InboundCall::Read { .. } => names::ON_READ,
            InboundCall::WriteAcknowledge { .. } => names::ON_WRITE_ACKNOWLEDGE,
            InboundCall::Close { .. } => names::ON_CLOSE,
            InboundCall::ReadReady { .. } => names::ON_READ_READY,
            InboundCall::Resize { .. } => names::ON_RESIZE,
            InboundCall::ExitAcknowledge => names::ON_EXIT_ACKNOWLEDGE,
        }
    }
}

fn known_name(name: &str) -> Option<&'static str> {
    [
        names::START_SESSION,
        names::ON_OPEN_FILE,
        names::ON_OPEN_SOCKET,
        names::ON_READ,
        names::ON_WRITE_ACKNOWLEDGE,
        names::ON_CLOSE,
        names::ON_READ_READY,
        names::ON_RESIZE,
        names::ON_EXIT_ACKNOWLEDGE,
    ]
    .into_iter()
    .find(|known| *known == name)
}

/// 引数リストの検証ヘルパー
///
/// 余分な引数は無視する（足りない場合のみエラー）。
struct Args<'a> {
    call: &'static str,
    values: &'a [Value],
}

impl Args<'_> {
    fn error(&self, reason: &'static str) -> CallError {
        CallError {
            call: self.call,
            reason,
        }
    }

    fn require(&self, count: usize) -> Result<(), CallError> {
        if self.values.len() < count {
            return Err(self.error("too few arguments"));
        }
        Ok(())
    }

    fn descriptor(&self, index: usize) -> Result<Descriptor, CallError> {
        as_int(&self.values[index])
            .and_then(|fd| Descriptor::try_from(fd).ok())
            .filter(|fd| *fd >= 0)
            .ok_or_else(|| self.error("file descriptor must be a non-negative integer"))
    }

    fn int32(&self, index: usize, reason: &'static str) -> Result<i32, CallError> {
        as_int(&self.values[index])
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| self.error(reason))
    }

    fn boolean(&self, index: usize, reason: &'static str) -> Result<bool, CallError> {
        self.values[index].as_bool().ok_or_else(|| self.error(reason))
    }

    fn string(&self, index: usize, reason: &'static str) -> Result<String, CallError> {
        self.values[index]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.error(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(name: &str, arguments: Value) -> Result<Option<InboundCall>, CallError> {
        let arguments = match arguments {
            Value::Array(a) => a,
            other => panic!("arguments must be an array, got {other}"),
        };
        InboundCall::parse(&Envelope::new(name, arguments))
    }

    #[test]
    fn test_unknown_name_is_ignored() {
        assert_eq!(parse("onFutureThing", json!([1, 2, 3])), Ok(None));
    }

    #[test]
    fn test_start_session_requires_single_object() {
        let call = parse("startSession", json!([{"host": "example.com"}])).unwrap();
        assert!(matches!(call, Some(InboundCall::StartSession(_))));

        assert!(parse("startSession", json!([])).is_err());
        assert!(parse("startSession", json!(["example.com"])).is_err());
        assert!(parse("startSession", json!([{}, {}])).is_err());
    }

    #[test]
    fn test_open_file_and_socket_share_result() {
        let expected = Some(InboundCall::OpenResult {
            fd: 3,
            success: true,
            is_tty: false,
        });
        assert_eq!(parse("onOpenFile", json!([3, true, false])).unwrap(), expected);
        assert_eq!(parse("onOpenSocket", json!([3, true, false])).unwrap(), expected);
    }

    #[test]
    fn test_open_result_type_errors() {
        let err = parse("onOpenFile", json!(["3", true, false])).unwrap_err();
        assert_eq!(err.call, "onOpenFile");
        assert!(parse("onOpenSocket", json!([3, 1, false])).is_err());
        assert!(parse("onOpenSocket", json!([3, true])).is_err());
    }

    #[test]
    fn test_negative_descriptor_rejected() {
        for (name, args) in [
            ("onOpenFile", json!([-1, true, false])),
            ("onRead", json!([-2, "aGk="])),
            ("onWriteAcknowledge", json!([-3, 1])),
            ("onClose", json!([-3])),
            ("onReadReady", json!([-4, true])),
        ] {
            let err = parse(name, args).unwrap_err();
            assert_eq!(err.call, name);
            assert!(err.to_string().contains("non-negative"));
        }
        assert!(parse("onClose", json!([0])).unwrap().is_some());
    }

    #[test]
    fn test_read() {
        assert_eq!(
            parse("onRead", json!([4, "aGVsbG8="])).unwrap(),
            Some(InboundCall::Read {
                fd: 4,
                payload: "aGVsbG8=".to_string()
            })
        );
        assert!(parse("onRead", json!([4, 12])).is_err());
    }

    #[test]
    fn test_write_acknowledge_count_is_uint32() {
        assert_eq!(
            parse("onWriteAcknowledge", json!([4, 4096])).unwrap(),
            Some(InboundCall::WriteAcknowledge { fd: 4, count: 4096 })
        );
        assert!(parse("onWriteAcknowledge", json!([4, -1])).is_err());
        assert!(parse("onWriteAcknowledge", json!([4, 4294967296u64])).is_err());
    }

    #[test]
    fn test_close_and_read_ready() {
        assert_eq!(
            parse("onClose", json!([7])).unwrap(),
            Some(InboundCall::Close { fd: 7 })
        );
        assert!(parse("onClose", json!([])).is_err());
        assert!(parse("onClose", json!([null])).is_err());
        assert_eq!(
            parse("onReadReady", json!([7, false])).unwrap(),
            Some(InboundCall::ReadReady { fd: 7, ready: false })
        );
    }

    #[test]
    fn test_resize_and_exit_ack() {
        assert_eq!(
            parse("onResize", json!([120, 40])).unwrap(),
            Some(InboundCall::Resize {
                width: 120,
                height: 40
            })
        );
        assert!(parse("onResize", json!([120])).is_err());
        assert_eq!(
            parse("onExitAcknowledge", json!([])).unwrap(),
            Some(InboundCall::ExitAcknowledge)
        );
    }

    #[test]
    fn test_extra_arguments_tolerated() {
        assert_eq!(
            parse("onClose", json!([7, "extra"])).unwrap(),
            Some(InboundCall::Close { fd: 7 })
        );
    }

    #[test]
    fn test_error_message_names_call() {
        let err = parse("onReadReady", json!([1, "yes"])).unwrap_err();
        assert_eq!(err.to_string(), "onReadReady: invalid arguments (ready must be a boolean)");
    }
}
