//! ネイティブ → JS 方向の呼び出し
//!
//! ネイティブ側から JS ホストへ送る呼び出しは固定の集合。
//! 型付きの [`OutboundCall`] で組み立て、[`Outbox`] に投函する。

use alloc::string::String;
use alloc::vec::Vec;

use serde_json::{json, Value};

use crate::Envelope;

/// ファイル/ソケットを識別する整数ハンドル（両側で共有）
pub type Descriptor = i32;

/// ネイティブ側から見た JS のメソッド名
pub mod names {
    pub const PRINT_LOG: &str = "printLog";
    pub const EXIT: &str = "exit";
    pub const OPEN_FILE: &str = "openFile";
    pub const OPEN_SOCKET: &str = "openSocket";
    pub const WRITE: &str = "write";
    pub const READ: &str = "read";
    pub const CLOSE: &str = "close";
}

/// JS ホストへ送る呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCall {
    /// ログ 1 行（末尾改行込み）
    PrintLog(String),
    /// ssh セッションの終了コード
    Exit(i32),
    /// ファイルを開くよう依頼する
    OpenFile {
        fd: Descriptor,
        path: String,
        mode: i32,
    },
    /// ソケット接続を依頼する
    OpenSocket {
        fd: Descriptor,
        host: String,
        port: u16,
    },
    /// Base64 エンコード済みチャンクの書き込み
    Write { fd: Descriptor, payload: String },
    /// 最大 `size` バイトの読み込みを依頼する
    Read { fd: Descriptor, size: u64 },
    /// ストリームを閉じる
    Close { fd: Descriptor },
}

impl OutboundCall {
    /// 呼び出し名
    pub fn name(&self) -> &'static str {
        match self {
            OutboundCall::PrintLog(_) => names::PRINT_LOG,
            OutboundCall::Exit(_) => names::EXIT,
            OutboundCall::OpenFile { .. } => names::OPEN_FILE,
            OutboundCall::OpenSocket { .. } => names::OPEN_SOCKET,
            OutboundCall::Write { .. } => names::WRITE,
            OutboundCall::Read { .. } => names::READ,
            OutboundCall::Close { .. } => names::CLOSE,
        }
    }

    /// 対象の Descriptor（ストリーム系の呼び出しのみ）
    pub fn descriptor(&self) -> Option<Descriptor> {
        match self {
            OutboundCall::OpenFile { fd, .. }
            | OutboundCall::OpenSocket { fd, .. }
            | OutboundCall::Write { fd, .. }
            | OutboundCall::Read { fd, .. }
            | OutboundCall::Close { fd } => Some(*fd),
            OutboundCall::PrintLog(_) | OutboundCall::Exit(_) => None,
        }
    }

    /// Envelope に変換する
    pub fn into_envelope(self) -> Envelope {
        let name = self.name();
        let arguments: Vec<Value> = match self {
            OutboundCall::PrintLog(message) => alloc::vec![json!(message)],
            OutboundCall::Exit(code) => alloc::vec![json!(code)],
            OutboundCall::OpenFile { fd, path, mode } => {
                alloc::vec![json!(fd), json!(path), json!(mode)]
            }
            OutboundCall::OpenSocket { fd, host, port } => {
                alloc::vec![json!(fd), json!(host), json!(port)]
            }
            OutboundCall::Write { fd, payload } => alloc::vec![json!(fd), json!(payload)],
            OutboundCall::Read { fd, size } => alloc::vec![json!(fd), json!(size)],
            OutboundCall::Close { fd } => alloc::vec![json!(fd)],
        };
        Envelope::new(name, arguments)
    }
}

/// JS ホストへの送信口
///
/// 実際の postMessage 相当の転送は実装側（`nassh-wasm` の JS コールバックなど）が担当する。
/// 制御スレッドからのみ呼ばれる。
pub trait Outbox {
    /// 呼び出しを 1 件送信する
    fn post(&mut self, call: OutboundCall);

    /// `printLog` を送信する
    fn print_log(&mut self, message: String) {
        self.post(OutboundCall::PrintLog(message));
    }
}

/// 送信内容をそのまま溜める Outbox（テスト・記録用）
impl Outbox for Vec<OutboundCall> {
    fn post(&mut self, call: OutboundCall) {
        self.push(call);
    }
}
