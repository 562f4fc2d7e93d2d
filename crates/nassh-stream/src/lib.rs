//! # nassh-stream
//!
//! Descriptor で索引されるストリームレジストリと、書き込みのフロー制御。
//!
//! ## 設計の背景
//!
//! JS ホストは生のファイル/ソケット I/O を行えない。ネイティブ側は
//! 「論理ファイルディスクリプタ」を開く/読む/書く/閉じるよう JS に依頼し、
//! JS 側の応答は非同期に届く。
//!
//! ネイティブ側はストリームを整数の Descriptor でしか参照しない。
//! Descriptor → Capability の対応はレジストリが排他的に所有する。
//!
//! ## ストリームの状態遷移
//!
//! ```text
//! Opening ──onOpen(success=true)──→ Open
//!    │                                │
//!    └──onOpen(success=false)──→ Closed ←──close / onClose──┘
//!                             (レジストリから削除)
//! ```
//!
//! ## 送信フロー
//!
//! ```text
//! write(fd, bytes)
//!   → 24576 バイトごとに分割
//!   → 各チャンクを Base64 化
//!   → write(fd, payload) Envelope をチャンク数ぶん送信（順序維持）
//! ```

#![no_std]
extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod capability;
pub mod error;
pub mod flow;
pub mod registry;

pub use capability::StreamCapability;
pub use error::RegistryError;
pub use flow::{fragment_write, WriteWindow, DEFAULT_WRITE_WINDOW, MAX_WRITE_CHUNK};
pub use registry::{StreamHandle, StreamRegistry};

use alloc::string::String;

/// ストリームの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    File,
    Socket,
}

/// ストリームのライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// open を依頼済み、JS 側の応答待ち
    Opening,
    /// JS 側が success=true で応答した
    Open,
    /// 閉じられた
    ///
    /// 閉じたストリームはその場でレジストリから削除されるため、
    /// `StreamRegistry::state` がこの値を返すことはない（`None` になる）。
    Closed,
}

/// open 時に JS 側へ渡す識別情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// ファイル: パスとモード
    File { path: String, mode: i32 },
    /// ソケット: ホストとポート
    Socket { host: String, port: u16 },
}

impl StreamTarget {
    pub fn kind(&self) -> StreamKind {
        match self {
            StreamTarget::File { .. } => StreamKind::File,
            StreamTarget::Socket { .. } => StreamKind::Socket,
        }
    }
}
