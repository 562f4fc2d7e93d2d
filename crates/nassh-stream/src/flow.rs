//! 書き込みのチャンク分割と送信ウィンドウ
//!
//! 2 つの独立した制限がある:
//! - チャンク上限（[`MAX_WRITE_CHUNK`]）: 1 つの `write` Envelope に載せる最大バイト数
//! - 送信ウィンドウ（[`WriteWindow`]）: ACK 待ちで許される未確認バイト数。
//!   協調的なバックプレッシャーで、書き込み側（Capability の所有者）が守る。
//!   このモジュールの分割処理では強制しない。

use alloc::vec::Vec;

use nassh_envelope::{encode_payload, Descriptor, OutboundCall};

/// `write` Envelope 1 件あたりの最大バイト数（Base64 化前）
pub const MAX_WRITE_CHUNK: usize = 24 * 1024;

/// セッションパラメータで指定が無い場合の送信ウィンドウ（バイト）
pub const DEFAULT_WRITE_WINDOW: usize = 64 * 1024;

/// バイト列を `write` 呼び出し列に分割する
///
/// # 引数
/// - `fd`: 書き込み先 Descriptor（全チャンク共通）
/// - `data`: 書き込むバイト列
/// - `chunk_ceiling`: チャンクの最大バイト数（通常は [`MAX_WRITE_CHUNK`]）
///
/// # 戻り値
/// `ceil(data.len() / chunk_ceiling)` 件の `OutboundCall::Write`。元のバイト順を保つ。
/// 空の `data` なら空の Vec。
///
/// # パニック
/// チャンクのエンコード結果が空になった場合（内部のバッファサイズ計算バグ）。
pub fn fragment_write(fd: Descriptor, data: &[u8], chunk_ceiling: usize) -> Vec<OutboundCall> {
    data.chunks(chunk_ceiling.max(1))
        .map(|chunk| {
            let payload = encode_payload(chunk);
            assert!(
                !payload.is_empty(),
                "write: encoding a {} byte chunk produced no output",
                chunk.len()
            );
            OutboundCall::Write { fd, payload }
        })
        .collect()
}

/// 送信ウィンドウ（未 ACK バイト数の予算）
///
/// `reserve` で送信前に予算を確保し、`onWriteAcknowledge` を受けたら
/// `acknowledge` で返却する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteWindow {
    /// ウィンドウサイズ（バイト）
    window: usize,
    /// ACK 待ちのバイト数
    outstanding: usize,
}

impl WriteWindow {
    /// 新しい WriteWindow を生成する
    pub fn new(window: usize) -> Self {
        WriteWindow {
            window,
            outstanding: 0,
        }
    }

    /// ウィンドウサイズ
    pub fn window(&self) -> usize {
        self.window
    }

    /// ACK 待ちのバイト数
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// 今送信してよいバイト数
    pub fn available(&self) -> usize {
        self.window.saturating_sub(self.outstanding)
    }

    /// ウィンドウを使い切ったか（送信を止めるべきか）
    pub fn is_exhausted(&self) -> bool {
        self.available() == 0
    }

    /// 最大 `wanted` バイトの送信枠を確保する
    ///
    /// # 戻り値
    /// 実際に確保できたバイト数（`available()` 以下）
    pub fn reserve(&mut self, wanted: usize) -> usize {
        let granted = wanted.min(self.available());
        self.outstanding += granted;
        granted
    }

    /// JS 側から ACK されたバイト数を返却する
    pub fn acknowledge(&mut self, count: u64) {
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        self.outstanding = self.outstanding.saturating_sub(count);
    }
}

impl Default for WriteWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_WINDOW)
    }
}
