//! Descriptor → ストリームの対応表
//!
//! 両側は非同期に動くため、どの通知も「未知の Descriptor」に対して冪等。
//! 例えば close と競合して届いた read でクラッシュしてはならない。

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use nassh_envelope::{decode_payload, Descriptor, OutboundCall, Outbox};

use crate::capability::StreamCapability;
use crate::error::RegistryError;
use crate::flow::{fragment_write, MAX_WRITE_CHUNK};
use crate::{StreamKind, StreamState, StreamTarget};

/// 1 本の論理ストリーム
pub struct StreamHandle {
    descriptor: Descriptor,
    kind: StreamKind,
    state: StreamState,
    capability: Box<dyn StreamCapability>,
}

impl StreamHandle {
    pub fn descriptor(&self) -> Descriptor {
        self.descriptor
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn state(&self) -> StreamState {
        self.state
    }
}

impl core::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("descriptor", &self.descriptor)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// ストリームレジストリ
///
/// 制御スレッドだけが触るためロックは持たない。
pub struct StreamRegistry {
    /// 開いている（または open 応答待ちの）ストリーム
    streams: BTreeMap<Descriptor, StreamHandle>,
    /// `write` 1 件あたりの最大バイト数
    chunk_ceiling: usize,
}

impl StreamRegistry {
    /// 新しい StreamRegistry を生成する
    pub fn new() -> Self {
        Self::with_chunk_ceiling(MAX_WRITE_CHUNK)
    }

    /// チャンク上限を指定して生成する
    pub fn with_chunk_ceiling(chunk_ceiling: usize) -> Self {
        StreamRegistry {
            streams: BTreeMap::new(),
            chunk_ceiling: chunk_ceiling.max(1),
        }
    }

    /// ストリームを登録し、JS 側に open を依頼する
    ///
    /// `openFile(fd, path, mode)` / `openSocket(fd, host, port)` は登録結果に関わらず必ず送信する。
    /// ストリームは `Opening` 状態で登録される。
    ///
    /// # エラー
    /// - `RegistryError::InvalidDescriptor`: 負の Descriptor。何も送らず登録もしない。
    ///   Capability には `on_open(false, false)` を通知する。
    /// - `RegistryError::DuplicateDescriptor`: 同じ Descriptor が既に登録されていた。
    ///   古い Capability には `on_close` を通知して破棄し、新しいもので置き換える（登録自体は行われる）。
    pub fn open<O: Outbox + ?Sized>(
        &mut self,
        out: &mut O,
        fd: Descriptor,
        target: StreamTarget,
        capability: Box<dyn StreamCapability>,
    ) -> Result<(), RegistryError> {
        if fd < 0 {
            let mut capability = capability;
            capability.on_open(false, false);
            return Err(RegistryError::InvalidDescriptor(fd));
        }

        let kind = target.kind();
        out.post(match target {
            StreamTarget::File { path, mode } => OutboundCall::OpenFile { fd, path, mode },
            StreamTarget::Socket { host, port } => OutboundCall::OpenSocket { fd, host, port },
        });

        let handle = StreamHandle {
            descriptor: fd,
            kind,
            state: StreamState::Opening,
            capability,
        };
        tracing::debug!("stream {} opening ({:?})", fd, kind);

        match self.streams.insert(fd, handle) {
            Some(mut stale) => {
                stale.capability.on_close();
                Err(RegistryError::DuplicateDescriptor(fd))
            }
            None => Ok(()),
        }
    }

    /// JS 側の open 結果を反映する
    ///
    /// 失敗時はストリームを使えないのでレジストリから削除する。
    pub fn on_open_result(
        &mut self,
        fd: Descriptor,
        success: bool,
        is_tty: bool,
    ) -> Result<(), RegistryError> {
        let handle = self.lookup("onOpen", fd)?;
        handle.capability.on_open(success, is_tty);

        if success {
            handle.state = StreamState::Open;
            tracing::debug!("stream {} open (tty: {})", fd, is_tty);
        } else {
            self.remove(fd);
            tracing::debug!("stream {} failed to open", fd);
        }
        Ok(())
    }

    /// JS 側から届いたデータを Capability に渡す
    ///
    /// # パニック
    /// ペイロードが Base64 として不正な場合。JS 側のエンコーダは固定なので、
    /// これはバッファ破損を意味する。
    pub fn on_read(&mut self, fd: Descriptor, encoded: &str) -> Result<(), RegistryError> {
        let handle = self.lookup("onRead", fd)?;
        let data = match decode_payload(encoded) {
            Ok(data) => data,
            Err(e) => panic!("onRead: corrupt payload for file descriptor {}: {}", fd, e),
        };
        handle.capability.on_read(&data);
        Ok(())
    }

    /// 書き込み ACK を Capability に渡す（送信ウィンドウの補充は Capability 側）
    pub fn on_write_ack(&mut self, fd: Descriptor, count: u64) -> Result<(), RegistryError> {
        self.lookup("onWriteAcknowledge", fd)?
            .capability
            .on_write_acknowledge(count);
        Ok(())
    }

    /// 読み込み可否を Capability に渡す
    pub fn on_read_ready(&mut self, fd: Descriptor, ready: bool) -> Result<(), RegistryError> {
        self.lookup("onReadReady", fd)?.capability.on_read_ready(ready);
        Ok(())
    }

    /// JS 側からのクローズ通知
    pub fn on_close_notification(&mut self, fd: Descriptor) -> Result<(), RegistryError> {
        self.lookup("onClose", fd)?.capability.on_close();
        self.remove(fd);
        Ok(())
    }

    /// ネイティブ側からのクローズ（JS 側に `close(fd)` を送る）
    pub fn close<O: Outbox + ?Sized>(
        &mut self,
        out: &mut O,
        fd: Descriptor,
    ) -> Result<(), RegistryError> {
        self.lookup("close", fd)?.capability.on_close();
        self.remove(fd);
        out.post(OutboundCall::Close { fd });
        Ok(())
    }

    /// JS 側に最大 `size` バイトの読み込みを依頼する
    pub fn read<O: Outbox + ?Sized>(&mut self, out: &mut O, fd: Descriptor, size: u64) {
        out.post(OutboundCall::Read { fd, size });
    }

    /// バイト列を分割して JS 側へ書き込む
    ///
    /// レジストリ上の状態に関係なく常に受け付ける（送信ウィンドウは呼び出し側の責任）。
    ///
    /// # 戻り値
    /// 送信した `write` Envelope の数
    pub fn write<O: Outbox + ?Sized>(&mut self, out: &mut O, fd: Descriptor, data: &[u8]) -> usize {
        let calls = fragment_write(fd, data, self.chunk_ceiling);
        let count = calls.len();
        for call in calls {
            out.post(call);
        }
        count
    }

    /// Descriptor の状態（未登録なら `None`）
    pub fn state(&self, fd: Descriptor) -> Option<StreamState> {
        self.streams.get(&fd).map(StreamHandle::state)
    }

    /// Descriptor が登録されているか
    pub fn contains(&self, fd: Descriptor) -> bool {
        self.streams.contains_key(&fd)
    }

    /// 登録中の Descriptor 一覧（昇順）
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.streams.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    fn lookup(
        &mut self,
        call: &'static str,
        fd: Descriptor,
    ) -> Result<&mut StreamHandle, RegistryError> {
        self.streams
            .get_mut(&fd)
            .ok_or(RegistryError::UnknownDescriptor { call, fd })
    }

    fn remove(&mut self, fd: Descriptor) {
        if self.streams.remove(&fd).is_some() {
            tracing::debug!("stream {} closed", fd);
        }
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}
