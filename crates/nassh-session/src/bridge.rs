//! 制御スレッド側のディスパッチャ
//!
//! JS 側からのテキストメッセージと、ワーカースレッドからのイベントの両方を受け取り、
//! SessionController / StreamRegistry に振り分ける。
//! レジストリと Outbox に触るのはこのオブジェクト（= 制御スレッド）だけ。

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use nassh_envelope::{decode, Envelope, Outbox};
use nassh_stream::{StreamRegistry, StreamTarget};

use crate::call::InboundCall;
use crate::config::BridgeConfig;
use crate::controller::{SessionController, SessionState};
use crate::host::SessionHost;
use crate::params::SessionParameters;
use crate::worker::{NativeClient, WorkerEvent};

/// JS ホストとネイティブ ssh クライアントの間のブリッジ
///
/// ## 内部アーキテクチャ
///
/// ```text
/// Bridge
///   ├── SessionController (セッション状態・ワーカースレッド)
///   ├── StreamRegistry    (Descriptor → Capability)
///   ├── Receiver          (ワーカー → 制御スレッドのキュー)
///   ├── Outbox            (JS ホストへの送信口)
///   └── SessionHost       (ファイルシステム層への通知口)
/// ```
pub struct Bridge<O: Outbox, H: SessionHost> {
    config: BridgeConfig,
    registry: StreamRegistry,
    session: SessionController,
    events: Receiver<WorkerEvent>,
    outbox: O,
    host: H,
}

impl<O: Outbox, H: SessionHost> Bridge<O, H> {
    /// 新しい Bridge を生成する
    ///
    /// # 引数
    /// - `config`: ブリッジ設定
    /// - `client`: ワーカースレッドで実行するネイティブ ssh クライアント
    /// - `outbox`: JS ホストへの送信口
    /// - `host`: ファイルシステム層
    pub fn new(config: BridgeConfig, client: Arc<dyn NativeClient>, outbox: O, host: H) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Bridge {
            registry: StreamRegistry::with_chunk_ceiling(config.write_chunk_ceiling),
            session: SessionController::new(client, tx),
            events: rx,
            config,
            outbox,
            host,
        }
    }

    /// JS 側から届いたテキストメッセージを処理する
    ///
    /// 不正なメッセージは `printLog` を 1 件出して破棄する。
    pub fn handle_message(&mut self, text: &str) {
        match decode(text) {
            Ok(envelope) => self.dispatch(&envelope),
            Err(e) => self.report(format!("handleMessage: {}\n", e)),
        }
    }

    /// Envelope を対応するハンドラに振り分ける
    ///
    /// - 未知の呼び出し名: 何もしない
    /// - 引数不正: `printLog` を 1 件出し、状態は変えない
    pub fn dispatch(&mut self, envelope: &Envelope) {
        match InboundCall::parse(envelope) {
            Ok(Some(call)) => self.invoke(call),
            Ok(None) => tracing::trace!("ignoring unknown call {}", envelope.name),
            Err(e) => self.report(format!("{}\n", e)),
        }
    }

    fn invoke(&mut self, call: InboundCall) {
        let result = match call {
            InboundCall::StartSession(object) => {
                if let Err(e) =
                    self.session
                        .start(&self.config, &mut self.outbox, &mut self.host, &object)
                {
                    self.report(format!("{}\n", e));
                }
                return;
            }
            InboundCall::OpenResult {
                fd,
                success,
                is_tty,
            } => self.registry.on_open_result(fd, success, is_tty),
            InboundCall::Read { fd, payload } => self.registry.on_read(fd, &payload),
            InboundCall::WriteAcknowledge { fd, count } => {
                self.registry.on_write_ack(fd, u64::from(count))
            }
            InboundCall::Close { fd } => self.registry.on_close_notification(fd),
            InboundCall::ReadReady { fd, ready } => self.registry.on_read_ready(fd, ready),
            InboundCall::Resize { width, height } => {
                self.session.resize(&mut self.host, width, height);
                Ok(())
            }
            InboundCall::ExitAcknowledge => {
                self.session.on_exit_acknowledged(&mut self.host);
                Ok(())
            }
        };

        if let Err(e) = result {
            self.report(format!("{}\n", e));
        }
    }

    /// ワーカースレッドから届いているイベントをすべて処理する（ブロックしない）
    ///
    /// # 戻り値
    /// 処理したイベント数
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_worker_event(event);
            handled += 1;
        }
        handled
    }

    /// イベントが 1 件届くまで最大 `timeout` 待ち、その後届いているものをすべて処理する
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.events.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_worker_event(event);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// 実行中のセッションが終わるまでイベントを処理する
    ///
    /// # 戻り値
    /// 終了コード。`timeout` 以内に終わらない、またはセッションが無い場合は `None`。
    pub fn wait_for_exit(&mut self, timeout: Duration) -> Option<i32> {
        let deadline = Instant::now() + timeout;
        while self.session.is_running() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.pump_timeout(remaining);
        }
        match self.session.state() {
            SessionState::Exited(code) => Some(code),
            SessionState::Idle | SessionState::Running => None,
        }
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        let result = match event {
            WorkerEvent::Log(message) => {
                self.outbox.print_log(message);
                Ok(())
            }
            WorkerEvent::OpenFile {
                fd,
                path,
                mode,
                capability,
            } => self.registry.open(
                &mut self.outbox,
                fd,
                StreamTarget::File { path, mode },
                capability,
            ),
            WorkerEvent::OpenSocket {
                fd,
                host,
                port,
                capability,
            } => self.registry.open(
                &mut self.outbox,
                fd,
                StreamTarget::Socket { host, port },
                capability,
            ),
            WorkerEvent::Write { fd, data } => {
                self.registry.write(&mut self.outbox, fd, &data);
                Ok(())
            }
            WorkerEvent::Read { fd, size } => {
                self.registry.read(&mut self.outbox, fd, size);
                Ok(())
            }
            WorkerEvent::Close { fd } => self.registry.close(&mut self.outbox, fd),
            WorkerEvent::Exit(code) => {
                self.session.on_worker_exit(&mut self.outbox, code);
                Ok(())
            }
        };

        if let Err(e) = result {
            self.report(format!("{}\n", e));
        }
    }

    /// 致命的でないエラーを `printLog` とローカルログの両方に出す
    fn report(&mut self, message: String) {
        tracing::warn!("{}", message.trim_end());
        self.outbox.print_log(message);
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session_parameters(&self) -> Option<&SessionParameters> {
        self.session.parameters()
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    pub fn outbox_mut(&mut self) -> &mut O {
        &mut self.outbox
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}
