//! セッションコントローラ
//!
//! ```text
//! Idle ──startSession──→ Running ──ssh main が返る──→ Exited(code)
//!  ↑                                                     │
//!  └──────────── 次の startSession を受け付ける ──────────┘
//! ```
//!
//! 同時に動くセッションは 1 つだけ。`start` が唯一の受付口で、制御スレッド上で
//! 同期的に Running を判定するため、連続した `startSession` が競合することはない。

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use serde_json::{Map, Value};

use nassh_envelope::{OutboundCall, Outbox};

use crate::config::BridgeConfig;
use crate::host::SessionHost;
use crate::params::SessionParameters;
use crate::worker::{self, NativeClient, WorkerContext, WorkerEvent, WorkerInvocation};

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// まだセッションを開始していない
    Idle,
    /// ssh ワーカースレッドが動いている
    Running,
    /// 直前のセッションが終了コードを返した（Idle と同じく開始可能）
    Exited(i32),
}

/// セッション開始の失敗
#[derive(Debug)]
pub enum LaunchError {
    /// 既にセッションが動いている（何も変更していない）
    AlreadyRunning,
    /// ワーカースレッドを作れなかった（`exit(-1)` 送信済み）
    SpawnFailed(io::Error),
}

impl core::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LaunchError::AlreadyRunning => write!(f, "startSession: session already running"),
            LaunchError::SpawnFailed(e) => {
                write!(f, "startSession: failed to create ssh thread: {}", e)
            }
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::SpawnFailed(e) => Some(e),
            LaunchError::AlreadyRunning => None,
        }
    }
}

/// セッションのライフサイクル管理
pub struct SessionController {
    /// ネイティブ ssh クライアント
    client: Arc<dyn NativeClient>,
    /// ワーカー → 制御スレッドのキュー（送信側）
    events: Sender<WorkerEvent>,
    state: SessionState,
    /// 実行中のワーカースレッド
    worker: Option<JoinHandle<()>>,
    /// 現在（または直前）のセッションのパラメータ
    params: Option<SessionParameters>,
}

impl SessionController {
    pub fn new(client: Arc<dyn NativeClient>, events: Sender<WorkerEvent>) -> Self {
        SessionController {
            client,
            events,
            state: SessionState::Idle,
            worker: None,
            params: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn parameters(&self) -> Option<&SessionParameters> {
        self.params.as_ref()
    }

    /// セッションを開始する
    ///
    /// 処理フロー:
    /// 1. Running なら拒否（副作用なし）
    /// 2. パラメータを解析
    /// 3. 端末サイズと JS ソケットモードを SessionHost に通知
    /// 4. 環境変数（`environment`, `SSH_AUTH_SOCK`）を設定
    /// 5. argv を組み立ててワーカースレッドを起動
    ///
    /// # エラー
    /// - `LaunchError::AlreadyRunning`: セッション実行中
    /// - `LaunchError::SpawnFailed`: スレッド作成失敗。`exit(-1)` を送り、開始可能な状態に戻る
    pub fn start<O, H>(
        &mut self,
        config: &BridgeConfig,
        out: &mut O,
        host: &mut H,
        object: &Map<String, Value>,
    ) -> Result<(), LaunchError>
    where
        O: Outbox + ?Sized,
        H: SessionHost + ?Sized,
    {
        if self.is_running() {
            return Err(LaunchError::AlreadyRunning);
        }

        let (params, skipped) = SessionParameters::parse(object, config);
        for _ in 0..skipped {
            out.print_log("startSession: invalid argument\n".to_string());
        }

        if let Some((width, height)) = params.terminal_size {
            host.set_terminal_size(width, height);
        }
        if let Some(enabled) = params.use_js_socket {
            host.use_js_socket(enabled);
        }

        let mut environment = Vec::new();
        for (key, value) in params.worker_environment() {
            if !is_exportable(&key, &value) {
                out.print_log(format!("startSession: invalid environment variable {:?}\n", key));
                continue;
            }
            tracing::debug!("env[{}] = {}", key, value);
            std::env::set_var(&key, &value);
            environment.push((key, value));
        }

        let invocation = WorkerInvocation {
            argv: params.worker_argv(config),
            subsystem: params.subsystem.clone(),
            environment,
        };
        tracing::debug!("ssh main args: {:?}", invocation.argv);

        let ctx = WorkerContext::new(self.events.clone(), params.write_window);
        self.params = Some(params);

        let spawned = worker::spawn(
            &config.worker_thread_name,
            Arc::clone(&self.client),
            invocation,
            ctx,
        );
        self.on_spawned(out, spawned)
    }

    /// ワーカースレッド起動結果を反映する
    fn on_spawned<O: Outbox + ?Sized>(
        &mut self,
        out: &mut O,
        spawned: io::Result<JoinHandle<()>>,
    ) -> Result<(), LaunchError> {
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.state = SessionState::Running;
                tracing::info!("ssh session started");
                Ok(())
            }
            Err(e) => {
                out.post(OutboundCall::Exit(-1));
                self.state = SessionState::Idle;
                Err(LaunchError::SpawnFailed(e))
            }
        }
    }

    /// ワーカーの終了コードを JS 側に送り、次のセッションを受け付けられる状態に戻す
    ///
    /// 必ず制御スレッド（`pump`）から呼ぶ。
    pub fn on_worker_exit<O: Outbox + ?Sized>(&mut self, out: &mut O, code: i32) {
        out.post(OutboundCall::Exit(code));

        if let Some(handle) = self.worker.take() {
            // Exit を送った直後にスレッドは終わる
            if handle.join().is_err() {
                tracing::warn!("ssh thread panicked after reporting exit code {}", code);
            }
        }

        self.state = SessionState::Exited(code);
        tracing::info!("ssh session exited with {}", code);
    }

    /// 端末サイズ変更（セッション状態に関係なく通知する）
    pub fn resize<H: SessionHost + ?Sized>(&self, host: &mut H, width: i32, height: i32) {
        host.set_terminal_size(width, height);
    }

    /// `exit` の ACK（ファイルシステム層に通知するだけ）
    pub fn on_exit_acknowledged<H: SessionHost + ?Sized>(&self, host: &mut H) {
        host.exit_acknowledged();
    }
}

/// `std::env::set_var` がパニックしない名前と値か
fn is_exportable(key: &str, value: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '\0']) && !value.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostState;
    use crossbeam_channel::unbounded;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn exit_immediately() -> Arc<dyn NativeClient> {
        Arc::new(|_: &WorkerInvocation, _: &WorkerContext| 0)
    }

    #[test]
    fn test_spawn_failure_reports_minus_one() {
        let (tx, _rx) = unbounded();
        let mut controller = SessionController::new(exit_immediately(), tx);
        let mut out: Vec<OutboundCall> = Vec::new();

        let err = controller
            .on_spawned(&mut out, Err(io::Error::new(io::ErrorKind::Other, "no threads")))
            .unwrap_err();
        assert!(matches!(err, LaunchError::SpawnFailed(_)));
        assert_eq!(out, vec![OutboundCall::Exit(-1)]);
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_start_applies_host_hints() {
        let (tx, rx) = unbounded();
        let mut controller = SessionController::new(exit_immediately(), tx);
        let mut out: Vec<OutboundCall> = Vec::new();
        let mut host = HostState::default();

        controller
            .start(
                &BridgeConfig::default(),
                &mut out,
                &mut host,
                &object(json!({"terminalWidth": 132, "terminalHeight": 43, "useJsSocket": true})),
            )
            .unwrap();
        assert_eq!(host.terminal_size, Some((132, 43)));
        assert!(host.js_socket);
        assert!(controller.is_running());

        let event = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert!(matches!(event, WorkerEvent::Exit(0)));
        controller.on_worker_exit(&mut out, 0);
        assert_eq!(controller.state(), SessionState::Exited(0));
        assert_eq!(out, vec![OutboundCall::Exit(0)]);
    }

    #[test]
    fn test_start_while_running_has_no_side_effects() {
        let (tx, _rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();
        let client: Arc<dyn NativeClient> =
            Arc::new(move |_: &WorkerInvocation, _: &WorkerContext| {
                let _ = release_rx.recv();
                0
            });
        let mut controller = SessionController::new(client, tx);
        let mut out: Vec<OutboundCall> = Vec::new();
        let mut host = HostState::default();
        let config = BridgeConfig::default();

        controller
            .start(&config, &mut out, &mut host, &object(json!({"host": "a.example.com"})))
            .unwrap();
        let err = controller
            .start(
                &config,
                &mut out,
                &mut host,
                &object(json!({"host": "b.example.com", "terminalWidth": 1, "terminalHeight": 1})),
            )
            .unwrap_err();

        assert!(matches!(err, LaunchError::AlreadyRunning));
        assert_eq!(
            controller.parameters().and_then(|p| p.host.as_deref()),
            Some("a.example.com")
        );
        assert_eq!(host, HostState::default());
        assert!(out.is_empty());

        release_tx.send(()).unwrap();
    }

    #[test]
    fn test_invalid_environment_names_are_skipped() {
        let (tx, rx) = unbounded();
        let mut controller = SessionController::new(exit_immediately(), tx);
        let mut out: Vec<OutboundCall> = Vec::new();
        let mut host = HostState::default();

        controller
            .start(
                &BridgeConfig::default(),
                &mut out,
                &mut host,
                &object(json!({"environment": {"BAD=NAME": "x", "NASSH_CONTROLLER_TEST": "ok"}})),
            )
            .unwrap();

        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], OutboundCall::PrintLog(msg) if msg.contains("BAD=NAME")));
        assert_eq!(std::env::var("NASSH_CONTROLLER_TEST").as_deref(), Ok("ok"));

        let _ = rx.recv_timeout(std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_resize_and_exit_ack_forwarded_in_any_state() {
        let (tx, _rx) = unbounded();
        let controller = SessionController::new(exit_immediately(), tx);
        let mut host = HostState::default();

        controller.resize(&mut host, 100, 30);
        controller.on_exit_acknowledged(&mut host);
        assert_eq!(host.terminal_size, Some((100, 30)));
        assert_eq!(host.exit_acks, 1);
    }
}
