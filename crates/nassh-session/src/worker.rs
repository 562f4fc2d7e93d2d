//! ssh ワーカースレッド
//!
//! ネイティブ ssh クライアントのエントリポイントはブロッキングなので、専用スレッドで動かす。
//! ワーカースレッドは JS 向けの呼び出しを直接行わない。ログ、ストリーム操作、終了コードは
//! すべて [`WorkerEvent`] としてキューに積み、制御スレッドが `pump` で取り出して処理する。
//!
//! ```text
//! worker thread                      control thread
//!   NativeClient::run(...)
//!     ctx.open_socket(...)  ──┐
//!     ctx.write(...)          ├─→ channel ─→ Bridge::pump() ─→ StreamRegistry / Outbox
//!     ctx.print_log(...)      │
//!   return exit code ─────────┘ (WorkerEvent::Exit)
//! ```

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;

use nassh_envelope::Descriptor;
use nassh_stream::StreamCapability;

/// ワーカースレッドから制御スレッドへ渡すイベント
pub enum WorkerEvent {
    /// `printLog` として JS 側に送る
    Log(String),
    /// ファイルを開く
    OpenFile {
        fd: Descriptor,
        path: String,
        mode: i32,
        capability: Box<dyn StreamCapability>,
    },
    /// ソケットを開く
    OpenSocket {
        fd: Descriptor,
        host: String,
        port: u16,
        capability: Box<dyn StreamCapability>,
    },
    /// 書き込み（分割は制御スレッド側）
    Write { fd: Descriptor, data: Vec<u8> },
    /// 読み込み依頼
    Read { fd: Descriptor, size: u64 },
    /// クローズ
    Close { fd: Descriptor },
    /// ssh のエントリポイントが返った
    Exit(i32),
}

impl std::fmt::Debug for WorkerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerEvent::Log(msg) => f.debug_tuple("Log").field(msg).finish(),
            WorkerEvent::OpenFile { fd, path, mode, .. } => f
                .debug_struct("OpenFile")
                .field("fd", fd)
                .field("path", path)
                .field("mode", mode)
                .finish_non_exhaustive(),
            WorkerEvent::OpenSocket { fd, host, port, .. } => f
                .debug_struct("OpenSocket")
                .field("fd", fd)
                .field("host", host)
                .field("port", port)
                .finish_non_exhaustive(),
            WorkerEvent::Write { fd, data } => f
                .debug_struct("Write")
                .field("fd", fd)
                .field("len", &data.len())
                .finish(),
            WorkerEvent::Read { fd, size } => f
                .debug_struct("Read")
                .field("fd", fd)
                .field("size", size)
                .finish(),
            WorkerEvent::Close { fd } => f.debug_struct("Close").field("fd", fd).finish(),
            WorkerEvent::Exit(code) => f.debug_tuple("Exit").field(code).finish(),
        }
    }
}

/// ssh エントリポイントに渡す起動情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInvocation {
    /// argv（argv[0] はプログラム名）
    pub argv: Vec<String>,
    /// argv とは別に渡すサブシステム名
    pub subsystem: Option<String>,
    /// ワーカーの環境に設定済みの変数
    pub environment: Vec<(String, String)>,
}

/// ワーカースレッド側の操作口
///
/// すべての操作はキューに積むだけで、実際の処理は制御スレッドで行われる。
/// 制御スレッド側が既に無い場合、イベントは捨てられる。
#[derive(Clone)]
pub struct WorkerContext {
    events: Sender<WorkerEvent>,
    write_window: usize,
}

impl WorkerContext {
    pub(crate) fn new(events: Sender<WorkerEvent>, write_window: usize) -> Self {
        WorkerContext {
            events,
            write_window,
        }
    }

    /// このセッションの送信ウィンドウ（バイト）
    pub fn write_window(&self) -> usize {
        self.write_window
    }

    /// JS 側にログを送る
    pub fn print_log(&self, message: impl Into<String>) {
        self.send(WorkerEvent::Log(message.into()));
    }

    pub fn open_file(
        &self,
        fd: Descriptor,
        path: impl Into<String>,
        mode: i32,
        capability: Box<dyn StreamCapability>,
    ) {
        self.send(WorkerEvent::OpenFile {
            fd,
            path: path.into(),
            mode,
            capability,
        });
    }

    pub fn open_socket(
        &self,
        fd: Descriptor,
        host: impl Into<String>,
        port: u16,
        capability: Box<dyn StreamCapability>,
    ) {
        self.send(WorkerEvent::OpenSocket {
            fd,
            host: host.into(),
            port,
            capability,
        });
    }

    pub fn write(&self, fd: Descriptor, data: &[u8]) {
        self.send(WorkerEvent::Write {
            fd,
            data: data.to_vec(),
        });
    }

    pub fn read(&self, fd: Descriptor, size: u64) {
        self.send(WorkerEvent::Read { fd, size });
    }

    pub fn close(&self, fd: Descriptor) {
        self.send(WorkerEvent::Close { fd });
    }

    pub(crate) fn finish(&self, code: i32) {
        self.send(WorkerEvent::Exit(code));
    }

    fn send(&self, event: WorkerEvent) {
        if let Err(e) = self.events.send(event) {
            tracing::debug!("control thread gone, dropping {:?}", e.into_inner());
        }
    }
}

/// ブロッキングなネイティブ ssh クライアント
///
/// `run` はワーカースレッドで呼ばれ、セッション終了まで戻らない。
pub trait NativeClient: Send + Sync + 'static {
    /// ssh を実行し、終了コードを返す
    fn run(&self, invocation: &WorkerInvocation, ctx: &WorkerContext) -> i32;
}

/// クロージャをそのまま NativeClient として使う
impl<F> NativeClient for F
where
    F: Fn(&WorkerInvocation, &WorkerContext) -> i32 + Send + Sync + 'static,
{
    fn run(&self, invocation: &WorkerInvocation, ctx: &WorkerContext) -> i32 {
        self(invocation, ctx)
    }
}

/// ネイティブクライアントがパニックした場合の終了コード
pub const PANIC_EXIT_CODE: i32 = -1;

/// ワーカースレッドを起動する
///
/// スレッドは `client.run` の戻り値を `WorkerEvent::Exit` としてキューに積んで終了する。
/// `client.run` がパニックした場合も [`PANIC_EXIT_CODE`] で必ず `Exit` を積む。
pub(crate) fn spawn(
    thread_name: &str,
    client: Arc<dyn NativeClient>,
    invocation: WorkerInvocation,
    ctx: WorkerContext,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            let code = match panic::catch_unwind(AssertUnwindSafe(|| client.run(&invocation, &ctx)))
            {
                Ok(code) => {
                    tracing::debug!("ssh main returned {}", code);
                    code
                }
                Err(payload) => {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!("ssh main panicked: {}", reason);
                    ctx.print_log(format!("ssh main panicked: {}\n", reason));
                    PANIC_EXIT_CODE
                }
            };
            ctx.finish(code);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_worker_events_arrive_in_order() {
        let (tx, rx) = unbounded();
        let ctx = WorkerContext::new(tx, 4096);
        let client: Arc<dyn NativeClient> =
            Arc::new(|inv: &WorkerInvocation, ctx: &WorkerContext| {
                ctx.print_log(format!("argc = {}\n", inv.argv.len()));
                ctx.write(1, b"hi");
                ctx.close(1);
                ctx.write_window() as i32
            });
        let invocation = WorkerInvocation {
            argv: vec!["ssh".to_string()],
            subsystem: None,
            environment: Vec::new(),
        };

        let handle = spawn("ssh-test", client, invocation, ctx).unwrap();
        handle.join().unwrap();

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], WorkerEvent::Log(msg) if msg == "argc = 1\n"));
        assert!(matches!(&events[1], WorkerEvent::Write { fd: 1, data } if data == b"hi"));
        assert!(matches!(events[2], WorkerEvent::Close { fd: 1 }));
        assert!(matches!(events[3], WorkerEvent::Exit(4096)));
    }

    #[test]
    fn test_panicking_client_still_reports_exit() {
        let (tx, rx) = unbounded();
        let ctx = WorkerContext::new(tx, 1);
        let client: Arc<dyn NativeClient> =
            Arc::new(|_: &WorkerInvocation, _: &WorkerContext| -> i32 {
                panic!("native client crashed")
            });
        let invocation = WorkerInvocation {
            argv: vec!["ssh".to_string()],
            subsystem: None,
            environment: Vec::new(),
        };

        let handle = spawn("ssh-test", client, invocation, ctx).unwrap();
        assert!(handle.join().is_ok());

        let events: Vec<WorkerEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(
            matches!(&events[0], WorkerEvent::Log(msg) if msg.contains("native client crashed"))
        );
        assert!(matches!(events[1], WorkerEvent::Exit(PANIC_EXIT_CODE)));
    }

    #[test]
    fn test_send_after_receiver_dropped_is_harmless() {
        let (tx, rx) = unbounded();
        drop(rx);
        let ctx = WorkerContext::new(tx, 1);
        ctx.print_log("nobody listening");
        ctx.finish(0);
    }
}
