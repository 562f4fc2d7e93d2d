//! # nassh-session
//!
//! JS ホストからの呼び出しのディスパッチと、ssh セッションのライフサイクル管理。
//!
//! ## スレッドモデル
//!
//! ```text
//! 制御スレッド（1 本）                     ワーカースレッド（最大 1 本）
//!   Bridge::handle_message(text)            NativeClient::run(argv)
//!     → InboundCall                           （ブロッキング）
//!     → SessionController / StreamRegistry     │
//!   Bridge::pump()  ←──── WorkerEvent ─────────┘
//!     → Outbox（JS ホストへ）
//! ```
//!
//! - JS 向けの呼び出しとレジストリ操作は制御スレッドだけが行う（ロック不要）
//! - ワーカースレッドはキュー経由でしか制御スレッドと通信しない
//! - ワーカーのキャンセル・タイムアウトは無い。終了コードが返るまで動き続ける
//!
//! ## 使用例
//!
//! ```no_run
//! use std::sync::Arc;
//! use nassh_envelope::OutboundCall;
//! use nassh_session::{Bridge, BridgeConfig, HostState, NativeClient, WorkerContext, WorkerInvocation};
//!
//! let client: Arc<dyn NativeClient> = Arc::new(|inv: &WorkerInvocation, ctx: &WorkerContext| {
//!     ctx.print_log(format!("would run {:?}\n", inv.argv));
//!     0
//! });
//! let mut bridge = Bridge::new(BridgeConfig::default(), client, Vec::<OutboundCall>::new(), HostState::default());
//!
//! bridge.handle_message(r#"{"name":"startSession","arguments":[{"host":"example.com","username":"alice"}]}"#);
//! // 制御スレッドのイベントループから定期的に呼ぶ
//! bridge.pump();
//! ```

pub mod bridge;
pub mod call;
pub mod config;
pub mod controller;
pub mod host;
pub mod logging;
pub mod params;
pub mod worker;

pub use bridge::Bridge;
pub use call::{CallError, InboundCall};
pub use config::BridgeConfig;
pub use controller::{LaunchError, SessionController, SessionState};
pub use host::{HostState, SessionHost};
pub use params::SessionParameters;
pub use worker::{NativeClient, WorkerContext, WorkerEvent, WorkerInvocation, PANIC_EXIT_CODE};
