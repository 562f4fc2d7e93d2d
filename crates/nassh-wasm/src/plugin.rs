//! SshPlugin wasm-bindgen エクスポート
//!
//! JS ホスト（nassh）から呼び出すプラグインインスタンス。
//! JS → ネイティブは `handleMessage`、ネイティブ → JS はコンストラクタで渡された
//! `postMessage` コールバックで行う。

use std::sync::Arc;

use js_sys::Function;
use wasm_bindgen::prelude::*;

use nassh_envelope::{OutboundCall, Outbox};
use nassh_session::{Bridge, BridgeConfig, HostState, SessionState};

use crate::ssh_main::OpensshMain;

/// JS の `postMessage` コールバックへ Envelope を送る Outbox
pub struct JsOutbox {
    post_message: Function,
}

impl JsOutbox {
    pub fn new(post_message: Function) -> Self {
        JsOutbox { post_message }
    }
}

impl Outbox for JsOutbox {
    fn post(&mut self, call: OutboundCall) {
        let name = call.name();
        let text = call.into_envelope().to_wire();
        if let Err(e) = self
            .post_message
            .call1(&JsValue::NULL, &JsValue::from_str(&text))
        {
            tracing::warn!("postMessage({}) threw: {:?}", name, e);
        }
    }
}

/// nassh プラグインインスタンス
///
/// ## スレッド安全性
///
/// JS のメインスレッド（= 制御スレッド）からのみ呼び出す。
/// ssh 本体は別スレッドで動き、その出力は `pump` 呼び出し時にまとめて JS 側に送られる。
///
/// ## 使用方法（TypeScript）
///
/// ```typescript
/// const plugin = new SshPlugin((msg: string) => onPluginMessage(JSON.parse(msg)));
/// plugin.handleMessage(JSON.stringify({name: 'startSession', arguments: [params]}));
/// setInterval(() => plugin.pump(), 10);
/// ```
#[wasm_bindgen]
pub struct SshPlugin {
    bridge: Bridge<JsOutbox, HostState>,
}

#[wasm_bindgen]
impl SshPlugin {
    /// プラグインを初期化する
    ///
    /// # 引数
    /// - `post_message`: Envelope テキストを 1 件ずつ受け取る JS 関数
    /// - `config_json`: `BridgeConfig` の JSON（省略時はデフォルト）
    #[wasm_bindgen(constructor)]
    pub fn new(post_message: Function, config_json: Option<String>) -> SshPlugin {
        let config = config_json
            .as_deref()
            .map(BridgeConfig::from_json)
            .unwrap_or_default();

        SshPlugin {
            bridge: Bridge::new(
                config,
                Arc::new(OpensshMain),
                JsOutbox::new(post_message),
                HostState::default(),
            ),
        }
    }

    /// JS 側からの Envelope テキストを処理する
    #[wasm_bindgen(js_name = "handleMessage")]
    pub fn handle_message(&mut self, message: &str) {
        self.bridge.handle_message(message);
    }

    /// ssh ワーカーからのイベントを JS 側に流す
    ///
    /// # 戻り値
    /// 処理したイベント数
    #[wasm_bindgen]
    pub fn pump(&mut self) -> u32 {
        u32::try_from(self.bridge.pump()).unwrap_or(u32::MAX)
    }

    /// セッション状態（`"idle"` / `"running"` / `"exited"`）
    #[wasm_bindgen(js_name = "sessionState")]
    pub fn session_state(&self) -> String {
        match self.bridge.session_state() {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Exited(_) => "exited",
        }
        .to_string()
    }

    /// 直前のセッションの終了コード
    #[wasm_bindgen(js_name = "exitCode")]
    pub fn exit_code(&self) -> Option<i32> {
        match self.bridge.session_state() {
            SessionState::Exited(code) => Some(code),
            SessionState::Idle | SessionState::Running => None,
        }
    }

    /// 最後に通知された端末サイズ `[width, height]`（未通知なら空配列）
    #[wasm_bindgen(js_name = "terminalSize")]
    pub fn terminal_size(&self) -> Vec<i32> {
        self.bridge
            .host()
            .terminal_size
            .map(|(w, h)| vec![w, h])
            .unwrap_or_default()
    }

    /// 開いている Descriptor の数
    #[wasm_bindgen(js_name = "openStreams")]
    pub fn open_streams(&self) -> u32 {
        u32::try_from(self.bridge.registry().len()).unwrap_or(u32::MAX)
    }
}
