//! # nassh-wasm
//!
//! wasm-bindgen エクスポート：JS ホスト（nassh）から呼び出す公開 API。
//!
//! ## 使用方法（TypeScript）
//!
//! ```typescript
//! import { SshPlugin, init_panic_hook, initLogging } from '../nassh-wasm-pkg/nassh_wasm';
//!
//! // パニック時のスタックトレースを有効化（開発時）
//! init_panic_hook();
//! initLogging("nassh_session=debug");
//!
//! // プラグイン初期化（ネイティブ → JS の Envelope はコールバックで届く）
//! const plugin = new SshPlugin((text) => dispatchToJs(JSON.parse(text)));
//!
//! // JS → ネイティブ
//! plugin.handleMessage(JSON.stringify({
//!     name: 'startSession',
//!     arguments: [{username: 'alice', host: 'example.com', port: 22}],
//! }));
//!
//! // ssh スレッドからの出力を定期的に流す
//! setInterval(() => plugin.pump(), 10);
//! ```

use wasm_bindgen::prelude::*;

pub mod plugin;
pub mod ssh_main;

pub use plugin::{JsOutbox, SshPlugin};
pub use ssh_main::OpensshMain;

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// ブリッジ内部の tracing ログを有効にする
///
/// # 引数
/// - `filter`: `EnvFilter` 形式（例: `"nassh_session=debug"`）。省略時は `info`。
///
/// # 戻り値
/// 今回設定できたら `true`（既に設定済みなら `false`）
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging(filter: Option<String>) -> bool {
    nassh_session::logging::init(filter.as_deref())
}

/// Base64 ペイロードをデコードするユーティリティ
///
/// テスト・デバッグ用。`write` Envelope の中身を確認するときに使う。
///
/// # エラー
/// - Base64 デコード失敗
#[wasm_bindgen(js_name = "decodePayload")]
pub fn decode_payload(payload: &str) -> Result<js_sys::Uint8Array, JsError> {
    let data = nassh_envelope::decode_payload(payload)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    let arr = js_sys::Uint8Array::new_with_length(data.len() as u32);
    arr.copy_from(&data);
    Ok(arr)
}
