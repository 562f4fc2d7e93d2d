//! ブリッジの設定

use serde::Deserialize;

use nassh_stream::{DEFAULT_WRITE_WINDOW, MAX_WRITE_CHUNK};

/// ブリッジ設定
///
/// JSON で上書きできる。未指定のフィールドはデフォルト値。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// argv[0]
    pub program_name: String,
    /// argv[0] の直後に入れるデバッグ用フラグ（debug ビルドでは `-vvv`）
    pub debug_flags: Vec<String>,
    /// `write` Envelope 1 件あたりの最大バイト数
    pub write_chunk_ceiling: usize,
    /// `writeWindow` 未指定時の送信ウィンドウ
    pub default_write_window: usize,
    /// ssh ワーカースレッドの名前
    pub worker_thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            program_name: "ssh".to_string(),
            debug_flags: if cfg!(debug_assertions) {
                vec!["-vvv".to_string()]
            } else {
                Vec::new()
            },
            write_chunk_ceiling: MAX_WRITE_CHUNK,
            default_write_window: DEFAULT_WRITE_WINDOW,
            worker_thread_name: "ssh-session".to_string(),
        }
    }
}

impl BridgeConfig {
    /// JSON 文字列から設定を読み込む
    ///
    /// 解析に失敗した場合は警告を出してデフォルト値を使う。
    /// 0 などの使えない値は個別にデフォルト値へ戻す。
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<BridgeConfig>(text) {
            Ok(config) => config.sanitized(),
            Err(e) => {
                tracing::warn!("Failed to parse bridge config: {}", e);
                Self::default()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.write_chunk_ceiling == 0 {
            tracing::warn!("writeChunkCeiling must be positive; using {}", MAX_WRITE_CHUNK);
            self.write_chunk_ceiling = defaults.write_chunk_ceiling;
        }
        if self.default_write_window == 0 {
            tracing::warn!("defaultWriteWindow must be positive; using {}", DEFAULT_WRITE_WINDOW);
            self.default_write_window = defaults.default_write_window;
        }
        if self.program_name.is_empty() {
            self.program_name = defaults.program_name;
        }
        self
    }
}
