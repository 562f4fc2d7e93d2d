//! ローカル診断ログ（tracing-subscriber）の初期化
//!
//! JS 側に見せるログは `printLog` で送る。ここで設定するのは
//! ブリッジ自身の `tracing` イベントの出力先。

use tracing_subscriber::EnvFilter;

/// フィルタ未指定時の既定値
pub const DEFAULT_LOG_FILTER: &str = "info";

/// グローバルな tracing サブスクライバを設定する
///
/// # 引数
/// - `directives`: `EnvFilter` 形式のフィルタ（例: `"nassh_session=debug"`）。
///   `None` の場合は `RUST_LOG`、それも無ければ [`DEFAULT_LOG_FILTER`]。
///
/// # 戻り値
/// 今回設定できたら `true`。既に設定済みなら `false`（何もしない）。
///
/// wasm32 にはクロックが無いため、タイムスタンプは出さない。
pub fn init(directives: Option<&str>) -> bool {
    let mut rejected = None;
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            rejected = Some((directives.to_string(), e));
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .try_init()
        .is_ok();

    if let Some((directives, e)) = rejected {
        tracing::warn!("Invalid log filter {:?}: {}; using {:?}", directives, e, DEFAULT_LOG_FILTER);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _ = init(Some("nassh_session=debug"));
        // 2 回目は必ず false（他のテストが先に設定していても同じ）
        assert!(!init(Some("not a [valid filter")));
    }
}
