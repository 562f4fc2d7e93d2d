//! `startSession` のパラメータ
//!
//! JS 側のオブジェクトから 1 回だけ組み立て、セッション中は変更しない。
//! 型が合わないフィールドは「指定なし」として扱う。

use serde_json::{Map, Value};

use nassh_envelope::as_int;

use crate::config::BridgeConfig;

// 既知の startSession 属性
const USERNAME_ATTR: &str = "username";
const HOST_ATTR: &str = "host";
const PORT_ATTR: &str = "port";
const TERMINAL_WIDTH_ATTR: &str = "terminalWidth";
const TERMINAL_HEIGHT_ATTR: &str = "terminalHeight";
const USE_JS_SOCKET_ATTR: &str = "useJsSocket";
const ENVIRONMENT_ATTR: &str = "environment";
const ARGUMENTS_ATTR: &str = "arguments";
const WRITE_WINDOW_ATTR: &str = "writeWindow";
const AUTH_AGENT_APP_ID_ATTR: &str = "authAgentAppID";
const SUBSYSTEM_ATTR: &str = "subsystem";

/// 認証エージェントのソケット識別子を渡す環境変数
pub const AUTH_SOCK_ENV: &str = "SSH_AUTH_SOCK";

/// セッション開始パラメータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParameters {
    pub username: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    /// 幅と高さが両方とも数値の場合のみ `Some`
    pub terminal_size: Option<(i32, i32)>,
    pub use_js_socket: Option<bool>,
    /// 文字列値のペアのみ（キー順）
    pub environment: Vec<(String, String)>,
    /// ssh に渡す追加引数（文字列のみ）
    pub arguments: Vec<String>,
    /// 送信ウィンドウ（バイト）
    pub write_window: usize,
    pub auth_agent_app_id: Option<String>,
    pub subsystem: Option<String>,
}

impl SessionParameters {
    /// JS 側のオブジェクトからパラメータを組み立てる
    ///
    /// # 戻り値
    /// `(パラメータ, 文字列でなかったため捨てた arguments 要素の数)`
    pub fn parse(object: &Map<String, Value>, config: &BridgeConfig) -> (Self, usize) {
        let string = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        let terminal_size = match (
            object.get(TERMINAL_WIDTH_ATTR).and_then(as_int),
            object.get(TERMINAL_HEIGHT_ATTR).and_then(as_int),
        ) {
            (Some(width), Some(height)) => {
                match (i32::try_from(width), i32::try_from(height)) {
                    (Ok(width), Ok(height)) => Some((width, height)),
                    _ => None,
                }
            }
            _ => None,
        };

        let environment = match object.get(ENVIRONMENT_ATTR) {
            Some(Value::Object(env)) => env
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect(),
            _ => Vec::new(),
        };

        let mut skipped = 0;
        let arguments = match object.get(ARGUMENTS_ATTR) {
            Some(Value::Array(args)) => args
                .iter()
                .filter_map(|arg| {
                    let arg = arg.as_str().map(str::to_string);
                    if arg.is_none() {
                        skipped += 1;
                    }
                    arg
                })
                .collect(),
            _ => Vec::new(),
        };

        let write_window = object
            .get(WRITE_WINDOW_ATTR)
            .and_then(as_int)
            .and_then(|window| usize::try_from(window).ok())
            .filter(|window| *window > 0)
            .unwrap_or(config.default_write_window);

        let params = SessionParameters {
            username: string(USERNAME_ATTR),
            host: string(HOST_ATTR),
            port: object.get(PORT_ATTR).and_then(as_int),
            terminal_size,
            use_js_socket: object.get(USE_JS_SOCKET_ATTR).and_then(Value::as_bool),
            environment,
            arguments,
            write_window,
            auth_agent_app_id: string(AUTH_AGENT_APP_ID_ATTR),
            subsystem: string(SUBSYSTEM_ATTR),
        };
        (params, skipped)
    }

    /// ssh の argv を組み立てる
    ///
    /// ```text
    /// [program, debug flags..., arguments..., -p<port>, user@host]
    /// ```
    ///
    /// サブシステム名は argv に含めず、別引数で ssh に渡す。
    pub fn worker_argv(&self, config: &BridgeConfig) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.arguments.len() + config.debug_flags.len() + 3);
        argv.push(config.program_name.clone());
        argv.extend(config.debug_flags.iter().cloned());
        argv.extend(self.arguments.iter().cloned());

        if let Some(port) = self.port {
            argv.push(format!("-p{}", port));
        }

        if let (Some(username), Some(host)) = (&self.username, &self.host) {
            argv.push(format!("{}@{}", username, host));
        }

        argv
    }

    /// ワーカーに渡す環境変数（`environment` の後に `SSH_AUTH_SOCK`）
    pub fn worker_environment(&self) -> Vec<(String, String)> {
        let mut env = self.environment.clone();
        if let Some(app_id) = &self.auth_agent_app_id {
            env.push((AUTH_SOCK_ENV.to_string(), app_id.clone()));
        }
        env
    }
}
