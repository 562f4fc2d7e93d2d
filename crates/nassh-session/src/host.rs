//! ネイティブ側ファイルシステム層への通知口
//!
//! 端末サイズ、JS ソケットモード、終了コード ACK はこのブリッジでは解釈せず、
//! そのまま外部のファイルシステム層に渡す。

/// ファイルシステム層（外部協調者）
pub trait SessionHost {
    /// 端末サイズ（セッション開始時と `onResize`）
    fn set_terminal_size(&mut self, width: i32, height: i32);

    /// ソケット I/O を JS 側で行うかどうか
    fn use_js_socket(&mut self, enabled: bool);

    /// JS 側が `exit` を受け取った
    fn exit_acknowledged(&mut self);
}

/// 通知された値を保持するだけの SessionHost
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostState {
    /// 最後に通知された端末サイズ
    pub terminal_size: Option<(i32, i32)>,
    /// JS ソケットモード
    pub js_socket: bool,
    /// `onExitAcknowledge` を受けた回数
    pub exit_acks: u32,
}

impl SessionHost for HostState {
    fn set_terminal_size(&mut self, width: i32, height: i32) {
        self.terminal_size = Some((width, height));
    }

    fn use_js_socket(&mut self, enabled: bool) {
        self.js_socket = enabled;
    }

    fn exit_acknowledged(&mut self) {
        self.exit_acks += 1;
    }
}
