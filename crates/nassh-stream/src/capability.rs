//! ストリームごとの通知受け口

/// Descriptor に紐づくネイティブ側オブジェクト
///
/// JS 側からの応答（open 結果、受信データ、書き込み ACK、クローズ、読み込み可否）を受け取る。
/// 送信ウィンドウの管理（[`crate::WriteWindow`]）はこのオブジェクトの責任。
///
/// ワーカースレッドで生成されて制御スレッドに渡されるため `Send` が必要。
/// 呼び出しは常に制御スレッドから行われる。
pub trait StreamCapability: Send {
    /// open 結果
    fn on_open(&mut self, success: bool, is_tty: bool);

    /// 受信データ（Base64 デコード済み）
    fn on_read(&mut self, data: &[u8]);

    /// JS 側が書き込みを完了したバイト数
    fn on_write_acknowledge(&mut self, count: u64);

    /// ストリームが閉じられた
    fn on_close(&mut self);

    /// 読み込み可能かどうか
    fn on_read_ready(&mut self, ready: bool);
}
