//! nassh-stream エラー型

use nassh_envelope::Descriptor;

/// ストリームレジストリのエラー
///
/// どれも致命的ではない。呼び出し側が `printLog` に流して処理を続ける。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// レジストリに存在しない Descriptor への通知（close との競合で正常に起こりうる）
    UnknownDescriptor {
        /// 通知を受けた呼び出し名（`onRead` など）
        call: &'static str,
        fd: Descriptor,
    },
    /// 既に開いている Descriptor を再度 open した（新しい Capability で置き換え済み）
    DuplicateDescriptor(Descriptor),
    /// 負の Descriptor で open しようとした（登録していない）
    InvalidDescriptor(Descriptor),
}

impl core::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RegistryError::UnknownDescriptor { call, fd } => {
                write!(f, "{}: for unknown file descriptor {}", call, fd)
            }
            RegistryError::DuplicateDescriptor(fd) => {
                write!(f, "open: file descriptor {} is already open, replacing it", fd)
            }
            RegistryError::InvalidDescriptor(fd) => {
                write!(f, "open: invalid file descriptor {}", fd)
            }
        }
    }
}
