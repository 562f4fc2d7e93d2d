//! OpenSSH のエントリポイント
//!
//! wasm32 ビルドでは OpenSSH 移植版がリンクされ、`ssh_main` を提供する。
//! ストリーム I/O はそちら側のファイルシステム層が行う。

use nassh_session::{NativeClient, WorkerContext, WorkerInvocation};

#[cfg(target_arch = "wasm32")]
mod ffi {
    use core::ffi::{c_char, c_int};

    extern "C" {
        /// リネーム済みの OpenSSH main
        pub fn ssh_main(ac: c_int, av: *const *const c_char, subsystem: *const c_char) -> c_int;
    }
}

/// OpenSSH 移植版を呼び出す NativeClient
pub struct OpensshMain;

impl NativeClient for OpensshMain {
    #[cfg(target_arch = "wasm32")]
    fn run(&self, invocation: &WorkerInvocation, ctx: &WorkerContext) -> i32 {
        use std::ffi::CString;

        let argv: Result<Vec<CString>, _> = invocation
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect();
        let subsystem = invocation
            .subsystem
            .as_deref()
            .map(CString::new)
            .transpose();

        let (argv, subsystem) = match (argv, subsystem) {
            (Ok(argv), Ok(subsystem)) => (argv, subsystem),
            _ => {
                ctx.print_log("startSession: argument contains a NUL byte\n");
                return -1;
            }
        };

        let mut av: Vec<*const core::ffi::c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
        av.push(core::ptr::null());
        let subsystem_ptr = subsystem
            .as_ref()
            .map_or(core::ptr::null(), |s| s.as_ptr());

        // argv と subsystem の CString は ssh_main が返るまで生きている
        unsafe { ffi::ssh_main(argv.len() as core::ffi::c_int, av.as_ptr(), subsystem_ptr) }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn run(&self, invocation: &WorkerInvocation, ctx: &WorkerContext) -> i32 {
        ctx.print_log(format!(
            "ssh_main is only linked into wasm32 builds; not running {:?}\n",
            invocation.argv
        ));
        -1
    }
}
