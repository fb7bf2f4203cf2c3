pub mod io;

use std::io as stdio;

/// Name printed in front of diagnostics: the binary name without its
/// `f` prefix, so `fz85` reports as `z85`.
#[inline]
pub fn gnu_name(binary_name: &str) -> &str {
    binary_name.strip_prefix('f').unwrap_or(binary_name)
}

/// Let a closed downstream pipe terminate the process instead of
/// surfacing as EPIPE write errors. Call first thing in main().
#[inline]
pub fn reset_sigpipe() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

/// Text of an I/O error for a diagnostic line. OS errors lose the
/// trailing " (os error N)" so they read like `strerror` output.
pub fn io_error_msg(e: &stdio::Error) -> String {
    let msg = e.to_string();
    match e.raw_os_error() {
        Some(code) => msg
            .strip_suffix(format!(" (os error {})", code).as_str())
            .map_or_else(|| msg.clone(), str::to_owned),
        None => msg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gnu_name() {
        assert_eq!(gnu_name("fz85"), "z85");
        assert_eq!(gnu_name("z85"), "z85");
    }

    #[test]
    fn test_io_error_msg_strips_os_suffix() {
        let e = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(!io_error_msg(&e).contains("os error"));
        #[cfg(unix)]
        {
            let e = std::io::Error::from_raw_os_error(libc::ENOENT);
            assert_eq!(io_error_msg(&e), "No such file or directory");
        }
    }

    #[test]
    fn test_io_error_msg_custom() {
        let e = std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid input: empty input");
        assert_eq!(io_error_msg(&e), "invalid input: empty input");
    }
}
