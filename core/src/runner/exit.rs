/// Maps an exit status to a single code; a fatal signal `n` becomes `128 + n`.
pub fn normalize_exit(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(code) = status.code() {
            code
        } else if let Some(sig) = status.signal() {
            128 + sig
        } else {
            1
        }
    }
    #[cfg(windows)]
    {
        status.code().unwrap_or(1)
    }
}

/// Codes above 128 are ambiguous after [`normalize_exit`], so no signal is named.
pub fn describe_exit(code: i32) -> String {
    format!("test process exited with code {code}")
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::process::ExitStatusExt;

    use super::*;

    #[test]
    fn signal_maps_above_128() {
        // raw wait status 9 = killed by SIGKILL
        assert_eq!(normalize_exit(std::process::ExitStatus::from_raw(9)), 137);
        // raw wait status 3 << 8 = exited with code 3
        assert_eq!(normalize_exit(std::process::ExitStatus::from_raw(3 << 8)), 3);
    }

    #[test]
    fn description_does_not_guess_a_signal() {
        assert_eq!(describe_exit(130), "test process exited with code 130");
        assert_eq!(describe_exit(2), "test process exited with code 2");
    }
}
