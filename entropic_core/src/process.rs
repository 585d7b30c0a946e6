use std::process::ExitStatus;

/// How a child process (build script or fuzzer) finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Code(i32),
    Signal(i32),
    Abnormal,
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            return ExitOutcome::Success;
        }
        if let Some(code) = status.code() {
            return ExitOutcome::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitOutcome::Signal(signal);
            }
        }
        ExitOutcome::Abnormal
    }
}

/// Joins a command line for log output. Arguments containing whitespace are
/// quoted so the line can be pasted back into a shell.
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut line = String::from(program);
    for arg in args {
        line.push(' ');
        if arg.chars().any(char::is_whitespace) {
            line.push('\'');
            line.push_str(arg);
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_quotes_arguments_with_spaces() {
        let args = vec!["-ex".to_string(), "echo hi".to_string()];
        assert_eq!(render_command("/bin/bash", &args), "/bin/bash -ex 'echo hi'");
    }

    #[cfg(unix)]
    #[test]
    fn outcome_from_exit_codes() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(ExitOutcome::from(ExitStatus::from_raw(0)), ExitOutcome::Success);
        // Wait status encodes the exit code in the second byte.
        assert_eq!(ExitOutcome::from(ExitStatus::from_raw(3 << 8)), ExitOutcome::Code(3));
        assert_eq!(ExitOutcome::from(ExitStatus::from_raw(9)), ExitOutcome::Signal(9));
    }
}
