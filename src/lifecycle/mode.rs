/*!
 * Startup Mode
 * Pure decision procedure over environment signals
 *
 * Undetermined -> ExecDelegate | InteractiveProbe | ServerPiped | ServerInit
 */

use crate::process::ExecRequest;
use std::ffi::OsString;
use std::io::IsTerminal;

/// Lifecycle states; everything but `Undetermined` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Undetermined,
    ExecDelegate,
    InteractiveProbe,
    ServerPiped,
    ServerInit,
}

impl LifecycleState {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, LifecycleState::Undetermined)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Undetermined => "undetermined",
            LifecycleState::ExecDelegate => "exec_delegate",
            LifecycleState::InteractiveProbe => "interactive_probe",
            LifecycleState::ServerPiped => "server_piped",
            LifecycleState::ServerInit => "server_init",
        }
    }
}

/// Ambient facts read once at the entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupFacts {
    /// Arguments after the program name, as the kernel passed them
    pub args: Vec<OsString>,
    pub stdin_is_terminal: bool,
    pub pid: u32,
}

impl StartupFacts {
    pub fn capture() -> Self {
        Self {
            args: std::env::args_os().skip(1).collect(),
            stdin_is_terminal: std::io::stdin().is_terminal(),
            pid: std::process::id(),
        }
    }
}

/// What to do before any I/O has happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupDecision {
    /// Replace this process with the given command
    Exec(ExecRequest),
    /// List services and exit
    Probe,
    /// Bridge stdio to a server, then decide after peeking at stdin
    Bridge,
}

impl StartupDecision {
    /// The state this decision commits to, if it is already final
    pub fn state(&self) -> LifecycleState {
        match self {
            StartupDecision::Exec(_) => LifecycleState::ExecDelegate,
            StartupDecision::Probe => LifecycleState::InteractiveProbe,
            StartupDecision::Bridge => LifecycleState::Undetermined,
        }
    }
}

/// Rules 1-3: arguments win, then a terminal on stdin, else bridge
pub fn decide(facts: &StartupFacts) -> StartupDecision {
    if let Some((path, rest)) = facts.args.split_first() {
        return StartupDecision::Exec(ExecRequest::new(path.clone(), rest.to_vec()));
    }
    if facts.stdin_is_terminal {
        return StartupDecision::Probe;
    }
    StartupDecision::Bridge
}

/// Rules 4-6: init serves forever; otherwise an empty first read degrades
/// to the probe
pub fn decide_after_peek(had_data: bool, is_init: bool) -> LifecycleState {
    if is_init {
        LifecycleState::ServerInit
    } else if !had_data {
        LifecycleState::InteractiveProbe
    } else {
        LifecycleState::ServerPiped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(args: &[&str], tty: bool) -> StartupFacts {
        StartupFacts {
            args: args.iter().map(OsString::from).collect(),
            stdin_is_terminal: tty,
            pid: 4242,
        }
    }

    #[test]
    fn test_args_take_priority_over_terminal() {
        let decision = decide(&facts(&["ls", "-l", "/"], true));
        assert_eq!(
            decision,
            StartupDecision::Exec(ExecRequest::new("ls", vec!["-l".into(), "/".into()]))
        );
        assert_eq!(decision.state(), LifecycleState::ExecDelegate);
    }

    #[test]
    fn test_single_arg_has_no_extra_args() {
        match decide(&facts(&["true"], false)) {
            StartupDecision::Exec(req) => {
                assert_eq!(req.path, "true");
                assert!(req.args.is_empty());
                assert!(req.env.is_empty());
            }
            other => panic!("expected exec, got {:?}", other),
        }
    }

    #[test]
    fn test_exec_args_keep_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let raw = std::ffi::OsStr::from_bytes(b"\xff");
        let facts = StartupFacts {
            args: vec![OsString::from("printf"), OsString::from("%s"), raw.to_os_string()],
            stdin_is_terminal: false,
            pid: 4242,
        };
        match decide(&facts) {
            StartupDecision::Exec(req) => {
                assert_eq!(req.path, "printf");
                assert_eq!(req.args[1].as_bytes(), b"\xff");
            }
            other => panic!("expected exec, got {:?}", other),
        }
    }

    #[test]
    fn test_terminal_probes() {
        assert_eq!(decide(&facts(&[], true)), StartupDecision::Probe);
    }

    #[test]
    fn test_pipe_bridges() {
        let decision = decide(&facts(&[], false));
        assert_eq!(decision, StartupDecision::Bridge);
        assert!(!decision.state().is_terminal());
    }

    #[test]
    fn test_after_peek_table() {
        assert_eq!(decide_after_peek(true, false), LifecycleState::ServerPiped);
        assert_eq!(decide_after_peek(false, false), LifecycleState::InteractiveProbe);
        assert_eq!(decide_after_peek(true, true), LifecycleState::ServerInit);
        assert_eq!(decide_after_peek(false, true), LifecycleState::ServerInit);
    }
}
