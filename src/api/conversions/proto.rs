/*!
 * Proto Conversions
 * Wire messages to and from process-layer types
 */

use crate::api::server::grpc_server::commander_proto::{Command, Output};
use crate::api::server::grpc_server::loader_proto::ExecutionArgs;
use crate::process::{ExecRequest, OutputChunk, ShellRequest};
use std::ffi::OsString;

impl From<Command> for ShellRequest {
    fn from(cmd: Command) -> Self {
        ShellRequest {
            command: cmd.command,
            shell: cmd.shell,
            working_dir: cmd.working_dir,
            args: cmd.args,
            env: cmd.env,
        }
    }
}

impl From<ExecutionArgs> for ExecRequest {
    fn from(args: ExecutionArgs) -> Self {
        ExecRequest {
            path: args.path.into(),
            args: args.args.into_iter().map(OsString::from).collect(),
            env: args
                .env
                .into_iter()
                .map(|(k, v)| (OsString::from(k), OsString::from(v)))
                .collect(),
        }
    }
}

pub fn output_to_proto(chunk: OutputChunk) -> Output {
    Output {
        stdout: chunk.origin.is_stdout(),
        data: chunk.data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::OutputOrigin;
    use std::collections::HashMap;

    #[test]
    fn test_command_conversion() {
        let cmd = Command {
            command: "ls".into(),
            shell: "/bin/bash".into(),
            working_dir: "/tmp".into(),
            args: vec!["-l".into()],
            env: HashMap::from([("K".to_string(), "V".to_string())]),
        };
        let request = ShellRequest::from(cmd);
        assert_eq!(request.command, "ls");
        assert_eq!(request.shell, "/bin/bash");
        assert_eq!(request.working_dir, "/tmp");
        assert_eq!(request.args, vec!["-l"]);
        assert_eq!(request.env.get("K").map(String::as_str), Some("V"));
    }

    #[test]
    fn test_execution_args_conversion() {
        let args = ExecutionArgs {
            path: "ls".into(),
            args: vec!["-l".into()],
            env: HashMap::from([("K".to_string(), "V".to_string())]),
        };
        let request = ExecRequest::from(args);
        assert_eq!(request.path, "ls");
        assert_eq!(request.args, vec![OsString::from("-l")]);
        assert_eq!(
            request.env.get(&OsString::from("K")),
            Some(&OsString::from("V"))
        );
    }

    #[test]
    fn test_output_origin_flag() {
        let out = output_to_proto(OutputChunk {
            origin: OutputOrigin::Stderr,
            data: b"oops".to_vec(),
        });
        assert!(!out.stdout);
        assert_eq!(out.data, b"oops".to_vec());
    }
}
