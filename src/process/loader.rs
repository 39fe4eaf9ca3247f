/*!
 * Process Loader
 * Replaces the current process image with another executable
 *
 * `replace_process_image` bypasses every destructor, flush and task
 * teardown in this process. Call it only when nothing else owns resources
 * that need explicit cleanup.
 */

use super::environment::HostEnvironment;
use super::path::look_path;
use super::types::{ExecRequest, LoaderError, LoaderResult};
use nix::unistd::execve;
use std::convert::Infallible;
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Resolve `path` to the file that will be executed.
///
/// Absolute paths are used as-is, with no PATH search. Anything else is
/// looked up through the host's PATH.
pub fn resolve_executable(path: &OsStr, host: &dyn HostEnvironment) -> LoaderResult<PathBuf> {
    if path.is_empty() {
        return Err(LoaderError::EmptyPath);
    }
    if path.as_bytes().starts_with(b"/") {
        return Ok(PathBuf::from(path));
    }
    look_path(path, host.var("PATH").as_deref())
}

/// argv[0] is the path as requested, not the resolved one
pub fn build_argv(request: &ExecRequest) -> Vec<OsString> {
    let mut argv = Vec::with_capacity(request.args.len() + 1);
    argv.push(request.path.clone());
    argv.extend(request.args.iter().cloned());
    argv
}

fn env_entry(key: &OsStr, value: &OsStr) -> OsString {
    let mut entry = OsString::with_capacity(key.len() + value.len() + 1);
    entry.push(key);
    entry.push("=");
    entry.push(value);
    entry
}

/// `KEY=VALUE` entries: the explicit mapping when given, otherwise the
/// host environment unmodified
pub fn build_env(request: &ExecRequest, host: &dyn HostEnvironment) -> Vec<OsString> {
    if request.env.is_empty() {
        host.vars()
            .iter()
            .map(|(k, v)| env_entry(k, v))
            .collect()
    } else {
        request
            .env
            .iter()
            .map(|(k, v)| env_entry(k, v))
            .collect()
    }
}

fn to_cstring(value: &OsStr) -> LoaderResult<CString> {
    CString::new(value.as_bytes())
        .map_err(|_| LoaderError::InvalidString(value.to_string_lossy().into_owned()))
}

fn to_cstrings(values: &[OsString]) -> LoaderResult<Vec<CString>> {
    values.iter().map(|v| to_cstring(v)).collect()
}

/// execve(2). Only returns on failure; a missing file is reported as
/// [`LoaderError::NotFound`], anything else as [`LoaderError::ExecFailed`].
pub fn replace_process_image(
    path: &Path,
    argv: &[OsString],
    env: &[OsString],
) -> LoaderResult<Infallible> {
    let path_c = to_cstring(path.as_os_str())?;
    let argv_c = to_cstrings(argv)?;
    let env_c = to_cstrings(env)?;

    execve(&path_c, &argv_c, &env_c).map_err(|errno| match errno {
        nix::Error::ENOENT => LoaderError::NotFound(path.display().to_string()),
        other => LoaderError::ExecFailed(other),
    })
}

/// Exec entry point shared by the RPC handler and the command-line shortcut
#[derive(Clone)]
pub struct ProcessLoader {
    host: Arc<dyn HostEnvironment>,
}

impl ProcessLoader {
    pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
        Self { host }
    }

    /// Everything `exec` does short of the final system call
    pub fn prepare(
        &self,
        request: &ExecRequest,
    ) -> LoaderResult<(PathBuf, Vec<OsString>, Vec<OsString>)> {
        let resolved = resolve_executable(&request.path, self.host.as_ref())?;
        let argv = build_argv(request);
        let env = build_env(request, self.host.as_ref());
        Ok((resolved, argv, env))
    }

    /// Replace this process with `request`. Never returns on success.
    pub fn exec(&self, request: &ExecRequest) -> LoaderResult<Infallible> {
        let (resolved, argv, env) = self.prepare(request)?;

        info!(
            path = %request.path.to_string_lossy(),
            resolved = %resolved.display(),
            args = request.args.len(),
            "Replacing process image"
        );

        replace_process_image(&resolved, &argv, &env).map_err(|e| {
            error!(path = %resolved.display(), error = %e, "exec failed");
            e
        })
    }
}
