/*!
 * Host Environment
 * Ambient process state (environment variables, working directory) behind
 * a trait so services can be exercised without touching the real process
 */

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

/// Read access to the ambient state a request may default to
pub trait HostEnvironment: Send + Sync {
    /// Full environment as ordered key/value pairs, bytes untouched
    fn vars(&self) -> Vec<(OsString, OsString)>;

    /// Single variable lookup
    fn var(&self, key: &str) -> Option<OsString> {
        self.vars()
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    /// Current working directory
    fn current_dir(&self) -> io::Result<PathBuf>;
}

/// Live view of this process, read at call time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl HostEnvironment for SystemEnvironment {
    fn vars(&self) -> Vec<(OsString, OsString)> {
        std::env::vars_os().collect()
    }

    fn var(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}

/// Frozen snapshot, used by tests
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment {
    vars: Vec<(OsString, OsString)>,
    current_dir: PathBuf,
}

impl FixedEnvironment {
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: Vec::new(),
            current_dir: current_dir.into(),
        }
    }

    pub fn with_var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let key = key.into();
        self.vars.retain(|(k, _)| *k != key);
        self.vars.push((key, value.into()));
        self
    }
}

impl HostEnvironment for FixedEnvironment {
    fn vars(&self) -> Vec<(OsString, OsString)> {
        self.vars.clone()
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(self.current_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    #[test]
    fn test_fixed_environment_overrides() {
        let env = FixedEnvironment::new("/srv")
            .with_var("PATH", "/bin")
            .with_var("PATH", "/usr/bin");

        assert_eq!(env.var("PATH").as_deref(), Some(OsStr::new("/usr/bin")));
        assert_eq!(env.vars().len(), 1);
        assert_eq!(env.current_dir().unwrap(), PathBuf::from("/srv"));
        assert!(env.var("HOME").is_none());
    }

    #[test]
    fn test_system_environment_matches_process() {
        let env = SystemEnvironment;
        assert_eq!(env.current_dir().unwrap(), std::env::current_dir().unwrap());
        assert_eq!(env.var("PATH"), std::env::var_os("PATH"));
        assert_eq!(env.vars().len(), std::env::vars_os().count());
    }

    #[test]
    fn test_fixed_environment_keeps_raw_bytes() {
        let raw = OsStr::from_bytes(b"\xff\xfe");
        let env = FixedEnvironment::new("/").with_var("RAW", raw);
        assert_eq!(env.var("RAW").as_deref(), Some(raw));
        assert_eq!(env.vars(), vec![(OsString::from("RAW"), raw.to_os_string())]);
    }
}
