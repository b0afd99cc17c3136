use std::ffi::CString;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{KernelError, Result};

/// The daemon's sole side-effect sink: every sysfs write, cgroup move and
/// service restart the CCT decides to perform goes through here. Kept as a
/// trait so the arbitration engine can be exercised against
/// [`InMemoryKernelApplier`] in tests without touching a real machine.
pub trait KernelApplier: Send + Sync {
    fn read_knob(&self, path: &str) -> Result<String>;
    fn write_knob(&self, path: &str, value: &str) -> Result<()>;
    fn move_to_cgroup(&self, cgroup_path: &str, pid: i32) -> Result<()>;
    fn restart_service(&self, name: &str) -> Result<()>;
    fn list_cpufreq_policies(&self) -> Result<Vec<String>>;
    fn read_cpu_capacity(&self, cpu: i32) -> Result<i32>;
    fn mkdirp(&self, path: &str, mode: u32) -> Result<()>;
}

/// Direct-to-sysfs implementation. `restart_service` shells out to
/// `systemctl restart <name>` — the only place this crate spawns a process.
#[derive(Default)]
pub struct LinuxKernelApplier;

impl KernelApplier for LinuxKernelApplier {
    fn read_knob(&self, path: &str) -> Result<String> {
        fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .map_err(|source| KernelError::Io { path: path.to_string(), source })
    }

    fn write_knob(&self, path: &str, value: &str) -> Result<()> {
        debug!(path, value, "writing kernel knob");
        fs::write(path, value).map_err(|source| KernelError::Io { path: path.to_string(), source })
    }

    fn move_to_cgroup(&self, cgroup_path: &str, pid: i32) -> Result<()> {
        let procs_file = Path::new(cgroup_path).join("cgroup.procs");
        fs::write(&procs_file, pid.to_string())
            .map_err(|e| KernelError::Cgroup(format!("{}: {}", procs_file.display(), e)))
    }

    fn restart_service(&self, name: &str) -> Result<()> {
        let status = std::process::Command::new("systemctl")
            .args(["restart", name])
            .status()
            .map_err(|e| KernelError::ServiceControl(format!("{}: {}", name, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(KernelError::ServiceControl(format!("{} exited with {}", name, status)))
        }
    }

    fn list_cpufreq_policies(&self) -> Result<Vec<String>> {
        let root = "/sys/devices/system/cpu/cpufreq";
        let entries = fs::read_dir(root).map_err(|source| KernelError::Io { path: root.to_string(), source })?;
        Ok(entries
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.starts_with("policy"))
            .collect())
    }

    fn read_cpu_capacity(&self, cpu: i32) -> Result<i32> {
        let path = format!("/sys/devices/system/cpu/cpu{}/cpu_capacity", cpu);
        self.read_knob(&path)?.parse().map_err(|_| KernelError::Cgroup(format!("malformed capacity at {}", path)))
    }

    fn mkdirp(&self, path: &str, mode: u32) -> Result<()> {
        if Path::new(path).is_dir() {
            return Err(KernelError::AlreadyExists(path.to_string()));
        }
        fs::create_dir_all(path).map_err(|source| KernelError::Io { path: path.to_string(), source })?;
        let c_path = CString::new(path).map_err(|_| KernelError::Cgroup(format!("nul byte in path {}", path)))?;
        // SAFETY: c_path is a valid nul-terminated C string for the lifetime of this call.
        let rc = unsafe { libc::chmod(c_path.as_ptr(), mode as libc::mode_t) };
        if rc != 0 {
            return Err(KernelError::Io { path: path.to_string(), source: std::io::Error::last_os_error() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mkdirp_then_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c");
        let applier = LinuxKernelApplier;
        applier.mkdirp(target.to_str().unwrap(), 0o755).unwrap();
        let knob = target.join("knob");
        applier.write_knob(knob.to_str().unwrap(), "42").unwrap();
        assert_eq!(applier.read_knob(knob.to_str().unwrap()).unwrap(), "42");
    }

    #[test]
    fn mkdirp_twice_reports_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let applier = LinuxKernelApplier;
        applier.mkdirp(dir.path().to_str().unwrap(), 0o755).unwrap_err();
    }
}
