use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{KernelError, Result};
use crate::kernel_applier::KernelApplier;

/// In-memory stand-in for a real kernel, used by higher-level crates' tests
/// so they can assert on writes without touching sysfs.
#[derive(Default)]
pub struct InMemoryKernelApplier {
    knobs: Mutex<HashMap<String, String>>,
    cgroup_moves: Mutex<Vec<(String, i32)>>,
    capacities: Mutex<HashMap<i32, i32>>,
    policies: Mutex<Vec<String>>,
}

impl InMemoryKernelApplier {
    pub fn with_capacity(self, cpu: i32, capacity: i32) -> Self {
        self.capacities.lock().unwrap().insert(cpu, capacity);
        self
    }

    pub fn with_policy(self, name: impl Into<String>) -> Self {
        self.policies.lock().unwrap().push(name.into());
        self
    }

    pub fn moves(&self) -> Vec<(String, i32)> {
        self.cgroup_moves.lock().unwrap().clone()
    }
}

impl KernelApplier for InMemoryKernelApplier {
    fn read_knob(&self, path: &str) -> Result<String> {
        self.knobs
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| KernelError::Io { path: path.to_string(), source: std::io::ErrorKind::NotFound.into() })
    }

    fn write_knob(&self, path: &str, value: &str) -> Result<()> {
        self.knobs.lock().unwrap().insert(path.to_string(), value.to_string());
        Ok(())
    }

    fn move_to_cgroup(&self, cgroup_path: &str, pid: i32) -> Result<()> {
        self.cgroup_moves.lock().unwrap().push((cgroup_path.to_string(), pid));
        Ok(())
    }

    fn restart_service(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn list_cpufreq_policies(&self) -> Result<Vec<String>> {
        Ok(self.policies.lock().unwrap().clone())
    }

    fn read_cpu_capacity(&self, cpu: i32) -> Result<i32> {
        self.capacities.lock().unwrap().get(&cpu).copied().ok_or_else(|| {
            KernelError::Io { path: format!("cpu{}", cpu), source: std::io::ErrorKind::NotFound.into() }
        })
    }

    fn mkdirp(&self, _path: &str, _mode: u32) -> Result<()> {
        Ok(())
    }
}
