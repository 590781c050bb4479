use anyhow::Result;
use std::collections::HashMap;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Source of process-table snapshots: the current mapping of live pid to
/// executable name.
///
/// `Err` means the underlying query failed and nothing could be observed this
/// cycle; `Ok` with an empty map means there genuinely are no visible
/// processes. The monitor relies on that distinction to avoid emitting a
/// termination storm on a transient query failure.
pub trait SnapshotSource {
    fn processes(&mut self) -> Result<HashMap<u32, String>>;
}

/// Snapshot source backed by the OS process table via `sysinfo`.
///
/// Executable names are lowercased at the source so every consumer sees the
/// normalized form.
pub struct SystemSnapshotSource {
    sys: System,
}

impl SystemSnapshotSource {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SystemSnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for SystemSnapshotSource {
    fn processes(&mut self) -> Result<HashMap<u32, String>> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);

        Ok(self
            .sys
            .processes()
            .iter()
            .map(|(pid, process)| {
                (
                    pid.as_u32(),
                    process.name().to_string_lossy().to_lowercase(),
                )
            })
            .collect())
    }
}

/// Forcefully terminates `pid`. Returns whether the kill signal was delivered;
/// the process may take a moment to actually exit.
pub fn terminate(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]), false);

    match sys.process(Pid::from_u32(pid)) {
        Some(process) => process.kill(),
        None => false,
    }
}
