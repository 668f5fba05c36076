//! Resident-set-size sampling
//!
//! Values are process-wide RSS at the sampling instant; attributing them to
//! the function being traced is a proxy, not an allocation measurement.

use std::cell::RefCell;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

thread_local! {
    static SAMPLER: RefCell<Option<(Pid, System)>> = const { RefCell::new(None) };
}

/// Current process RSS in bytes, 0 when it cannot be determined.
pub(crate) fn current_rss_bytes() -> u64 {
    SAMPLER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            let pid = match sysinfo::get_current_pid() {
                Ok(pid) => pid,
                Err(_) => return 0,
            };
            *slot = Some((pid, System::new()));
        }
        let (pid, system) = slot.as_mut().unwrap();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[*pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(*pid).map_or(0, |p| p.memory())
    })
}
