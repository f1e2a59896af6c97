//! Real-time scheduling for the control thread (Linux SCHED_FIFO + mlockall).
//!
//! Everything here is best effort: a failure is logged as a warning and the
//! session continues with normal scheduling.

#[cfg(target_os = "linux")]
pub fn setup_rt_once(prio: Option<i32>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    fn is_retryable_memlock_error(err: &std::io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    }

    fn mlock(flags: libc::c_int) -> std::io::Result<()> {
        let rc = unsafe { libc::mlockall(flags) };
        if rc != 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    // Lock current and future pages; fall back to current-only when the
    // memlock limit is too small for MCL_FUTURE.
    fn try_apply_mem_lock() -> eyre::Result<&'static str> {
        let err = match mlock(libc::MCL_CURRENT | libc::MCL_FUTURE) {
            Ok(()) => return Ok("current|future"),
            Err(e) => e,
        };
        if is_retryable_memlock_error(&err) && mlock(libc::MCL_CURRENT).is_ok() {
            return Ok("current");
        }
        let mut msg = format!("mlockall(current|future) failed: {err}");
        if is_retryable_memlock_error(&err) {
            msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
        }
        Err(eyre::eyre!(msg))
    }

    // Apply SCHED_FIFO priority, clamped to the system range.
    fn try_apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
        let (min, max) = unsafe {
            let min = libc::sched_get_priority_min(libc::SCHED_FIFO);
            let max = libc::sched_get_priority_max(libc::SCHED_FIFO);
            if min < 0 || max < 0 { (1, 99) } else { (min, max) }
        };
        let prio_val = prio.unwrap_or(max).clamp(min, max);
        let param = libc::sched_param {
            sched_priority: prio_val,
        };
        let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EPERM) {
                eyre::bail!(
                    "{err}; hint: run with sudo or grant CAP_SYS_NICE: 'sudo setcap cap_sys_nice=ep /path/to/teleop'"
                );
            }
            return Err(eyre::eyre!(err));
        }
        Ok(prio_val)
    }

    RT_ONCE.get_or_init(|| {
        match try_apply_mem_lock() {
            Ok(mode) => tracing::info!(mode, "rt: memory locked"),
            Err(err) => tracing::warn!(error = %err, "rt: mlockall failed"),
        }
        match try_apply_fifo_priority(prio) {
            Ok(p) => tracing::info!(priority = p, "rt: SCHED_FIFO enabled"),
            Err(err) => tracing::warn!(
                requested = ?prio,
                error = %err,
                "rt: sched_setscheduler(SCHED_FIFO) failed"
            ),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(prio: Option<i32>) {
    tracing::warn!(requested = ?prio, "rt: real-time mode is only supported on Linux; ignoring --rt");
}
