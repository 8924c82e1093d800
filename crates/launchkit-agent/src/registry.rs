use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

// ─── ProcessRegistry ──────────────────────────────────────────────────────

/// Tracks every subprocess spawned by the task runner so a cancel request or
/// a crash can take them all down.
///
/// There is one process-lifetime instance ([`ProcessRegistry::global`]);
/// tests construct their own. Cloning shares the same underlying set.
///
/// Termination is two-phase: `SIGTERM` to every tracked pid, a grace period
/// during which runners may observe the exit and untrack themselves, then
/// `SIGKILL` for anything still registered.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    pids: Mutex<BTreeSet<u32>>,
    handlers_installed: AtomicBool,
}

static GLOBAL: OnceLock<ProcessRegistry> = OnceLock::new();

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static ProcessRegistry {
        GLOBAL.get_or_init(ProcessRegistry::new)
    }

    /// Start tracking `pid`. The returned guard untracks it on drop.
    pub fn track(&self, pid: u32) -> Tracked {
        self.add(pid);
        Tracked {
            registry: self.clone(),
            pid,
        }
    }

    pub fn add(&self, pid: u32) {
        if let Ok(mut pids) = self.inner.pids.lock() {
            pids.insert(pid);
        }
        tracing::debug!(pid, "tracking subprocess");
    }

    pub fn remove(&self, pid: u32) {
        if let Ok(mut pids) = self.inner.pids.lock() {
            pids.remove(&pid);
        }
    }

    pub fn pids(&self) -> Vec<u32> {
        self.inner
            .pids
            .lock()
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.pids.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record that cancel/crash handlers have been installed for this
    /// registry. Returns `true` only for the first caller.
    pub fn mark_handlers_installed(&self) -> bool {
        !self.inner.handlers_installed.swap(true, Ordering::SeqCst)
    }

    /// Gracefully terminate every tracked subprocess, escalating to a forced
    /// kill after `grace`. Returns how many processes were signalled.
    ///
    /// The registry is empty when this returns.
    pub async fn terminate_all(&self, grace: Duration) -> usize {
        let pids = self.pids();
        if pids.is_empty() {
            return 0;
        }
        tracing::debug!(count = pids.len(), "terminating subprocesses");
        for &pid in &pids {
            signal::terminate(pid);
        }

        let deadline = tokio::time::Instant::now() + grace;
        loop {
            let remaining: Vec<u32> = self
                .pids()
                .into_iter()
                .filter(|pid| signal::is_alive(*pid))
                .collect();
            if remaining.is_empty() || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        self.kill_all_now();
        pids.len()
    }

    /// Force-kill everything still tracked and clear the registry. Safe to
    /// call from a panic hook (no async, no waiting).
    pub fn kill_all_now(&self) {
        let pids = match self.inner.pids.lock() {
            Ok(mut p) => std::mem::take(&mut *p),
            Err(_) => return,
        };
        for pid in pids {
            signal::kill(pid);
        }
    }
}

// ─── Tracked ──────────────────────────────────────────────────────────────

/// RAII handle for a tracked pid.
#[derive(Debug)]
pub struct Tracked {
    registry: ProcessRegistry,
    pid: u32,
}

impl Tracked {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.registry.remove(self.pid);
    }
}

// ─── Platform signalling ──────────────────────────────────────────────────

/// Tracked processes lead their own process group, so signals go to the
/// group first and fall back to the single pid.
#[cfg(unix)]
pub(crate) mod signal {
    use nix::sys::signal::{kill as send, killpg, Signal};
    use nix::unistd::Pid;

    fn pid(raw: u32) -> Option<Pid> {
        i32::try_from(raw).ok().map(Pid::from_raw)
    }

    fn deliver(raw: u32, sig: Signal) {
        if let Some(p) = pid(raw) {
            if killpg(p, sig).is_err() {
                let _ = send(p, sig);
            }
        }
    }

    pub(crate) fn terminate(raw: u32) {
        deliver(raw, Signal::SIGTERM);
    }

    pub(crate) fn kill(raw: u32) {
        deliver(raw, Signal::SIGKILL);
    }

    pub(crate) fn is_alive(raw: u32) -> bool {
        pid(raw).map(|p| send(p, None).is_ok()).unwrap_or(false)
    }
}

#[cfg(not(unix))]
pub(crate) mod signal {
    use std::process::{Command, Stdio};

    pub(crate) fn terminate(raw: u32) {
        let _ = Command::new("taskkill")
            .args(["/PID", &raw.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }

    pub(crate) fn kill(raw: u32) {
        let _ = Command::new("taskkill")
            .args(["/F", "/T", "/PID", &raw.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }

    pub(crate) fn is_alive(_raw: u32) -> bool {
        true
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_untracks_on_drop() {
        let registry = ProcessRegistry::new();
        {
            let guard = registry.track(4242);
            assert_eq!(guard.pid(), 4242);
            assert_eq!(registry.pids(), vec![4242]);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn clones_share_state() {
        let a = ProcessRegistry::new();
        let b = a.clone();
        a.add(1);
        assert_eq!(b.len(), 1);
        b.remove(1);
        assert!(a.is_empty());
    }

    #[test]
    fn handler_installation_is_idempotent() {
        let registry = ProcessRegistry::new();
        assert!(registry.mark_handlers_installed());
        assert!(!registry.mark_handlers_installed());
        assert!(!registry.clone().mark_handlers_installed());
    }

    #[tokio::test]
    async fn terminate_all_on_empty_registry_is_noop() {
        let registry = ProcessRegistry::new();
        assert_eq!(registry.terminate_all(Duration::from_millis(10)).await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_all_stops_a_real_process() {
        let registry = ProcessRegistry::new();
        let mut child = tokio::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();
        registry.add(pid);

        let signalled = registry.terminate_all(Duration::from_millis(500)).await;
        assert_eq!(signalled, 1);
        assert!(registry.is_empty());

        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("child should exit after SIGTERM")
            .unwrap();
        assert!(!status.success());
    }
}
