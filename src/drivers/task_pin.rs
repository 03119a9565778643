//! Worker-thread spawning for the timer dispatcher and interrupt handlers.
//!
//! On ESP-IDF, `std::thread` is backed by pthreads over FreeRTOS tasks and
//! `esp_pthread_set_cfg()` sets the core, priority and stack of the *next*
//! thread created by the calling thread, so the config→spawn pair must not
//! be interleaved with other thread creation on the same thread.
//!
//! On other targets only the name and stack size are honoured.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers for the ESP32 dual-core parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): protocol stacks and the esp_timer task.
    Pro = 0,
    /// Core 1 (APP_CPU): interrupt handler threads.
    App = 1,
}

/// Placement of a worker thread.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSpec {
    /// Null-terminated name (e.g. `"irq/button\0"`).
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl WorkerSpec {
    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn a worker pinned to `spec.core` with explicit priority and stack.
#[cfg(target_os = "espidf")]
pub fn spawn_worker(spec: WorkerSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    if !spec.name.ends_with('\0') {
        return Err(io::Error::other("worker name must be null-terminated"));
    }
    // SAFETY: `cfg` outlives the call; `spec.name` is a 'static
    // null-terminated string, as esp_pthread_set_cfg requires.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as _;
        cfg.thread_name = spec.name.as_ptr().cast();
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    log::debug!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

/// Host fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_worker(spec: WorkerSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    log::debug!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}
