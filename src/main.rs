//! breathctl: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspGpio / SimGpio   EspTimerService / HostTimerService        │
//! │  (GpioPort)          (TimerPort)                               │
//! │  EspIrq / SimIrq     LogEventSink                              │
//! │  (InterruptPort)     (EventSink)                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           Controller (lifecycle, rollback)             │    │
//! │  │  ModeController · toggle · PWM tick/ramp · button      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use std::sync::Arc;

    use anyhow::anyhow;
    use breathctl::adapters::esp::{EspGpio, EspIrq, EspTimerService};
    use breathctl::adapters::log_sink::LogEventSink;
    use breathctl::{Controller, ControllerConfig};
    use log::info;

    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  breathctl v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config ─────────────────────────────────────────────
    // The on-chip GPIO matrix is the only provider, so no hint.
    let mut config = ControllerConfig::default();
    config.line_provider_name.clear();

    // ── 3. Adapters ───────────────────────────────────────────
    let irq = EspIrq::new().map_err(|e| anyhow!("ISR service: {}", e))?;

    // ── 4. Start ──────────────────────────────────────────────
    let _controller = Controller::start(&config, EspGpio::new(), &EspTimerService, irq, Arc::new(LogEventSink::new()))?;

    // ── 5. Park: timers and the button task do the work ───────
    loop {
        std::thread::park();
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use anyhow::{Context, anyhow};
    use breathctl::adapters::log_sink::LogEventSink;
    use breathctl::adapters::sim::{HostTimerService, SimGpio, SimIrq};
    use breathctl::{Controller, ControllerConfig};
    use log::{info, warn};
    use tracing_subscriber::EnvFilter;

    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("breathctl v{} (host simulation)", env!("CARGO_PKG_VERSION"));

    // ── 2. Config: $BREATHCTL_CONFIG or defaults ──────────────
    let config = match std::env::var("BREATHCTL_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            ControllerConfig::from_json(&text).map_err(|e| anyhow!("{}: {}", path, e))?
        }
        Err(_) => {
            warn!("BREATHCTL_CONFIG not set, using defaults");
            ControllerConfig::default()
        }
    };
    let run_for = std::env::var("BREATHCTL_RUN_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map_or(Duration::from_secs(10), Duration::from_secs);

    // ── 3. Adapters ───────────────────────────────────────────
    let gpio = SimGpio::reference_board();
    let bus = gpio.bus();
    let timers = HostTimerService::new().context("starting timer dispatcher")?;
    let irq = SimIrq::new(gpio.bus());

    // ── 4. Start ──────────────────────────────────────────────
    let mut controller = Controller::start(&config, gpio, &timers, irq, Arc::new(LogEventSink::new()))?;
    let button = controller.lines().button;

    // ── 5. Scripted button presses ────────────────────────────
    let started = Instant::now();
    while started.elapsed() < run_for {
        std::thread::sleep(Duration::from_secs(3).min(run_for.saturating_sub(started.elapsed())));
        if started.elapsed() >= run_for {
            break;
        }
        bus.set_input(button, true);
        std::thread::sleep(Duration::from_millis(50));
        bus.set_input(button, false);
        info!("status: {:?}", controller.status());
    }

    // ── 6. Shutdown ───────────────────────────────────────────
    controller.shutdown();
    Ok(())
}
