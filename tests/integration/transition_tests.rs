//! Mode transitions and output waveforms on virtual time.
//!
//! Default timing: toggle every 1 s, PWM tick every 200 µs (20 ms / 100),
//! ramp step of 2 every 40 ms.

use std::sync::Arc;
use std::time::Duration;

use breathctl::adapters::sim::VirtualTimers;
use breathctl::app::events::ControllerEvent;
use breathctl::drivers::pwm::Direction;
use breathctl::error::LineError;
use breathctl::{Controller, ControllerConfig, Mode};

use super::mock_hw::{MockGpio, MockIrq, Recorder, RecordingSink};

const LED_A: u32 = 17;
const LED_B: u32 = 19;
const PWM: u32 = 18;

type MockController = Controller<MockGpio, VirtualTimers, MockIrq, RecordingSink>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn rig() -> (MockController, Arc<Recorder>, VirtualTimers, MockIrq, Arc<RecordingSink>) {
    let rec = Arc::new(Recorder::default());
    let timers = VirtualTimers::new();
    let irq = MockIrq::new(Arc::clone(&rec));
    let sink = Arc::new(RecordingSink::default());
    let controller = Controller::start(
        &ControllerConfig::default(),
        MockGpio::new(Arc::clone(&rec)),
        &timers,
        irq.clone(),
        Arc::clone(&sink),
    )
    .expect("startup");
    (controller, rec, timers, irq, sink)
}

// ── Toggle ────────────────────────────────────────────────────

#[test]
fn toggle_alternates_once_per_period() {
    let (controller, rec, timers, _irq, _sink) = rig();

    timers.advance(ms(999));
    assert!(rec.level(LED_A) && !rec.level(LED_B), "nothing before the first period");

    timers.advance(ms(1));
    assert!(!rec.level(LED_A) && rec.level(LED_B));

    timers.advance(ms(1000));
    assert!(rec.level(LED_A) && !rec.level(LED_B));

    timers.advance(ms(3000));
    assert_eq!(timers.fired("toggle"), 5);
    // Exactly one LED is lit after every expiry.
    assert!(rec.level(LED_A) ^ rec.level(LED_B));
    assert!(!controller.status().led_a_lit);
    assert!(!rec.level(PWM));
}

// ── Button ────────────────────────────────────────────────────

#[test]
fn press_cycles_toggle_breathe_toggle() {
    let (controller, rec, timers, irq, sink) = rig();

    assert!(irq.fire());
    assert_eq!(controller.mode(), Mode::Breathe);
    assert!(!rec.level(LED_A) && !rec.level(LED_B), "toggle LEDs off in Breathe");
    assert!(!timers.is_armed("toggle"));
    assert!(timers.is_armed("pwm-tick") && timers.is_armed("pwm-ramp"));

    timers.advance(ms(400));
    assert_eq!(controller.status().duty, 20);

    assert!(irq.fire());
    assert_eq!(controller.mode(), Mode::Toggle);
    assert!(rec.level(LED_A) && !rec.level(LED_B), "toggle restarts from LED A");
    assert!(!rec.level(PWM));
    assert!(!timers.is_armed("pwm-tick") && !timers.is_armed("pwm-ramp"));
    assert_eq!(controller.status().duty, 0, "ramp reset on leaving Breathe");

    assert_eq!(
        sink.events()[1..],
        [
            ControllerEvent::ModeChanged { from: Mode::Toggle, to: Mode::Breathe },
            ControllerEvent::ModeChanged { from: Mode::Breathe, to: Mode::Toggle },
        ]
    );
    assert_eq!(controller.status().transitions, 2);
}

#[test]
fn breathe_restarts_from_zero_duty() {
    let (controller, _rec, timers, irq, _sink) = rig();
    irq.fire();
    timers.advance(ms(1000));
    irq.fire();
    irq.fire();

    let status = controller.status();
    assert_eq!(status.mode, Mode::Breathe);
    assert_eq!(status.duty, 0);
    assert_eq!(status.direction, Direction::Up);
    assert_eq!(status.counter, 0);
}

#[test]
fn released_button_edge_changes_nothing() {
    let (controller, rec, timers, irq, sink) = rig();
    timers.advance(ms(1000));
    rec.set_button(Ok(false));
    let before = rec.calls().len();

    assert!(irq.fire());

    assert_eq!(controller.mode(), Mode::Toggle);
    assert_eq!(rec.calls().len(), before, "no output touched");
    assert!(timers.is_armed("toggle"));
    assert_eq!(sink.events().last(), Some(&ControllerEvent::SpuriousEdge));
    assert_eq!(controller.status().transitions, 0);
}

#[test]
fn unreadable_button_is_treated_as_spurious() {
    let (controller, rec, _timers, irq, sink) = rig();
    rec.set_button(Err(LineError::Io(-5)));
    irq.fire();
    assert_eq!(controller.mode(), Mode::Toggle);
    assert_eq!(sink.count(&ControllerEvent::SpuriousEdge), 1);
}

#[test]
fn toggle_phase_is_preserved_across_spurious_edges() {
    let (controller, rec, timers, irq, _sink) = rig();
    timers.advance(ms(1000));
    assert!(!controller.status().led_a_lit);

    rec.set_button(Ok(false));
    irq.fire();
    timers.advance(ms(1000));
    assert!(controller.status().led_a_lit);
    assert!(rec.level(LED_A));
}

// ── PWM engine ────────────────────────────────────────────────

#[test]
fn ramp_peaks_after_fifty_steps_then_descends() {
    let (controller, _rec, timers, irq, _sink) = rig();
    irq.fire();

    timers.advance(ms(50 * 40));
    assert_eq!(timers.fired("pwm-ramp"), 50);
    let status = controller.status();
    assert_eq!(status.duty, 100);
    assert_eq!(status.direction, Direction::Down);

    timers.advance(ms(40));
    assert_eq!(controller.status().duty, 98);

    timers.advance(ms(49 * 40));
    let status = controller.status();
    assert_eq!(status.duty, 0);
    assert_eq!(status.direction, Direction::Up);
}

#[test]
fn pwm_duty_matches_on_fraction() {
    let (_controller, rec, timers, irq, _sink) = rig();
    irq.fire();

    // First ramp step lands at 40 ms: duty 2 of 100.
    timers.advance(Duration::from_micros(40_100));
    let start = rec.history(PWM).len();

    timers.advance(ms(20));
    let window = &rec.history(PWM)[start..];
    assert_eq!(window.len(), 100, "one render per tick");
    assert_eq!(window.iter().filter(|on| **on).count(), 2);
}

#[test]
fn full_duty_keeps_pwm_on() {
    let (_controller, rec, timers, irq, _sink) = rig();
    irq.fire();
    timers.advance(ms(50 * 40) + Duration::from_micros(100));
    let start = rec.history(PWM).len();

    timers.advance(ms(20));
    let window = &rec.history(PWM)[start..];
    assert_eq!(window.len(), 100);
    assert!(window.iter().all(|on| *on), "duty 100 renders every tick ON");
}

#[test]
fn tick_floor_applies_for_extreme_resolution() {
    let rec = Arc::new(Recorder::default());
    let timers = VirtualTimers::new();
    let irq = MockIrq::new(Arc::clone(&rec));
    let config = ControllerConfig {
        pwm_base_period_us: 10,
        pwm_resolution: 1000,
        ..ControllerConfig::default()
    };
    let _controller = Controller::start(
        &config,
        MockGpio::new(Arc::clone(&rec)),
        &timers,
        irq.clone(),
        Arc::new(RecordingSink::default()),
    )
    .unwrap();
    irq.fire();

    timers.advance(ms(1));
    assert_eq!(timers.fired("pwm-tick"), 1000, "one tick per microsecond");
}

// ── Stop semantics ────────────────────────────────────────────

#[test]
fn callbacks_stop_once_their_mode_ends() {
    let (controller, rec, timers, irq, _sink) = rig();
    irq.fire();
    timers.advance(ms(100));
    irq.fire();
    assert_eq!(controller.mode(), Mode::Toggle);

    let ticks = timers.fired("pwm-tick");
    timers.advance(ms(500));
    assert_eq!(timers.fired("pwm-tick"), ticks);
    assert!(rec.history(PWM).iter().rev().take(1).all(|on| !on));
}
