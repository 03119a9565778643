//! Startup, rollback and shutdown of the [`Controller`] against mock
//! lines, virtual timers and a manually fired interrupt.

use std::sync::Arc;

use breathctl::adapters::sim::VirtualTimers;
use breathctl::app::events::ControllerEvent;
use breathctl::app::ports::Edge;
use breathctl::error::{Error, IrqError, LineError, TimerError};
use breathctl::{Controller, ControllerConfig, Mode};

use super::mock_hw::{Call, FailingTimers, MockGpio, MockIrq, Recorder, RecordingSink};

type MockController = Controller<MockGpio, VirtualTimers, MockIrq, RecordingSink>;

struct Rig {
    rec: Arc<Recorder>,
    timers: VirtualTimers,
    irq: MockIrq,
    sink: Arc<RecordingSink>,
}

impl Rig {
    fn new() -> Self {
        let rec = Arc::new(Recorder::default());
        Self {
            irq: MockIrq::new(Arc::clone(&rec)),
            rec,
            timers: VirtualTimers::new(),
            sink: Arc::new(RecordingSink::default()),
        }
    }

    fn start_with(&self, config: &ControllerConfig, gpio: MockGpio) -> Result<MockController, Error> {
        Controller::start(config, gpio, &self.timers, self.irq.clone(), Arc::clone(&self.sink))
    }

    fn start(&self) -> MockController {
        self.start_with(&ControllerConfig::default(), MockGpio::new(Arc::clone(&self.rec)))
            .expect("startup")
    }
}

fn requests() -> Vec<Call> {
    vec![
        Call::RequestOutput { line: 17, consumer: "led1", initial: true },
        Call::RequestOutput { line: 19, consumer: "led2", initial: false },
        Call::RequestOutput { line: 18, consumer: "pwm-led", initial: false },
        Call::RequestInput { line: 27, consumer: "button" },
    ]
}

fn releases() -> Vec<Call> {
    vec![
        Call::ReleaseInput(27),
        Call::ReleaseOutput(18),
        Call::ReleaseOutput(19),
        Call::ReleaseOutput(17),
    ]
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn startup_acquires_in_order_and_runs_toggle() {
    let rig = Rig::new();
    let controller = rig.start();

    let mut expected = requests();
    expected.push(Call::Register { line: 27, edge: Edge::Both });
    assert_eq!(rig.rec.lifecycle(), expected);

    assert_eq!(controller.mode(), Mode::Toggle);
    assert!(controller.is_running());
    assert!(rig.rec.level(17), "LED A lit first");
    assert!(!rig.rec.level(19));
    assert!(!rig.rec.level(18));

    assert!(rig.timers.is_armed("toggle"));
    assert!(!rig.timers.is_armed("pwm-tick"));
    assert!(!rig.timers.is_armed("pwm-ramp"));

    assert_eq!(
        rig.sink.events(),
        vec![ControllerEvent::Started { led_a: 17, led_b: 19, pwm: 18, button: 27 }]
    );
}

#[test]
fn custom_lines_are_used_verbatim() {
    let rig = Rig::new();
    let config = ControllerConfig {
        led1_line: 5,
        led2_line: 6,
        pwm_line: 12,
        button_line: 26,
        ..ControllerConfig::default()
    };
    let controller = rig.start_with(&config, MockGpio::new(Arc::clone(&rig.rec))).unwrap();

    assert_eq!(controller.lines().button, 26);
    assert!(rig.rec.lifecycle().contains(&Call::Register { line: 26, edge: Edge::Both }));
    assert!(rig.rec.level(5));
}

// ── Provider resolution ───────────────────────────────────────

#[test]
fn missing_hinted_provider_falls_back_to_line_owner() {
    let rig = Rig::new();
    let gpio = MockGpio::with_chips(Arc::clone(&rig.rec), vec![("gpio-raspberrypi", 0, 58)]);
    let controller = rig.start_with(&ControllerConfig::default(), gpio).unwrap();

    assert_eq!(controller.mode(), Mode::Toggle);
    assert_eq!(rig.sink.events()[0], ControllerEvent::ProviderFallback);
}

#[test]
fn empty_hint_scans_without_warning() {
    let rig = Rig::new();
    let mut config = ControllerConfig::default();
    config.line_provider_name.clear();
    let gpio = MockGpio::with_chips(Arc::clone(&rig.rec), vec![("gpio-raspberrypi", 0, 58)]);
    let _controller = rig.start_with(&config, gpio).unwrap();

    assert_eq!(rig.sink.count(&ControllerEvent::ProviderFallback), 0);
}

#[test]
fn no_provider_owning_the_lines_is_resource_unavailable() {
    let rig = Rig::new();
    let gpio = MockGpio::with_chips(Arc::clone(&rig.rec), vec![("expander", 100, 16)]);
    let err = rig.start_with(&ControllerConfig::default(), gpio).err();

    assert_eq!(err, Some(Error::ResourceUnavailable { line: 17, cause: LineError::NoProvider }));
    assert!(rig.rec.calls().is_empty(), "nothing acquired");
    assert!(rig.sink.events().is_empty());
}

// ── Rollback ──────────────────────────────────────────────────

#[test]
fn first_line_failure_holds_nothing() {
    let rig = Rig::new();
    let gpio = MockGpio::new(Arc::clone(&rig.rec)).fail_line(17, LineError::Busy);
    let err = rig.start_with(&ControllerConfig::default(), gpio).err();

    assert_eq!(err, Some(Error::AcquisitionFailed { line: 17, cause: LineError::Busy }));
    assert!(rig.rec.calls().is_empty());
}

#[test]
fn second_line_failure_releases_first() {
    let rig = Rig::new();
    let gpio = MockGpio::new(Arc::clone(&rig.rec)).fail_line(19, LineError::Busy);
    let err = rig.start_with(&ControllerConfig::default(), gpio).err();

    assert_eq!(err, Some(Error::AcquisitionFailed { line: 19, cause: LineError::Busy }));
    assert_eq!(rig.rec.lifecycle(), vec![requests()[0], Call::ReleaseOutput(17)]);
}

#[test]
fn pwm_line_failure_releases_in_reverse() {
    let rig = Rig::new();
    let gpio = MockGpio::new(Arc::clone(&rig.rec)).fail_line(18, LineError::Io(-5));
    let err = rig.start_with(&ControllerConfig::default(), gpio).err();

    assert_eq!(err, Some(Error::AcquisitionFailed { line: 18, cause: LineError::Io(-5) }));
    assert_eq!(
        rig.rec.lifecycle(),
        vec![requests()[0], requests()[1], Call::ReleaseOutput(19), Call::ReleaseOutput(17)]
    );
}

#[test]
fn button_line_failure_releases_all_outputs_in_reverse() {
    let rig = Rig::new();
    let gpio = MockGpio::new(Arc::clone(&rig.rec)).fail_line(27, LineError::NotOwned);
    let err = rig.start_with(&ControllerConfig::default(), gpio).err();

    assert_eq!(err, Some(Error::ResourceUnavailable { line: 27, cause: LineError::NotOwned }));
    let mut expected = requests()[..3].to_vec();
    expected.extend([Call::ReleaseOutput(18), Call::ReleaseOutput(19), Call::ReleaseOutput(17)]);
    assert_eq!(rig.rec.lifecycle(), expected);
}

#[test]
fn timer_creation_failure_releases_every_line() {
    let rec = Arc::new(Recorder::default());
    let timers = FailingTimers::new(1);
    let sink = Arc::new(RecordingSink::default());
    let result = Controller::start(
        &ControllerConfig::default(),
        MockGpio::new(Arc::clone(&rec)),
        &timers,
        MockIrq::new(Arc::clone(&rec)),
        Arc::clone(&sink),
    );

    assert_eq!(result.err(), Some(Error::Timer(TimerError::CreateFailed(-12))));
    let mut expected = requests();
    expected.extend(releases());
    assert_eq!(rec.lifecycle(), expected);
    assert_eq!(timers.inner.armed(), 0);
}

#[test]
fn interrupt_failure_stops_toggle_and_releases_every_line() {
    let rig = Rig::new();
    let irq = MockIrq::failing(Arc::clone(&rig.rec), IrqError::NoIrq);
    let result = Controller::start(
        &ControllerConfig::default(),
        MockGpio::new(Arc::clone(&rig.rec)),
        &rig.timers,
        irq,
        Arc::clone(&rig.sink),
    );

    assert_eq!(
        result.err(),
        Some(Error::InterruptRegistrationFailed { line: 27, cause: IrqError::NoIrq })
    );
    let mut expected = requests();
    expected.extend(releases());
    assert_eq!(rig.rec.lifecycle(), expected);

    assert!(!rig.rec.level(17), "LED A driven off before release");
    assert_eq!(rig.timers.armed(), 0);
    assert!(rig.sink.events().is_empty(), "no Started event");

    // Nothing keeps running afterwards.
    let before = rig.rec.calls().len();
    rig.timers.advance(std::time::Duration::from_secs(5));
    assert_eq!(rig.rec.calls().len(), before);
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_unregisters_then_stops_then_releases() {
    let rig = Rig::new();
    let mut controller = rig.start();
    rig.rec.clear();

    controller.shutdown();

    let calls = rig.rec.calls();
    assert_eq!(calls.first(), Some(&Call::Unregister(27)));
    let mut expected = vec![Call::Unregister(27)];
    expected.extend(releases());
    assert_eq!(rig.rec.lifecycle(), expected);

    // Every level written during teardown is OFF.
    assert!(calls.iter().all(|c| !matches!(c, Call::Set { on: true, .. })));
    assert!(!controller.is_running());
    assert_eq!(controller.mode(), Mode::Idle);
    assert_eq!(rig.timers.armed(), 0);
    assert!(!rig.irq.is_registered());
    assert_eq!(rig.sink.events().last(), Some(&ControllerEvent::Stopped));
}

#[test]
fn shutdown_from_breathe_turns_pwm_off() {
    let rig = Rig::new();
    let mut controller = rig.start();
    rig.irq.fire();
    rig.timers.advance(std::time::Duration::from_millis(100));
    assert_eq!(controller.mode(), Mode::Breathe);

    controller.shutdown();
    assert!(!rig.rec.level(18));
    assert_eq!(rig.timers.armed(), 0);
}

#[test]
fn second_shutdown_is_a_no_op() {
    let rig = Rig::new();
    let mut controller = rig.start();
    controller.shutdown();
    rig.rec.clear();

    controller.shutdown();
    drop(controller);

    assert!(rig.rec.calls().is_empty());
    assert_eq!(rig.sink.count(&ControllerEvent::Stopped), 1);
}

#[test]
fn dropping_the_controller_shuts_it_down() {
    let rig = Rig::new();
    {
        let _controller = rig.start();
        rig.rec.clear();
    }
    let mut expected = vec![Call::Unregister(27)];
    expected.extend(releases());
    assert_eq!(rig.rec.lifecycle(), expected);
}
