//! Bring-up and touch delivery against an emulated serializer/deserializer
//! pair with the MCU behind it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use embassy_futures::join::join;
use embassy_futures::select::{select, Either};
use embassy_futures::{block_on, yield_now};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::{Error as PinError, ErrorKind, ErrorType};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use fpdlink_core::config::{BridgeConfig, DeliveryMode, TouchConfig};
use fpdlink_core::gate::ReadinessGate;
use fpdlink_core::link::{FailureReason, LinkState};
use fpdlink_core::touch::{Outcome, TouchService};
use fpdlink_core::traits::{ContactUpdate, InputCapabilities, InputSink, TouchSource};
use fpdlink_drivers::sequencer::{BridgeCommand, BridgeSequencer, SequencerError};
use fpdlink_drivers::serdes::ser983;
use fpdlink_drivers::touch::{Acknowledger, InterruptSource, McuLink, PollingSource, TouchError};
use fpdlink_drivers::transport::reg::{IND_ACC_ADDR, IND_ACC_CTL, IND_ACC_DATA};
use fpdlink_hal::{BusErrorKind, I2cBus};
use fpdlink_protocol::{PointRecord, PointStatus, RawReport, TouchReport};

const SER: u8 = 0x14;
const DES: u8 = 0x30;
const MCU: u8 = 0x78;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Write(u8, Vec<u8>),
    WriteRead(u8, Vec<u8>),
    /// VP0 status sampled
    Vp0Status,
}

struct State {
    regs: HashMap<(u8, u8), u8>,
    /// Status samples answered "not locked" before locking
    unlocked: usize,
    status_reads: usize,
    patgen: bool,
    temp_raw: u8,
    report: RawReport,
    nack: Option<u8>,
    log: Vec<Op>,
}

/// Shared handle, the gate owns one clone and the test keeps another
#[derive(Clone)]
struct Bridge(Rc<RefCell<State>>);

impl Bridge {
    fn new(unlocked: usize) -> Self {
        Bridge(Rc::new(RefCell::new(State {
            regs: HashMap::new(),
            unlocked,
            status_reads: 0,
            patgen: false,
            temp_raw: 150,
            report: press(100, 200),
            nack: None,
            log: Vec::new(),
        })))
    }

    fn log(&self) -> Vec<Op> {
        self.0.borrow().log.clone()
    }

    fn clear_log(&self) {
        self.0.borrow_mut().log.clear();
    }

    fn status_reads(&self) -> usize {
        self.0.borrow().status_reads
    }

    fn mcu_traffic(&self) -> usize {
        self.log()
            .iter()
            .filter(|op| matches!(op, Op::Write(MCU, _) | Op::WriteRead(MCU, _)))
            .count()
    }

    /// Video input resets issued while sampling lock status
    fn training_video_resets(&self) -> usize {
        let log = self.log();
        let first = log.iter().position(|op| *op == Op::Vp0Status);
        let last = log.iter().rposition(|op| *op == Op::Vp0Status);
        match (first, last) {
            (Some(first), Some(last)) => log[first..last]
                .iter()
                .filter(|op| **op == Op::Write(SER, vec![0x49, 0x54]))
                .count(),
            _ => 0,
        }
    }

    fn contains(&self, op: &Op) -> bool {
        self.0.borrow().log.contains(op)
    }
}

impl State {
    fn indirect(&self, dev: u8) -> (u8, u8) {
        let ctl = self.regs.get(&(dev, IND_ACC_CTL)).copied().unwrap_or(0);
        let addr = self.regs.get(&(dev, IND_ACC_ADDR)).copied().unwrap_or(0);
        (ctl >> 2, addr)
    }

    fn register(&mut self, dev: u8, reg: u8) -> u8 {
        if reg != IND_ACC_DATA {
            return self.regs.get(&(dev, reg)).copied().unwrap_or(0);
        }
        match (dev, self.indirect(dev)) {
            (SER, (ser983::page::VIDEO_PROCESSOR, ser983::vp::VP0_STS)) => {
                self.status_reads += 1;
                self.log.push(Op::Vp0Status);
                (self.status_reads > self.unlocked) as u8
            }
            (SER, (ser983::page::VIDEO_PROCESSOR, ser983::vp::PATGEN_CTL)) => self.patgen as u8,
            (SER, (ser983::page::INTERRUPT, _)) => 0x01,
            (DES, _) => self.temp_raw,
            _ => 0,
        }
    }
}

impl I2cBus for Bridge {
    type Error = BusErrorKind;

    async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        let mut s = self.0.borrow_mut();
        if s.nack == Some(address) {
            return Err(BusErrorKind::NoAck);
        }
        s.log.push(Op::Write(address, data.to_vec()));
        if address != MCU {
            if let &[reg, value] = data {
                s.regs.insert((address, reg), value);
            }
        }
        Ok(())
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        if self.0.borrow().nack == Some(address) {
            return Err(BusErrorKind::NoAck);
        }
        buf.fill(0);
        Ok(())
    }

    async fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut s = self.0.borrow_mut();
        if s.nack == Some(address) {
            return Err(BusErrorKind::NoAck);
        }
        s.log.push(Op::WriteRead(address, write_data.to_vec()));

        if address == MCU {
            match write_data {
                [0x60] | [0xfe] => read_buf.copy_from_slice(&s.report.as_bytes()[..read_buf.len()]),
                _ => read_buf.fill(0xa5),
            }
            return Ok(());
        }

        let reg = write_data[0];
        for (i, byte) in read_buf.iter_mut().enumerate() {
            *byte = s.register(address, reg.wrapping_add(i as u8));
        }
        Ok(())
    }
}

/// Delay that only counts, optionally yielding to the executor
#[derive(Clone, Default)]
struct Clock {
    elapsed: Rc<Cell<u64>>,
    yields: bool,
}

impl Clock {
    fn yielding() -> Self {
        Self {
            yields: true,
            ..Self::default()
        }
    }
}

impl DelayNs for Clock {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.elapsed.set(self.elapsed.get() + ms as u64);
        if self.yields {
            yield_now().await;
        }
    }
}

/// Interrupt line with a fixed number of edges left
struct Edges(Cell<u32>);

#[derive(Debug)]
struct LineGone;

impl PinError for LineGone {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for Edges {
    type Error = LineGone;
}

impl Edges {
    fn take(&self) -> Result<(), LineGone> {
        match self.0.get() {
            0 => Err(LineGone),
            n => {
                self.0.set(n - 1);
                Ok(())
            }
        }
    }
}

impl Wait for Edges {
    async fn wait_for_high(&mut self) -> Result<(), LineGone> {
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), LineGone> {
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), LineGone> {
        self.take()
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), LineGone> {
        self.take()
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), LineGone> {
        self.take()
    }
}

/// Interrupt line that never fires
struct Quiet;

impl ErrorType for Quiet {
    type Error = LineGone;
}

impl Wait for Quiet {
    async fn wait_for_high(&mut self) -> Result<(), LineGone> {
        std::future::pending().await
    }

    async fn wait_for_low(&mut self) -> Result<(), LineGone> {
        std::future::pending().await
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), LineGone> {
        std::future::pending().await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), LineGone> {
        std::future::pending().await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), LineGone> {
        std::future::pending().await
    }
}

#[derive(Default)]
struct Recorder {
    contacts: Vec<ContactUpdate>,
    frames: usize,
}

impl InputSink for Recorder {
    type Error = core::convert::Infallible;

    fn register(&mut self, _caps: &InputCapabilities) -> Result<(), Self::Error> {
        Ok(())
    }

    fn report_contact(&mut self, update: &ContactUpdate) -> Result<(), Self::Error> {
        self.contacts.push(*update);
        Ok(())
    }

    fn sync_frame(&mut self) -> Result<(), Self::Error> {
        self.frames += 1;
        Ok(())
    }

    fn unregister(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

type Gate = ReadinessGate<NoopRawMutex, Bridge>;

fn press(x: u16, y: u16) -> RawReport {
    TouchReport::new(&[PointRecord::new(0, PointStatus::Press, x, y)])
        .unwrap()
        .encode()
}

fn config() -> BridgeConfig {
    BridgeConfig {
        motor: false,
        ..BridgeConfig::default()
    }
}

fn link_state(gate: &Gate) -> LinkState {
    block_on(gate.lock()).link_state()
}

/// Yield until `done` holds, failing after a bounded number of turns
async fn until(mut done: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if done() {
            return;
        }
        yield_now().await;
    }
    panic!("condition not reached");
}

fn current_state(gate: &Gate) -> Option<LinkState> {
    gate.try_lock().map(|guard| guard.link_state())
}

/// Serializer and deserializer writes that route the MCU interrupt to the host
fn interrupt_routing() -> Vec<Op> {
    vec![
        Op::Write(SER, vec![0x51, 0x83]),
        Op::Write(SER, vec![0xc6, 0x21]),
        Op::Write(SER, vec![IND_ACC_ADDR, 0x8c]),
        Op::Write(SER, vec![IND_ACC_ADDR, 0x9c]),
        Op::Write(DES, vec![0x44, 0x81]),
        Op::Write(DES, vec![0x45, 0x80]),
        Op::Write(DES, vec![0x52, 0x01]),
    ]
}

#[test]
fn test_immediate_lock() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());

    let report = block_on(seq.bring_up()).unwrap();
    assert_eq!(report.training_samples, 1);
    assert_eq!(report.generation, 1);
    assert_eq!(bus.status_reads(), 1);
    assert_eq!(bus.training_video_resets(), 0);
    assert!(gate.is_ready());
}

#[test]
fn test_lock_after_misses() {
    for misses in 1..10 {
        let bus = Bridge::new(misses);
        let gate = Gate::new(bus.clone());
        let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());

        let report = block_on(seq.bring_up()).unwrap();
        assert_eq!(report.training_samples as usize, misses + 1);
        assert_eq!(bus.status_reads(), misses + 1);
        assert_eq!(bus.training_video_resets(), 1);
        assert_eq!(link_state(&gate), LinkState::Ready);
    }
}

#[test]
fn test_training_timeout() {
    for misses in [10, 11, 100] {
        let bus = Bridge::new(misses);
        let gate = Gate::new(bus.clone());
        let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());

        assert_eq!(
            block_on(seq.bring_up()),
            Err(SequencerError::TrainingTimeout { samples: 10 })
        );
        assert_eq!(bus.status_reads(), 10);
        assert_eq!(bus.training_video_resets(), 1);
        assert!(!gate.is_ready());
        assert_eq!(
            link_state(&gate),
            LinkState::Failed(FailureReason::TrainingTimeout)
        );
        // Outputs were still programmed
        assert!(bus.contains(&Op::Write(SER, vec![ser983::reg::TARGET_ID_0, MCU << 1])));
    }
}

#[test]
fn test_pattern_generator_skips_lock() {
    let bus = Bridge::new(100);
    bus.0.borrow_mut().patgen = true;
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());

    let report = block_on(seq.bring_up()).unwrap();
    assert!(report.pattern_generator);
    assert_eq!(report.training_samples, 1);
    // Status is still read once
    assert_eq!(bus.status_reads(), 1);
}

#[test]
fn test_failed_needs_reinit() {
    let bus = Bridge::new(100);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());

    assert!(block_on(seq.bring_up()).is_err());
    assert!(matches!(
        block_on(seq.bring_up()),
        Err(SequencerError::InvalidState(LinkState::Failed(_)))
    ));

    bus.0.borrow_mut().unlocked = 0;
    bus.0.borrow_mut().status_reads = 0;
    block_on(seq.reinit());
    assert!(block_on(seq.bring_up()).is_ok());
    assert!(gate.is_ready());
}

#[test]
fn test_deserializer_nack_fails_bring_up() {
    let bus = Bridge::new(0);
    bus.0.borrow_mut().nack = Some(DES);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());

    assert!(matches!(
        block_on(seq.bring_up()),
        Err(SequencerError::Transport {
            error: BusErrorKind::NoAck,
            ..
        })
    ));
    assert_eq!(link_state(&gate), LinkState::Failed(FailureReason::Transport));
    assert_eq!(bus.status_reads(), 0);
}

#[test]
fn test_ready_only_after_outputs() {
    let bus = Bridge::new(3);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::yielding(), config());
    let done = Cell::new(false);

    block_on(join(
        async {
            seq.bring_up().await.unwrap();
            done.set(true);
        },
        async {
            let mut observed = 0;
            while !done.get() {
                if gate.is_ready() {
                    observed += 1;
                }
                yield_now().await;
            }
            assert_eq!(observed, 0);
        },
    ));

    assert!(gate.is_ready());
    let log = bus.log();
    let pass_through = log
        .iter()
        .position(|op| *op == Op::Write(SER, vec![ser983::reg::TARGET_ID_0, MCU << 1]))
        .unwrap();
    let last_status = log.iter().rposition(|op| *op == Op::Vp0Status).unwrap();
    assert!(last_status < pass_through);
}

#[test]
fn test_motor_opens_after_ready() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), BridgeConfig::default());

    let report = block_on(seq.bring_up()).unwrap();
    assert_eq!(report.motor_status, Some([0xa5; 7]));
    assert!(bus.mcu_traffic() >= 2);
}

#[test]
fn test_suspend_clears_ready_and_resets() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());
    block_on(seq.bring_up()).unwrap();

    bus.clear_log();
    block_on(seq.suspend()).unwrap();
    assert!(!gate.is_ready());
    assert_eq!(link_state(&gate), LinkState::Suspended);

    let log = bus.log();
    let des = log.iter().position(|op| *op == Op::Write(DES, vec![0x01, 0x01]));
    let ser = log.iter().position(|op| *op == Op::Write(SER, vec![0x01, 0xff]));
    assert!(des.unwrap() < ser.unwrap());

    // Suspending twice touches nothing
    bus.clear_log();
    block_on(seq.suspend()).unwrap();
    assert!(bus.log().is_empty());

    let report = block_on(seq.bring_up()).unwrap();
    assert_eq!(report.generation, 2);
}

#[test]
fn test_shutdown_closes_motor_then_resets() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), BridgeConfig::default());
    block_on(seq.bring_up()).unwrap();

    bus.clear_log();
    block_on(seq.shutdown()).unwrap();
    assert!(!gate.is_ready());
    assert_eq!(link_state(&gate), LinkState::Uninitialized);

    let log = bus.log();
    let motor = log.iter().position(|op| matches!(op, Op::Write(MCU, _)));
    let reset = log.iter().position(|op| *op == Op::Write(DES, vec![0x01, 0x01]));
    assert!(motor.unwrap() < reset.unwrap());
}

#[test]
fn test_cancelled_bring_up_releases_bus() {
    let bus = Bridge::new(5);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::yielding(), config());

    assert_eq!(
        block_on(seq.bring_up_until(async {})),
        Err(SequencerError::Cancelled)
    );
    assert!(!gate.is_ready());
    assert!(gate.try_lock().is_some());
    assert!(link_state(&gate).is_bringing_up());

    block_on(seq.suspend()).unwrap();
    assert_eq!(link_state(&gate), LinkState::Suspended);
}

#[test]
fn test_poll_before_ready_touches_nothing() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut link = McuLink::new(&gate, config(), Clock::default());

    assert_eq!(block_on(link.poll()), Err(TouchError::NotReady));
    assert_eq!(block_on(link.query()), Err(TouchError::NotReady));
    assert!(bus.log().is_empty());
    assert_eq!(link.session(), None);
}

#[test]
fn test_session_follows_generation() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());
    let mut link = McuLink::new(&gate, config(), Clock::default());

    block_on(seq.bring_up()).unwrap();
    assert_eq!(block_on(link.poll()), Ok(press(100, 200)));
    assert_eq!(link.session(), Some(1));

    // Same generation, no second setup
    bus.clear_log();
    block_on(link.poll()).unwrap();
    assert!(!bus.contains(&Op::Write(SER, vec![ser983::reg::TARGET_ID_0, MCU << 1])));

    block_on(seq.suspend()).unwrap();
    block_on(seq.bring_up()).unwrap();
    block_on(link.poll()).unwrap();
    assert_eq!(link.session(), Some(2));
}

#[test]
fn test_poll_acks_before_fetch() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());
    let mut link = McuLink::new(&gate, config(), Clock::default());
    block_on(seq.bring_up()).unwrap();
    block_on(link.poll()).unwrap();

    bus.clear_log();
    block_on(link.poll()).unwrap();
    let log = bus.log();
    let ack = log
        .iter()
        .position(|op| *op == Op::Write(SER, vec![IND_ACC_ADDR, 0x8d]))
        .unwrap();
    let fetch = log
        .iter()
        .position(|op| *op == Op::WriteRead(MCU, vec![0x60]))
        .unwrap();
    assert!(ack < fetch);
}

#[test]
fn test_interrupt_source() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());

    // Edges before the link is up are dropped
    let link = McuLink::new(&gate, config(), Clock::default());
    let mut source = InterruptSource::new(link, Edges(Cell::new(3)));
    assert_eq!(block_on(source.fetch_next_report()), Err(TouchError::Line));
    assert!(bus.log().is_empty());

    block_on(seq.bring_up()).unwrap();
    let link = McuLink::new(&gate, config(), Clock::default());
    let mut source = InterruptSource::new(link, Edges(Cell::new(1)));
    bus.clear_log();
    assert_eq!(block_on(source.fetch_next_report()), Ok(press(100, 200)));

    let log = bus.log();
    let fetch = log
        .iter()
        .position(|op| *op == Op::WriteRead(MCU, vec![0xfe]))
        .unwrap();
    let ack = log
        .iter()
        .rposition(|op| *op == Op::Write(SER, vec![IND_ACC_ADDR, 0x8d]))
        .unwrap();
    assert!(fetch < ack);
}

#[test]
fn test_interrupt_routing_armed_before_first_edge() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    block_on(BridgeSequencer::new(&gate, Clock::default(), config()).bring_up()).unwrap();
    bus.clear_log();

    // No edge ever arrives, the routing must already be in place
    let link = McuLink::new(&gate, config(), Clock::default());
    let mut source = InterruptSource::new(link, Edges(Cell::new(0)));
    assert_eq!(block_on(source.fetch_next_report()), Err(TouchError::Line));

    for op in interrupt_routing() {
        assert!(bus.contains(&op), "missing {:?}", op);
    }
    assert_eq!(source.link().session(), Some(1));
    assert!(!bus.contains(&Op::WriteRead(MCU, vec![0xfe])));
}

#[test]
fn test_resume_rearms_interrupt_routing() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::yielding(), config());
    block_on(seq.bring_up()).unwrap();

    let link = McuLink::new(&gate, config(), Clock::yielding());
    let mut source = InterruptSource::new(link, Quiet);

    let outcome = block_on(select(source.fetch_next_report(), async {
        until(|| bus.contains(&Op::Write(SER, vec![0x51, 0x83]))).await;
        seq.suspend().await.unwrap();
        seq.bring_up().await.unwrap();
        bus.clear_log();
        until(|| interrupt_routing().iter().all(|op| bus.contains(op))).await;
    }));
    assert!(matches!(outcome, Either::Second(())));
    assert_eq!(gate.generation(), 2);
}

#[test]
fn test_acknowledger_waits_for_ready() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::default(), config());
    let mut ack = Acknowledger::new(&gate, SER, 50, Clock::default());

    assert_eq!(block_on(ack.tick()), Ok(false));
    assert!(bus.log().is_empty());

    block_on(seq.bring_up()).unwrap();
    bus.clear_log();
    assert_eq!(block_on(ack.tick()), Ok(true));
    assert!(bus.contains(&Op::Write(
        SER,
        vec![IND_ACC_CTL, (ser983::page::INTERRUPT << 2) | 1]
    )));
}

#[test]
fn test_run_suspend_cancels_bring_up() {
    let bus = Bridge::new(5);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::yielding(), config());
    let commands = Signal::<NoopRawMutex, BridgeCommand>::new();

    let driver = async {
        commands.signal(BridgeCommand::Start);
        until(|| bus.status_reads() >= 2).await;
        commands.signal(BridgeCommand::Suspend);
        until(|| current_state(&gate) == Some(LinkState::Suspended)).await;
        assert!(!gate.is_ready());
        assert_eq!(gate.generation(), 0);

        commands.signal(BridgeCommand::Resume);
        until(|| gate.is_ready()).await;
    };
    match block_on(select(seq.run(&commands), driver)) {
        Either::First(never) => never,
        Either::Second(()) => {}
    }

    assert_eq!(link_state(&gate), LinkState::Ready);
    assert_eq!(gate.generation(), 1);
}

#[test]
fn test_run_ignores_start_during_bring_up() {
    let bus = Bridge::new(3);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::yielding(), config());
    let commands = Signal::<NoopRawMutex, BridgeCommand>::new();

    let driver = async {
        commands.signal(BridgeCommand::Start);
        until(|| bus.status_reads() >= 1).await;
        commands.signal(BridgeCommand::Start);
        commands.signal(BridgeCommand::Resume);
        until(|| gate.is_ready()).await;
        for _ in 0..100 {
            yield_now().await;
        }
    };
    match block_on(select(seq.run(&commands), driver)) {
        Either::First(never) => never,
        Either::Second(()) => {}
    }

    // One uninterrupted training run, one ready commit
    assert_eq!(bus.status_reads(), 4);
    assert_eq!(gate.generation(), 1);
    assert_eq!(link_state(&gate), LinkState::Ready);
}

#[test]
fn test_run_reinit_brings_up_again() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    let mut seq = BridgeSequencer::new(&gate, Clock::yielding(), config());
    let commands = Signal::<NoopRawMutex, BridgeCommand>::new();

    let driver = async {
        commands.signal(BridgeCommand::Start);
        until(|| gate.generation() == 1).await;
        commands.signal(BridgeCommand::Reinit);
        until(|| gate.generation() == 2).await;
    };
    match block_on(select(seq.run(&commands), driver)) {
        Either::First(never) => never,
        Either::Second(()) => {}
    }

    assert!(gate.is_ready());
    assert_eq!(bus.status_reads(), 2);
}

fn polling_service(
    gate: &Gate,
    clock: Clock,
) -> TouchService<PollingSource<'_, NoopRawMutex, Bridge, Clock>, Recorder> {
    let touch = TouchConfig {
        mode: DeliveryMode::Polling,
        ..TouchConfig::default()
    };
    let link = McuLink::new(gate, config(), clock);
    let mut service = TouchService::new(PollingSource::new(link, &touch), Recorder::default(), &touch);
    service.start().unwrap();
    service
}

#[test]
fn test_polling_dedup_and_release() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    block_on(BridgeSequencer::new(&gate, Clock::default(), config()).bring_up()).unwrap();

    let mut service = polling_service(&gate, Clock::default());
    assert_eq!(block_on(service.step()), Ok(Outcome::Forwarded(1)));

    for _ in 0..49 {
        assert_eq!(block_on(service.step()), Ok(Outcome::Suppressed));
    }
    assert_eq!(block_on(service.step()), Ok(Outcome::SyntheticRelease));
    assert_eq!(block_on(service.step()), Ok(Outcome::Suppressed));

    let sink = service.session().sink();
    let released = sink.contacts.last().unwrap();
    assert!(!released.active);
    assert_eq!(sink.frames, 2);

    // A new frame is forwarded again
    bus.0.borrow_mut().report = press(5, 5);
    assert_eq!(block_on(service.step()), Ok(Outcome::Forwarded(1)));
}

#[test]
fn test_polling_paces_fetches() {
    let bus = Bridge::new(0);
    let gate = Gate::new(bus.clone());
    block_on(BridgeSequencer::new(&gate, Clock::default(), config()).bring_up()).unwrap();

    let clock = Clock::default();
    let mut service = polling_service(&gate, clock.clone());
    block_on(service.step()).unwrap();
    // First fetch unpaced, session setup has no delays of its own
    let after_first = clock.elapsed.get();

    for _ in 0..3 {
        block_on(service.step()).unwrap();
    }
    assert_eq!(clock.elapsed.get() - after_first, 30);
}
