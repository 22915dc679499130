//! Bridge sequencer
//!
//! Drives the DS90UB983/DS90UB984 pair from reset to a trained, enabled
//! link and publishes readiness through the shared
//! [`ReadinessGate`](fpdlink_core::gate::ReadinessGate).
//!
//! Every public operation holds the bus lock for its whole duration, so
//! the touch side never sees a half-programmed bridge. Readiness goes up
//! only after the last mandatory step and comes down before anything is
//! reset.
//!
//! # Bring-up order
//!
//! 1. Serializer reset, variables, strap detection, FPD-Link IV PLLs,
//!    pass-through, deserializer soft reset, DP and VP configuration
//! 2. Link training: up to [`MAX_TRAINING_SAMPLES`] VP0 lock samples, one
//!    video input reset after the first miss
//! 3. Serializer link layer, deserializer eFuse and temperature ramp, CRC
//!    clear, DTG/DPTX programming, output enable, MCU pass-through
//! 4. Ready commit, then the optional motor open
//!
//! [`MAX_TRAINING_SAMPLES`]: fpdlink_core::link::MAX_TRAINING_SAMPLES

use core::future::Future;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;
use fpdlink_core::config::BridgeConfig;
use fpdlink_core::gate::{BusGuard, ReadinessGate};
use fpdlink_core::link::{LinkEvent, LinkState, TrainingAction, TrainingAttempt};
use fpdlink_hal::I2cBus;
use fpdlink_protocol::{MotorCommand, MOTOR_STATUS_LEN};

use crate::mcu;
use crate::script::{self, Script, ScriptError};
use crate::serdes::{des984, ser983, EfuseProbe, RampPlan, StrapProfile};
use crate::transport::{Registers, TransportError};

/// Sequencer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerError {
    /// Operation not allowed from this link state
    InvalidState(LinkState),
    /// Mandatory register access failed
    Transport {
        stage: &'static str,
        error: TransportError,
    },
    /// Video never locked; outputs were still enabled
    TrainingTimeout { samples: u8 },
    /// A cancelling command arrived before bring-up finished
    Cancelled,
}

impl From<ScriptError> for SequencerError {
    fn from(e: ScriptError) -> Self {
        SequencerError::Transport {
            stage: e.script,
            error: e.error,
        }
    }
}

fn at(stage: &'static str) -> impl Fn(TransportError) -> SequencerError {
    move |error| SequencerError::Transport { stage, error }
}

/// What a successful bring-up found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BringUpReport {
    pub straps: StrapProfile,
    /// Pattern generator was driving VP0, lock taken as given
    pub pattern_generator: bool,
    /// VP0 status samples read
    pub training_samples: u8,
    pub efuse: EfuseProbe,
    pub ramp: RampPlan,
    /// Ready generation committed by this bring-up
    pub generation: u32,
    /// Motor status block, if the motor was driven and answered
    pub motor_status: Option<[u8; MOTOR_STATUS_LEN]>,
}

/// Requests handled by [`BridgeSequencer::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeCommand {
    Start,
    Suspend,
    Resume,
    /// Drop back to uninitialized and bring up again
    Reinit,
    Shutdown,
}

impl BridgeCommand {
    /// Whether this command aborts a bring-up in flight
    pub fn cancels_bring_up(self) -> bool {
        matches!(
            self,
            BridgeCommand::Suspend | BridgeCommand::Reinit | BridgeCommand::Shutdown
        )
    }
}

/// Link training outcome
struct Training {
    locked: bool,
    pattern_generator: bool,
    samples: u8,
}

/// Bring-up, suspend and shutdown for one serializer/deserializer pair
pub struct BridgeSequencer<'a, M: RawMutex, B: I2cBus, D: DelayNs> {
    gate: &'a ReadinessGate<M, B>,
    delay: D,
    config: BridgeConfig,
}

impl<'a, M: RawMutex, B: I2cBus, D: DelayNs> BridgeSequencer<'a, M, B, D> {
    pub fn new(gate: &'a ReadinessGate<M, B>, delay: D, config: BridgeConfig) -> Self {
        Self {
            gate,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bring the link up from `Uninitialized` or `Suspended`
    ///
    /// On a training timeout the outputs are still programmed but the link
    /// is left `Failed` and never reported ready.
    pub async fn bring_up(&mut self) -> Result<BringUpReport, SequencerError> {
        let gate = self.gate;
        let mut report = {
            let mut guard = gate.lock().await;
            bring_up_locked(&mut guard, &mut self.delay, &self.config).await?
        };

        if self.config.motor {
            report.motor_status = drive_motor(gate, self.config.mcu_addr, MotorCommand::Open).await;
        }

        Ok(report)
    }

    /// [`bring_up`](Self::bring_up) racing a cancellation future
    ///
    /// If `cancel` completes first the bring-up is dropped where it stands,
    /// including any pending training delay, and the bus lock is released.
    /// The link state is left mid-bring-up for a following suspend,
    /// re-init or shutdown to clean up.
    pub async fn bring_up_until<F: Future<Output = ()>>(
        &mut self,
        cancel: F,
    ) -> Result<BringUpReport, SequencerError> {
        match select(self.bring_up(), cancel).await {
            Either::First(result) => result,
            Either::Second(()) => Err(SequencerError::Cancelled),
        }
    }

    /// Clear readiness, then reset the deserializer and the serializer
    ///
    /// A no-op when nothing was brought up.
    pub async fn suspend(&mut self) -> Result<(), SequencerError> {
        let mut guard = self.gate.lock().await;
        if matches!(
            guard.link_state(),
            LinkState::Uninitialized | LinkState::Suspended
        ) {
            return Ok(());
        }

        guard.apply(LinkEvent::Suspend);
        reset_bridge(&mut guard, &mut self.delay, &self.config).await
    }

    /// Return to `Uninitialized` so the next bring-up starts from scratch
    ///
    /// This is the only way out of `Failed`.
    pub async fn reinit(&mut self) {
        let mut guard = self.gate.lock().await;
        guard.apply(LinkEvent::Reinit);
    }

    /// Clear readiness, close the motor and reset both chips
    pub async fn shutdown(&mut self) -> Result<(), SequencerError> {
        let mut guard = self.gate.lock().await;
        let was_ready = guard.is_ready();
        guard.apply(LinkEvent::Suspend);

        if was_ready && self.config.motor {
            let mut regs = Registers::new(guard.bus());
            if let Err(_e) = mcu::motor(&mut regs, self.config.mcu_addr, MotorCommand::Close).await {
                #[cfg(feature = "defmt")]
                defmt::warn!("motor close failed: {}", _e);
            }
        }

        let result = reset_bridge(&mut guard, &mut self.delay, &self.config).await;
        guard.apply(LinkEvent::Reinit);
        result
    }

    /// Serve commands forever
    ///
    /// A suspend, re-init or shutdown arriving during a bring-up cancels it
    /// and is handled next.
    pub async fn run<C: RawMutex>(&mut self, commands: &Signal<C, BridgeCommand>) -> ! {
        let mut pending: Option<BridgeCommand> = None;

        loop {
            let command = match pending.take() {
                Some(command) => command,
                None => commands.wait().await,
            };

            #[cfg(feature = "defmt")]
            defmt::info!("bridge command {}", command);

            let result = match command {
                BridgeCommand::Start | BridgeCommand::Resume | BridgeCommand::Reinit => {
                    if command == BridgeCommand::Reinit {
                        self.reinit().await;
                    }
                    let mut cancelled_by = None;
                    let result = self
                        .bring_up_until(async {
                            cancelled_by = Some(next_cancelling(commands).await);
                        })
                        .await;
                    pending = cancelled_by;
                    result.map(|_report| {
                        #[cfg(feature = "defmt")]
                        defmt::info!("bridge ready: {}", _report);
                    })
                }
                BridgeCommand::Suspend => self.suspend().await,
                BridgeCommand::Shutdown => self.shutdown().await,
            };

            if let Err(_e) = result {
                #[cfg(feature = "defmt")]
                defmt::warn!("bridge command {} failed: {}", command, _e);
            }
        }
    }
}

async fn next_cancelling<C: RawMutex>(commands: &Signal<C, BridgeCommand>) -> BridgeCommand {
    loop {
        let command = commands.wait().await;
        if command.cancels_bring_up() {
            return command;
        }
    }
}

async fn bring_up_locked<M: RawMutex, B: I2cBus, D: DelayNs>(
    guard: &mut BusGuard<'_, M, B>,
    delay: &mut D,
    config: &BridgeConfig,
) -> Result<BringUpReport, SequencerError> {
    let event = match guard.link_state() {
        LinkState::Uninitialized => LinkEvent::Start,
        LinkState::Suspended => LinkEvent::Resume,
        other => return Err(SequencerError::InvalidState(other)),
    };
    guard.apply(event);

    let straps = match serializer_stages(&mut Registers::new(guard.bus()), delay, config).await {
        Ok(straps) => straps,
        Err(e) => {
            guard.apply(LinkEvent::TransportFailed);
            return Err(e);
        }
    };
    guard.apply(LinkEvent::ScriptsApplied);

    let training = train(guard, delay, config).await;
    delay.delay_ms(config.settle_ms).await;

    let outputs = output_stages(&mut Registers::new(guard.bus()), delay, config).await;

    if !training.locked {
        // Already Failed(TrainingTimeout), the outputs were best effort
        if let Err(_e) = outputs {
            #[cfg(feature = "defmt")]
            defmt::warn!("output stage after training timeout: {}", _e);
        }
        return Err(SequencerError::TrainingTimeout {
            samples: training.samples,
        });
    }

    let (efuse, ramp) = match outputs {
        Ok(outputs) => outputs,
        Err(e) => {
            guard.apply(LinkEvent::TransportFailed);
            return Err(e);
        }
    };

    guard.apply(LinkEvent::OutputEnabled);

    Ok(BringUpReport {
        straps,
        pattern_generator: training.pattern_generator,
        training_samples: training.samples,
        efuse,
        ramp,
        generation: guard.generation(),
        motor_status: None,
    })
}

async fn run_all<B: I2cBus, D: DelayNs>(
    regs: &mut Registers<'_, B>,
    delay: &mut D,
    dev: u8,
    scripts: &[&Script],
) -> Result<(), ScriptError> {
    for script in scripts {
        script::apply(regs, delay, dev, script).await?;
    }
    Ok(())
}

/// Serializer setup up to the start of link training
async fn serializer_stages<B: I2cBus, D: DelayNs>(
    regs: &mut Registers<'_, B>,
    delay: &mut D,
    config: &BridgeConfig,
) -> Result<StrapProfile, SequencerError> {
    let ser = config.serializer_addr;

    run_all(regs, delay, ser, &[&ser983::RESET, &ser983::VARIABLES]).await?;

    let straps = ser983::read_straps(regs, ser)
        .await
        .map_err(at("ser.straps"))?;
    if !straps.serializer_present() {
        #[cfg(feature = "defmt")]
        defmt::warn!("no serializer strap mode detected");
    }

    run_all(
        regs,
        delay,
        ser,
        &[
            &ser983::FPD4_MODE,
            &ser983::FPD4_PLL,
            &ser983::ENABLE_PLLS,
            &ser983::ENABLE_PASS_THROUGH,
        ],
    )
    .await?;

    script::apply(regs, delay, config.deserializer_addr, &des984::SOFT_RESET).await?;
    regs.write(ser, ser983::reg::TX_PORT_SEL, 0x01)
        .await
        .map_err(at("ser.port_select"))?;

    run_all(
        regs,
        delay,
        ser,
        &[&ser983::DP_CONFIG, &ser983::VP_CONFIG, &ser983::ENABLE_VPS],
    )
    .await?;

    Ok(straps)
}

/// Sample VP0 lock until it holds or the budget runs out
async fn train<M: RawMutex, B: I2cBus, D: DelayNs>(
    guard: &mut BusGuard<'_, M, B>,
    delay: &mut D,
    config: &BridgeConfig,
) -> Training {
    let ser = config.serializer_addr;

    delay.delay_ms(config.settle_ms).await;
    let pattern_generator =
        ser983::pattern_generator_enabled(&mut Registers::new(guard.bus()), ser).await;

    let mut attempt = TrainingAttempt::FIRST;
    loop {
        let locked =
            ser983::vp0_locked(&mut Registers::new(guard.bus()), ser).await || pattern_generator;

        match attempt.after_sample(locked) {
            TrainingAction::Proceed => {
                return Training {
                    locked: true,
                    pattern_generator,
                    samples: attempt.samples(),
                };
            }
            TrainingAction::GiveUp => {
                guard.apply(LinkEvent::NotLocked);
                #[cfg(feature = "defmt")]
                defmt::warn!("VP0 not locked after {} samples", attempt.samples());
                return Training {
                    locked: false,
                    pattern_generator,
                    samples: attempt.samples(),
                };
            }
            TrainingAction::Retry { reset_video_input } => {
                if reset_video_input {
                    let mut regs = Registers::new(guard.bus());
                    if let Err(_e) =
                        script::apply(&mut regs, delay, ser, &ser983::VIDEO_INPUT_RESET).await
                    {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("video input reset failed: {}", _e);
                    }
                }
                guard.apply(LinkEvent::NotLocked);
                delay.delay_ms(config.training_retry_ms).await;
            }
        }

        // Retry is only offered while another sample fits the budget
        if let Some(next) = attempt.next() {
            attempt = next;
        }
    }
}

/// Everything after training, ending with the MCU pass-through
async fn output_stages<B: I2cBus, D: DelayNs>(
    regs: &mut Registers<'_, B>,
    delay: &mut D,
    config: &BridgeConfig,
) -> Result<(EfuseProbe, RampPlan), SequencerError> {
    let ser = config.serializer_addr;
    let des = config.deserializer_addr;

    script::apply(regs, delay, ser, &ser983::TX_LINK_LAYER).await?;

    let efuse = des984::probe_efuse(regs, delay, des).await?;
    let ramp = des984::calibrate_temp_ramp(regs, delay, des, config.settle_ms)
        .await
        .map_err(at("des.temp_ramp"))?;

    script::apply(regs, delay, ser, &ser983::CLEAR_CRC_ERROR).await?;

    run_all(
        regs,
        delay,
        des,
        &[
            &des984::HOLD_DTG_RESET,
            &des984::DISABLE_STREAM_MAPPING,
            &des984::FORCE_DP_RATE,
            &des984::SETUP_PORTS,
            &des984::MAP_OUTPUT,
            &des984::PCLK,
            &des984::DTG,
            &des984::DPTX,
            &des984::RELEASE_DTG_RESET,
            &des984::ENABLE_OUTPUT,
        ],
    )
    .await?;

    mcu::enable_pass_through(regs, ser, config.mcu_addr)
        .await
        .map_err(at("mcu.pass_through"))?;

    Ok((efuse, ramp))
}

/// Deserializer first, then serializer, each followed by the settle time
///
/// Both resets are attempted; the first failure is reported.
async fn reset_bridge<M: RawMutex, B: I2cBus, D: DelayNs>(
    guard: &mut BusGuard<'_, M, B>,
    delay: &mut D,
    config: &BridgeConfig,
) -> Result<(), SequencerError> {
    let mut regs = Registers::new(guard.bus());

    let des = script::apply(&mut regs, delay, config.deserializer_addr, &des984::RESET).await;
    delay.delay_ms(config.settle_ms).await;
    let ser = script::apply(&mut regs, delay, config.serializer_addr, &ser983::RESET).await;
    delay.delay_ms(config.settle_ms).await;

    des.and(ser).map_err(SequencerError::from)
}

/// Best-effort motor command, only while the link is ready
async fn drive_motor<M: RawMutex, B: I2cBus>(
    gate: &ReadinessGate<M, B>,
    mcu_addr: u8,
    command: MotorCommand,
) -> Option<[u8; MOTOR_STATUS_LEN]> {
    let mut guard = gate.lock().await;
    if !guard.is_ready() {
        return None;
    }
    match mcu::motor(&mut Registers::new(guard.bus()), mcu_addr, command).await {
        Ok(status) => Some(status),
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::warn!("motor {} failed: {}", command, _e);
            None
        }
    }
}
