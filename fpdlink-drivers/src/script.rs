//! Register scripts
//!
//! Vendor bring-up sequences are long lists of register writes. They are
//! kept as `&'static` tables of [`Step`]s and run by a single executor, so
//! a failure can be reported as "step N of script X" without each sequence
//! carrying its own error handling.

use embedded_hal_async::delay::DelayNs;
use fpdlink_hal::I2cBus;

use crate::transport::{Registers, TransportError};

/// One register operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Write a value to a register
    Write(u8, u8),
    /// Read-modify-write the bits in `mask`
    Update { reg: u8, mask: u8, value: u8 },
    /// Read and discard, e.g. to clear latched status
    Read(u8),
    /// Wait before the next step
    Delay(u32),
}

/// Named list of steps
#[derive(Debug, Clone, Copy)]
pub struct Script {
    pub name: &'static str,
    pub steps: &'static [Step],
}

impl Script {
    pub const fn new(name: &'static str, steps: &'static [Step]) -> Self {
        Self { name, steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Script aborted at a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScriptError {
    pub script: &'static str,
    /// Index of the failing step
    pub step: usize,
    pub error: TransportError,
}

/// Run a script against one device
///
/// Stops at the first failing step; the steps before it have taken effect.
pub async fn apply<B: I2cBus, D: DelayNs>(
    regs: &mut Registers<'_, B>,
    delay: &mut D,
    dev: u8,
    script: &Script,
) -> Result<(), ScriptError> {
    for (index, step) in script.steps.iter().enumerate() {
        run_step(regs, delay, dev, *step)
            .await
            .map_err(|error| ScriptError {
                script: script.name,
                step: index,
                error,
            })?;
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("script {} applied to {:#x}", script.name, dev);

    Ok(())
}

async fn run_step<B: I2cBus, D: DelayNs>(
    regs: &mut Registers<'_, B>,
    delay: &mut D,
    dev: u8,
    step: Step,
) -> Result<(), TransportError> {
    match step {
        Step::Write(reg, value) => regs.write(dev, reg, value).await,
        Step::Update { reg, mask, value } => regs
            .read_modify_write(dev, reg, mask, value)
            .await
            .map(|_| ()),
        Step::Read(reg) => regs.read(dev, reg).await.map(|_| ()),
        Step::Delay(ms) => {
            delay.delay_ms(ms).await;
            Ok(())
        }
    }
}
