//! Bounded retry and response timeout
//!
//! Wraps any [`I2cBus`] so every transaction is given a fixed response
//! window and transient failures are retried a fixed number of times before
//! the error is reported upward.

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;

use crate::i2c::{BusError, BusErrorKind, I2cBus, I2cConfig};

/// Bus wrapper applying the configured retry count and timeout
pub struct Retrying<B, D> {
    bus: B,
    delay: D,
    config: I2cConfig,
}

impl<B, D> Retrying<B, D> {
    /// Wrap a bus with the given policy
    pub fn new(bus: B, delay: D, config: I2cConfig) -> Self {
        Self { bus, delay, config }
    }

    /// Policy in effect
    pub fn config(&self) -> &I2cConfig {
        &self.config
    }

    /// Release the wrapped bus
    pub fn into_inner(self) -> B {
        self.bus
    }
}

/// Flatten a raced transfer into a classified result
fn settle<E: BusError>(outcome: Either<Result<(), E>, ()>) -> Result<(), BusErrorKind> {
    match outcome {
        Either::First(result) => result.map_err(|e| e.kind()),
        Either::Second(()) => Err(BusErrorKind::Timeout),
    }
}

/// Decide whether another attempt is allowed
fn should_retry(error: BusErrorKind, attempt: u8, config: &I2cConfig) -> bool {
    error.is_transient() && attempt < config.retries
}

impl<B: I2cBus, D: DelayNs> I2cBus for Retrying<B, D> {
    type Error = BusErrorKind;

    async fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        let mut attempt = 0;
        loop {
            let outcome = select(
                self.bus.write(address, data),
                self.delay.delay_ms(self.config.timeout_ms),
            )
            .await;
            match settle(outcome) {
                Err(e) if should_retry(e, attempt, &self.config) => attempt += 1,
                result => return result,
            }
        }
    }

    async fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        let mut attempt = 0;
        loop {
            let outcome = select(
                self.bus.read(address, buf),
                self.delay.delay_ms(self.config.timeout_ms),
            )
            .await;
            match settle(outcome) {
                Err(e) if should_retry(e, attempt, &self.config) => attempt += 1,
                result => return result,
            }
        }
    }

    async fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut attempt = 0;
        loop {
            let outcome = select(
                self.bus.write_read(address, write_data, read_buf),
                self.delay.delay_ms(self.config.timeout_ms),
            )
            .await;
            match settle(outcome) {
                Err(e) if should_retry(e, attempt, &self.config) => attempt += 1,
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    struct NoDelay;

    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Bus failing a fixed number of times with the given error
    struct Flaky {
        failures: u8,
        error: BusErrorKind,
        calls: u8,
    }

    impl I2cBus for Flaky {
        type Error = BusErrorKind;

        async fn write(&mut self, _address: u8, _data: &[u8]) -> Result<(), Self::Error> {
            self.calls += 1;
            if self.calls <= self.failures {
                Err(self.error)
            } else {
                Ok(())
            }
        }

        async fn read(&mut self, _address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
            self.calls += 1;
            buf.fill(0xA5);
            Ok(())
        }

        async fn write_read(
            &mut self,
            _address: u8,
            _write_data: &[u8],
            _read_buf: &mut [u8],
        ) -> Result<(), Self::Error> {
            self.calls += 1;
            core::future::pending().await
        }
    }

    fn flaky(failures: u8, error: BusErrorKind) -> Retrying<Flaky, NoDelay> {
        Retrying::new(
            Flaky {
                failures,
                error,
                calls: 0,
            },
            NoDelay,
            I2cConfig::FAST,
        )
    }

    #[test]
    fn test_transient_error_recovers_within_budget() {
        let mut bus = flaky(3, BusErrorKind::Arbitration);
        assert_eq!(block_on(bus.write(0x14, &[0x01, 0xff])), Ok(()));
        assert_eq!(bus.into_inner().calls, 4);
    }

    #[test]
    fn test_retry_budget_exhausted() {
        let mut bus = flaky(10, BusErrorKind::Arbitration);
        assert_eq!(
            block_on(bus.write(0x14, &[0x01, 0xff])),
            Err(BusErrorKind::Arbitration)
        );
        // First attempt plus five retries
        assert_eq!(bus.into_inner().calls, 6);
    }

    #[test]
    fn test_nack_not_retried() {
        let mut bus = flaky(1, BusErrorKind::NoAck);
        assert_eq!(
            block_on(bus.write(0x30, &[0x01, 0x01])),
            Err(BusErrorKind::NoAck)
        );
        assert_eq!(bus.into_inner().calls, 1);
    }

    #[test]
    fn test_unresponsive_device_times_out() {
        let mut bus = flaky(0, BusErrorKind::Bus);
        let mut buf = [0u8; 1];
        assert_eq!(
            block_on(bus.write_read(0x78, &[0xfe], &mut buf)),
            Err(BusErrorKind::Timeout)
        );
        assert_eq!(bus.into_inner().calls, 6);
    }

    #[test]
    fn test_successful_read_passes_data_through() {
        let mut bus = flaky(0, BusErrorKind::Bus);
        let mut buf = [0u8; 3];
        assert_eq!(block_on(bus.read(0x14, &mut buf)), Ok(()));
        assert_eq!(buf, [0xA5; 3]);
    }
}
