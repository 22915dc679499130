//! Touch input service loop body

use fpdlink_protocol::ReportError;

use super::pipeline::{Delivery, ReportPipeline};
use super::session::TouchSession;
use crate::config::TouchConfig;
use crate::traits::input::{InputCapabilities, InputSink};
use crate::traits::source::TouchSource;

/// What one service step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Report forwarded with this many points
    Forwarded(usize),
    /// Synthetic release forwarded
    SyntheticRelease,
    /// Duplicate dropped
    Suppressed,
    /// Frame failed validation, nothing sent to the sink
    Rejected(ReportError),
}

/// Errors that stop a service step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceError<E, K> {
    /// Report source failed
    Source(E),
    /// Input sink failed
    Sink(K),
    /// Step called before `start` or after `stop`
    Unregistered,
}

/// A report source wired to an input sink through the pipeline
pub struct TouchService<Src: TouchSource, S: InputSink> {
    source: Src,
    pipeline: ReportPipeline,
    session: TouchSession<S>,
}

impl<Src: TouchSource, S: InputSink> TouchService<Src, S> {
    pub fn new(source: Src, sink: S, config: &TouchConfig) -> Self {
        let caps = InputCapabilities::for_panel(&config.panel, config.revert);
        Self {
            source,
            pipeline: ReportPipeline::new(config),
            session: TouchSession::new(sink, caps),
        }
    }

    /// Register the input device
    pub fn start(&mut self) -> Result<(), ServiceError<Src::Error, S::Error>> {
        self.session.register().map_err(ServiceError::Sink)
    }

    /// Fetch one report and deliver it
    pub async fn step(&mut self) -> Result<Outcome, ServiceError<Src::Error, S::Error>> {
        if !self.session.is_registered() {
            return Err(ServiceError::Unregistered);
        }

        let raw = self
            .source
            .fetch_next_report()
            .await
            .map_err(ServiceError::Source)?;

        match self.pipeline.process(&raw) {
            Err(e) => Ok(Outcome::Rejected(e)),
            Ok(Delivery::Suppressed) => Ok(Outcome::Suppressed),
            Ok(Delivery::Forward(report)) => self
                .session
                .forward(&report)
                .map(Outcome::Forwarded)
                .map_err(ServiceError::Sink),
            Ok(Delivery::SyntheticRelease(report)) => self
                .session
                .forward_release(&report)
                .map(|_| Outcome::SyntheticRelease)
                .map_err(ServiceError::Sink),
        }
    }

    /// Lift remaining contacts and unregister
    pub fn stop(&mut self) -> Result<(), ServiceError<Src::Error, S::Error>> {
        self.pipeline.reset();
        self.session.shutdown().map_err(ServiceError::Sink)
    }

    pub fn source_mut(&mut self) -> &mut Src {
        &mut self.source
    }

    pub fn session(&self) -> &TouchSession<S> {
        &self.session
    }
}
