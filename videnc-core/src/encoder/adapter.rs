//! Generic lifecycle adapter over a [`NativeBackend`]

use tracing::{debug, error, info, trace, warn};

use super::{EncoderState, VideoEncoder};
use crate::backend::{NativeBackend, NativeSession};
use crate::error::{EncoderError, Operation, Result, ResultExt};
use crate::frame::{Bitstream, I420Layout};
use crate::types::EncodeParams;
use crate::validate::validate;

/// Owns one native session and enforces the lifecycle state machine
///
/// A failed reset never leaves a native context behind. When the reset was
/// triggered from `encode_one_frame`, the adapter stays in
/// [`EncoderState::PendingReset`] and every later encode retries it. `reset_encoder`, `stop_encoder` and
/// `destroy_encoder` leave that state explicitly.
pub struct LifecycleAdapter<B: NativeBackend> {
    backend: B,
    state: EncoderState,
    /// Most recently accepted parameters
    params: Option<EncodeParams>,
    /// Parameters the live session was opened with
    active: Option<EncodeParams>,
    /// Input layout of the live session
    layout: Option<I420Layout>,
    session: Option<B::Session>,
}

impl<B: NativeBackend> LifecycleAdapter<B> {
    pub fn new(backend: B) -> Self {
        debug!("{} encoder constructed", backend.name());
        Self {
            backend,
            state: EncoderState::Uninitialized,
            params: None,
            active: None,
            layout: None,
            session: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Expected input length of the live session, if any
    pub fn frame_size(&self) -> Option<usize> {
        self.layout.map(|l| l.frame_size())
    }

    fn invalid_state(&self) -> EncoderError {
        EncoderError::InvalidState { state: self.state }
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            drop(session);
            debug!("{} native context released", self.backend.name());
        }
        self.active = None;
        self.layout = None;
    }

    fn try_init(&mut self, params: &EncodeParams) -> Result<()> {
        if !self.state.can_init() {
            return Err(self.invalid_state());
        }
        validate(params, self.backend.bounds())?;
        self.backend.bind()?;

        self.release();
        let session = self.backend.open(params)?;
        self.session = Some(session);
        self.active = Some(*params);
        self.layout = Some(I420Layout::new(params.width, params.height));
        self.params = Some(*params);
        self.state = EncoderState::Initialized;
        Ok(())
    }

    fn try_start(&mut self) -> Result<()> {
        if self.state != EncoderState::Initialized {
            return Err(self.invalid_state());
        }
        let state = self.state;
        self.session
            .as_mut()
            .ok_or(EncoderError::InvalidState { state })?
            .start()?;

        self.state = if self.params == self.active {
            EncoderState::Started
        } else {
            EncoderState::PendingReset
        };
        Ok(())
    }

    /// Destroy, then init with the current parameters, then start
    ///
    /// On failure the state is `Destroyed` and no session is held.
    fn reinit(&mut self) -> Result<()> {
        let params = self.params.ok_or(EncoderError::NoParams)?;
        self.release();
        self.state = EncoderState::Destroyed;

        let result = self
            .init_encoder(&params)
            .and_then(|()| self.start_encoder());
        if result.is_err() {
            self.release();
            self.state = EncoderState::Destroyed;
        }
        result
    }

    fn try_encode(&mut self, input: &[u8]) -> Result<Bitstream<'_>> {
        if !self.state.accepts_frames() {
            return Err(self.invalid_state());
        }
        let params = self.params.ok_or(EncoderError::NoParams)?;

        // Sized against the parameters this frame will be encoded with.
        let layout = I420Layout::new(params.width, params.height);
        let planes = layout.split(input)?;

        if self.state == EncoderState::PendingReset {
            info!("applying new encode params before encoding: {}", params);
            if let Err(e) = self.reinit().during(Operation::Reset) {
                self.state = EncoderState::PendingReset;
                return Err(e);
            }
        }

        let state = self.state;
        let bitstream = self
            .session
            .as_mut()
            .ok_or(EncoderError::InvalidState { state })?
            .encode(&planes)?;

        trace!(
            "encoded frame: {} bytes, keyframe={}",
            bitstream.len(),
            bitstream.is_keyframe()
        );
        Ok(bitstream)
    }

    fn try_stop(&mut self) -> Result<()> {
        if !self.state.accepts_frames() {
            return Err(self.invalid_state());
        }
        if let Some(session) = self.session.as_mut() {
            session.stop()?;
        }
        self.state = EncoderState::Stopped;
        Ok(())
    }

    fn try_force_key_frame(&mut self) -> Result<()> {
        let state = self.state;
        self.session
            .as_mut()
            .ok_or(EncoderError::InvalidState { state })?
            .force_key_frame()
    }

    fn try_set_params(&mut self, params: &EncodeParams) -> Result<()> {
        validate(params, self.backend.bounds())?;
        self.params = Some(*params);

        match self.state {
            EncoderState::Started => {
                self.state = EncoderState::PendingReset;
                info!("new encode params accepted, reset armed: {}", params);
            }
            EncoderState::PendingReset
                if self.session.is_some() && self.active == self.params =>
            {
                self.state = EncoderState::Started;
                info!("encode params reverted to the active configuration, reset disarmed");
            }
            _ => info!("new encode params accepted: {}", params),
        }
        Ok(())
    }
}

fn log_failure<T>(backend: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!("{}: {}", backend, e);
    }
    result
}

impl<B: NativeBackend> VideoEncoder for LifecycleAdapter<B> {
    fn init_encoder(&mut self, params: &EncodeParams) -> Result<()> {
        let name = self.backend.name();
        log_failure(name, self.try_init(params).during(Operation::Init))?;
        info!("{} init encoder success: {}", name, params);
        Ok(())
    }

    fn start_encoder(&mut self) -> Result<()> {
        let name = self.backend.name();
        log_failure(name, self.try_start().during(Operation::Start))?;
        info!("{} start encoder success", name);
        Ok(())
    }

    fn encode_one_frame(&mut self, input: &[u8]) -> Result<Bitstream<'_>> {
        let name = self.backend.name();
        log_failure(name, self.try_encode(input).during(Operation::Encode))
    }

    fn stop_encoder(&mut self) -> Result<()> {
        let name = self.backend.name();
        log_failure(name, self.try_stop().during(Operation::Stop))?;
        info!("{} stop encoder success", name);
        Ok(())
    }

    fn destroy_encoder(&mut self) {
        if self.state == EncoderState::Destroyed {
            debug!("{} encoder already destroyed", self.backend.name());
            return;
        }
        self.release();
        self.state = EncoderState::Destroyed;
        info!("{} destroy encoder success", self.backend.name());
    }

    fn reset_encoder(&mut self) -> Result<()> {
        let name = self.backend.name();
        info!("{} resetting encoder", name);
        log_failure(name, self.reinit().during(Operation::Reset))?;
        info!("{} reset encoder success", name);
        Ok(())
    }

    fn force_key_frame(&mut self) -> Result<()> {
        let name = self.backend.name();
        log_failure(
            name,
            self.try_force_key_frame().during(Operation::ForceKeyFrame),
        )?;
        info!("{} force key frame success", name);
        Ok(())
    }

    fn set_encode_params(&mut self, params: &EncodeParams) -> Result<()> {
        if self.params.as_ref() == Some(params) {
            warn!("{} encode params are not changed", self.backend.name());
            return Ok(());
        }
        let name = self.backend.name();
        log_failure(name, self.try_set_params(params).during(Operation::SetParams))
    }

    fn state(&self) -> EncoderState {
        self.state
    }

    fn encode_params(&self) -> Option<EncodeParams> {
        self.params
    }

    fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

impl<B: NativeBackend> Drop for LifecycleAdapter<B> {
    fn drop(&mut self) {
        self.release();
    }
}
