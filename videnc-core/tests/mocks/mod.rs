//! Mock infrastructure for testing
//!
//! A scriptable native backend with call counters and failure injection,
//! plus I420 frame generators.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use videnc_core::backend::{NativeBackend, NativeSession};
use videnc_core::{
    Bitstream, EncodeParams, EncoderError, I420Layout, I420Planes, LifecycleAdapter, ParamBounds,
    Result,
};

/// Shared view of everything the mock backend was asked to do
#[derive(Default)]
pub struct MockStats {
    pub binds: AtomicUsize,
    pub opens: AtomicUsize,
    pub starts: AtomicUsize,
    pub encodes: AtomicUsize,
    pub stops: AtomicUsize,
    pub key_requests: AtomicUsize,
    pub releases: AtomicUsize,
    /// Most native sessions alive at the same time
    pub peak_live: AtomicUsize,
    pub fail_bind: AtomicBool,
    pub fail_open: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_encode: AtomicBool,
    /// Parameters of every successful open, in order
    pub opened_with: Mutex<Vec<EncodeParams>>,
}

impl MockStats {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        Self::count(&self.opens)
    }

    pub fn encodes(&self) -> usize {
        Self::count(&self.encodes)
    }

    pub fn releases(&self) -> usize {
        Self::count(&self.releases)
    }

    pub fn live_sessions(&self) -> usize {
        self.opens() - self.releases()
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn last_opened(&self) -> Option<EncodeParams> {
        self.opened_with.lock().unwrap().last().copied()
    }
}

/// Native backend that records calls instead of touching a library
pub struct MockBackend {
    stats: Arc<MockStats>,
    bounds: ParamBounds,
}

impl MockBackend {
    /// Mock with the software encoder's bounds
    pub fn new() -> (Self, Arc<MockStats>) {
        Self::with_bounds(ParamBounds::SOFTWARE_H264)
    }

    pub fn with_bounds(bounds: ParamBounds) -> (Self, Arc<MockStats>) {
        let stats = Arc::new(MockStats::default());
        (
            Self {
                stats: Arc::clone(&stats),
                bounds,
            },
            stats,
        )
    }
}

impl NativeBackend for MockBackend {
    type Session = MockSession;

    fn name(&self) -> &'static str {
        "Mock"
    }

    fn bounds(&self) -> &ParamBounds {
        &self.bounds
    }

    fn bind(&self) -> Result<()> {
        self.stats.binds.fetch_add(1, Ordering::SeqCst);
        if self.stats.fail_bind.load(Ordering::SeqCst) {
            return Err(EncoderError::binding("libmock.so: cannot open shared object file"));
        }
        Ok(())
    }

    fn open(&self, params: &EncodeParams) -> Result<MockSession> {
        if self.stats.fail_open.load(Ordering::SeqCst) {
            return Err(EncoderError::native("mock_open", -2));
        }
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        self.stats
            .peak_live
            .fetch_max(self.stats.live_sessions(), Ordering::SeqCst);
        self.stats.opened_with.lock().unwrap().push(*params);
        Ok(MockSession {
            stats: Arc::clone(&self.stats),
            params: *params,
            output: Vec::new(),
            frames: 0,
            force_key: false,
        })
    }
}

pub struct MockSession {
    stats: Arc<MockStats>,
    params: EncodeParams,
    output: Vec<u8>,
    frames: u64,
    force_key: bool,
}

impl NativeSession for MockSession {
    fn start(&mut self) -> Result<()> {
        if self.stats.fail_start.load(Ordering::SeqCst) {
            return Err(EncoderError::native("mock_start", -4));
        }
        self.stats.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn encode(&mut self, frame: &I420Planes<'_>) -> Result<Bitstream<'_>> {
        if self.stats.fail_encode.load(Ordering::SeqCst) {
            return Err(EncoderError::native("mock_encode", -1));
        }
        self.stats.encodes.fetch_add(1, Ordering::SeqCst);
        assert_eq!(frame.width, self.params.width);
        assert_eq!(frame.height, self.params.height);

        let keyframe = self.force_key || self.frames % self.params.gop_size as u64 == 0;
        self.force_key = false;
        self.frames += 1;

        // Annex-B start code, a slice NAL header, then a few payload bytes.
        self.output.clear();
        self.output.extend_from_slice(&[0, 0, 0, 1]);
        self.output.push(if keyframe { 0x65 } else { 0x41 });
        self.output.extend_from_slice(&self.frames.to_be_bytes());
        self.output.push(frame.y[0]);
        Ok(Bitstream::new(&self.output, keyframe))
    }

    fn stop(&mut self) -> Result<()> {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn force_key_frame(&mut self) -> Result<()> {
        self.stats.key_requests.fetch_add(1, Ordering::SeqCst);
        self.force_key = true;
        Ok(())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Adapter over a fresh mock backend
pub fn mock_encoder() -> (LifecycleAdapter<MockBackend>, Arc<MockStats>) {
    let (backend, stats) = MockBackend::new();
    (LifecycleAdapter::new(backend), stats)
}

/// Parameters used by most lifecycle tests
pub fn default_params() -> EncodeParams {
    EncodeParams::new(1280, 720)
        .with_frame_rate(30)
        .with_bitrate(4_000_000)
        .with_gop_size(60)
}

/// Create an I420 frame with uniform luma and neutral chroma
pub fn create_i420_frame(width: u32, height: u32, luma: u8) -> Vec<u8> {
    let layout = I420Layout::new(width, height);
    let mut data = vec![luma; layout.luma_size()];
    data.resize(layout.frame_size(), 128);
    data
}

/// Create an I420 frame with a diagonal luma gradient
pub fn create_gradient_i420(width: u32, height: u32) -> Vec<u8> {
    let layout = I420Layout::new(width, height);
    let mut data = Vec::with_capacity(layout.frame_size());
    for y in 0..height {
        for x in 0..width {
            data.push((((x + y) * 255) / (width + height).max(1)) as u8);
        }
    }
    data.resize(layout.frame_size(), 128);
    data
}
