//! Worker-thread render loop driven by surface lifecycle callbacks.
//!
//! `on_available` starts a worker, `on_resized` resizes the shared surface and
//! `on_destroyed` cancels the worker without waiting for it. Each run gets its
//! own cancellation token, so a restarted loop never observes a stale stop flag.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::canvas::Canvas;
use super::RenderError;

/// Default minimum spacing between frames.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(15);

/// Remaining time that is spun through with `yield_now` instead of slept.
const SPIN_WINDOW: Duration = Duration::from_millis(1);

const WORKER_NAME: &str = "linewave-render";

/// A host-provided drawable surface.
pub trait DisplaySurface: Send + 'static {
    type Buffer: Canvas;

    /// Locks a buffer for drawing the next frame.
    ///
    /// # Errors
    /// - `RenderError::SurfaceUnavailable` once the surface has been released
    fn acquire_buffer(&mut self) -> Result<Self::Buffer, RenderError>;

    /// Presents a buffer obtained from [`DisplaySurface::acquire_buffer`].
    fn present_buffer(&mut self, buffer: Self::Buffer) -> Result<(), RenderError>;

    /// Applies new host dimensions; later buffers use them.
    fn resize(&mut self, width: u32, height: u32);

    /// Tears the surface down. Every later acquisition fails.
    fn release(&mut self);
}

/// Draws one frame into a canvas.
pub trait FrameRenderer: Send + 'static {
    fn draw_frame(&mut self, canvas: &mut dyn Canvas, elapsed_millis: u64)
        -> Result<(), RenderError>;
}

/// Lifecycle of a render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    /// Cancelled; the worker is finishing its in-flight frame.
    Stopping,
}

#[derive(Debug, Default)]
struct FrameCounters {
    presented: AtomicU64,
    dropped: AtomicU64,
}

struct Run {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Drives a [`FrameRenderer`] against a [`DisplaySurface`] on a dedicated thread.
pub struct RenderLoop<S, R> {
    surface: Arc<Mutex<S>>,
    renderer: Arc<Mutex<R>>,
    frame_interval: Duration,
    counters: Arc<FrameCounters>,
    run: Option<Run>,
}

impl<S: DisplaySurface, R: FrameRenderer> RenderLoop<S, R> {
    pub fn new(surface: S, renderer: R, frame_interval: Duration) -> Self {
        Self {
            surface: Arc::new(Mutex::new(surface)),
            renderer: Arc::new(Mutex::new(renderer)),
            frame_interval,
            counters: Arc::new(FrameCounters::default()),
            run: None,
        }
    }

    /// Shared surface handle; lock it to release or inspect the surface.
    pub fn surface(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.surface)
    }

    /// Shared renderer handle, e.g. for adding lines while running.
    pub fn renderer(&self) -> Arc<Mutex<R>> {
        Arc::clone(&self.renderer)
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn frames_presented(&self) -> u64 {
        self.counters.presented.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> LoopState {
        match &self.run {
            None => LoopState::Idle,
            Some(run) if run.handle.is_finished() => LoopState::Idle,
            Some(run) if run.cancel.load(Ordering::Acquire) => LoopState::Stopping,
            Some(_) => LoopState::Running,
        }
    }

    /// The surface became drawable: resize it and start a worker.
    ///
    /// Ignored while a worker is already running.
    ///
    /// # Errors
    /// - If the worker thread cannot be spawned
    pub fn on_available(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if self.state() == LoopState::Running {
            tracing::debug!("Render loop already running, ignoring surface availability");
            return Ok(());
        }

        lock(&self.surface).resize(width, height);

        let cancel = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            surface: Arc::clone(&self.surface),
            renderer: Arc::clone(&self.renderer),
            counters: Arc::clone(&self.counters),
            cancel: Arc::clone(&cancel),
            frame_interval: self.frame_interval,
            start: Instant::now(),
        };

        let handle = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || worker.run())
            .map_err(RenderError::Spawn)?;

        tracing::info!(
            "Render loop started on {}x{} surface ({:?} frame interval)",
            width,
            height,
            self.frame_interval
        );
        self.run = Some(Run { cancel, handle });
        Ok(())
    }

    /// The host resized the surface.
    pub fn on_resized(&self, width: u32, height: u32) {
        tracing::debug!("Surface resized to {}x{}", width, height);
        lock(&self.surface).resize(width, height);
    }

    /// The surface is going away: cancel the worker and return at once.
    ///
    /// The worker stops after its in-flight frame. Callers that tear the surface
    /// down afterwards should lock it and call [`DisplaySurface::release`].
    pub fn on_destroyed(&self) {
        if let Some(run) = &self.run {
            run.cancel.store(true, Ordering::Release);
            tracing::info!(
                "Render loop cancelled after {} frames ({} dropped)",
                self.frames_presented(),
                self.frames_dropped()
            );
        }
    }

    /// Cancels the worker, then releases the surface once the in-flight frame
    /// (if any) has been presented.
    pub fn shutdown(&self) {
        self.on_destroyed();
        lock(&self.surface).release();
    }
}

impl<S, R> Drop for RenderLoop<S, R> {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.cancel.store(true, Ordering::Release);
        }
    }
}

/// State moved onto the worker thread for one run.
struct Worker<S, R> {
    surface: Arc<Mutex<S>>,
    renderer: Arc<Mutex<R>>,
    counters: Arc<FrameCounters>,
    cancel: Arc<AtomicBool>,
    frame_interval: Duration,
    start: Instant,
}

impl<S: DisplaySurface, R: FrameRenderer> Worker<S, R> {
    fn run(self) {
        tracing::debug!("Render worker started");

        while !self.cancel.load(Ordering::Acquire) {
            let frame_start = Instant::now();
            let elapsed_millis =
                u64::try_from(frame_start.duration_since(self.start).as_millis()).unwrap_or(u64::MAX);

            // a panicking renderer poisons its mutex; `lock` recovers it next frame
            match panic::catch_unwind(AssertUnwindSafe(|| self.frame(elapsed_millis))) {
                Ok(Ok(())) => {
                    self.counters.presented.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Dropped frame at {}ms: {}", elapsed_millis, e);
                }
                Err(payload) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        "Dropped frame at {}ms: renderer panicked: {}",
                        elapsed_millis,
                        panic_message(payload.as_ref())
                    );
                }
            }

            pace_until(frame_start + self.frame_interval);
        }

        tracing::debug!("Render worker exited");
    }

    fn frame(&self, elapsed_millis: u64) -> Result<(), RenderError> {
        let mut surface = lock(&self.surface);
        let mut buffer = surface.acquire_buffer()?;
        lock(&self.renderer).draw_frame(&mut buffer, elapsed_millis)?;
        surface.present_buffer(buffer)
    }
}

/// Blocks until `deadline`: sleeps for most of the wait, then yields through
/// the last millisecond.
pub fn pace_until(deadline: Instant) {
    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
        return;
    };
    if remaining > SPIN_WINDOW {
        thread::sleep(remaining - SPIN_WINDOW);
    }
    while Instant::now() < deadline {
        thread::yield_now();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::DisplayList;
    use crate::wave::color::Rgb;
    use std::sync::mpsc;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Records presented frames; optionally fails every `fail_every`-th acquisition.
    struct MemorySurface {
        size: (u32, u32),
        released: bool,
        acquisitions: u64,
        fail_every: Option<u64>,
        presented: Arc<Mutex<Vec<DisplayList>>>,
    }

    impl MemorySurface {
        fn new() -> (Self, Arc<Mutex<Vec<DisplayList>>>) {
            let presented = Arc::new(Mutex::new(Vec::new()));
            let surface = Self {
                size: (0, 0),
                released: false,
                acquisitions: 0,
                fail_every: None,
                presented: Arc::clone(&presented),
            };
            (surface, presented)
        }
    }

    impl DisplaySurface for MemorySurface {
        type Buffer = DisplayList;

        fn acquire_buffer(&mut self) -> Result<DisplayList, RenderError> {
            if self.released {
                return Err(RenderError::SurfaceUnavailable);
            }
            self.acquisitions += 1;
            if let Some(n) = self.fail_every {
                if self.acquisitions % n == 0 {
                    return Err(RenderError::SurfaceUnavailable);
                }
            }
            Ok(DisplayList::new(self.size.0 as f32, self.size.1 as f32))
        }

        fn present_buffer(&mut self, buffer: DisplayList) -> Result<(), RenderError> {
            self.presented.lock().unwrap().push(buffer);
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    /// Hands every present to the test and blocks until it is acknowledged.
    struct RendezvousSurface {
        presents: mpsc::Sender<()>,
        acks: mpsc::Receiver<()>,
    }

    impl DisplaySurface for RendezvousSurface {
        type Buffer = DisplayList;

        fn acquire_buffer(&mut self) -> Result<DisplayList, RenderError> {
            Ok(DisplayList::new(10.0, 10.0))
        }

        fn present_buffer(&mut self, _buffer: DisplayList) -> Result<(), RenderError> {
            let _ = self.presents.send(());
            // a dropped ack sender lets any extra frame through
            let _ = self.acks.recv_timeout(TIMEOUT);
            Ok(())
        }

        fn resize(&mut self, _width: u32, _height: u32) {}

        fn release(&mut self) {}
    }

    /// Fills the canvas and remembers every elapsed time it was asked to draw.
    #[derive(Default)]
    struct TimelineRenderer {
        frames: Arc<Mutex<Vec<(u64, (f32, f32))>>>,
    }

    impl FrameRenderer for TimelineRenderer {
        fn draw_frame(
            &mut self,
            canvas: &mut dyn Canvas,
            elapsed_millis: u64,
        ) -> Result<(), RenderError> {
            canvas.fill(Rgb::WHITE);
            self.frames
                .lock()
                .unwrap()
                .push((elapsed_millis, canvas.size()));
            Ok(())
        }
    }

    /// Panics while drawing every other frame.
    #[derive(Default)]
    struct FlakyRenderer {
        calls: u64,
    }

    impl FrameRenderer for FlakyRenderer {
        fn draw_frame(
            &mut self,
            canvas: &mut dyn Canvas,
            _elapsed_millis: u64,
        ) -> Result<(), RenderError> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                panic!("renderer failed on call {}", self.calls);
            }
            canvas.fill(Rgb::WHITE);
            Ok(())
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + TIMEOUT;
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_starts_idle_and_runs_after_available() {
        let (surface, presented) = MemorySurface::new();
        let mut render_loop =
            RenderLoop::new(surface, TimelineRenderer::default(), Duration::from_millis(2));
        assert_eq!(render_loop.state(), LoopState::Idle);

        render_loop.on_available(40, 20).unwrap();
        assert_eq!(render_loop.state(), LoopState::Running);
        wait_for(|| presented.lock().unwrap().len() >= 3);

        let first = presented.lock().unwrap()[0].clone();
        assert_eq!(first.size(), (40.0, 20.0));
        assert_eq!(first.background(), Some(Rgb::WHITE));

        render_loop.on_destroyed();
        wait_for(|| render_loop.state() == LoopState::Idle);
    }

    #[test]
    fn test_stop_after_n_frames_presents_between_one_and_n_plus_one() {
        const N: usize = 4;
        let (present_tx, present_rx) = mpsc::channel();
        let (ack_tx, ack_rx) = mpsc::channel();
        let surface = RendezvousSurface {
            presents: present_tx,
            acks: ack_rx,
        };
        let mut render_loop =
            RenderLoop::new(surface, TimelineRenderer::default(), Duration::from_millis(1));
        render_loop.on_available(10, 10).unwrap();

        for i in 1..=N {
            present_rx.recv_timeout(TIMEOUT).unwrap();
            if i == N {
                // the worker is blocked inside present; destroy must not wait for it
                render_loop.on_destroyed();
                assert_eq!(render_loop.state(), LoopState::Stopping);
            }
            ack_tx.send(()).unwrap();
        }
        drop(ack_tx);

        wait_for(|| render_loop.state() == LoopState::Idle);
        let presents = N + present_rx.try_iter().count();
        assert!((1..=N + 1).contains(&presents), "presented {presents} frames");
    }

    #[test]
    fn test_frames_are_spaced_by_the_interval() {
        let (surface, _) = MemorySurface::new();
        let renderer = TimelineRenderer::default();
        let frames = Arc::clone(&renderer.frames);
        let mut render_loop = RenderLoop::new(surface, renderer, Duration::from_millis(20));

        render_loop.on_available(10, 10).unwrap();
        wait_for(|| frames.lock().unwrap().len() >= 4);
        render_loop.on_destroyed();

        let frames = frames.lock().unwrap().clone();
        for pair in frames.windows(2) {
            assert!(pair[1].0 >= pair[0].0 + 19, "frames too close: {pair:?}");
        }
    }

    #[test]
    fn test_failed_frames_are_dropped_and_the_loop_continues() {
        let (mut surface, presented) = MemorySurface::new();
        surface.fail_every = Some(2);
        let mut render_loop =
            RenderLoop::new(surface, TimelineRenderer::default(), Duration::from_millis(1));

        render_loop.on_available(10, 10).unwrap();
        wait_for(|| render_loop.frames_dropped() >= 3 && render_loop.frames_presented() >= 3);
        assert_eq!(render_loop.state(), LoopState::Running);
        assert!(presented.lock().unwrap().len() >= 3);

        render_loop.on_destroyed();
    }

    #[test]
    fn test_renderer_panics_are_dropped_frames() {
        let (surface, presented) = MemorySurface::new();
        let mut render_loop =
            RenderLoop::new(surface, FlakyRenderer::default(), Duration::from_millis(1));

        render_loop.on_available(10, 10).unwrap();
        wait_for(|| render_loop.frames_dropped() >= 3 && render_loop.frames_presented() >= 3);
        assert_eq!(render_loop.state(), LoopState::Running);
        assert!(presented.lock().unwrap().len() >= 3);

        render_loop.on_destroyed();
        wait_for(|| render_loop.state() == LoopState::Idle);
        assert!(render_loop.renderer().lock().is_err(), "renderer mutex was poisoned");
    }

    #[test]
    fn test_panic_message_reads_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_resize_reaches_the_next_buffer() {
        let (surface, _) = MemorySurface::new();
        let renderer = TimelineRenderer::default();
        let frames = Arc::clone(&renderer.frames);
        let mut render_loop = RenderLoop::new(surface, renderer, Duration::from_millis(1));

        render_loop.on_available(10, 10).unwrap();
        render_loop.on_resized(64, 32);
        wait_for(|| {
            frames
                .lock()
                .unwrap()
                .last()
                .is_some_and(|(_, size)| *size == (64.0, 32.0))
        });
        render_loop.on_destroyed();
    }

    #[test]
    fn test_available_twice_keeps_a_single_run() {
        let (surface, _) = MemorySurface::new();
        let mut render_loop =
            RenderLoop::new(surface, TimelineRenderer::default(), Duration::from_millis(1));

        render_loop.on_available(10, 10).unwrap();
        render_loop.on_available(99, 99).unwrap();
        assert_eq!(render_loop.state(), LoopState::Running);
        assert_eq!(render_loop.surface().lock().unwrap().size, (10, 10));
        render_loop.on_destroyed();
    }

    #[test]
    fn test_shutdown_releases_the_surface_and_restart_gets_a_fresh_token() {
        let (surface, presented) = MemorySurface::new();
        let mut render_loop =
            RenderLoop::new(surface, TimelineRenderer::default(), Duration::from_millis(1));

        render_loop.on_available(10, 10).unwrap();
        wait_for(|| !presented.lock().unwrap().is_empty());
        render_loop.shutdown();
        assert!(render_loop.surface().lock().unwrap().released);
        wait_for(|| render_loop.state() == LoopState::Idle);

        render_loop.surface().lock().unwrap().released = false;
        let before = render_loop.frames_presented();
        render_loop.on_available(10, 10).unwrap();
        assert_eq!(render_loop.state(), LoopState::Running);
        wait_for(|| render_loop.frames_presented() > before);
        render_loop.on_destroyed();
    }

    #[test]
    fn test_pace_until_waits_for_the_deadline() {
        let start = Instant::now();
        pace_until(start + Duration::from_millis(5));
        assert!(start.elapsed() >= Duration::from_millis(5));

        let late = Instant::now();
        pace_until(late - Duration::from_millis(1));
        assert!(late.elapsed() < Duration::from_millis(50));
    }
}
