//! Background render worker.
//!
//! The worker thread exclusively owns a [`FaceSession`]. Callers submit
//! mutations and render requests over a channel and read results from a
//! second one. Render requests are coalesced through a [`RenderQueue`], and
//! results computed for an image that has since been replaced are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use image::{DynamicImage, RgbaImage};
use tracing::{debug, warn};

use crate::error::FaceFilterError;
use crate::filter::Filter;
use crate::geometry::{Point, Rect};
use crate::queue::{RenderKey, RenderQueue};
use crate::region::RegionTarget;
use crate::session::FaceSession;

/// Mutations and requests a caller can send to the worker.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    DetectFaces,
    AddDetected(Vec<Rect>),
    AddRegion(Point),
    SetFilter(RegionTarget, Filter),
    SetOvershoot(RegionTarget, f64),
    ApplyToAll { filter: Filter, overshoot: f64 },
    Render(RenderKey),
}

/// Everything the worker reports back. `generation` identifies the image
/// the event belongs to; it grows by one with every reset.
#[derive(Debug)]
pub enum WorkerEvent {
    Rendered {
        key: RenderKey,
        generation: u64,
        image: RgbaImage,
    },
    RegionsChanged {
        generation: u64,
        count: usize,
    },
    Failed {
        key: Option<RenderKey>,
        generation: u64,
        error: FaceFilterError,
    },
}

enum WorkerCmd {
    Session(SessionCommand),
    Reset {
        image: DynamicImage,
        generation: u64,
    },
    Shutdown,
}

/// Handle to the worker thread.
pub struct RenderWorker {
    tx: Sender<WorkerCmd>,
    events: Receiver<WorkerEvent>,
    generation: AtomicU64,
    worker_thread: Option<thread::JoinHandle<()>>,
}

impl RenderWorker {
    /// Move `session` onto a new worker thread.
    pub fn start(session: FaceSession) -> Self {
        let (tx, rx) = unbounded();
        let (event_tx, events) = unbounded();

        let worker_thread = thread::spawn(move || {
            let mut state = WorkerState {
                session,
                queue: RenderQueue::new(),
                generation: 0,
                events: event_tx,
            };
            state.run(rx);
        });

        Self {
            tx,
            events,
            generation: AtomicU64::new(0),
            worker_thread: Some(worker_thread),
        }
    }

    pub fn submit(&self, command: SessionCommand) -> Result<(), FaceFilterError> {
        self.send(WorkerCmd::Session(command))
    }

    pub fn render(&self, key: RenderKey) -> Result<(), FaceFilterError> {
        self.submit(SessionCommand::Render(key))
    }

    /// Replace the session image. Returns the generation that events for the
    /// new image will carry.
    ///
    /// An empty image is refused here, before the generation moves, so the
    /// current image and its queued renders stay live.
    pub fn reset(&self, image: DynamicImage) -> Result<u64, FaceFilterError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FaceFilterError::EmptyImage);
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.send(WorkerCmd::Reset { image, generation })?;
        Ok(generation)
    }

    /// Generation of the most recently submitted image.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Stop the worker and wait for it. Pending renders are abandoned.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(WorkerCmd::Shutdown);
        if let Some(handle) = self.worker_thread.take() {
            if handle.join().is_err() {
                warn!("render worker panicked");
            }
        }
    }

    fn send(&self, cmd: WorkerCmd) -> Result<(), FaceFilterError> {
        self.tx.send(cmd).map_err(|_| FaceFilterError::WorkerStopped)
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WorkerState {
    session: FaceSession,
    queue: RenderQueue,
    generation: u64,
    events: Sender<WorkerEvent>,
}

/// Whether the loop should keep going after a command.
enum Flow {
    Continue,
    Stop,
}

impl WorkerState {
    fn run(&mut self, rx: Receiver<WorkerCmd>) {
        loop {
            if self.queue.is_empty() {
                match rx.recv() {
                    Ok(cmd) => {
                        if let Flow::Stop = self.handle(cmd) {
                            return;
                        }
                    }
                    Err(_) => return,
                }
            }
            if let Flow::Stop = self.drain(&rx) {
                return;
            }

            let Some(key) = self.queue.start_next() else {
                continue;
            };
            let generation = self.generation;
            let result = self.render(key);

            // Pick up anything that arrived while rendering, a reset included
            let flow = self.drain(&rx);
            if let Some(done) = self.queue.finish() {
                debug!(
                    key = ?done,
                    pending = self.queue.len(),
                    superseded = self.queue.superseded(),
                    "render finished"
                );
            }
            self.deliver(key, generation, result);
            if let Flow::Stop = flow {
                return;
            }
        }
    }

    fn drain(&mut self, rx: &Receiver<WorkerCmd>) -> Flow {
        loop {
            match rx.try_recv() {
                Ok(cmd) => {
                    if let Flow::Stop = self.handle(cmd) {
                        return Flow::Stop;
                    }
                }
                Err(TryRecvError::Empty) => return Flow::Continue,
                Err(TryRecvError::Disconnected) => return Flow::Stop,
            }
        }
    }

    fn handle(&mut self, cmd: WorkerCmd) -> Flow {
        match cmd {
            WorkerCmd::Shutdown => return Flow::Stop,
            WorkerCmd::Reset { image, generation } => {
                self.queue.clear();
                match self.session.reset(image) {
                    Ok(()) => self.generation = generation,
                    Err(error) => self.fail(None, error),
                }
            }
            WorkerCmd::Session(command) => self.apply(command),
        }
        Flow::Continue
    }

    fn apply(&mut self, command: SessionCommand) {
        let outcome = match command {
            SessionCommand::Render(key) => {
                if !self.queue.push(key) {
                    debug!(
                        ?key,
                        in_flight = ?self.queue.in_flight(),
                        superseded = self.queue.superseded(),
                        "render request coalesced"
                    );
                }
                return;
            }
            SessionCommand::DetectFaces => self.session.detect_faces().map(|_| true),
            SessionCommand::AddDetected(boxes) => self.session.add_detected(boxes).map(|_| true),
            SessionCommand::AddRegion(point) => self.session.add_region(point).map(|_| true),
            SessionCommand::SetFilter(target, filter) => self
                .session
                .set_filter(target, filter)
                .map(|()| self.invalidate(target)),
            SessionCommand::SetOvershoot(target, overshoot) => self
                .session
                .set_overshoot(target, overshoot)
                .map(|()| self.invalidate(target)),
            SessionCommand::ApplyToAll { filter, overshoot } => self
                .session
                .apply_to_all(filter, overshoot)
                .map(|()| self.invalidate(RegionTarget::All)),
        };

        match outcome {
            Ok(true) => {
                let _ = self.events.send(WorkerEvent::RegionsChanged {
                    generation: self.generation,
                    count: self.session.len(),
                });
            }
            Ok(false) => {}
            Err(error) => self.fail(None, error),
        }
    }

    /// Drop cached previews touched by a mutation. Returns `false`: the
    /// region list itself did not change.
    fn invalidate(&mut self, target: RegionTarget) -> bool {
        match target {
            RegionTarget::Index(index) => self.session.invalidate_preview(index),
            RegionTarget::All => self.session.invalidate_previews(),
        }
        false
    }

    fn render(&mut self, key: RenderKey) -> Result<RgbaImage, FaceFilterError> {
        debug!(?key, generation = self.generation, "rendering");
        match key {
            RenderKey::Result => self.session.render_result(),
            RenderKey::Overview => self.session.render_overview(),
            RenderKey::Preview(index) => self.session.render_preview(index),
        }
    }

    fn deliver(&self, key: RenderKey, generation: u64, result: Result<RgbaImage, FaceFilterError>) {
        if generation != self.generation {
            warn!(?key, generation, current = self.generation, "discarding stale render");
            return;
        }
        match result {
            Ok(image) => {
                let _ = self.events.send(WorkerEvent::Rendered {
                    key,
                    generation,
                    image,
                });
            }
            Err(error) => self.fail(Some(key), error),
        }
    }

    fn fail(&self, key: Option<RenderKey>, error: FaceFilterError) {
        warn!(?key, %error, "worker command failed");
        let _ = self.events.send(WorkerEvent::Failed {
            key,
            generation: self.generation,
            error,
        });
    }
}
