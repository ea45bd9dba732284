//! CPU/GPU frame synchronization
//!
//! Every in-flight frame slot remembers the fence value signalled after its
//! last submission. Before the slot's per-frame resources are overwritten the
//! GPU must have reported that value complete; [`FrameSynchronizer::begin_frame`]
//! blocks until it has.
//!
//! Resources whose lifetime may overlap in-flight GPU work (deleted vertex
//! buffers) are parked in a retirement list and dropped only once the fence
//! passes the value that was current when they were released.

use std::{
    any::Any,
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use log::{debug, trace};

use crate::{config::FRAME_COUNT, error::SyncError};

/// A monotonically increasing GPU completion counter
pub trait GpuFence {
    /// Enqueue a signal of `value` behind all work submitted so far
    fn signal(&mut self, value: u64);

    /// Highest value the GPU has reported complete
    fn completed_value(&self) -> u64;

    /// Block until `value` has completed
    fn wait_for(&mut self, value: u64) -> Result<(), SyncError>;
}

/// [`GpuFence`] over a wgpu queue
///
/// Signalling submits an empty batch and registers a work-done callback that
/// publishes the value. Waiting blocks in `Device::poll` on the matching
/// submission index, so no busy loop is involved.
pub struct QueueFence {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    completed: Arc<AtomicU64>,
    pending: VecDeque<(u64, wgpu::SubmissionIndex)>,
}

impl QueueFence {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            device,
            queue,
            completed: Arc::new(AtomicU64::new(0)),
            pending: VecDeque::with_capacity(FRAME_COUNT + 1),
        }
    }

    fn prune(&mut self) {
        let completed = self.completed.load(Ordering::Acquire);
        while self.pending.front().is_some_and(|(v, _)| *v <= completed) {
            self.pending.pop_front();
        }
    }
}

impl GpuFence for QueueFence {
    fn signal(&mut self, value: u64) {
        let index = self.queue.submit(std::iter::empty());
        let completed = Arc::clone(&self.completed);
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
        self.pending.push_back((value, index));
        self.prune();
    }

    fn completed_value(&self) -> u64 {
        // Drives pending work-done callbacks without blocking
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            debug!("Non-blocking device poll failed: {}", err);
        }
        self.completed.load(Ordering::Acquire)
    }

    fn wait_for(&mut self, value: u64) -> Result<(), SyncError> {
        if self.completed.load(Ordering::Acquire) >= value {
            return Ok(());
        }

        let index = self
            .pending
            .iter()
            .find(|(v, _)| *v >= value)
            .map(|(_, index)| index.clone())
            .ok_or(SyncError::NeverSignalled(value))?;

        self.device
            .poll(wgpu::PollType::WaitForSubmissionIndex(index))
            .map_err(|err| SyncError::Poll(err.to_string()))?;

        // The submission carrying `value` has retired even if its callback has
        // not been observed yet
        self.completed.fetch_max(value, Ordering::AcqRel);
        self.prune();
        Ok(())
    }
}

/// Gates reuse of the per-slot resources of [`FRAME_COUNT`] in-flight frames
pub struct FrameSynchronizer<F> {
    fence: F,
    slot_values: [u64; FRAME_COUNT],
    last_signalled: u64,
    retired: Vec<(u64, Box<dyn Any>)>,
}

impl<F: GpuFence> FrameSynchronizer<F> {
    pub fn new(fence: F) -> Self {
        Self {
            fence,
            slot_values: [0; FRAME_COUNT],
            last_signalled: 0,
            retired: Vec::new(),
        }
    }

    /// Blocks until `slot`'s previous submission has retired
    ///
    /// Once this returns, the slot's command recording and constant buffer
    /// may be overwritten.
    pub fn begin_frame(&mut self, slot: usize) -> Result<(), SyncError> {
        let target = self.slot_values[slot];
        if self.fence.completed_value() < target {
            debug!("Slot {} waiting for fence value {}", slot, target);
            self.fence.wait_for(target)?;
        }
        self.release_retired();
        Ok(())
    }

    /// Records that `slot`'s work has been submitted
    ///
    /// Must only be called after a successful submission for the slot.
    pub fn end_frame(&mut self, slot: usize) {
        let value = self.next_value();
        self.fence.signal(value);
        self.slot_values[slot] = value;
        trace!("Slot {} signalled fence value {}", slot, value);
    }

    /// Signals a fresh value and blocks until the GPU reaches it
    pub fn wait_for_idle(&mut self) -> Result<(), SyncError> {
        let value = self.next_value();
        self.fence.signal(value);
        self.fence.wait_for(value)?;
        debug!("GPU idle at fence value {}", value);
        self.release_retired();
        Ok(())
    }

    /// Keeps `resource` alive until every frame submitted so far has retired
    pub fn defer_release<T: Any>(&mut self, resource: T) {
        let value = self.last_signalled;
        if value == 0 || self.fence.completed_value() >= value {
            drop(resource);
            return;
        }
        trace!("Deferring release until fence value {}", value);
        self.retired.push((value, Box::new(resource)));
    }

    /// Number of resources still waiting for their fence value
    pub fn pending_releases(&self) -> usize {
        self.retired.len()
    }

    /// Last fence value signalled for `slot`
    pub fn slot_value(&self, slot: usize) -> u64 {
        self.slot_values[slot]
    }

    fn next_value(&mut self) -> u64 {
        self.last_signalled += 1;
        self.last_signalled
    }

    fn release_retired(&mut self) {
        if self.retired.is_empty() {
            return;
        }
        let completed = self.fence.completed_value();
        let before = self.retired.len();
        self.retired.retain(|(value, _)| *value > completed);
        let released = before - self.retired.len();
        if released > 0 {
            trace!("Released {} retired resources at fence value {}", released, completed);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
    };

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Signal(u64),
        Wait(u64),
        /// Slot resources overwritten for a frame
        Reset { slot: usize, frame: usize },
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    /// Fence whose GPU only makes progress when waited on, or when the test
    /// advances it by hand
    struct MockFence {
        log: Log,
        completed: Rc<Cell<u64>>,
    }

    impl GpuFence for MockFence {
        fn signal(&mut self, value: u64) {
            self.log.borrow_mut().push(Event::Signal(value));
        }

        fn completed_value(&self) -> u64 {
            self.completed.get()
        }

        fn wait_for(&mut self, value: u64) -> Result<(), SyncError> {
            self.log.borrow_mut().push(Event::Wait(value));
            self.completed.set(self.completed.get().max(value));
            Ok(())
        }
    }

    fn synchronizer() -> (FrameSynchronizer<MockFence>, Log, Rc<Cell<u64>>) {
        let log: Log = Rc::default();
        let completed = Rc::new(Cell::new(0));
        let fence = MockFence {
            log: Rc::clone(&log),
            completed: Rc::clone(&completed),
        };
        (FrameSynchronizer::new(fence), log, completed)
    }

    fn run_frames(sync: &mut FrameSynchronizer<MockFence>, log: &Log, frames: usize) {
        for frame in 0..frames {
            let slot = frame % FRAME_COUNT;
            sync.begin_frame(slot).unwrap();
            log.borrow_mut().push(Event::Reset { slot, frame });
            sync.end_frame(slot);
        }
    }

    #[test]
    fn test_slot_reuse_waits_before_reset() {
        let (mut sync, log, _) = synchronizer();

        run_frames(&mut sync, &log, 4);

        let log = log.borrow();
        for frame in FRAME_COUNT..4 {
            let slot = frame % FRAME_COUNT;
            // Value signalled after frame `frame - FRAME_COUNT` on this slot
            let signalled = (frame - FRAME_COUNT + 1) as u64;
            let wait = log.iter().position(|e| *e == Event::Wait(signalled));
            let reset = log.iter().position(|e| *e == Event::Reset { slot, frame });
            assert!(wait.is_some(), "frame {} never waited", frame);
            assert!(wait < reset, "frame {} reset before its wait", frame);
        }
    }

    #[test]
    fn test_first_use_of_each_slot_does_not_wait() {
        let (mut sync, log, _) = synchronizer();

        run_frames(&mut sync, &log, FRAME_COUNT);

        assert!(!log.borrow().iter().any(|e| matches!(e, Event::Wait(_))));
    }

    #[test]
    fn test_no_wait_when_gpu_already_done() {
        let (mut sync, log, completed) = synchronizer();
        run_frames(&mut sync, &log, FRAME_COUNT);
        completed.set(FRAME_COUNT as u64);
        log.borrow_mut().clear();

        sync.begin_frame(0).unwrap();

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_slot_values_strictly_increase() {
        let (mut sync, log, _) = synchronizer();
        let mut previous = [0u64; FRAME_COUNT];

        for frame in 0..6 {
            let slot = frame % FRAME_COUNT;
            sync.begin_frame(slot).unwrap();
            sync.end_frame(slot);
            assert!(sync.slot_value(slot) > previous[slot]);
            previous[slot] = sync.slot_value(slot);
        }
        assert_eq!(log.borrow().len(), 6 + 4);
    }

    #[test]
    fn test_wait_for_idle_signals_fresh_value() {
        let (mut sync, log, completed) = synchronizer();
        run_frames(&mut sync, &log, 3);
        log.borrow_mut().clear();

        sync.wait_for_idle().unwrap();

        assert_eq!(*log.borrow(), vec![Event::Signal(4), Event::Wait(4)]);
        assert_eq!(completed.get(), 4);
    }

    struct DropFlag(Rc<Cell<bool>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn test_deferred_release_waits_for_fence() {
        let (mut sync, log, completed) = synchronizer();
        run_frames(&mut sync, &log, 2);

        let dropped = Rc::new(Cell::new(false));
        sync.defer_release(DropFlag(Rc::clone(&dropped)));
        assert!(!dropped.get());
        assert_eq!(sync.pending_releases(), 1);

        // Frame 1 retired but the resource was tagged with value 2
        completed.set(1);
        sync.begin_frame(0).unwrap();
        assert!(!dropped.get());

        completed.set(2);
        sync.begin_frame(1).unwrap();
        assert!(dropped.get());
        assert_eq!(sync.pending_releases(), 0);
    }

    #[test]
    fn test_release_before_any_submission_is_immediate() {
        let (mut sync, _, _) = synchronizer();
        let dropped = Rc::new(Cell::new(false));

        sync.defer_release(DropFlag(Rc::clone(&dropped)));

        assert!(dropped.get());
    }

    #[test]
    fn test_wait_for_idle_releases_everything() {
        let (mut sync, log, _) = synchronizer();
        run_frames(&mut sync, &log, 2);
        let dropped = Rc::new(Cell::new(false));
        sync.defer_release(DropFlag(Rc::clone(&dropped)));

        sync.wait_for_idle().unwrap();

        assert!(dropped.get());
    }
}
