//! Per-path integrator state and control flow.
//!
//! Each state slot holds a main transport path and at most one shadow path.
//! A sub-path is either queued on exactly one kernel of its own kind or
//! terminated ([`PathFlow`]), so "queued on nothing while alive" and "queued on
//! two kernels" cannot be represented.
//!
//! Kernels move paths with three operations, each keeping the queue counters in
//! step with the slot:
//!
//! - INIT(next): a terminated slot becomes queued on `next`
//! - NEXT(current, next): the only way to move between kernels
//! - TERMINATE(current): the path leaves the batch
//!
//! Violations (wrong current kernel, edge outside the kernel graph, INIT on a
//! live path) are programming errors in kernels and panic.

use super::queue_counter::KernelQueueCounters;
use super::random::PathRng;
use super::types::{MainKernel, PathKernel, ShadowKernel};
use crate::scene::Intersection;
use crate::util::{Ray, UVec2, Vec3};

/// Liveness and queued kernel of one sub-path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFlow<K> {
    Queued(K),
    Terminated,
}

impl<K> Default for PathFlow<K> {
    fn default() -> Self {
        PathFlow::Terminated
    }
}

impl<K: Copy> PathFlow<K> {
    #[inline]
    pub fn is_alive(&self) -> bool {
        matches!(self, PathFlow::Queued(_))
    }

    #[inline]
    pub fn queued(&self) -> Option<K> {
        match *self {
            PathFlow::Queued(k) => Some(k),
            PathFlow::Terminated => None,
        }
    }
}

/// One control-flow event, recorded when path history is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEvent {
    Init(PathKernel),
    Next { from: PathKernel, to: PathKernel },
    Terminate(PathKernel),
}

/// Main transport path.
#[derive(Debug, Clone, Default)]
pub struct MainPath {
    pub flow: PathFlow<MainKernel>,
    /// Pixel in buffer coordinates.
    pub pixel: UVec2,
    pub sample: u32,
    pub rng: PathRng,
    pub ray: Ray,
    pub throughput: Vec3,
    /// Accumulated radiance for this camera sample.
    pub radiance: Vec3,
    /// Number of scatter events so far.
    pub bounce: u32,
    /// Result of the last intersect kernel.
    pub isect: Option<Intersection>,
    pub exiting_subsurface: bool,
}

/// Next-event-estimation shadow path.
#[derive(Debug, Clone, Default)]
pub struct ShadowPath {
    pub flow: PathFlow<ShadowKernel>,
    pub ray: Ray,
    /// Radiance added to the parent if the ray is unoccluded.
    pub contribution: Vec3,
}

/// One entry of the integrator state array.
#[derive(Debug, Clone, Default)]
pub struct PathSlot {
    pub main: MainPath,
    pub shadow: ShadowPath,
    /// Control-flow log; `None` unless history recording is enabled.
    pub history: Option<Vec<PathEvent>>,
}

impl PathSlot {
    /// Empty slot, optionally recording its control flow.
    pub fn new(record_history: bool) -> Self {
        Self {
            history: record_history.then(Vec::new),
            ..Default::default()
        }
    }

    /// Both sub-paths terminated: the slot may be reused.
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.main.flow.is_alive() && !self.shadow.flow.is_alive()
    }

    /// Number of live sub-paths (0, 1 or 2).
    #[inline]
    pub fn num_alive(&self) -> u32 {
        self.main.flow.is_alive() as u32 + self.shadow.flow.is_alive() as u32
    }

    /// Whether either sub-path is queued on `kernel`.
    pub fn is_queued_on(&self, kernel: PathKernel) -> bool {
        match (kernel.as_main(), kernel.as_shadow()) {
            (Some(k), _) => self.main.flow == PathFlow::Queued(k),
            (_, Some(k)) => self.shadow.flow == PathFlow::Queued(k),
            _ => false,
        }
    }

    /// Reset for reuse; keeps the history buffer allocation.
    pub fn clear(&mut self) {
        let history = self.history.take().map(|mut h| {
            h.clear();
            h
        });
        *self = Self { history, ..Default::default() };
    }

    #[inline]
    fn record(&mut self, event: PathEvent) {
        if let Some(history) = self.history.as_mut() {
            history.push(event);
        }
    }

    pub fn path_init(&mut self, counters: &KernelQueueCounters, next: MainKernel) {
        assert!(
            !self.main.flow.is_alive(),
            "INIT({}) on a live path queued on {:?}",
            PathKernel::from(next),
            self.main.flow
        );
        counters.add(next.into());
        self.main.flow = PathFlow::Queued(next);
        self.record(PathEvent::Init(next.into()));
    }

    pub fn path_next(&mut self, counters: &KernelQueueCounters, current: MainKernel, next: MainKernel) {
        assert_eq!(
            self.main.flow,
            PathFlow::Queued(current),
            "NEXT from {} on a path not queued there",
            PathKernel::from(current)
        );
        assert!(
            current.can_follow(next),
            "illegal kernel edge {} -> {}",
            PathKernel::from(current),
            PathKernel::from(next)
        );
        counters.transfer(current.into(), next.into());
        self.main.flow = PathFlow::Queued(next);
        self.record(PathEvent::Next { from: current.into(), to: next.into() });
    }

    pub fn path_terminate(&mut self, counters: &KernelQueueCounters, current: MainKernel) {
        assert_eq!(
            self.main.flow,
            PathFlow::Queued(current),
            "TERMINATE from {} on a path not queued there",
            PathKernel::from(current)
        );
        assert!(current.can_terminate(), "TERMINATE is not legal from {}", PathKernel::from(current));
        counters.sub(current.into());
        self.main.flow = PathFlow::Terminated;
        self.record(PathEvent::Terminate(current.into()));
    }

    pub fn shadow_path_init(&mut self, counters: &KernelQueueCounters, next: ShadowKernel) {
        assert!(
            !self.shadow.flow.is_alive(),
            "shadow INIT while a shadow path is still queued on {:?}",
            self.shadow.flow
        );
        counters.add(next.into());
        self.shadow.flow = PathFlow::Queued(next);
        self.record(PathEvent::Init(next.into()));
    }

    pub fn shadow_path_next(&mut self, counters: &KernelQueueCounters, current: ShadowKernel, next: ShadowKernel) {
        assert_eq!(
            self.shadow.flow,
            PathFlow::Queued(current),
            "shadow NEXT from {} on a path not queued there",
            PathKernel::from(current)
        );
        assert!(
            current.can_follow(next),
            "illegal shadow kernel edge {} -> {}",
            PathKernel::from(current),
            PathKernel::from(next)
        );
        counters.transfer(current.into(), next.into());
        self.shadow.flow = PathFlow::Queued(next);
        self.record(PathEvent::Next { from: current.into(), to: next.into() });
    }

    pub fn shadow_path_terminate(&mut self, counters: &KernelQueueCounters, current: ShadowKernel) {
        assert_eq!(
            self.shadow.flow,
            PathFlow::Queued(current),
            "shadow TERMINATE from {} on a path not queued there",
            PathKernel::from(current)
        );
        counters.sub(current.into());
        self.shadow.flow = PathFlow::Terminated;
        self.record(PathEvent::Terminate(current.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_lifecycle() {
        let counters = KernelQueueCounters::new();
        let mut slot = PathSlot::new(true);
        assert!(slot.is_free());

        slot.path_init(&counters, MainKernel::IntersectClosest);
        assert!(slot.is_queued_on(PathKernel::IntersectClosest));
        assert_eq!(counters.queued(PathKernel::IntersectClosest), 1);

        slot.path_next(&counters, MainKernel::IntersectClosest, MainKernel::ShadeBackground);
        assert_eq!(counters.queued(PathKernel::IntersectClosest), 0);
        assert_eq!(counters.queued(PathKernel::ShadeBackground), 1);

        slot.path_terminate(&counters, MainKernel::ShadeBackground);
        assert!(slot.is_free());
        assert!(counters.is_drained());

        let history = slot.history.as_ref().unwrap();
        assert_eq!(
            history,
            &vec![
                PathEvent::Init(PathKernel::IntersectClosest),
                PathEvent::Next { from: PathKernel::IntersectClosest, to: PathKernel::ShadeBackground },
                PathEvent::Terminate(PathKernel::ShadeBackground),
            ]
        );
    }

    #[test]
    fn test_shadow_lifecycle_independent() {
        let counters = KernelQueueCounters::new();
        let mut slot = PathSlot::new(false);
        slot.path_init(&counters, MainKernel::IntersectClosest);
        slot.shadow_path_init(&counters, ShadowKernel::IntersectShadow);
        assert_eq!(slot.num_alive(), 2);
        assert_eq!(counters.snapshot().total(), 2);

        slot.shadow_path_next(&counters, ShadowKernel::IntersectShadow, ShadowKernel::ShadeShadow);
        slot.shadow_path_terminate(&counters, ShadowKernel::ShadeShadow);
        assert_eq!(slot.num_alive(), 1);
        assert!(slot.main.flow.is_alive());
        assert!(slot.history.is_none());
    }

    #[test]
    #[should_panic(expected = "INIT")]
    fn test_double_init_panics() {
        let counters = KernelQueueCounters::new();
        let mut slot = PathSlot::new(false);
        slot.path_init(&counters, MainKernel::IntersectClosest);
        slot.path_init(&counters, MainKernel::IntersectClosest);
    }

    #[test]
    #[should_panic(expected = "not queued there")]
    fn test_transition_on_terminated_panics() {
        let counters = KernelQueueCounters::new();
        let mut slot = PathSlot::new(false);
        slot.path_init(&counters, MainKernel::IntersectClosest);
        slot.path_next(&counters, MainKernel::IntersectClosest, MainKernel::ShadeBackground);
        slot.path_terminate(&counters, MainKernel::ShadeBackground);
        slot.path_terminate(&counters, MainKernel::ShadeBackground);
    }

    #[test]
    #[should_panic(expected = "illegal kernel edge")]
    fn test_illegal_edge_panics() {
        let counters = KernelQueueCounters::new();
        let mut slot = PathSlot::new(false);
        slot.path_init(&counters, MainKernel::IntersectClosest);
        slot.path_next(&counters, MainKernel::IntersectClosest, MainKernel::IntersectSubsurface);
    }

    #[test]
    #[should_panic(expected = "shadow INIT")]
    fn test_second_shadow_panics() {
        let counters = KernelQueueCounters::new();
        let mut slot = PathSlot::new(false);
        slot.shadow_path_init(&counters, ShadowKernel::IntersectShadow);
        slot.shadow_path_init(&counters, ShadowKernel::IntersectShadow);
    }

    #[test]
    fn test_clear_keeps_history_buffer() {
        let counters = KernelQueueCounters::new();
        let mut slot = PathSlot::new(true);
        slot.path_init(&counters, MainKernel::IntersectClosest);
        slot.main.radiance = Vec3::ONE;
        slot.clear();
        assert!(slot.is_free());
        assert_eq!(slot.main.radiance, Vec3::ZERO);
        assert_eq!(slot.history, Some(Vec::new()));
    }
}
