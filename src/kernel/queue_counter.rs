//! Per-kernel queued-path counters.
//!
//! One [`KernelQueueCounters`] belongs to one queue's current batch. Kernel
//! invocations running in parallel within a launch update the same slots, so
//! every update is an atomic fetch-add / fetch-sub. Ordering between launches
//! comes from the queue's `synchronize()` barrier, so relaxed ordering is
//! enough here.

use std::sync::atomic::{AtomicU32, Ordering};

use super::types::PathKernel;

/// Atomic count of queued paths per kernel kind.
#[derive(Debug, Default)]
pub struct KernelQueueCounters {
    num_queued: [AtomicU32; PathKernel::COUNT],
}

impl KernelQueueCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every slot. Only valid between launches.
    pub fn reset(&self) {
        for c in &self.num_queued {
            c.store(0, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn queued(&self, kernel: PathKernel) -> u32 {
        self.num_queued[kernel.index()].load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn add(&self, kernel: PathKernel) {
        self.num_queued[kernel.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn sub(&self, kernel: PathKernel) {
        let prev = self.num_queued[kernel.index()].fetch_sub(1, Ordering::Relaxed);
        assert!(prev > 0, "queue counter underflow on {kernel}");
    }

    /// Move one path's contribution from `from` to `to`.
    #[inline]
    pub(crate) fn transfer(&self, from: PathKernel, to: PathKernel) {
        self.sub(from);
        self.add(to);
    }

    /// Host-side copy of all slots.
    pub fn snapshot(&self) -> QueueCounterSnapshot {
        let mut num_queued = [0u32; PathKernel::COUNT];
        for (dst, src) in num_queued.iter_mut().zip(&self.num_queued) {
            *dst = src.load(Ordering::Relaxed);
        }
        QueueCounterSnapshot { num_queued }
    }

    pub fn is_drained(&self) -> bool {
        self.num_queued.iter().all(|c| c.load(Ordering::Relaxed) == 0)
    }
}

/// Counter values copied from a queue after `synchronize()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounterSnapshot {
    pub num_queued: [u32; PathKernel::COUNT],
}

impl QueueCounterSnapshot {
    #[inline]
    pub fn get(&self, kernel: PathKernel) -> u32 {
        self.num_queued[kernel.index()]
    }

    /// Sum over all kinds: equals the number of alive main and shadow paths.
    pub fn total(&self) -> u64 {
        self.num_queued.iter().map(|&n| n as u64).sum()
    }

    /// All zero: the batch is fully drained.
    pub fn is_empty(&self) -> bool {
        self.num_queued.iter().all(|&n| n == 0)
    }

    /// Queued paths on shadow kernels.
    pub fn num_shadow_queued(&self) -> u32 {
        self.get(PathKernel::IntersectShadow) + self.get(PathKernel::ShadeShadow)
    }

    /// Kernels with queued paths, in slot order.
    pub fn nonzero(&self) -> impl Iterator<Item = (PathKernel, u32)> + '_ {
        PathKernel::ALL
            .iter()
            .map(|&k| (k, self.get(k)))
            .filter(|&(_, n)| n > 0)
    }
}
