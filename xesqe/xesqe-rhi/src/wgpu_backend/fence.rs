use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{Fence, FenceValue, RhiError, RhiResult};

/// Fence driven by queue work-done callbacks. Waiting polls the device until the callback for the
/// requested value has run.
pub struct WgpuFence {
    device: Arc<wgpu::Device>,
    completed: Arc<AtomicU64>,
    signaled: AtomicU64,
}

impl WgpuFence {
    pub(super) fn new(device: Arc<wgpu::Device>, initial: FenceValue) -> Self {
        Self {
            device,
            completed: Arc::new(AtomicU64::new(initial)),
            signaled: AtomicU64::new(initial),
        }
    }

    /// Note that `value` is about to be signaled; returns the counter the callback should bump.
    pub(super) fn arm(&self, value: FenceValue) -> Arc<AtomicU64> {
        self.signaled.fetch_max(value, Ordering::AcqRel);
        self.completed.clone()
    }
}

impl std::fmt::Debug for WgpuFence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuFence")
            .field("completed", &self.completed.load(Ordering::Relaxed))
            .field("signaled", &self.signaled.load(Ordering::Relaxed))
            .finish()
    }
}

impl Fence for WgpuFence {
    fn completed_value(&self) -> FenceValue {
        self.completed.load(Ordering::Acquire)
    }

    fn wait(&self, value: FenceValue) -> RhiResult<()> {
        if self.signaled.load(Ordering::Acquire) < value {
            return Err(RhiError::FenceNeverSignaled(value));
        }
        while self.completed_value() < value {
            let _ = self.device.poll(wgpu::Maintain::Wait);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
