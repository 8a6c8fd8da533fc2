//! Device, queue fence and the single command list every frame records into.
//!
//! Work is ordered by one fence counter. `current` is the last value the host signaled; the device
//! reports `completed`. After [`GpuContext::flush`] returns the two are equal and the GPU is idle.

use std::sync::Arc;

use xesqe_rhi::{CommandList, Device, Fence, FenceValue, RhiResult};

pub struct GpuContext {
    device: Arc<dyn Device>,
    fence: Box<dyn Fence>,
    current_fence: FenceValue,
    commands: CommandList,
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("device", &self.device.adapter_name())
            .field("current_fence", &self.current_fence)
            .field("completed_fence", &self.fence.completed_value())
            .finish()
    }
}

impl GpuContext {
    pub fn new(device: Arc<dyn Device>) -> RhiResult<Self> {
        let fence = device.create_fence(0)?;
        Ok(Self {
            device,
            fence,
            current_fence: 0,
            commands: CommandList::new("frame"),
        })
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub fn current_fence(&self) -> FenceValue {
        self.current_fence
    }

    pub fn completed_fence(&self) -> FenceValue {
        self.fence.completed_value()
    }

    /// Reset the command list for recording. Fails while its last submission is still in flight.
    pub fn begin_commands(&mut self) -> RhiResult<&mut CommandList> {
        self.commands.reset(self.fence.completed_value())?;
        Ok(&mut self.commands)
    }

    pub fn commands(&mut self) -> &mut CommandList {
        &mut self.commands
    }

    /// Close and execute the list. Returns the fence value that retires it, which the next
    /// [`flush`](Self::flush) signals.
    pub fn submit(&mut self) -> RhiResult<FenceValue> {
        self.commands.close()?;
        self.device.execute_command_list(&self.commands)?;
        let retire_at = self.current_fence + 1;
        self.commands.mark_submitted(retire_at)?;
        Ok(retire_at)
    }

    /// Signal the next fence value and block until the device reaches it.
    pub fn flush(&mut self) -> RhiResult<()> {
        self.current_fence += 1;
        self.device.signal(self.fence.as_ref(), self.current_fence)?;
        if self.fence.completed_value() < self.current_fence {
            self.fence.wait(self.current_fence)?;
        }
        log::trace!("flushed to fence {}", self.current_fence);
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("final GPU flush failed: {e}");
        }
    }
}
