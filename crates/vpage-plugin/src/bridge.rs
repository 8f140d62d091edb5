//! Lazily created, close-once headless render instance.
//!
//! ```text
//! Uninitialized --acquire--> Initializing --ok--> Ready --close--> Closed
//!       ^                         |                                  ^
//!       +---------- error --------+                                  |
//!       +------------------------------ close -----------------------+
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Mutex;

use crate::error::BridgeError;
use crate::host::{ModulePipeline, PipelineFactory};

/// Observable lifecycle phase of the headless instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    /// No instance exists yet.
    Uninitialized,
    /// An instance is being created.
    Initializing,
    /// The instance is available.
    Ready,
    /// The instance was closed; no new one will be created.
    Closed,
}

impl BridgePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Closed,
            _ => Self::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initializing => 1,
            Self::Ready => 2,
            Self::Closed => 3,
        }
    }
}

enum Slot {
    Empty,
    Ready(Arc<dyn ModulePipeline>),
    Closed,
}

/// Owner of the headless render instance.
///
/// The instance is created on the first [`acquire`](Self::acquire) and
/// shared by every later call. Creation runs while holding the slot lock,
/// so callers arriving during `Initializing` wait for the same instance
/// instead of creating a second one.
pub struct HeadlessBridge {
    factory: Arc<dyn PipelineFactory>,
    slot: Mutex<Slot>,
    phase: AtomicU8,
}

impl fmt::Debug for HeadlessBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessBridge")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl HeadlessBridge {
    /// Create a bridge that builds instances with `factory`.
    #[must_use]
    pub fn new(factory: Arc<dyn PipelineFactory>) -> Self {
        Self {
            factory,
            slot: Mutex::new(Slot::Empty),
            phase: AtomicU8::new(BridgePhase::Uninitialized.as_u8()),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> BridgePhase {
        BridgePhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn set_phase(&self, phase: BridgePhase) {
        self.phase.store(phase.as_u8(), Ordering::Release);
    }

    /// Get the headless instance, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Closed`] after [`close`](Self::close) and
    /// [`BridgeError::Create`] if creation fails. A failed creation leaves
    /// the bridge uninitialized, so a later call tries again.
    pub async fn acquire(&self) -> Result<Arc<dyn ModulePipeline>, BridgeError> {
        let mut slot = self.slot.lock().await;
        match &*slot {
            Slot::Ready(pipeline) => return Ok(Arc::clone(pipeline)),
            Slot::Closed => return Err(BridgeError::Closed),
            Slot::Empty => {}
        }

        self.set_phase(BridgePhase::Initializing);
        tracing::info!("Starting headless render instance");

        match self.factory.create().await {
            Ok(pipeline) => {
                *slot = Slot::Ready(Arc::clone(&pipeline));
                self.set_phase(BridgePhase::Ready);
                Ok(pipeline)
            }
            Err(e) => {
                self.set_phase(BridgePhase::Uninitialized);
                tracing::error!(error = %e, "Failed to start headless render instance");
                Err(BridgeError::Create(e))
            }
        }
    }

    /// Close the instance if one exists.
    ///
    /// The bridge is `Closed` afterwards even if teardown fails. Repeated
    /// calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Close`] if the instance fails to close.
    pub async fn close(&self) -> Result<(), BridgeError> {
        let mut slot = self.slot.lock().await;
        let previous = std::mem::replace(&mut *slot, Slot::Closed);
        self.set_phase(BridgePhase::Closed);

        match previous {
            Slot::Ready(pipeline) => {
                tracing::info!("Closing headless render instance");
                pipeline.close().await.map_err(BridgeError::Close)
            }
            Slot::Empty | Slot::Closed => Ok(()),
        }
    }
}
