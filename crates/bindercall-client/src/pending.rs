use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use bindercall_parcel::ParcelReader;

use crate::error::{CallError, Result};

/// A submitted call whose reply has not been collected yet.
///
/// Dropping it does not cancel the call; the result is discarded when it
/// arrives. If the channel stops first, waiting yields
/// [`CallError::Abandoned`].
#[derive(Debug)]
pub struct PendingCall {
    id: u64,
    receiver: Receiver<Result<ParcelReader>>,
}

impl PendingCall {
    pub(crate) fn new(id: u64, receiver: Receiver<Result<ParcelReader>>) -> Self {
        Self { id, receiver }
    }

    /// Correlation id of the call.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the call completes.
    pub fn wait(self) -> Result<ParcelReader> {
        self.receiver.recv().unwrap_or(Err(CallError::Abandoned))
    }

    /// Block for at most `timeout`. `None` means still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<ParcelReader>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(CallError::Abandoned)),
        }
    }

    /// Collect the result if it has already arrived.
    pub fn try_result(&self) -> Option<Result<ParcelReader>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CallError::Abandoned)),
        }
    }
}
