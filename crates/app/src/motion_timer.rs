//! Tokio-backed [`MotionTimer`]: sleeps for the travel time, then hands the
//! completion to whoever drains the channel.

use tokio::sync::mpsc;

use crate::ports::{MotionTimer, PendingCompletion};

pub struct TokioMotionTimer {
    sender: mpsc::UnboundedSender<PendingCompletion>,
}

impl TokioMotionTimer {
    /// Create a timer and the receiver its completions arrive on.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PendingCompletion>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl MotionTimer for TokioMotionTimer {
    /// Must be called from within a tokio runtime.
    fn schedule(&self, completion: PendingCompletion) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(completion.after).await;
            if sender.send(completion).is_err() {
                tracing::debug!("completion listener gone, dropping motion completion");
            }
        });
    }
}
