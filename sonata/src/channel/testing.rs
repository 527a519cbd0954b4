//! In-memory channel for unit tests.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::error::ChannelError;
use super::traits::ConfigChannel;
use crate::protocol::decode;

/// Records every delivered frame; can refuse the first N deliveries.
#[derive(Clone)]
pub(crate) struct RecordingChannel {
    name: String,
    frames: Arc<Mutex<Vec<Bytes>>>,
    failures_left: Arc<AtomicU32>,
}

impl RecordingChannel {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames: Arc::new(Mutex::new(Vec::new())),
            failures_left: Arc::new(AtomicU32::new(0)),
        }
    }

    pub(crate) fn failing(name: &str, failures: u32) -> Self {
        let channel = Self::new(name);
        channel.fail_next(failures);
        channel
    }

    /// Refuse the next `failures` deliveries.
    pub(crate) fn fail_next(&self, failures: u32) {
        self.failures_left.store(failures, Ordering::SeqCst);
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub(crate) fn messages<T: DeserializeOwned>(&self) -> Vec<T> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|frame| decode(frame).unwrap())
            .collect()
    }
}

impl ConfigChannel for RecordingChannel {
    fn endpoint(&self) -> &str {
        &self.name
    }

    async fn send(&self, frame: Bytes) -> Result<(), ChannelError> {
        let refused = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(ChannelError::Unavailable {
                endpoint: self.name.clone(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            });
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }
}
