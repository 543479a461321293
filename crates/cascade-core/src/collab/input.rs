//! Request input, consulted only when a call supplies no data

use crate::model::Payload;
use std::sync::{Arc, Mutex};

pub trait InputSource {
    /// Every submitted field
    fn all_fields(&self) -> Payload;

    /// Whether a session is available to flash into
    fn has_session(&self) -> bool;

    /// Keep `payload` for redisplay on the next request
    fn flash(&self, payload: &Payload);
}

/// Fixed input, for tests and batch callers
#[derive(Debug, Default)]
pub struct StaticInput {
    fields: Payload,
    session: bool,
    flashed: Mutex<Vec<Payload>>,
}

impl StaticInput {
    pub fn new(fields: Payload) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_session(mut self) -> Self {
        self.session = true;
        self
    }

    /// Payloads flashed so far, oldest first
    pub fn flashed(&self) -> Vec<Payload> {
        self.flashed
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

impl InputSource for StaticInput {
    fn all_fields(&self) -> Payload {
        self.fields.clone()
    }

    fn has_session(&self) -> bool {
        self.session
    }

    fn flash(&self, payload: &Payload) {
        if let Ok(mut flashed) = self.flashed.lock() {
            flashed.push(payload.clone());
        }
    }
}

/// Shared input, so the caller can inspect what was flashed
impl<T: InputSource + ?Sized> InputSource for Arc<T> {
    fn all_fields(&self) -> Payload {
        (**self).all_fields()
    }

    fn has_session(&self) -> bool {
        (**self).has_session()
    }

    fn flash(&self, payload: &Payload) {
        (**self).flash(payload)
    }
}
