//! Hook and lifecycle event dispatch
//!
//! In `Direct` mode the engine calls declared hooks itself and events only
//! reach registered listeners. In `Listeners` mode each hook rides on its
//! event instead, so it runs exactly once either way.

use super::Engine;
use crate::config::HookMode;
use crate::errors::CascadeError;
use crate::model::{Callback, Hook, HookOutcome, ModelEvent, Record};
use crate::store::Repository;

impl<R: Repository> Engine<R> {
    /// Call `hook` on the record's type, if declared and in direct mode
    pub(crate) fn call_hook(&self, record: &mut Record, hook: Hook) -> HookOutcome {
        if self.config.hook_mode != HookMode::Direct {
            return HookOutcome::Continue;
        }
        match record.record_type().hook(hook).cloned() {
            Some(callback) => callback(record),
            None => HookOutcome::Continue,
        }
    }

    /// Fire `event`: the bound hook in listener mode, registered listeners,
    /// then `one_shot`. The first `Stop` on a vetoable event ends dispatch.
    pub(crate) fn fire(
        &self,
        record: &mut Record,
        event: ModelEvent,
        one_shot: Option<&Callback>,
    ) -> HookOutcome {
        let mut callbacks: Vec<Callback> = Vec::new();
        if self.config.hook_mode == HookMode::Listeners {
            callbacks.extend(record.record_type().hook(event.bound_hook()).cloned());
        }
        if let Some(listeners) = self
            .listeners
            .get(&(record.type_name().to_string(), event))
        {
            callbacks.extend(listeners.iter().cloned());
        }
        callbacks.extend(one_shot.cloned());

        for callback in callbacks {
            if callback(record).is_stop() && event.is_vetoable() {
                tracing::debug!(
                    record_type = record.type_name(),
                    event = event.name(),
                    "listener vetoed"
                );
                return HookOutcome::Stop;
            }
        }
        HookOutcome::Continue
    }

    /// Direct hook; `Err(HookVetoed)` when it returns `Stop`
    pub(crate) fn guard(&self, record: &mut Record, hook: Hook) -> Result<(), CascadeError> {
        if self.call_hook(record, hook).is_stop() {
            return Err(vetoed(hook.name(), record));
        }
        Ok(())
    }

    pub(crate) fn guard_event(
        &self,
        record: &mut Record,
        event: ModelEvent,
        one_shot: Option<&Callback>,
    ) -> Result<(), CascadeError> {
        if self.fire(record, event, one_shot).is_stop() {
            return Err(vetoed(event.name(), record));
        }
        Ok(())
    }
}

fn vetoed(hook: &str, record: &Record) -> CascadeError {
    CascadeError::HookVetoed {
        hook: hook.to_string(),
        record_type: record.type_name().to_string(),
    }
}
