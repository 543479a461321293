//! Record hooks and the lifecycle events they bind to

use super::record::Record;
use std::fmt;
use std::sync::Arc;

/// A hook, listener or one-shot save callback
pub type Callback = Arc<dyn Fn(&mut Record) -> HookOutcome + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Continue,
    /// Abort the surrounding operation, where the hook point allows it
    Stop,
}

impl HookOutcome {
    pub fn is_stop(self) -> bool {
        self == HookOutcome::Stop
    }
}

/// Optional behaviours a record type may supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hook {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeSave,
    AfterSave,
    BeforeDelete,
    AfterDelete,
    BeforeValidate,
    AfterValidate,
}

impl Hook {
    pub fn name(self) -> &'static str {
        match self {
            Hook::BeforeCreate => "before_create",
            Hook::AfterCreate => "after_create",
            Hook::BeforeUpdate => "before_update",
            Hook::AfterUpdate => "after_update",
            Hook::BeforeSave => "before_save",
            Hook::AfterSave => "after_save",
            Hook::BeforeDelete => "before_delete",
            Hook::AfterDelete => "after_delete",
            Hook::BeforeValidate => "before_validate",
            Hook::AfterValidate => "after_validate",
        }
    }

    /// The event this hook rides on in listener mode
    pub fn event(self) -> ModelEvent {
        match self {
            Hook::BeforeCreate => ModelEvent::Creating,
            Hook::AfterCreate => ModelEvent::Created,
            Hook::BeforeUpdate => ModelEvent::Updating,
            Hook::AfterUpdate => ModelEvent::Updated,
            Hook::BeforeSave => ModelEvent::Saving,
            Hook::AfterSave => ModelEvent::Saved,
            Hook::BeforeDelete => ModelEvent::Deleting,
            Hook::AfterDelete => ModelEvent::Deleted,
            Hook::BeforeValidate => ModelEvent::Validating,
            Hook::AfterValidate => ModelEvent::Validated,
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelEvent {
    Validating,
    Validated,
    Saving,
    Saved,
    Creating,
    Created,
    Updating,
    Updated,
    Deleting,
    Deleted,
}

impl ModelEvent {
    pub fn name(self) -> &'static str {
        match self {
            ModelEvent::Validating => "validating",
            ModelEvent::Validated => "validated",
            ModelEvent::Saving => "saving",
            ModelEvent::Saved => "saved",
            ModelEvent::Creating => "creating",
            ModelEvent::Created => "created",
            ModelEvent::Updating => "updating",
            ModelEvent::Updated => "updated",
            ModelEvent::Deleting => "deleting",
            ModelEvent::Deleted => "deleted",
        }
    }

    /// Whether a `Stop` from a listener aborts the operation
    pub fn is_vetoable(self) -> bool {
        matches!(
            self,
            ModelEvent::Validating
                | ModelEvent::Saving
                | ModelEvent::Creating
                | ModelEvent::Updating
        )
    }

    /// The record hook bound to this event in listener mode
    pub fn bound_hook(self) -> Hook {
        match self {
            ModelEvent::Validating => Hook::BeforeValidate,
            ModelEvent::Validated => Hook::AfterValidate,
            ModelEvent::Saving => Hook::BeforeSave,
            ModelEvent::Saved => Hook::AfterSave,
            ModelEvent::Creating => Hook::BeforeCreate,
            ModelEvent::Created => Hook::AfterCreate,
            ModelEvent::Updating => Hook::BeforeUpdate,
            ModelEvent::Updated => Hook::AfterUpdate,
            ModelEvent::Deleting => Hook::BeforeDelete,
            ModelEvent::Deleted => Hook::AfterDelete,
        }
    }
}

impl fmt::Display for ModelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
