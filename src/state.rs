use crate::command::{LogicalCommand, VolumeStep};
use crate::types::{clamp_volume, Decibels, SourceId, StateSnapshot};
use parking_lot::Mutex;

/// Field of the amplifier state touched by a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Volume,
    Mute,
    Dim,
    Source,
}

/// Result of applying a command to the state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mutation {
    /// The field changed; snapshot is taken right after the change
    Changed { field: Field, snapshot: StateSnapshot },
    /// Requested value was already held
    Unchanged(StateSnapshot),
}

impl Mutation {
    pub fn snapshot(&self) -> StateSnapshot {
        match *self {
            Mutation::Changed { snapshot, .. } | Mutation::Unchanged(snapshot) => snapshot,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Mutation::Changed { .. })
    }
}

/// Authoritative in-memory model of the amplifier
///
/// Each operation runs its read-compare-mutate sequence under a single lock
/// acquisition. The lock is never held across an await point.
pub struct DeviceState {
    inner: Mutex<StateSnapshot>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(StateSnapshot::default())
    }
}

impl DeviceState {
    pub fn new(initial: StateSnapshot) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Get a copy of the current state
    pub fn snapshot(&self) -> StateSnapshot {
        *self.inner.lock()
    }

    /// Get the current volume in dB
    pub fn volume(&self) -> Decibels {
        self.inner.lock().volume
    }

    /// Apply a command, dispatching to the matching operation
    pub fn apply(&self, command: LogicalCommand) -> Mutation {
        match command {
            LogicalCommand::VolumeDelta(step) => self.adjust_volume(step),
            LogicalCommand::VolumeSet(target) => self.set_volume(target),
            LogicalCommand::Mute(muted) => self.set_mute(muted),
            LogicalCommand::ToggleMute => self.toggle_mute(),
            LogicalCommand::Dim(dimmed) => self.set_dim(dimmed),
            LogicalCommand::ToggleDim => self.toggle_dim(),
            LogicalCommand::SourceSet(id) => self.set_source(id),
        }
    }

    /// Step the volume by one decibel, stopping at the range bounds
    pub fn adjust_volume(&self, step: VolumeStep) -> Mutation {
        self.update(Field::Volume, |state| {
            let volume = clamp_volume(state.volume + step.delta());
            replace(&mut state.volume, volume)
        })
    }

    /// Set the volume; the target is clamped before comparing with the current value
    pub fn set_volume(&self, target: Decibels) -> Mutation {
        let target = clamp_volume(target);
        self.update(Field::Volume, |state| replace(&mut state.volume, target))
    }

    pub fn set_mute(&self, muted: bool) -> Mutation {
        self.update(Field::Mute, |state| replace(&mut state.muted, muted))
    }

    pub fn toggle_mute(&self) -> Mutation {
        self.update(Field::Mute, |state| {
            state.muted = !state.muted;
            true
        })
    }

    pub fn set_dim(&self, dimmed: bool) -> Mutation {
        self.update(Field::Dim, |state| replace(&mut state.dimmed, dimmed))
    }

    pub fn toggle_dim(&self) -> Mutation {
        self.update(Field::Dim, |state| {
            state.dimmed = !state.dimmed;
            true
        })
    }

    pub fn set_source(&self, id: SourceId) -> Mutation {
        self.update(Field::Source, |state| replace(&mut state.source, id))
    }

    fn update(&self, field: Field, mutate: impl FnOnce(&mut StateSnapshot) -> bool) -> Mutation {
        let mut state = self.inner.lock();
        if mutate(&mut state) {
            Mutation::Changed {
                field,
                snapshot: *state,
            }
        } else {
            Mutation::Unchanged(*state)
        }
    }
}

/// Store `value` unless it is already held; reports whether anything changed
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
