//! Property-based tests for the device state and frame codec

use amp_bridge::{
    clamp_volume, format_volume, integer_digit_count, DeviceState, FrameKind, LogicalCommand,
    Mutation, StateSnapshot, VolumeStep, MAX_VOLUME, MIN_VOLUME,
};
use proptest::prelude::*;

fn step() -> impl Strategy<Value = VolumeStep> {
    prop_oneof![Just(VolumeStep::Up), Just(VolumeStep::Down)]
}

fn volume() -> impl Strategy<Value = f64> {
    prop_oneof![-500.0f64..500.0, (-120i32..=20).prop_map(f64::from)]
}

fn state_at(volume: f64) -> DeviceState {
    DeviceState::new(StateSnapshot {
        volume,
        ..StateSnapshot::default()
    })
}

/// Property: repeated steps never leave the volume range
#[test]
fn prop_steps_stay_in_range() {
    proptest!(|(start in MIN_VOLUME..=MAX_VOLUME, steps in prop::collection::vec(step(), 0..400))| {
        let state = state_at(start);
        for step in steps {
            state.adjust_volume(step);
            let volume = state.volume();
            prop_assert!((MIN_VOLUME..=MAX_VOLUME).contains(&volume));
        }
    });
}

/// Property: setting a value whose clamp equals the current volume is a no-op
#[test]
fn prop_set_to_clamped_current_is_noop() {
    proptest!(|(requested in volume())| {
        let current = clamp_volume(requested);
        let state = state_at(current);

        let mutation = state.set_volume(requested);

        prop_assert!(matches!(mutation, Mutation::Unchanged(_)));
        prop_assert_eq!(state.volume(), current);
    });
}

/// Property: any set leaves the volume in range
#[test]
fn prop_set_volume_clamps() {
    proptest!(|(requested in volume())| {
        let state = DeviceState::default();
        state.apply(LogicalCommand::VolumeSet(requested));
        prop_assert_eq!(state.volume(), clamp_volume(requested));
    });
}

/// Property: a switch set twice changes state at most once
#[test]
fn prop_switch_idempotent() {
    proptest!(|(value in any::<bool>(), dim in any::<bool>())| {
        let state = DeviceState::default();
        let command = if dim { LogicalCommand::Dim(value) } else { LogicalCommand::Mute(value) };

        let first = state.apply(command);
        let second = state.apply(command);

        prop_assert_eq!(first.is_changed(), value);
        prop_assert!(!second.is_changed());
    });
}

/// Property: the formatted volume always spends 18 characters on digits and sign
#[test]
fn prop_volume_format_budget() {
    proptest!(|(volume in MIN_VOLUME..=MAX_VOLUME)| {
        let formatted = format_volume(volume).unwrap();
        let (integer, fraction) = formatted.split_once('.').unwrap();

        prop_assert_eq!(integer.len(), integer_digit_count(volume));
        prop_assert_eq!(integer.len() + fraction.len(), 18);
    });
}

/// Property: every in-range volume frame has the same length, matching its selector
#[test]
fn prop_volume_frame_length_constant() {
    proptest!(|(volume in MIN_VOLUME..=MAX_VOLUME)| {
        let frame = FrameKind::Volume(volume).encode().unwrap();
        prop_assert_eq!(frame.selector(), 0x35);
        prop_assert_eq!(frame.as_bytes().len(), 0x35 + 4);
    });
}

/// Property: encoding is deterministic
#[test]
fn prop_encoding_deterministic() {
    proptest!(|(volume in MIN_VOLUME..=MAX_VOLUME, source in any::<u32>())| {
        prop_assert_eq!(
            FrameKind::Volume(volume).encode().unwrap(),
            FrameKind::Volume(volume).encode().unwrap()
        );
        prop_assert_eq!(
            FrameKind::Source(source).encode().unwrap(),
            FrameKind::Source(source).encode().unwrap()
        );
    });
}
