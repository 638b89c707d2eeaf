//! Integration tests for the vgp-core pipeline.
//!
//! These tests push encoded bytes through the public API the way a server
//! does: frame, decode, translate against a mapping snapshot, and carry the
//! translator state from one reading to the next.

use vgp_core::protocol::codec::{HEADER_SIZE, MIN_MESSAGE_SIZE};
use vgp_core::{
    decode, encode, release_all, translate, ButtonAction, FrameBuffer, GamepadButton,
    GamepadButtons, GamepadReading, HidKeyCode, InjectionCommand, MappingStore, MappingTable, OutputMode,
    ProtocolError, TranslateOptions, TranslatorState,
};

/// Decodes each message and translates it, returning one command list per message.
fn pipeline(
    messages: &[Vec<u8>],
    table: &MappingTable,
    options: TranslateOptions,
) -> (Vec<Vec<InjectionCommand>>, TranslatorState) {
    let mut state = TranslatorState::default();
    let mut out = Vec::new();
    for bytes in messages {
        let (reading, consumed) = decode(bytes).expect("decode must succeed");
        assert_eq!(consumed, bytes.len(), "all bytes must be consumed");
        let (cmds, next) = translate(&state, &reading, table, options);
        out.push(cmds);
        state = next;
    }
    (out, state)
}

#[test]
fn test_press_and_release_a_yields_key_down_then_key_up() {
    // Arrange
    let mut table = MappingTable::empty();
    table.set_button(GamepadButton::A, Some(ButtonAction::Key(HidKeyCode::KeyK)));
    let messages = vec![
        encode(&GamepadReading::pressing(GamepadButton::A)).unwrap(),
        encode(&GamepadReading::releasing(GamepadButton::A)).unwrap(),
    ];

    // Act
    let (out, state) = pipeline(&messages, &table, TranslateOptions::default());

    // Assert
    assert_eq!(out[0], vec![InjectionCommand::KeyDown(HidKeyCode::KeyK)]);
    assert_eq!(out[1], vec![InjectionCommand::KeyUp(HidKeyCode::KeyK)]);
    assert!(state.is_idle());
}

#[test]
fn test_buffer_three_bytes_short_is_incomplete_and_state_is_untouched() {
    // Arrange
    let bytes = encode(&GamepadReading::pressing(GamepadButton::B)).unwrap();
    let short = &bytes[..MIN_MESSAGE_SIZE - 3];
    let state = TranslatorState::default();

    // Act
    let result = decode(short);

    // Assert – nothing consumed, nothing to translate
    assert!(matches!(result, Err(ProtocolError::IncompleteData { .. })));
    assert_eq!(state, TranslatorState::default());
}

#[test]
fn test_every_button_round_trips_through_the_wire() {
    for button in GamepadButton::ALL {
        let reading = GamepadReading::pressing(button);
        let (decoded, _) = decode(&encode(&reading).unwrap()).unwrap();
        assert_eq!(decoded, reading, "{button:?}");
    }
}

#[test]
fn test_axis_endpoints_and_zero_round_trip() {
    for v in [-1.0f32, -0.5, 0.0, 0.5, 1.0] {
        let reading = GamepadReading {
            left_trigger: v.abs(),
            right_trigger: 1.0 - v.abs(),
            left_stick_x: v,
            left_stick_y: -v,
            right_stick_x: v,
            right_stick_y: -v,
            ..GamepadReading::default()
        };
        let (decoded, consumed) = decode(&encode(&reading).unwrap()).unwrap();
        assert_eq!(decoded, reading);
        assert_eq!(consumed, MIN_MESSAGE_SIZE);
    }
}

/// Byte offset of each float field inside a message, in wire order.
const FLOAT_FIELDS: [(&str, usize); 6] = [
    ("left_trigger", HEADER_SIZE + 8),
    ("right_trigger", HEADER_SIZE + 12),
    ("left_stick_x", HEADER_SIZE + 16),
    ("left_stick_y", HEADER_SIZE + 20),
    ("right_stick_x", HEADER_SIZE + 24),
    ("right_stick_y", HEADER_SIZE + 28),
];

/// Evenly spaced samples over `[min, 1]` plus the representable extremes.
fn samples(min: f32) -> Vec<f32> {
    let below_one = 1.0 - f32::EPSILON / 2.0;
    let tiny = f32::from_bits(1);
    let mut values: Vec<f32> = (0..=200)
        .map(|k| min + (1.0 - min) * (k as f32 / 200.0))
        .collect();
    values.extend([min, 0.0, -0.0, 1.0, below_one, tiny, f32::MIN_POSITIVE]);
    if min < 0.0 {
        values.extend([-below_one, -tiny, -f32::MIN_POSITIVE]);
    }
    values
}

fn with_field(field: usize, value: f32) -> GamepadReading {
    let mut reading = GamepadReading::default();
    let slot = match field {
        0 => &mut reading.left_trigger,
        1 => &mut reading.right_trigger,
        2 => &mut reading.left_stick_x,
        3 => &mut reading.left_stick_y,
        4 => &mut reading.right_stick_x,
        _ => &mut reading.right_stick_y,
    };
    *slot = value;
    reading
}

fn float_bits(reading: &GamepadReading) -> [u32; 6] {
    [
        reading.left_trigger.to_bits(),
        reading.right_trigger.to_bits(),
        reading.left_stick_x.to_bits(),
        reading.left_stick_y.to_bits(),
        reading.right_stick_x.to_bits(),
        reading.right_stick_y.to_bits(),
    ]
}

#[test]
fn test_every_float_field_round_trips_bit_exact_across_its_range() {
    for (field, (name, _)) in FLOAT_FIELDS.iter().enumerate() {
        let min = if field < 2 { 0.0 } else { -1.0 };
        for value in samples(min) {
            // Arrange
            let reading = with_field(field, value);

            // Act
            let (decoded, consumed) = decode(&encode(&reading).unwrap()).unwrap();

            // Assert
            assert_eq!(float_bits(&decoded), float_bits(&reading), "{name} = {value:e}");
            assert_eq!(consumed, MIN_MESSAGE_SIZE);
        }
    }
}

#[test]
fn test_all_fields_together_round_trip_across_ranges() {
    for k in 0..=100u32 {
        let t = k as f32 / 100.0;
        let reading = GamepadReading {
            buttons_down: GamepadButtons(k.wrapping_mul(2_654_435_761) & GamepadButtons::DEFINED),
            buttons_up: GamepadButtons::default(),
            left_trigger: t,
            right_trigger: 1.0 - t,
            left_stick_x: 2.0 * t - 1.0,
            left_stick_y: 1.0 - 2.0 * t,
            right_stick_x: -t,
            right_stick_y: t,
        };
        let reading = GamepadReading {
            buttons_up: GamepadButtons(!reading.buttons_down.0 & GamepadButtons::DEFINED & (k << 3)),
            ..reading
        };

        let (decoded, _) = decode(&encode(&reading).unwrap()).unwrap();

        assert_eq!(decoded.buttons_down, reading.buttons_down, "k = {k}");
        assert_eq!(decoded.buttons_up, reading.buttons_up, "k = {k}");
        assert_eq!(float_bits(&decoded), float_bits(&reading), "k = {k}");
    }
}

#[test]
fn test_button_masks_round_trip_across_the_defined_range() {
    let masks = (0..=GamepadButtons::DEFINED)
        .step_by(4099)
        .chain([GamepadButtons::DEFINED]);
    for down in masks {
        let reading = GamepadReading {
            buttons_down: GamepadButtons(down),
            buttons_up: GamepadButtons(!down & GamepadButtons::DEFINED),
            ..GamepadReading::default()
        };
        let (decoded, _) = decode(&encode(&reading).unwrap()).unwrap();
        assert_eq!(decoded, reading, "down = 0x{down:05X}");
    }
}

#[test]
fn test_values_just_outside_each_range_are_rejected() {
    let valid = encode(&GamepadReading::default()).unwrap();
    for (field, (name, offset)) in FLOAT_FIELDS.iter().enumerate() {
        let (min, below_min) = if field < 2 {
            (0.0, -f32::from_bits(1))
        } else {
            (-1.0, -1.0 - f32::EPSILON)
        };
        for bad in [below_min, 1.0 + f32::EPSILON, f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            // Arrange
            let mut bytes = valid.clone();
            bytes[*offset..offset + 4].copy_from_slice(&bad.to_le_bytes());

            // Act
            let result = decode(&bytes);

            // Assert
            assert!(
                matches!(result, Err(ProtocolError::SchemaMismatch(_))),
                "{name} = {bad:e} (min {min}) must be rejected, got {result:?}"
            );
        }
    }
}

#[test]
fn test_overlapping_masks_are_rejected_not_repaired() {
    // Arrange – encode refuses the overlap, so patch valid bytes by hand
    let mut bytes = encode(&GamepadReading::pressing(GamepadButton::X)).unwrap();
    let up_offset = HEADER_SIZE + 4;
    bytes[up_offset..up_offset + 4].copy_from_slice(&GamepadButton::X.bit().to_le_bytes());

    // Act
    let result = decode(&bytes);

    // Assert
    assert!(matches!(result, Err(ProtocolError::SchemaMismatch(_))));
}

#[test]
fn test_pipelined_stream_in_odd_chunks_yields_every_command_in_order() {
    // Arrange
    let table = MappingTable::default();
    let mut stream = Vec::new();
    for reading in [
        GamepadReading::pressing(GamepadButton::A),
        GamepadReading::pressing(GamepadButton::B),
        GamepadReading::releasing(GamepadButton::A),
        GamepadReading::releasing(GamepadButton::B),
    ] {
        stream.extend(encode(&reading).unwrap());
    }
    let mut frames = FrameBuffer::new();
    let mut state = TranslatorState::default();
    let mut commands = Vec::new();

    // Act
    for chunk in stream.chunks(7) {
        frames.extend(chunk);
        while let Some(result) = frames.next_reading() {
            let reading = result.expect("stream is well formed");
            let (cmds, next) = translate(&state, &reading, &table, TranslateOptions::default());
            commands.extend(cmds);
            state = next;
        }
    }

    // Assert
    assert!(frames.is_empty());
    assert_eq!(
        commands,
        vec![
            InjectionCommand::KeyDown(HidKeyCode::Enter),
            InjectionCommand::KeyDown(HidKeyCode::Escape),
            InjectionCommand::KeyUp(HidKeyCode::Enter),
            InjectionCommand::KeyUp(HidKeyCode::Escape),
        ]
    );
}

#[test]
fn test_session_keeps_its_snapshot_when_the_store_is_swapped() {
    // Arrange
    let store = MappingStore::new(MappingTable::default());
    let view = store.current();
    let mut remapped = MappingTable::default();
    remapped.set_button(GamepadButton::A, Some(ButtonAction::Key(HidKeyCode::Space)));

    // Act
    let replaced = store.replace(remapped);
    let reading = GamepadReading::pressing(GamepadButton::A);
    let (old_cmds, _) =
        translate(&TranslatorState::default(), &reading, &view, TranslateOptions::default());
    let (new_cmds, _) =
        translate(&TranslatorState::default(), &reading, &replaced, TranslateOptions::default());

    // Assert
    assert_eq!(old_cmds, vec![InjectionCommand::KeyDown(HidKeyCode::Enter)]);
    assert_eq!(new_cmds, vec![InjectionCommand::KeyDown(HidKeyCode::Space)]);
    assert_eq!(replaced.version(), view.version() + 1);
}

#[test]
fn test_release_all_after_partial_stream_leaves_nothing_held() {
    // Arrange
    let table = MappingTable::default();
    let messages = vec![
        encode(&GamepadReading::pressing(GamepadButton::Y)).unwrap(),
        encode(&GamepadReading {
            right_stick_x: 0.9,
            ..GamepadReading::default()
        })
        .unwrap(),
    ];
    let (_, state) = pipeline(&messages, &table, TranslateOptions::default());

    // Act
    let (cmds, rest) = release_all(&state, &table, OutputMode::KeyboardMouse);

    // Assert
    assert_eq!(
        cmds,
        vec![
            InjectionCommand::KeyUp(HidKeyCode::ControlLeft),
            InjectionCommand::KeyUp(HidKeyCode::ArrowRight),
        ]
    );
    assert!(rest.is_idle());
}
