use std::sync::Arc;

use slotgraph::params::SlotParams;
use slotgraph::{
    BusLayout, Connection, GraphParams, MidiBuffer, MidiEvent, ParamSnapshot, SlotController, SlotEvent, SlotKind,
};

#[test]
fn empty_slots_pass_audio_and_midi_through() {
    let (mut slots, mut renderer) = SlotController::new(BusLayout::stereo()).unwrap();
    slots.update(&ParamSnapshot::new(3).with_mute(false)).unwrap();
    slots.prepare(48000.0, 100).unwrap();

    let mut left: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
    let mut right: Vec<f32> = (0..100).map(|i| -(i as f32) / 100.0).collect();
    let expected = (left.clone(), right.clone());
    let mut events = MidiBuffer::new();
    events.push(MidiEvent::note_on(70, 1, 64, 80)).unwrap();

    renderer.render(&mut [&mut left[..], &mut right[..]], &mut events).unwrap();

    assert_eq!((left, right), expected);
    assert_eq!(events.as_slice(), &[MidiEvent::note_on(70, 1, 64, 80)]);
}

#[test]
fn muted_input_still_passes_midi() {
    let (mut slots, mut renderer) = SlotController::new(BusLayout::mono()).unwrap();
    slots.update(&ParamSnapshot::new(3)).unwrap();
    slots.prepare(48000.0, 32).unwrap();

    let mut mono = vec![0.5f32; 32];
    let mut events = MidiBuffer::new();
    events.push(MidiEvent::note_off(3, 0, 60)).unwrap();

    renderer.render(&mut [&mut mono[..]], &mut events).unwrap();

    assert!(mono.iter().all(|&s| s == 0.0));
    assert_eq!(events.len(), 1);
}

#[test]
fn oscillator_then_gain_is_wired_in_slot_order() {
    let (mut slots, _renderer) = SlotController::new(BusLayout::stereo()).unwrap();
    let snapshot = ParamSnapshot::new(3)
        .with_kind(0, SlotKind::Oscillator)
        .with_kind(1, SlotKind::Gain);

    assert!(slots.update(&snapshot).unwrap());

    let io = slots.io();
    let osc = slots.slot(0).unwrap().bound_node.unwrap();
    let gain = slots.slot(1).unwrap().bound_node.unwrap();

    let mut expected = Vec::new();
    for channel in 0..2 {
        expected.push(Connection::audio(io.audio_input, osc, channel));
        expected.push(Connection::audio(osc, gain, channel));
        expected.push(Connection::audio(gain, io.audio_output, channel));
    }
    expected.push(Connection::events(io.midi_input, io.midi_output));
    expected.sort();

    assert_eq!(slots.graph().connections(), expected);
    assert_eq!(slots.graph().node_count(), 6);
}

#[test]
fn empty_slots_in_between_are_skipped() {
    let (mut slots, _renderer) = SlotController::new(BusLayout::mono()).unwrap();
    slots.update(&ParamSnapshot::new(3).with_kind(2, SlotKind::Filter)).unwrap();

    let io = slots.io();
    let filter = slots.slot(2).unwrap().bound_node.unwrap();

    let mut expected = vec![
        Connection::audio(io.audio_input, filter, 0),
        Connection::audio(filter, io.audio_output, 0),
        Connection::events(io.midi_input, io.midi_output),
    ];
    expected.sort();
    assert_eq!(slots.graph().connections(), expected);
    assert_eq!(
        slots.graph().render_sequence(),
        &[io.audio_input, io.midi_input, io.midi_output, filter, io.audio_output]
    );
}

#[test]
fn unchanged_oscillator_keeps_its_phase() {
    let (mut slots, mut renderer) = SlotController::new(BusLayout::mono()).unwrap();
    let snapshot = ParamSnapshot::new(3).with_kind(0, SlotKind::Oscillator);
    slots.update(&snapshot).unwrap();
    slots.prepare(48000.0, 64).unwrap();

    let mut first = vec![0.0f32; 64];
    let mut events = MidiBuffer::new();
    renderer.render(&mut [&mut first[..]], &mut events).unwrap();

    // Adding a gain after the oscillator rebuilds, but keeps the oscillator
    slots.update(&snapshot.with_kind(1, SlotKind::Gain)).unwrap();
    let mut second = vec![0.0f32; 64];
    renderer.render(&mut [&mut second[..]], &mut events).unwrap();

    // A restarted oscillator would begin at zero again
    assert!(second[0].abs() > 0.01);
}

#[test]
fn ticks_follow_the_parameter_store() {
    let params = Arc::new(GraphParams::default());
    let (mut slots, _renderer) = SlotController::new(BusLayout::stereo()).unwrap();

    assert!(!slots.tick(&params).unwrap());

    params.apply(SlotEvent::KindChanged { slot: 1, kind: SlotKind::Filter }).unwrap();
    params.apply(SlotEvent::BypassToggled { slot: 1 }).unwrap();
    assert!(slots.tick(&params).unwrap());

    let filter = slots.slot(1).unwrap().bound_node.unwrap();
    assert_eq!(slots.graph().is_bypassed(filter), Some(true));
    assert_eq!(slots.graph().is_bypassed(slots.io().audio_input), Some(true));

    params.set_normalized("slot2", 0.0).unwrap();
    assert!(slots.tick(&params).unwrap());
    assert_eq!(slots.slot(1).unwrap().bound_node, None);
    assert_eq!(params.snapshot().slots[1], SlotParams { kind: SlotKind::Empty, bypass: true });
}
