//! The renderer runs on its own thread while the control thread reshapes the
//! slot chain underneath it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use slotgraph::{BusLayout, GraphParams, MidiBuffer, MidiEvent, Renderer, SlotController, SlotEvent, SlotKind};

const BLOCK: usize = 100;

fn render_once(renderer: &mut Renderer) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.25f32; BLOCK];
    let mut right = vec![-0.25f32; BLOCK];
    let mut events = MidiBuffer::new();
    renderer.render(&mut [&mut left[..], &mut right[..]], &mut events).unwrap();
    (left, right)
}

#[test]
fn slot_changes_while_rendering_on_another_thread() {
    let params = Arc::new(GraphParams::default());
    let (mut slots, mut renderer) = SlotController::new(BusLayout::stereo()).unwrap();
    slots.prepare(48000.0, BLOCK).unwrap();

    let running = Arc::new(AtomicBool::new(true));
    let audio = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut left = vec![0.0f32; BLOCK];
            let mut right = vec![0.0f32; BLOCK];
            let mut events = MidiBuffer::new();
            let mut blocks = 0u64;
            let mut last_version = renderer.version();

            while running.load(Ordering::Relaxed) {
                left.fill(0.1);
                right.fill(-0.1);
                events.clear();
                events.push(MidiEvent::note_on(7, 0, 60, 100)).unwrap();

                renderer.render(&mut [&mut left[..], &mut right[..]], &mut events).unwrap();

                assert!(renderer.version() >= last_version, "renderer went back to an older plan");
                assert!(left.iter().chain(&right).all(|s| s.is_finite()));
                assert_eq!(events.len(), 1);
                last_version = renderer.version();
                blocks += 1;
            }

            (renderer, blocks)
        })
    };

    let script = [
        SlotEvent::MuteToggled,
        SlotEvent::KindChanged { slot: 0, kind: SlotKind::Oscillator },
        SlotEvent::KindChanged { slot: 1, kind: SlotKind::Gain },
        SlotEvent::BypassToggled { slot: 1 },
        SlotEvent::KindChanged { slot: 2, kind: SlotKind::Filter },
        SlotEvent::BypassToggled { slot: 1 },
        SlotEvent::KindChanged { slot: 0, kind: SlotKind::Empty },
        SlotEvent::KindChanged { slot: 1, kind: SlotKind::Oscillator },
        SlotEvent::MuteToggled,
        SlotEvent::KindChanged { slot: 2, kind: SlotKind::Empty },
        SlotEvent::KindChanged { slot: 1, kind: SlotKind::Empty },
    ];

    for _ in 0..20 {
        for event in script {
            params.apply(event).unwrap();
            slots.tick(&params).unwrap();
            thread::sleep(Duration::from_micros(200));
        }
    }

    running.store(false, Ordering::Relaxed);
    let (mut renderer, blocks) = audio.join().unwrap();

    assert!(blocks > 0);
    assert_eq!(renderer.faults(), 0);

    // Flush anything still held back, then the renderer must catch up exactly
    params.set_mute(false);
    slots.tick(&params).unwrap();
    render_once(&mut renderer);
    slots.tick(&params).unwrap();
    render_once(&mut renderer);
    assert_eq!(renderer.version(), slots.graph().version());

    // Every slot empty and unmuted: the input passes through untouched
    assert!(slots.slots().iter().all(|slot| slot.bound_node.is_none()));
    let (left, right) = render_once(&mut renderer);
    assert!(left.iter().all(|&s| s == 0.25));
    assert!(right.iter().all(|&s| s == -0.25));
}
