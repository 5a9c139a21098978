//! Slot graph walkthrough: a simulated audio thread renders while the control
//! thread swaps slots underneath it.
//!
//! Run with: cargo run --example graph_tutorial
//!
//! Set `RUST_LOG=debug` to see every node and connection change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, sleep};
use std::time::{Duration, Instant};

use rtrb::RingBuffer;
use slotgraph::{BusLayout, GraphParams, MidiBuffer, SlotController, SlotEvent, SlotKind};
use tracing::{info, warn};

const SAMPLE_RATE: f64 = 44100.0;
const BLOCK: usize = 512;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let params = Arc::new(GraphParams::default());
    let (mut slots, mut renderer) = match SlotController::new(BusLayout::stereo()) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Failed to build graph: {}", e);
            return;
        }
    };

    if let Err(e) = slots.prepare(SAMPLE_RATE, BLOCK) {
        eprintln!("Failed to prepare graph: {}", e);
        return;
    }

    // Block levels travel back from the audio thread without locking
    let (mut levels_tx, mut levels_rx) = RingBuffer::<(u64, f32)>::new(256);
    let running = Arc::new(AtomicBool::new(true));

    let audio = {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let block_time = Duration::from_secs_f64(BLOCK as f64 / SAMPLE_RATE);
            let mut left = vec![0.0f32; BLOCK];
            let mut right = vec![0.0f32; BLOCK];
            let mut events = MidiBuffer::new();

            while running.load(Ordering::Relaxed) {
                let start = Instant::now();
                left.iter_mut().chain(right.iter_mut()).for_each(|s| *s = 0.0);
                events.clear();

                if renderer.render(&mut [&mut left[..], &mut right[..]], &mut events).is_ok() {
                    let rms = (left.iter().map(|s| s * s).sum::<f32>() / BLOCK as f32).sqrt();
                    let _ = levels_tx.push((renderer.version(), rms));
                }

                if let Some(rest) = block_time.checked_sub(start.elapsed()) {
                    sleep(rest);
                }
            }

            renderer.faults()
        })
    };

    // What a user might click through, one step every 300ms
    let script = [
        SlotEvent::KindChanged { slot: 0, kind: SlotKind::Oscillator },
        SlotEvent::KindChanged { slot: 1, kind: SlotKind::Gain },
        SlotEvent::BypassToggled { slot: 1 },
        SlotEvent::BypassToggled { slot: 1 },
        SlotEvent::KindChanged { slot: 2, kind: SlotKind::Filter },
        SlotEvent::KindChanged { slot: 0, kind: SlotKind::Empty },
        SlotEvent::MuteToggled,
    ];

    for event in script {
        if let Err(e) = params.apply(event) {
            warn!(%e, "rejected event");
        }

        let until = Instant::now() + Duration::from_millis(300);
        while Instant::now() < until {
            match slots.tick(&params) {
                Ok(true) => info!(sequence = ?slots.graph().render_sequence(), "topology changed"),
                Ok(false) => {}
                Err(e) => warn!(%e, "update failed"),
            }
            sleep(Duration::from_millis(10));
        }

        let mut last = None;
        while let Ok(level) = levels_rx.pop() {
            last = Some(level);
        }
        if let Some((version, rms)) = last {
            info!(?event, version, rms, "after event");
        }
    }

    running.store(false, Ordering::Relaxed);
    let faults = audio.join().unwrap_or(0);

    if let Err(e) = slots.release() {
        warn!(%e, "release failed");
    }
    slots.tick(&params).ok();
    info!(faults, "done");
}
