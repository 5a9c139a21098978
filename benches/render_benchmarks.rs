use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slotgraph::params::ParamSnapshot;
use slotgraph::{BusLayout, MidiBuffer, SlotController, SlotKind};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Renderer.render() osc->gain->filter, 512 frames", |b| {
        let (mut slots, mut renderer) = SlotController::new(BusLayout::stereo()).unwrap();
        let snapshot = ParamSnapshot::new(3)
            .with_kind(0, SlotKind::Oscillator)
            .with_kind(1, SlotKind::Gain)
            .with_kind(2, SlotKind::Filter);
        slots.update(&snapshot).unwrap();
        slots.prepare(48000.0, 512).unwrap();

        let mut left = vec![0.0f32; 512];
        let mut right = vec![0.0f32; 512];
        let mut events = MidiBuffer::new();

        b.iter(move || {
            renderer
                .render(black_box(&mut [&mut left[..], &mut right[..]]), &mut events)
                .unwrap()
        })
    });

    c.bench_function("SlotController.update() kind swap", |b| {
        let (mut slots, _renderer) = SlotController::new(BusLayout::stereo()).unwrap();
        let gain = ParamSnapshot::new(3).with_kind(1, SlotKind::Gain);
        let filter = ParamSnapshot::new(3).with_kind(1, SlotKind::Filter);
        let mut flip = false;

        b.iter(|| {
            flip = !flip;
            slots.update(if flip { &gain } else { &filter }).unwrap();
            slots.graph().version()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
