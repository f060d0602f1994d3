use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use cupi_ascii::filter::asciify;
use cupi_ascii::font::BlockFont;
use cupi_ascii::pipeline::AsciiScenePipeline;
use cupi_core::charset::AsciiRamp;
use cupi_core::config::AsciiTextConfig;
use cupi_core::frame::FrameBuffer;
use cupi_core::stage::{Stage, ViewportMetrics};
use cupi_core::traits::dispatch_frame;

fn bench_asciify(c: &mut Criterion) {
    // 1920×1080 at a 10.8 px glyph: 296 × 100 characters.
    let mut fb = FrameBuffer::new(296, 100);
    for (i, px) in fb.data.chunks_exact_mut(4).enumerate() {
        let v = (i % 251) as u8;
        px.copy_from_slice(&[v, v, v, if i % 3 == 0 { 0 } else { 255 }]);
    }
    let ramp = AsciiRamp::default();
    c.bench_function("asciify_296x100", |b| {
        b.iter(|| black_box(asciify(black_box(&fb), &ramp)));
    });
}

fn bench_frame(c: &mut Criterion) {
    let mut stage = Stage::new(ViewportMetrics::new(1920, 1080));
    let mut config = AsciiTextConfig::default();
    config.ascii_font_size = 10.8;
    let Ok(mut pipeline) =
        AsciiScenePipeline::new(&mut stage, config, Arc::new(BlockFont), 1920.0, 1080.0)
    else {
        return;
    };
    pipeline.load(&mut stage, 0.0);
    let mut t = 0.0;
    c.bench_function("pipeline_frame_1080p", |b| {
        b.iter(|| {
            t += 0.016;
            dispatch_frame(&mut stage, &mut [&mut pipeline], t);
        });
    });
    pipeline.dispose(&mut stage);
}

criterion_group!(benches, bench_asciify, bench_frame);
criterion_main!(benches);
