//! Pitch tracking demo: a short melody through PeriodDetection.
//!
//! Run with: cargo run -p arbor-analysis --example pitch_demo

use arbor_analysis::{AttackDetection, EnvPd, PeriodDetection};
use arbor_core::Context;
use arbor_synth::MbSaw;

const NOTES: &[(&str, f32)] = &[
    ("A2", 110.0),
    ("E3", 164.81),
    ("A3", 220.0),
    ("C#4", 277.18),
    ("E4", 329.63),
    ("A4", 440.0),
];

fn main() {
    let ctx = Context::new(48000.0);
    let note_len = 12_000;
    let block = 256;

    let mut osc = MbSaw::new(&ctx);
    let mut input = vec![0.0f32; 1024];
    let mut output = vec![0.0f32; 1024];
    let mut detector =
        PeriodDetection::new(&ctx, &mut input, &mut output, block).expect("pool too small");
    let mut attacks = AttackDetection::new(&ctx, block);
    let mut env = EnvPd::new(&ctx, 1024, 256, block).expect("pool too small");

    println!("=== Period tracking over a minBLEP sawtooth ===\n");
    println!(
        "{:>5} {:>9} {:>9} {:>9} {:>9} {:>8}",
        "Note", "Target", "Tracked", "Error %", "Fidelity", "Level dB"
    );
    println!("{:->5} {:->9} {:->9} {:->9} {:->9} {:->8}", "", "", "", "", "", "");

    let mut attack_count = 0;
    let mut frame = vec![0.0f32; block];
    for &(name, freq) in NOTES {
        osc.set_freq(freq);
        for chunk in 0..note_len / block {
            // Short gap before each note so the attack detector sees an onset.
            let gate = if chunk < 2 { 0.0 } else { 0.5 };
            for y in frame.iter_mut() {
                *y = gate * osc.tick();
            }
            for &x in &frame {
                detector.find_period(x);
            }
            env.process_block(&frame);
            if attacks.detect(&frame).is_some() {
                attack_count += 1;
            }
        }

        let tracked = detector.frequency();
        let error = 100.0 * (tracked - freq).abs() / freq;
        println!(
            "{:>5} {:>9.2} {:>9.2} {:>9.3} {:>9.3} {:>8.1}",
            name,
            freq,
            tracked,
            error,
            detector.fidelity(),
            env.tick_db()
        );
    }

    println!("\nAttacks detected: {attack_count} (notes: {})", NOTES.len());
    println!("Pool in use: {} of {} bytes", ctx.pool().used(), ctx.pool().capacity());
}
