use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chip8::{constants::*, prelude::*};

struct Headless;

impl Devices for Headless {
    fn keys(&mut self) -> [bool; KEY_COUNT as usize] {
        [false; KEY_COUNT as usize]
    }

    fn draw(&mut self, display: Chip8DisplayBuffer) {
        black_box(display);
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let conf = Chip8Conf {
        seed: Some(1),
        ..Chip8Conf::default()
    };

    {
        let mut vm = Chip8Vm::new(conf.clone());
        vm.load_bytecode(include_bytes!("../programs/maze"))
            .unwrap();

        c.bench_function("maze bytecode", |b| {
            b.iter(|| {
                let step_count = black_box(1000_usize);
                black_box(vm.run_steps(step_count))
            })
        });
    }

    {
        let mut vm = Chip8Vm::new(conf);
        let mut devices = Headless;

        c.bench_function("maze frames", |b| {
            b.iter(|| {
                vm.load_bytecode(include_bytes!("../programs/maze"))
                    .unwrap();
                for _ in 0..black_box(120) {
                    vm.run_frame(&mut devices).unwrap();
                }
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
