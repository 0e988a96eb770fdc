//! Benchmarks for decode throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use xv_x64::{Cursor, Decoder};

/// A small function mixing prologue, arithmetic, branches and SSE.
const X86_64_CODE: &[u8] = &[
    // Function prologue
    0xf3, 0x0f, 0x1e, 0xfa, // endbr64
    0x55, // push rbp
    0x48, 0x89, 0xe5, // mov rbp, rsp
    0x48, 0x83, 0xec, 0x20, // sub rsp, 0x20
    0x64, 0x48, 0x8b, 0x04, 0x25, 0x28, 0x00, 0x00, 0x00, // mov rax, fs:[0x28]
    // Body
    0x48, 0x89, 0x7d, 0xf8, // mov [rbp-8], rdi
    0x48, 0x8b, 0x05, 0x10, 0x20, 0x00, 0x00, // mov rax, [rip+0x2010]
    0x48, 0x8d, 0x44, 0xcb, 0x10, // lea rax, [rbx+rcx*8+0x10]
    0x0f, 0x28, 0x44, 0x24, 0x10, // movaps xmm0, [rsp+0x10]
    0x66, 0x0f, 0x3a, 0x16, 0xc0, 0x01, // pextrd eax, xmm0, 1
    0x48, 0x83, 0x7d, 0xf0, 0x0a, // cmp qword [rbp-16], 10
    0x0f, 0x8e, 0x05, 0x00, 0x00, 0x00, // jle rel32
    0x48, 0xb8, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // mov rax, imm64
    0xe8, 0x00, 0x00, 0x00, 0x00, // call rel32
    // Epilogue
    0xc9, // leave
    0xc3, // ret
];

fn generate_block(size: usize) -> Vec<u8> {
    X86_64_CODE.iter().copied().cycle().take(size).collect()
}

fn bench_decode(c: &mut Criterion) {
    let decoder = Decoder::new();

    let mut group = c.benchmark_group("x86_64_decode");

    group.bench_function("single_instruction", |b| {
        b.iter(|| {
            let _ = decoder.decode_at(black_box(&X86_64_CODE[12..21]), 0x1000);
        })
    });

    group.bench_function("small_function", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(X86_64_CODE), 0x1000);
            decoder.instructions(&mut cursor).count()
        })
    });

    for size in [1024, 4096, 16384, 65536] {
        let code = generate_block(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("throughput", size), &code, |b, code| {
            b.iter(|| decoder.decode_all(black_box(code), 0x1000).len())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
