use criterion::{Criterion, black_box, criterion_group, criterion_main};
use markdown_materialize_engine::{
    Document, EventLoop, MaterializeOptions, RevealPolicy, create_streaming_parser_with_options,
};
use std::time::Duration;

fn sample_markdown(sections: usize) -> String {
    let mut s = String::new();
    for i in 0..sections {
        s.push_str(&format!("## Section {i}\n\n"));
        s.push_str("A paragraph that streams in a few tokens at a time. ");
        s.push_str("The quick brown fox jumps over the lazy dog.\n\n");
        s.push_str("- first item\n- second item\n\n");
        s.push_str("```rust\nfn main() {}\n```\n\n");
    }
    s
}

fn stream(markdown: &str, policy: RevealPolicy) -> usize {
    let document = Document::new_shared();
    let root = {
        let mut doc = document.borrow_mut();
        let root = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, root).expect("attach root");
        root
    };
    let event_loop = EventLoop::new();
    let options = MaterializeOptions {
        policy,
        ..MaterializeOptions::default()
    };
    let mut parser =
        create_streaming_parser_with_options(document.clone(), root, event_loop.clone(), options);

    let chars: Vec<char> = markdown.chars().collect();
    for chunk in chars.chunks(8) {
        parser.write(&chunk.iter().collect::<String>());
        event_loop.advance(Duration::from_millis(2));
    }
    parser.end();
    event_loop.run_until_idle();
    document.borrow().descendants(root).len()
}

fn bench_streaming(c: &mut Criterion) {
    let md = sample_markdown(50);
    c.bench_function("streaming/last_wins", |b| {
        b.iter(|| black_box(stream(black_box(&md), RevealPolicy::LastWins)))
    });
    c.bench_function("streaming/batch", |b| {
        b.iter(|| {
            black_box(stream(
                black_box(&md),
                RevealPolicy::Batch { max_pending: 64 },
            ))
        })
    });
}

criterion_group!(benches, bench_streaming);
criterion_main!(benches);
