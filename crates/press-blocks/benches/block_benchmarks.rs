use criterion::{Criterion, black_box, criterion_group, criterion_main};
use press_blocks::{BlockMatcher, DeleteMatching, Rule, parse};

fn article(paragraphs: usize) -> String {
    let mut body = String::new();
    for i in 0..paragraphs {
        body.push_str(&format!(
            "<!-- wp:paragraph -->\n<p>Paragraph {i} of the story.</p>\n<!-- /wp:paragraph -->\n\n"
        ));
        if i % 10 == 0 {
            body.push_str(
                "<!-- wp:html -->\n<div class=\"donate\">Support us</div>\n<!-- /wp:html -->\n\n",
            );
        }
    }
    body
}

fn parse_benchmark(c: &mut Criterion) {
    let body = article(200);
    c.bench_function("parse_200_blocks", |b| b.iter(|| parse(black_box(&body))));
}

fn round_trip_benchmark(c: &mut Criterion) {
    let body = article(200);
    c.bench_function("round_trip_200_blocks", |b| {
        b.iter(|| parse(black_box(&body)).serialize())
    });
}

fn delete_rule_benchmark(c: &mut Criterion) {
    let body = article(200);
    let rule = DeleteMatching::new("donations", BlockMatcher::kind("html").inner_contains("donate"));
    c.bench_function("delete_matching_200_blocks", |b| {
        b.iter(|| {
            let mut doc = parse(black_box(&body));
            rule.apply(&mut doc).map(|_| doc.serialize())
        })
    });
}

criterion_group!(
    benches,
    parse_benchmark,
    round_trip_benchmark,
    delete_rule_benchmark
);
criterion_main!(benches);
