//! Benchmarks for content extraction.

use article_extract::config::{ExtractionConfig, ReaderConfig};
use article_extract::pipeline::ContentPipeline;
use article_extract::readability::ReadabilityExtractor;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const URL: &str = "https://blog.example.com/2024/05/post.html";

fn synthetic_page(paragraphs: usize) -> String {
    let mut body = String::from("<nav><ul><li><a href=\"/\">Home</a></li><li><a href=\"/about\">About</a></li></ul></nav>");
    body.push_str("<div class=\"sidebar\"><p>Related posts and a newsletter form.</p></div><article><h1>Title</h1>");
    for i in 0..paragraphs {
        body.push_str(&format!(
            "<h2>Section {i}</h2><p>Paragraph {i} has a few sentences. It links to <a href=\"../p{i}.html\">a page</a>. \
             It also carries an image <img src=\"img{i}.png\"> inline!</p>"
        ));
    }
    body.push_str("</article><footer>Copyright</footer>");
    format!("<html><head><script>track()</script></head><body>{body}</body></html>")
}

fn readability_benchmark(c: &mut Criterion) {
    let page = synthetic_page(50);
    let extractor = ReadabilityExtractor::new(ExtractionConfig::default()).unwrap();
    c.bench_function("readability_extract", |b| {
        b.iter(|| extractor.extract(black_box(&page), URL).unwrap());
    });

    let pipeline = ContentPipeline::new(&ReaderConfig::default()).unwrap();
    c.bench_function("pipeline_process", |b| {
        b.iter(|| pipeline.process(black_box(&page), URL).unwrap());
    });
}

criterion_group!(benches, readability_benchmark);
criterion_main!(benches);
