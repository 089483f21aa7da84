use astprobe_core::config::ParsingConfig;
use astprobe_core::{DependencyTree, to_distance_matrix};
use astprobe_parser::{Language, SourceParser, parse_batch};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const SAMPLE_PYTHON: &str = r#"
def get_user(self, user_id: int):
    """Retrieve user by ID."""
    if not self.connection:
        raise RuntimeError("Not connected")
    # single row lookup
    return self.connection.execute("SELECT * FROM users WHERE id = ?", (user_id,))
"#;

const SAMPLE_JAVA: &str = r"
public int sum(int[] values) {
    int total = 0;
    for (int v : values) {
        total += v;
    }
    return total;
}
";

fn bench_python_parse(c: &mut Criterion) {
    let mut parser = SourceParser::new(Language::Python, ParsingConfig::default()).unwrap();
    c.bench_function("parse_python", |b| {
        b.iter(|| parser.parse(black_box(SAMPLE_PYTHON)).unwrap())
    });
}

fn bench_java_parse(c: &mut Criterion) {
    let mut parser = SourceParser::new(Language::Java, ParsingConfig::default()).unwrap();
    c.bench_function("parse_java", |b| {
        b.iter(|| parser.parse(black_box(SAMPLE_JAVA)).unwrap())
    });
}

fn bench_dependency_distances(c: &mut Criterion) {
    let mut parser = SourceParser::new(Language::Python, ParsingConfig::default()).unwrap();
    let parsed = parser.parse(SAMPLE_PYTHON).unwrap();
    c.bench_function("dependency_distance_matrix", |b| {
        b.iter(|| {
            let deps = DependencyTree::extract(black_box(&parsed.tree)).unwrap();
            to_distance_matrix(&deps, &parsed.code).unwrap()
        })
    });
}

fn bench_constituency_distances(c: &mut Criterion) {
    let mut parser = SourceParser::new(Language::Python, ParsingConfig::default()).unwrap();
    let parsed = parser.parse(SAMPLE_PYTHON).unwrap();
    c.bench_function("constituency_distance_matrix", |b| {
        b.iter(|| to_distance_matrix(black_box(&parsed.tree), &parsed.code).unwrap())
    });
}

fn bench_parallel_parsing(c: &mut Criterion) {
    let codes: Vec<String> = (0..50).map(|_| SAMPLE_PYTHON.to_string()).collect();
    let config = ParsingConfig::default();
    c.bench_function("parse_batch_50", |b| {
        b.iter(|| parse_batch(Language::Python, &config, black_box(&codes)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_python_parse,
    bench_java_parse,
    bench_dependency_distances,
    bench_constituency_distances,
    bench_parallel_parsing
);
criterion_main!(benches);
