//! Parser throughput over synthetic catalogue pages

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sacamantecas::domain::{ParserConfig, Pattern};
use sacamantecas::infrastructure::parse_metadata;

fn attribute_marker_page(records: usize) -> String {
    let mut page = String::from("<html><body><table>");
    for i in 0..records {
        page.push_str(&format!(
            r#"<tr><td class="k_field">Campo {i}:</td><td class="v_field">Valor <b>{i}</b> de prueba</td></tr>"#
        ));
    }
    page.push_str("</table></body></html>");
    page
}

fn metadata_block_page(records: usize) -> String {
    let mut page = String::from(r#"<html><body><div id="record"><dl>"#);
    for i in 0..records {
        page.push_str(&format!("<dt>Campo {i}</dt><dd>Valor {i} de prueba</dd>"));
    }
    page.push_str("</dl></div></body></html>");
    page
}

fn parser_throughput(c: &mut Criterion) {
    let attribute_marker = ParserConfig::AttributeMarker {
        key_class: Pattern::compile("^k_").unwrap(),
        value_class: Pattern::compile("^v_").unwrap(),
    };
    let metadata_block = ParserConfig::MetadataBlock {
        tag: Pattern::compile("div").unwrap(),
        attribute: Pattern::compile("id").unwrap(),
        value: Pattern::compile("^record$").unwrap(),
    };

    let mut group = c.benchmark_group("parse_metadata");
    for records in [10, 100, 1000] {
        let page = attribute_marker_page(records);
        group.throughput(Throughput::Bytes(page.len() as u64));
        group.bench_with_input(BenchmarkId::new("attribute_marker", records), &page, |b, page| {
            b.iter(|| parse_metadata(black_box(&attribute_marker), black_box(page)));
        });

        let page = metadata_block_page(records);
        group.throughput(Throughput::Bytes(page.len() as u64));
        group.bench_with_input(BenchmarkId::new("metadata_block", records), &page, |b, page| {
            b.iter(|| parse_metadata(black_box(&metadata_block), black_box(page)));
        });
    }
    group.finish();
}

criterion_group!(benches, parser_throughput);
criterion_main!(benches);
