use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use invoicer_infra::import::{ImportDefaults, RawRow, validate_batch};
use invoicer_infra::services::{InvoiceNumberPolicy, InvoiceService};
use invoicer_infra::store::InMemoryRecordStore;
use invoicer_invoicing::{NewItem, compute_invoice_totals};
use std::sync::Arc;

fn rows(count: usize) -> Vec<RawRow> {
    (0..count)
        .map(|i| RawRow {
            customer_name: Some(format!("Customer {i}")),
            invoice_number: Some(format!("INV-202403-{i:04}")),
            issue_date: Some("2024-03-15".to_string()),
            due_date: Some("2024-04-15".to_string()),
            items: Some(
                r#"[{"description":"Consulting","quantity":2,"unitPrice":100,"taxRate":10},
                    {"description":"Hosting","quantity":12,"unitPrice":9.5,"taxRate":20}]"#
                    .to_string(),
            ),
            ..RawRow::default()
        })
        .collect()
}

fn bench_invoice_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoice_totals");

    for item_count in [1, 10, 100, 1000].iter() {
        let items: Vec<NewItem> = (0..*item_count)
            .map(|i| NewItem::new(format!("line {i}"), (i % 7 + 1) as u32, 12.5, 10.0))
            .collect();
        group.throughput(Throughput::Elements(*item_count as u64));
        group.bench_with_input(BenchmarkId::new("compute", item_count), &items, |b, items| {
            b.iter(|| black_box(compute_invoice_totals(black_box(items))));
        });
    }

    group.finish();
}

fn bench_batch_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_validation");
    let defaults = ImportDefaults::default();

    for row_count in [10, 100, 1000].iter() {
        let batch = rows(*row_count);
        group.throughput(Throughput::Elements(*row_count as u64));
        group.bench_with_input(BenchmarkId::new("validate", row_count), &batch, |b, batch| {
            b.iter(|| black_box(validate_batch(batch, &defaults, InvoiceNumberPolicy::Unique)));
        });
    }

    group.finish();
}

fn bench_persist_and_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("persist_and_query");
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime");

    for row_count in [10, 100].iter() {
        let validated = match validate_batch(
            &rows(*row_count),
            &ImportDefaults::default(),
            InvoiceNumberPolicy::Unique,
        ) {
            Ok(validated) => validated,
            Err(violations) => panic!("benchmark rows must be valid: {violations:?}"),
        };

        group.throughput(Throughput::Elements(*row_count as u64));
        group.bench_with_input(
            BenchmarkId::new("insert_then_by_number", row_count),
            &validated,
            |b, validated| {
                b.iter(|| {
                    rt.block_on(async {
                        let service =
                            InvoiceService::new(Arc::new(InMemoryRecordStore::invoicing()));
                        for row in validated {
                            service.create(row.draft.clone()).await.unwrap();
                        }
                        black_box(service.by_number("INV-202403-0000").await.unwrap())
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_invoice_totals,
    bench_batch_validation,
    bench_persist_and_query
);
criterion_main!(benches);
