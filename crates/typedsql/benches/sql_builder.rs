use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use typedsql::{
    FieldRef, NumberField, Postgres, PostgresSelect, PredicateRef, Query, Sqlite, TableInfo, Value,
    or, predicates, question_to_dollar,
};

/// SELECT c0, c1, ... FROM t WHERE c0 = ? AND c1 = ? ...
fn build_select(n: usize) -> PostgresSelect {
    let t = TableInfo::new("t");
    let cols: Vec<NumberField> = (0..n).map(|i| NumberField::new(format!("c{i}"), &t)).collect();
    let fields: Vec<FieldRef> = cols.iter().map(|c| Arc::new(c.clone()) as FieldRef).collect();
    let mut q = Postgres.from(t).select(fields);
    for (i, c) in cols.iter().enumerate() {
        q = q.where_(c.eq_int(i as i64));
    }
    q
}

fn bench_to_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/to_sql");

    for n in [1, 5, 10, 50, 100] {
        let q = build_select(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &q, |b, q| {
            b.iter(|| black_box(q.to_sql()));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/build_and_render");

    for n in [1, 5, 10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(build_select(n).to_sql()));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/in_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let t = TableInfo::new("t");
                let id = NumberField::new("id", &t);
                let q = Sqlite
                    .from(t)
                    .where_(id.in_ints(values.iter().copied()));
                black_box(q.to_sql())
            });
        });
    }

    group.finish();
}

fn bench_nested_predicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/nested_predicates");

    for depth in [2, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let t = TableInfo::new("t");
                let a = NumberField::new("a", &t);
                let mut p: PredicateRef = Arc::new(a.eq_int(0));
                for i in 1..depth {
                    p = Arc::new(or(predicates![p, a.gt_int(i as i64)]));
                }
                black_box(Sqlite.from(t).where_(p).to_sql())
            });
        });
    }

    group.finish();
}

fn bench_question_to_dollar(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/question_to_dollar");

    for n in [10, 100, 1000] {
        let sql = (0..n).map(|_| "?").collect::<Vec<_>>().join(", ");
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(question_to_dollar(sql)));
        });
    }

    group.finish();
}

fn bench_values_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_builder/insert_values");

    for rows in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| {
                let t = TableInfo::new("t");
                let id = NumberField::new("id", &t);
                let mut q = Postgres.insert_into(t).columns([Arc::new(id) as FieldRef]);
                for i in 0..rows {
                    q = q.values(vec![Value::from(i as i64)]);
                }
                black_box(q.to_sql())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_to_sql,
    bench_build_and_render,
    bench_in_list,
    bench_nested_predicates,
    bench_question_to_dollar,
    bench_values_rows,
);
criterion_main!(benches);
