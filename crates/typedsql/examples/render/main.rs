//! Example rendering statements without a database.
//!
//! Prints the SQL, arguments and interpolated text of a few statements in
//! both dialects.
//!
//! Run with:
//!   cargo run --example render -p typedsql

use typedsql::{
    BuiltQuery, Cte, Postgres, Query, SqResult, Sqlite, Value, Window, case_when, count, fields,
    gt, literal, predicatef, predicates, queries, row_number_over, set_excluded, sum,
};

typedsql::define_table! {
    pub struct Users("users") {
        pub user_id: NumberField = "user_id" ["PRIMARY KEY"],
        pub name: StringField = "name" ["NOT NULL"],
        pub email: StringField = "email" ["UNIQUE"],
        pub active: BooleanField = "active",
        pub created_at: TimeField = "created_at",
    }
}

typedsql::define_table! {
    pub struct Orders("orders") {
        pub order_id: NumberField = "order_id" ["PRIMARY KEY"],
        pub user_id: NumberField = "user_id",
        pub total: NumberField = "total",
    }
}

fn show(title: &str, built: BuiltQuery) -> SqResult<()> {
    println!("-- {title} ({})", built.dialect);
    println!("{}", built.sql);
    println!("args: {:?}", built.args);
    println!("interpolated: {}\n", built.interpolate()?);
    Ok(())
}

fn main() -> SqResult<()> {
    let u = Users::aliased("u");
    let o = Orders::aliased("o");

    let active_users = Sqlite
        .from(u.clone())
        .select(fields![u.user_id.clone(), u.name.clone()])
        .where_(u.active.clone())
        .where_(u.name.like_string("a%"))
        .order_by(fields![u.created_at.desc()])
        .limit(20);
    show("active users", active_users.to_sql()?)?;

    // Same shape, numbered placeholders.
    let by_email = Postgres
        .from(u.clone())
        .select(fields![u.user_id.clone()])
        .where_(u.email.in_strings(["a@example.com", "b@example.com"]));
    show("by email", by_email.to_sql()?)?;

    let w = Window::new()
        .partition_by(fields![o.user_id.clone()])
        .order_by(fields![o.total.desc()]);
    let ranked = Postgres.from(o.clone()).select(fields![
        o.order_id.clone(),
        row_number_over(&w).with_alias("rank"),
        case_when(o.total.gt_int(100), literal("'big'"))
            .else_(literal("'small'"))
            .with_alias("size"),
    ]);
    show("ranked orders", ranked.to_sql()?)?;

    let spend = Sqlite
        .select(fields![
            u.name.clone(),
            count().with_alias("n"),
            sum(o.total.clone()).with_alias("spent"),
        ])
        .from(u.clone())
        .left_join(o.clone(), predicates![o.user_id.eq(&u.user_id)])
        .group_by(fields![u.name.clone()])
        .having(gt(count(), 2));
    show("spend per user", spend.to_sql()?)?;

    // 10, 20, ..., 100
    let t = Cte::recursive("t", ["n"])
        .initial(Sqlite.select(fields![literal("10")]))
        .union_all(queries![
            Sqlite
                .select(fields![literal("n+10")])
                .from(Cte::recursive("t", ["n"]))
                .where_(predicatef("n+10<=100", vec![])),
        ]);
    let tens = Sqlite.with([t.clone()]).select(fields![t.field("n")]).from(t);
    show("recursive cte", tens.to_sql()?)?;

    let users = Users::new();
    let upsert = Postgres
        .insert_into(users.clone())
        .columns(fields![users.user_id.clone(), users.name.clone()])
        .values(vec![Value::from(1), Value::from("alice")])
        .values(vec![Value::from(2), Value::from("bob")])
        .on_conflict(fields![users.user_id.clone()])
        .do_update_set([set_excluded(&users.name)]);
    show("upsert", upsert.to_sql()?)?;

    Ok(())
}
