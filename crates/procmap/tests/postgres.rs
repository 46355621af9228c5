//! End-to-end checks against a live PostgreSQL; skipped without `DATABASE_URL`.

mod common;

use common::{Customer, Order};
use procmap::{AsyncMapper, Command, PgExecutor, create_pool};
use rust_decimal::Decimal;
use std::error::Error;

type TestResult = Result<(), Box<dyn Error>>;

fn database_url(test: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("DATABASE_URL") {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            None
        }
    }
}

fn mapper(url: &str) -> Result<AsyncMapper<PgExecutor>, Box<dyn Error>> {
    Ok(AsyncMapper::new(PgExecutor::new(create_pool(url)?)))
}

#[tokio::test]
async fn text_command_with_bound_parameter() -> TestResult {
    let Some(url) = database_url("text_command_with_bound_parameter") else {
        return Ok(());
    };
    let mapper = mapper(&url)?;

    let cmd = Command::text(
        "SELECT id, name, NULL::text AS email_address \
         FROM (VALUES (1::int8, 'a'::text), (2::int8, 'b'::text)) AS t(id, name) \
         WHERE id >= $1 ORDER BY id",
    )
    .bind("min_id", 2_i64);
    let rows: Vec<Customer> = mapper.fetch_all(&cmd).await?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "b");
    assert_eq!(rows[0].email, None);
    Ok(())
}

#[tokio::test]
async fn windowed_total_fills_the_page() -> TestResult {
    let Some(url) = database_url("windowed_total_fills_the_page") else {
        return Ok(());
    };
    let mapper = mapper(&url)?;

    let cmd = Command::text(
        "SELECT id, name, count(*) OVER () AS total_rows \
         FROM (VALUES (1::int8, 'a'::text), (2::int8, 'b'::text), (3::int8, 'c'::text)) \
         AS t(id, name) ORDER BY id LIMIT $1",
    )
    .bind("rows_per_page", 2_i64);
    let page = mapper.fetch_page::<Customer>(&cmd, "total_rows").await?;

    assert_eq!(page.len(), 2);
    assert_eq!(page.virtual_total, 3);
    Ok(())
}

#[tokio::test]
async fn refcursor_routine_loads_related_sets() -> TestResult {
    let Some(url) = database_url("refcursor_routine_loads_related_sets") else {
        return Ok(());
    };
    let mapper = mapper(&url)?;
    let routine = format!("procmap_test_customers_orders_{}", std::process::id());

    let create = format!(
        "CREATE OR REPLACE FUNCTION {routine}() RETURNS SETOF refcursor LANGUAGE plpgsql AS $$
         DECLARE customers refcursor; orders refcursor;
         BEGIN
           OPEN customers FOR
             SELECT * FROM (VALUES (1::int8, 'a'::text), (2::int8, 'b'::text)) AS t(id, name);
           RETURN NEXT customers;
           OPEN orders FOR
             SELECT * FROM (VALUES (10::int8, 1::int8, 5.5::numeric), (11::int8, 1::int8, 6::numeric))
             AS t(id, customer_id, amount);
           RETURN NEXT orders;
         END $$"
    );
    mapper.execute(&Command::text(create)).await?;

    let result = mapper
        .fetch_related::<Customer, Order>(&Command::procedure(&routine).returns_cursors())
        .await;
    mapper
        .execute(&Command::text(format!("DROP FUNCTION IF EXISTS {routine}()")))
        .await?;

    let customers = result?;
    assert_eq!(customers.len(), 2);
    assert_eq!(customers[0].orders.len(), 2);
    assert_eq!(customers[0].orders[0].amount, Decimal::new(55, 1));
    assert!(customers[1].orders.is_empty());
    Ok(())
}
