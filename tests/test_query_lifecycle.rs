use layerdb::{
    CompareOp, DatabaseConfig, Error, ExecOutcome, ExecutionEngine, Predicate, ResultRow, Value,
};

fn open() -> ExecutionEngine {
    ExecutionEngine::open(DatabaseConfig::new()).unwrap()
}

fn select(engine: &mut ExecutionEngine, sql: &str) -> Vec<ResultRow> {
    match engine.execute(sql).unwrap() {
        ExecOutcome::Rows(rows) => rows,
        other => panic!("expected rows for {:?}, got {:?}", sql, other),
    }
}

fn row(id: i64, name: &str) -> ResultRow {
    vec![Some(Value::Integer(id)), Some(Value::from(name))]
}

/// Two-column table `t` holding (1, 'a') and (2, 'b')
fn two_row_table() -> ExecutionEngine {
    let mut engine = open();
    engine
        .execute("CREATE TABLE t (id INTEGER, name TEXT)")
        .unwrap();
    assert_eq!(
        engine.execute("INSERT INTO t VALUES (1,'a')").unwrap(),
        ExecOutcome::Count(1)
    );
    assert_eq!(
        engine.execute("INSERT INTO t VALUES (2,'b')").unwrap(),
        ExecOutcome::Count(2)
    );
    engine
}

#[test]
fn test_select_all_after_two_inserts() {
    let mut engine = two_row_table();
    assert_eq!(
        select(&mut engine, "SELECT * FROM t"),
        vec![row(1, "a"), row(2, "b")]
    );
}

#[test]
fn test_delete_by_id_removes_only_that_row() {
    let mut engine = two_row_table();
    select(&mut engine, "SELECT * FROM t");

    assert_eq!(
        engine.execute("DELETE FROM t WHERE id = 1").unwrap(),
        ExecOutcome::Count(1)
    );
    assert_eq!(select(&mut engine, "SELECT * FROM t"), vec![row(2, "b")]);
}

#[test]
fn test_projection_after_delete() {
    let mut engine = two_row_table();
    engine.execute("DELETE FROM t WHERE id = 1").unwrap();

    assert_eq!(
        select(&mut engine, "SELECT name FROM t WHERE id = 2"),
        vec![vec![Some(Value::from("b"))]]
    );
}

#[test]
fn test_deleted_row_never_surfaces() {
    // Indexed equality lookup on the durable table
    let config = DatabaseConfig::new().acceleration_threshold(0);
    let mut engine = ExecutionEngine::open(config).unwrap();
    engine
        .execute("CREATE TABLE t (id INTEGER, name TEXT)")
        .unwrap();
    engine.execute("INSERT INTO t VALUES (1,'a')").unwrap();
    engine.execute("INSERT INTO t VALUES (2,'b')").unwrap();
    engine.execute("DELETE FROM t WHERE id = 1").unwrap();

    assert!(select(&mut engine, "SELECT * FROM t WHERE id = 1").is_empty());
    assert!(select(&mut engine, "SELECT * FROM t WHERE name = 'a'").is_empty());
    assert!(select(&mut engine, "SELECT * FROM t WHERE id <= 1").is_empty());

    // Same lookups against the materialized copy
    let mut engine = two_row_table();
    engine.execute("DELETE FROM t WHERE id = 1").unwrap();
    select(&mut engine, "SELECT * FROM t");
    assert!(engine.is_materialized("t"));
    assert!(select(&mut engine, "SELECT * FROM t WHERE id = 1").is_empty());
    assert!(select(&mut engine, "SELECT * FROM t WHERE id < 2").is_empty());
}

#[test]
fn test_equality_returns_every_duplicate() {
    let config = DatabaseConfig::new().acceleration_threshold(0);
    let mut engine = ExecutionEngine::open(config).unwrap();
    engine
        .execute("CREATE TABLE heroes (id INTEGER, clan TEXT)")
        .unwrap();
    for i in 0..20 {
        let clan = if i % 4 == 0 { "pandava" } else { "kaurava" };
        engine
            .execute(&format!("INSERT INTO heroes VALUES ({}, '{}')", i, clan))
            .unwrap();
    }

    let rows = select(&mut engine, "SELECT id FROM heroes WHERE clan = 'pandava'");
    let ids: Vec<_> = rows.into_iter().map(|r| r[0].clone()).collect();
    assert_eq!(
        ids,
        [0, 4, 8, 12, 16]
            .into_iter()
            .map(|i| Some(Value::Integer(i)))
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_select_after_mutation_is_never_stale() {
    let mut engine = two_row_table();
    let sql = "SELECT * FROM t";

    assert_eq!(select(&mut engine, sql).len(), 2);
    engine.execute("INSERT INTO t VALUES (3,'c')").unwrap();
    assert_eq!(select(&mut engine, sql).len(), 3);
    engine.execute("DELETE FROM t WHERE name = 'c'").unwrap();
    assert_eq!(select(&mut engine, sql).len(), 2);
    engine.execute("DELETE FROM t").unwrap();
    assert!(select(&mut engine, sql).is_empty());
}

#[test]
fn test_mutation_of_one_table_keeps_other_cached() {
    let mut engine = two_row_table();
    engine
        .execute("CREATE TABLE t_archive (id INTEGER, name TEXT)")
        .unwrap();
    engine.execute("INSERT INTO t_archive VALUES (9,'z')").unwrap();

    select(&mut engine, "SELECT * FROM t_archive");
    engine.execute("INSERT INTO t VALUES (3,'c')").unwrap();
    select(&mut engine, "SELECT * FROM t_archive");

    let stats = engine.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache.hits, 1);
}

#[test]
fn test_verbatim_text_keys_the_cache() {
    let mut engine = two_row_table();
    select(&mut engine, "SELECT * FROM t");
    select(&mut engine, "select * from t");
    select(&mut engine, "SELECT * FROM t");

    let stats = engine.stats();
    assert_eq!((stats.cache_hits, stats.cache_misses), (1, 2));
    assert_eq!(stats.cache.query_cache_size, 2);
    assert!((stats.cache.hit_rate - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_row_ids_strictly_increase() {
    let mut engine = open();
    engine.execute("CREATE TABLE t (v INTEGER)").unwrap();

    let mut last = 0;
    for i in 0..30 {
        let id = engine
            .execute(&format!("INSERT INTO t VALUES ({})", i))
            .unwrap()
            .count()
            .unwrap();
        assert!(id > last);
        last = id;
        if i % 7 == 0 {
            engine
                .execute(&format!("DELETE FROM t WHERE v = {}", i))
                .unwrap();
        }
    }
    engine.execute("DELETE FROM t").unwrap();
    assert_eq!(
        engine.execute("INSERT INTO t VALUES (0)").unwrap(),
        ExecOutcome::Count(31)
    );
}

#[test]
fn test_mixed_numeric_comparison() {
    let mut engine = open();
    engine
        .execute("CREATE TABLE m (id INTEGER, price REAL)")
        .unwrap();
    engine.execute("INSERT INTO m VALUES (1, 9.5)").unwrap();
    engine.execute("INSERT INTO m VALUES (2, 10)").unwrap();

    assert_eq!(select(&mut engine, "SELECT id FROM m WHERE price >= 10.0").len(), 1);
    assert_eq!(select(&mut engine, "SELECT id FROM m WHERE price = 10").len(), 1);
    assert_eq!(select(&mut engine, "SELECT id FROM m WHERE price < 100").len(), 2);
    assert!(select(&mut engine, "SELECT id FROM m WHERE price = 'x'").is_empty());
}

#[test]
fn test_describe_reports_declared_schema() {
    let mut engine = open();
    engine
        .execute("CREATE TABLE users (id integer PRIMARY KEY, name varchar(100) NOT NULL, bio TEXT)")
        .unwrap();

    let text = |s: &str| Some(Value::from(s));
    assert_eq!(
        select(&mut engine, "DESCRIBE users;"),
        vec![
            vec![text("id"), text("INTEGER"), text("PRIMARY KEY")],
            vec![text("name"), text("VARCHAR(100)"), text("NOT NULL")],
            vec![text("bio"), text("TEXT"), text("")],
        ]
    );
}

#[test]
fn test_every_failure_is_an_execution_error() {
    let mut engine = two_row_table();

    let cases = [
        ("SELECT * FROM missing", "does not exist"),
        ("CREATE TABLE t (x INTEGER)", "already exists"),
        ("INSERT INTO t VALUES (1)", "expected 2 values, got 1"),
        ("SELECT * FROM t WHERE name < 1", "cannot compare"),
        ("UPDATE t SET id = 1", "Parse error"),
        ("SELECT * FROM t WHERE", "Parse error"),
    ];
    for (sql, message) in cases {
        let err = engine.execute(sql).unwrap_err();
        assert!(matches!(err, Error::ExecutionError(_)), "{}", sql);
        assert!(err.to_string().contains(message), "{}: {}", sql, err);
    }

    let stats = engine.stats();
    assert_eq!(stats.statements_executed, 3 + cases.len() as u64);
    assert_eq!(stats.tables, vec!["t".to_string()]);
}

fn durable_and_materialized(setup: &[&str]) -> (ExecutionEngine, ExecutionEngine) {
    let mut durable = ExecutionEngine::open(DatabaseConfig::new().acceleration_threshold(0)).unwrap();
    let mut materialized = open();
    for sql in setup {
        durable.execute(sql).unwrap();
        materialized.execute(sql).unwrap();
    }
    select(&mut materialized, "SELECT * FROM t");
    assert!(!durable.is_materialized("t"));
    assert!(materialized.is_materialized("t"));
    (durable, materialized)
}

#[test]
fn test_large_integers_compare_exactly_on_every_path() {
    let (mut durable, mut materialized) = durable_and_materialized(&[
        "CREATE TABLE t (v INTEGER)",
        "INSERT INTO t VALUES (9007199254740993)",
        "INSERT INTO t VALUES (9007199254740992)",
    ]);

    let cases = [
        ("SELECT v FROM t WHERE v = 9007199254740992.0", vec![9007199254740992]),
        ("SELECT v FROM t WHERE v > 9007199254740992.0", vec![9007199254740993]),
        ("SELECT v FROM t WHERE v >= 9007199254740992.0", vec![9007199254740993, 9007199254740992]),
        ("SELECT v FROM t WHERE v != 9007199254740992.0", vec![9007199254740993]),
    ];
    for (sql, expected) in cases {
        let expected: Vec<ResultRow> = expected
            .into_iter()
            .map(|v| vec![Some(Value::Integer(v))])
            .collect();
        assert_eq!(select(&mut durable, sql), expected, "durable: {}", sql);
        assert_eq!(select(&mut materialized, sql), expected, "materialized: {}", sql);
    }
}

#[test]
fn test_fractional_reals_never_equal_integers() {
    let (mut durable, mut materialized) = durable_and_materialized(&[
        "CREATE TABLE t (v INTEGER)",
        "INSERT INTO t VALUES (2)",
        "INSERT INTO t VALUES (3)",
    ]);

    for engine in [&mut durable, &mut materialized] {
        assert!(select(engine, "SELECT v FROM t WHERE v = 2.5").is_empty());
        assert_eq!(select(engine, "SELECT v FROM t WHERE v = 3.0").len(), 1);
        assert_eq!(select(engine, "SELECT v FROM t WHERE v < 2.5").len(), 1);
    }
}

#[test]
fn test_programmatic_api() {
    let mut engine = open();
    engine
        .create_table("heroes", &[("id", "integer"), ("name", "text")])
        .unwrap();
    assert_eq!(engine.table_names(), vec!["heroes"]);

    assert_eq!(
        engine.insert("heroes", vec![Value::Integer(1), Value::from("Arjuna")]).unwrap(),
        1
    );
    assert_eq!(
        engine.insert("heroes", vec![Value::Integer(2), Value::from("O'Neil")]).unwrap(),
        2
    );

    let quoted = Predicate::new("name", CompareOp::Eq, "O'Neil");
    assert_eq!(
        engine.select("heroes", Some(&["id"]), Some(quoted.clone())).unwrap(),
        vec![vec![Some(Value::Integer(2))]]
    );
    assert_eq!(engine.select("heroes", None, None).unwrap().len(), 2);

    // Canonical text shares cache entries with the equivalent SQL
    let before = engine.stats().cache_hits;
    select(&mut engine, "SELECT * FROM heroes");
    select(&mut engine, "SELECT id FROM heroes WHERE name = 'O''Neil'");
    assert_eq!(engine.stats().cache_hits, before + 2);

    assert_eq!(engine.delete("heroes", Some(quoted)).unwrap(), 1);
    assert_eq!(engine.select("heroes", None, None).unwrap().len(), 1);
    assert_eq!(engine.delete("heroes", None).unwrap(), 1);
    assert!(engine.select("heroes", None, None).unwrap().is_empty());

    assert_eq!(
        select(&mut engine, "DESCRIBE heroes"),
        vec![
            vec![Some(Value::from("id")), Some(Value::from("INTEGER")), Some(Value::from(""))],
            vec![Some(Value::from("name")), Some(Value::from("TEXT")), Some(Value::from(""))],
        ]
    );
}

#[test]
fn test_programmatic_api_errors_are_execution_errors() {
    let mut engine = open();
    engine.create_table("t", &[("id", "INTEGER")]).unwrap();
    engine.insert("t", vec![Value::Integer(1)]).unwrap();
    let executed = engine.stats().statements_executed;

    let errors = [
        engine.create_table("t", &[("id", "INTEGER")]).unwrap_err(),
        engine.insert("t", vec![]).unwrap_err(),
        engine.insert("missing", vec![Value::Integer(1)]).unwrap_err(),
        engine.select("missing", None, None).unwrap_err(),
        engine
            .select("t", None, Some(Predicate::new("id", CompareOp::Lt, "x")))
            .unwrap_err(),
        engine.delete("missing", None).unwrap_err(),
    ];
    for err in &errors {
        assert!(matches!(err, Error::ExecutionError(_)), "{}", err);
    }
    assert!(errors[0].to_string().contains("already exists"));
    assert!(errors[1].to_string().contains("expected 1 values, got 0"));
    assert!(errors[3].to_string().contains("table 'missing' does not exist"));
    assert!(errors[4].to_string().contains("cannot compare"));

    assert_eq!(
        engine.stats().statements_executed,
        executed + errors.len() as u64
    );
}
