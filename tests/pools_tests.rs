mod common;

use mealforge::config::CodeSpec;
use mealforge::pools::{resolve_pools, PoolWarning, MAX_REFERENCE_DEPTH};
use serde_json::json;
use std::time::{Duration, Instant};

#[test]
fn test_literal_reference_and_pattern_pools() {
    let foods = common::foods();
    let cfg = common::config();
    let res = resolve_pools(&cfg.component_pools, &foods);

    assert_eq!(res.pools.get("proteins").unwrap(), &["P.1", "P.2", "P.3"]);
    assert_eq!(
        res.pools.get("vegetables").unwrap(),
        &["V.1", "V.2", "V.3", "V.4"]
    );
    assert_eq!(
        res.pools.get("sides").unwrap(),
        &["V.1", "V.2", "V.3", "V.4", "B.1"]
    );
    assert!(res.warnings.is_empty(), "{:?}", res.warnings);
}

#[test]
fn test_data_problems_are_warnings() {
    let foods = common::foods();
    let pools = json!({
        "_comment": "ignored",
        "broken": "P.1",
        "mixed": ["p.1", "P.1", "NOPE.9", "@missing", "ZZ."],
        "empty": ["NOPE.1"]
    });
    let res = resolve_pools(pools.as_object().unwrap(), &foods);

    assert_eq!(res.pools.get("mixed").unwrap(), &["P.1"]);
    assert!(res.pools.get("empty").is_none());
    assert!(res.pools.get("broken").is_none());

    let expected = [
        PoolWarning::NotAList { pool: "broken".into() },
        PoolWarning::UnknownReference { pool: "mixed".into(), reference: "missing".into() },
        PoolWarning::DuplicateCode { pool: "mixed".into(), code: "P.1".into() },
        PoolWarning::UnknownCode { pool: "mixed".into(), code: "NOPE.9".into() },
        PoolWarning::PatternNoMatch { pool: "mixed".into(), pattern: "ZZ.".into() },
        PoolWarning::EmptyPool { pool: "empty".into() },
    ];
    for w in &expected {
        assert!(res.warnings.contains(w), "missing {:?} in {:?}", w, res.warnings);
    }
}

fn assert_unique(codes: &[String]) {
    let mut sorted = codes.to_vec();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), codes.len(), "{:?}", codes);
}

fn cycle(pool: &str, reference: &str) -> PoolWarning {
    PoolWarning::ReferenceCycle {
        pool: pool.into(),
        reference: reference.into(),
    }
}

#[test]
fn test_reference_cycle_terminates() {
    let foods = common::foods();
    let pools = json!({
        "a": ["@b", "P.1"],
        "b": ["@a", "P.2"]
    });
    let res = resolve_pools(pools.as_object().unwrap(), &foods);

    assert_eq!(res.pools.get("a").unwrap(), &["P.2", "P.1"]);
    assert_eq!(res.pools.get("b").unwrap(), &["P.1", "P.2"]);
    assert!(res.warnings.contains(&cycle("a", "b")), "{:?}", res.warnings);
    assert!(res.warnings.contains(&cycle("b", "a")), "{:?}", res.warnings);
}

#[test]
fn test_repeated_self_reference_stays_bounded() {
    let foods = common::foods();
    let pools = json!({ "a": ["@a", "@a", "@a", "P.1"] });

    let started = Instant::now();
    let res = resolve_pools(pools.as_object().unwrap(), &foods);
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(res.pools.get("a").unwrap(), &["P.1"]);
    assert_eq!(res.warnings, vec![cycle("a", "a")]);
}

#[test]
fn test_mutual_cycle_with_repeated_references() {
    let foods = common::foods();
    let pools = json!({
        "a": ["@b", "@b", "@a", "P.1"],
        "b": ["@a", "@a", "@b", "P.2", "V."]
    });

    let started = Instant::now();
    let res = resolve_pools(pools.as_object().unwrap(), &foods);
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(
        res.pools.get("a").unwrap(),
        &["P.2", "V.1", "V.2", "V.3", "V.4", "P.1"]
    );
    assert_eq!(
        res.pools.get("b").unwrap(),
        &["P.1", "P.2", "V.1", "V.2", "V.3", "V.4"]
    );
    for (_, codes) in res.pools.iter() {
        assert_unique(codes);
    }
    for w in [cycle("a", "a"), cycle("a", "b"), cycle("b", "a"), cycle("b", "b")] {
        assert!(res.warnings.contains(&w), "missing {:?} in {:?}", w, res.warnings);
    }
    assert!(!res
        .warnings
        .iter()
        .any(|w| matches!(w, PoolWarning::DuplicateCode { .. })));
}

#[test]
fn test_reference_chain_deeper_than_limit_is_cut() {
    let foods = common::foods();
    let mut pools = serde_json::Map::new();
    for i in 0..=MAX_REFERENCE_DEPTH {
        pools.insert(format!("p{:02}", i), json!([format!("@p{:02}", i + 1)]));
    }
    pools.insert(format!("p{:02}", MAX_REFERENCE_DEPTH + 1), json!(["P.1"]));
    let res = resolve_pools(&pools, &foods);

    // p00 needs eleven references to reach a code; p01 needs ten.
    assert!(res.pools.get("p00").is_none());
    assert_eq!(res.pools.get("p01").unwrap(), &["P.1"]);
    assert!(res.warnings.contains(&PoolWarning::UnresolvedReference {
        pool: "p10".into(),
        reference: "p11".into(),
    }));
}

#[test]
fn test_nested_references() {
    let foods = common::foods();
    let pools = json!({
        "outer": ["@middle"],
        "middle": ["@inner", "V.1"],
        "inner": ["P.2"]
    });
    let res = resolve_pools(pools.as_object().unwrap(), &foods);
    assert_eq!(res.pools.get("outer").unwrap(), &["P.2", "V.1"]);
    assert!(res.warnings.is_empty());
}

#[test]
fn test_expand_spec_with_pool_reference() {
    let foods = common::foods();
    let cfg = common::config();
    let pools = common::pools(&cfg, &foods);

    let spec = CodeSpec::Many(vec!["pool:proteins".into(), "v.1".into()]);
    assert_eq!(pools.expand_spec(&spec), vec!["P.1", "P.2", "P.3", "V.1"]);
    assert!(pools.expand_spec(&CodeSpec::One("pool:nope".into())).is_empty());
}
