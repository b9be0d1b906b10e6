//! Determinism and range properties of the random operator catalog.

use proptest::prelude::*;
use sortition::random::{DrawContext, HashVersion, SHA1_SCALE, hash, ops, uniform_float};
use sortition::{Assignment, RandomOp, Value};

fn unit_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        "[a-z0-9_-]{1,16}".prop_map(Value::String),
    ]
}

fn choices(n: usize) -> Vec<Value> {
    (0..n as i64).map(Value::Integer).collect()
}

proptest! {
    #[test]
    fn hashing_is_deterministic(salt in "[a-z_.]{1,24}", unit in unit_strategy()) {
        let units = [unit];
        prop_assert_eq!(hash(&salt, &units).unwrap(), hash(&salt, &units).unwrap());
    }

    #[test]
    fn uniform_float_stays_in_unit_interval(h in 0..=SHA1_SCALE) {
        let x = uniform_float(h);
        prop_assert!((0.0..=1.0).contains(&x));
    }

    #[test]
    fn blake3_uniform_float_stays_below_one(h in any::<u64>()) {
        let x = HashVersion::Blake3.uniform_float(h);
        prop_assert!((0.0..1.0).contains(&x));
    }

    #[test]
    fn sha1_hashes_fit_fifteen_hex_digits(salt in "[a-z_.]{1,24}", unit in unit_strategy()) {
        prop_assert!(hash(&salt, &[unit]).unwrap() <= SHA1_SCALE);
    }

    #[test]
    fn random_integer_is_inclusive_range(
        unit in unit_strategy(),
        min in -1_000i64..1_000,
        span in 0i64..1_000,
    ) {
        let units = [unit];
        let ctx = DrawContext::new("exp.n", &units);
        let value = ops::random_integer(&ctx, min, min + span).unwrap();
        prop_assert!(value >= min && value <= min + span);
    }

    #[test]
    fn random_float_stays_in_range(
        unit in unit_strategy(),
        min in -100.0f64..100.0,
        width in 0.001f64..50.0,
    ) {
        let units = [unit];
        let ctx = DrawContext::new("exp.f", &units);
        let value = ops::random_float(&ctx, min, min + width).unwrap();
        prop_assert!(value >= min && value <= min + width);
    }

    #[test]
    fn uniform_choice_returns_a_member(unit in unit_strategy(), n in 1usize..20) {
        let units = [unit];
        let ctx = DrawContext::new("exp.pick", &units);
        let pool = choices(n);
        let picked = ops::uniform_choice(&ctx, &pool).unwrap();
        prop_assert!(pool.contains(&picked));
    }

    #[test]
    fn weighted_choice_never_picks_zero_weight(unit in unit_strategy()) {
        let units = [unit];
        let ctx = DrawContext::new("exp.w", &units);
        let pool = vec![Value::from("never"), Value::from("always"), Value::from("also_never")];
        let picked = ops::weighted_choice(&ctx, &pool, &[0.0, 3.0, 0.0]).unwrap();
        prop_assert_eq!(picked, Value::from("always"));
    }

    #[test]
    fn sample_draws_distinct_members(
        unit in unit_strategy(),
        n in 0usize..12,
        draws in proptest::option::of(0i64..15),
    ) {
        let units = [unit];
        let ctx = DrawContext::new("exp.s", &units);
        let pool = choices(n);
        let picked = ops::sample(&ctx, &pool, draws).unwrap();

        let expected = draws.map_or(n, |d| (d as usize).min(n));
        prop_assert_eq!(picked.len(), expected);
        let mut seen = picked.clone();
        seen.sort_by_key(|v| v.as_i64());
        seen.dedup();
        prop_assert_eq!(seen.len(), picked.len());
        prop_assert!(picked.iter().all(|v| pool.contains(v)));
    }

    #[test]
    fn bernoulli_trial_extremes_are_certain(unit in unit_strategy()) {
        let units = [unit];
        let ctx = DrawContext::new("exp.b", &units);
        prop_assert_eq!(ops::bernoulli_trial(&ctx, 0.0).unwrap(), 0);
        prop_assert_eq!(ops::bernoulli_trial(&ctx, 1.0).unwrap(), 1);
    }

    #[test]
    fn draws_depend_only_on_salt_and_unit(unit in unit_strategy()) {
        let op = RandomOp::random_integer(0, 1_000_000).unit(unit);
        let mut first = Assignment::new("exp");
        let mut second = Assignment::new("exp");
        second.set("noise", 99);
        prop_assert_eq!(
            first.draw("x", op.clone()).unwrap(),
            second.draw("x", op).unwrap()
        );
    }
}

#[test]
fn uniform_choice_is_roughly_balanced() {
    let pool = choices(4);
    let mut counts = [0usize; 4];
    for i in 0..4_000i64 {
        let units = [Value::Integer(i)];
        let ctx = DrawContext::new("balance.arm", &units);
        let picked = ops::uniform_choice(&ctx, &pool).unwrap();
        counts[picked.as_i64().unwrap() as usize] += 1;
    }
    for count in counts {
        assert!((850..1_150).contains(&count), "counts = {:?}", counts);
    }
}

#[test]
fn bernoulli_trial_tracks_probability() {
    let hits: i64 = (0..5_000i64)
        .map(|i| {
            let units = [Value::Integer(i)];
            ops::bernoulli_trial(&DrawContext::new("balance.coin", &units), 0.2).unwrap()
        })
        .sum();
    assert!((850..1_150).contains(&hits), "hits = {}", hits);
}
