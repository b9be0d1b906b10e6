//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

use sortition::{Params, Value};

static INIT_TRACING: Once = Once::new();

/// Install a test-writer subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a params map from literal pairs.
pub fn params(pairs: &[(&str, Value)]) -> Params {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// The two-statement program used by the round-trip scenarios.
pub const FOO_BAR_PROGRAM: &str = r#"
{"op": "seq",
 "seq": [
  {"op": "set",
   "var": "foo",
   "value": {
     "choices": ["a", "b"],
     "op": "uniformChoice",
     "unit": {"op": "get", "var": "i"}
   }
  },
  {"op": "set",
   "var": "bar",
   "value": 41
  }
 ]}
"#;
