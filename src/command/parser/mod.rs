pub mod spec;

pub use spec::{parse_json, parse_spec, parse_toml};
