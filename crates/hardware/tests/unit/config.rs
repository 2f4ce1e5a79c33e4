//! Machine configuration: defaults, JSON loading and validation.

use std::io::Write as _;

use pretty_assertions::assert_eq;
use rstest::rstest;
use sssim_core::Config;
use sssim_core::common::ConfigError;
use sssim_core::config::{
    BranchPredictor, CacheConfig, FunctionalUnitConfig, PipelineConfig, ReplacementPolicy, WritePolicy,
};
use sssim_core::isa::FuClass;

#[test]
fn defaults_are_valid() {
    let config = Config::default();
    config.validate().unwrap();
    assert_eq!(config.pipeline.fetch_width, 3);
    assert_eq!(config.pipeline.commit_width, 4);
    assert_eq!(config.pipeline.rob_size, 256);
    assert_eq!(config.pipeline.flush_penalty, 0);
    assert_eq!(config.pipeline.max_cycles, None);
    assert_eq!(config.predictor.kind, BranchPredictor::Static);
    assert_eq!(config.memory.size, 64 * 1024);
    assert!(!config.memory.cache.enabled);
    assert_eq!(config.memory.cache.lines, 64);
    assert_eq!(config.memory.cache.replacement, ReplacementPolicy::Lru);
    assert_eq!(config.memory.cache.write_policy, WritePolicy::WriteBack);
    for class in FuClass::ALL {
        assert!(config.unit(class).is_some(), "{class:?} missing by default");
    }
}

#[test]
fn json_fills_missing_fields_with_defaults() {
    let config = Config::from_json(r#"{ "memory": { "lsq_size": 8 } }"#).unwrap();
    assert_eq!(config.memory.lsq_size, 8);
    assert_eq!(config.memory.load_ports, 1);
    assert_eq!(config.pipeline.fetch_width, PipelineConfig::default().fetch_width);
    assert_eq!(config.units.len(), FuClass::ALL.len());
}

#[test]
fn cache_block_parses() {
    let json = r#"{
        "memory": {
            "cache": {
                "enabled": true,
                "lines": 16,
                "associativity": 4,
                "replacement": "Fifo",
                "write_policy": "WriteThrough",
                "miss_latency": 25
            }
        }
    }"#;
    let cache = Config::from_json(json).unwrap().memory.cache;
    assert_eq!(
        cache,
        CacheConfig {
            lines: 16,
            associativity: 4,
            replacement: ReplacementPolicy::Fifo,
            write_policy: WritePolicy::WriteThrough,
            miss_latency: 25,
            ..CacheConfig::enabled()
        }
    );
    assert_eq!(cache.sets(), 4);
}

#[rstest]
#[case("LRU", ReplacementPolicy::Lru)]
#[case("FIFO", ReplacementPolicy::Fifo)]
#[case("Random", ReplacementPolicy::Random)]
fn replacement_policies_parse(#[case] name: &str, #[case] expected: ReplacementPolicy) {
    let json = format!(r#"{{ "memory": {{ "cache": {{ "replacement": "{name}" }} }} }}"#);
    assert_eq!(Config::from_json(&json).unwrap().memory.cache.replacement, expected);
}

#[rstest]
#[case("Static", BranchPredictor::Static)]
#[case("Bimodal", BranchPredictor::Bimodal)]
#[case("GShare", BranchPredictor::GShare)]
#[case("Gshare", BranchPredictor::GShare)]
fn predictor_kinds_parse(#[case] name: &str, #[case] expected: BranchPredictor) {
    let json = format!(r#"{{ "predictor": {{ "kind": "{name}" }} }}"#);
    assert_eq!(Config::from_json(&json).unwrap().predictor.kind, expected);
}

#[test]
fn units_replace_the_default_list() {
    let json = r#"{
        "units": [
            { "class": "IntAlu", "count": 4, "latency": 1 },
            { "class": "Memory" }
        ]
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(
        config.units,
        vec![
            FunctionalUnitConfig::new(FuClass::IntAlu, 4, 1),
            FunctionalUnitConfig::new(FuClass::Memory, 1, 1),
        ]
    );
    assert!(config.unit(FuClass::Fpu).is_none());
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "pipeline": {{ "flush_penalty": 3, "max_cycles": 500 }} }}"#).unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.pipeline.flush_penalty, 3);
    assert_eq!(config.pipeline.max_cycles, Some(500));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[rstest]
#[case("{ not json")]
#[case(r#"{ "predictor": { "kind": "Perceptron" } }"#)]
#[case(r#"{ "pipeline": { "fetch_width": -1 } }"#)]
fn unparseable_json_is_parse_error(#[case] json: &str) {
    assert!(matches!(Config::from_json(json), Err(ConfigError::Parse(_))));
}

fn invalid_field(config: &Config) -> &'static str {
    match config.validate() {
        Err(ConfigError::Invalid { field, .. }) => field,
        other => panic!("expected an invalid field, got {other:?}"),
    }
}

#[rstest]
#[case::zero_fetch_width(|c: &mut Config| c.pipeline.fetch_width = 0, "pipeline.fetch_width")]
#[case::zero_commit_width(|c: &mut Config| c.pipeline.commit_width = 0, "pipeline.commit_width")]
#[case::zero_rob(|c: &mut Config| c.pipeline.rob_size = 0, "pipeline.rob_size")]
#[case::zero_max_cycles(|c: &mut Config| c.pipeline.max_cycles = Some(0), "pipeline.max_cycles")]
#[case::no_units(|c: &mut Config| c.units.clear(), "units")]
#[case::zero_latency(|c: &mut Config| c.units[0].latency = 0, "units.latency")]
#[case::duplicate_unit(
    |c: &mut Config| c.units.push(FunctionalUnitConfig::new(FuClass::IntAlu, 1, 1)),
    "units.class"
)]
#[case::btb_not_power_of_two(|c: &mut Config| c.predictor.btb_size = 1000, "predictor.btb_size")]
#[case::table_not_power_of_two(|c: &mut Config| c.predictor.table_size = 3, "predictor.table_size")]
#[case::wide_counter(|c: &mut Config| c.predictor.counter_bits = 3, "predictor.counter_bits")]
#[case::initial_state_too_large(
    |c: &mut Config| {
        c.predictor.counter_bits = 1;
        c.predictor.initial_state = 2;
    },
    "predictor.initial_state"
)]
#[case::long_history(|c: &mut Config| c.predictor.history_bits = 31, "predictor.history_bits")]
#[case::zero_lsq(|c: &mut Config| c.memory.lsq_size = 0, "memory.lsq_size")]
#[case::data_outside_memory(|c: &mut Config| c.memory.data_base = 64 * 1024, "memory.data_base")]
#[case::no_cache_lines(|c: &mut Config| c.memory.cache.lines = 0, "memory.cache.lines")]
#[case::sets_not_power_of_two(|c: &mut Config| c.memory.cache.lines = 48, "memory.cache.lines")]
#[case::ways_do_not_divide(|c: &mut Config| c.memory.cache.associativity = 3, "memory.cache.associativity")]
#[case::tiny_cache_line(|c: &mut Config| c.memory.cache.line_size = 4, "memory.cache.line_size")]
#[case::odd_cache_line(|c: &mut Config| c.memory.cache.line_size = 24, "memory.cache.line_size")]
#[case::zero_hit_latency(|c: &mut Config| c.memory.cache.hit_latency = 0, "memory.cache.hit_latency")]
fn validation_names_the_offending_field(#[case] mutate: fn(&mut Config), #[case] field: &str) {
    let mut config = Config::default();
    mutate(&mut config);
    assert_eq!(invalid_field(&config), field);
}

#[test]
fn zero_bit_counters_accept_binary_initial_state() {
    let mut config = Config::default();
    config.predictor.counter_bits = 0;
    config.predictor.initial_state = 1;
    config.validate().unwrap();
}

#[test]
fn from_json_validates() {
    let err = Config::from_json(r#"{ "predictor": { "btb_size": 12 } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "predictor.btb_size", .. }));
}
