use crate::config::{HierarchyConfig, LevelName};
use crate::error::TraceError;
use crate::hierarchy::CacheHierarchy;
use crate::simulator::{SimulationResult, Simulator};
use crate::util::{sample_configs, synthetic_records, synthetic_trace};

fn sample(name: &str) -> HierarchyConfig {
    sample_configs()
        .into_iter()
        .find(|(sample, _)| *sample == name)
        .map(|(_, config)| config)
        .unwrap()
}

#[test]
fn totals_match_per_access_latencies() {
    let config = sample("alpha_like");
    let mut simulator = Simulator::new(&config).unwrap();
    let result = simulator.simulate(synthetic_trace(20_000, 11).as_bytes()).unwrap();

    let mut hierarchy = CacheHierarchy::new(&config).unwrap();
    let records = synthetic_records(20_000, 11);
    let expected_cycles: u64 = records.iter().map(|r| hierarchy.access(r.kind, r.address) as u64).sum();

    assert_eq!(result.total_references, 20_000);
    assert_eq!(result.instruction_references + result.data_references, 20_000);
    assert_eq!(result.total_cycles, expected_cycles);
    assert_eq!(result.average_cycles, expected_cycles as f64 / 20_000.0);
    let stats = hierarchy.snapshot_statistics();
    assert_eq!(result.caches[0].stats, stats.icache);
    assert_eq!(result.caches[1].stats, stats.dcache);
    assert_eq!(result.caches[2].stats, stats.l2);
    assert_eq!(result.caches[0].stats.references, result.instruction_references);
}

#[test]
fn repeated_simulations_accumulate() {
    let mut simulator = Simulator::new(&sample("tiny_inclusive")).unwrap();
    simulator.simulate("0x0 I\n0x40 D\n".as_bytes()).unwrap();
    let result = simulator.simulate("0x0 I\n".as_bytes()).unwrap();
    assert_eq!(result.total_references, 3);
    assert_eq!(result.instruction_references, 2);
    // The second fetch of 0x0 hits the I$
    assert_eq!(result.caches[0].stats.misses, 1);
    assert_eq!(simulator.result(), result);
}

#[test]
fn malformed_line_stops_the_trace_but_keeps_earlier_accesses() {
    let mut simulator = Simulator::new(&sample("direct_mapped")).unwrap();
    let error = simulator.simulate("0x100 I\n0x200 D\nnot a record\n0x300 D\n".as_bytes()).unwrap_err();
    assert!(matches!(error, TraceError::Malformed { line: 3, .. }), "{error}");
    let result = simulator.result();
    assert_eq!(result.total_references, 2);
}

#[test]
fn absent_levels_are_reported_as_absent() {
    let mut simulator = Simulator::new(&sample("no_l1")).unwrap();
    let result = simulator.simulate("0x0 I\n0x4 I\n0x1000 D\n".as_bytes()).unwrap();
    assert!(!result.caches[0].present);
    assert!(!result.caches[1].present);
    assert!(result.caches[2].present);
    assert_eq!(result.caches[2].stats.references, 3);
    assert_eq!(result.caches[2].stats.misses, 2);
    // 12 + 80, 12, 12 + 80
    assert_eq!(result.total_cycles, 196);
    let text = result.to_string();
    assert!(text.contains("icache"));
    assert!(text.contains("absent"));
}

#[test]
fn resident_line_counts_cover_every_level() {
    let mut simulator = Simulator::new(&sample("tiny_inclusive")).unwrap();
    simulator.simulate(synthetic_trace(5_000, 21).as_bytes()).unwrap();
    let counts = simulator.get_resident_line_counts();
    assert_eq!(counts.iter().map(|(name, _)| *name).collect::<Vec<_>>(), LevelName::ALL.to_vec());
    // Inclusion keeps the L1s from holding more than the L2 does
    assert!(counts[2].1 <= 16);
    assert!(simulator.hierarchy().check_inclusion());
}

#[test]
fn json_report_uses_level_names_and_flat_counters() {
    let mut simulator = Simulator::new(&sample("direct_mapped")).unwrap();
    let result = simulator.simulate(synthetic_trace(100, 5).as_bytes()).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["caches"][2]["name"], "l2cache");
    assert!(json["caches"][0]["references"].is_u64());
    assert!(json["caches"][0]["miss_rate"].is_f64());
    let parsed: SimulationResult = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.total_references, result.total_references);
}

#[test]
fn trace_errors_do_not_affect_configuration() {
    let config = HierarchyConfig { block_size: 12, ..sample("direct_mapped") };
    assert!(Simulator::new(&config).is_err());
}
