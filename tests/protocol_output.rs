use tempfile::tempdir;

use nback::artifact::{nback_dir, read_seeds, read_sequence, write_protocol};
use nback::{ProtocolConfig, check_block, generate_blocks, generate_protocol, sequence_stats};

fn protocol_config() -> ProtocolConfig {
    let mut config = ProtocolConfig {
        blocks: 3,
        trials: 30,
        match_trials: 0.2,
        ns: vec![1, 2],
        ..ProtocolConfig::default()
    };
    config.lure_rates.insert(1, vec![(1, 0.1), (2, 0.05)]);
    config.lure_rates.insert(2, vec![(1, 0.1), (-1, 0.05)]);
    config
}

#[test]
fn protocol_produces_valid_blocks_per_n() {
    let config = protocol_config();
    let runs = generate_protocol(&config).unwrap();
    assert_eq!(runs.iter().map(|run| run.n).collect::<Vec<_>>(), vec![1, 2]);
    for run in &runs {
        let nback = config.builder_for(run.n).build().unwrap();
        assert_eq!(run.blocks.len(), 3);
        let seeds = run.seeds();
        assert!(seeds.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(seeds[0] >= config.first_seed);
        for block in &run.blocks {
            assert!(check_block(&block.sequence, &nback).is_empty());
            assert_eq!(sequence_stats(&block.sequence).lures, 3);
        }
    }
}

#[test]
fn parallel_runs_match_sequential_generation() {
    let config = protocol_config();
    let runs = generate_protocol(&config).unwrap();
    for run in &runs {
        assert_eq!(run.blocks, generate_blocks(&config, run.n).unwrap());
    }
    assert_eq!(runs, generate_protocol(&config).unwrap());
}

#[test]
fn written_protocol_reads_back() {
    let config = protocol_config();
    let runs = generate_protocol(&config).unwrap();
    let dir = tempdir().unwrap();
    let written = write_protocol(dir.path(), &runs, false).unwrap();
    assert_eq!(written.len(), 6);

    for run in &runs {
        assert_eq!(read_seeds(dir.path(), run.n).unwrap(), run.seeds());
        for (idx, block) in run.blocks.iter().enumerate() {
            let path = nback_dir(dir.path(), run.n).join(format!("{idx}.txt"));
            let read = read_sequence(&path, run.n).unwrap();
            assert_eq!(read.symbol_string(), block.sequence.symbol_string());
            assert_eq!(read.condition_string(), block.sequence.condition_string());
            let stats = sequence_stats(&read);
            assert_eq!(stats.unattributed_lures, 3);
            assert_eq!(stats.matches, 6);
        }
    }
}

#[test]
fn protocol_config_loads_from_json_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("protocol.json");
    std::fs::write(
        &path,
        r#"{"blocks": 1, "trials": 20, "match_trials": 0.25, "ns": [3], "alphabet": "abcdefgh"}"#,
    )
    .unwrap();
    let config = ProtocolConfig::from_path(&path).unwrap();
    let runs = generate_protocol(&config).unwrap();
    assert_eq!(runs.len(), 1);
    let sequence = &runs[0].blocks[0].sequence;
    assert_eq!(sequence.len(), 23);
    assert!(sequence.symbols().iter().all(|s| "abcdefgh".contains(*s)));
}
