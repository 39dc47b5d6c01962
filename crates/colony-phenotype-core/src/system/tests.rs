use super::*;
use crate::config::{ColorMode, FeedbackMode};

fn raw(id: u64, x: f64, y: f64) -> RawRecord {
    RawRecord::from(BacteriumRecord::new(id, x, y))
}

fn make_system(signal_percent: f64, alpha: f64) -> ColonySystem {
    ColonySystem::new(ColonyConfig {
        signal_percent,
        alpha,
        ..ColonyConfig::default()
    })
    .unwrap()
}

fn founders_and_children() -> Vec<RawRecord> {
    vec![
        raw(1000, 0.0, 0.0),
        raw(1500, 50.0, 50.0),
        raw(2000, 100.0, 0.0),
        raw(3000, 51.0, 50.0),
        raw(3001, 49.0, 50.0),
    ]
}

#[test]
fn new_rejects_invalid_config() {
    let result = ColonySystem::new(ColonyConfig {
        neighbor_radius: -1.0,
        ..ColonyConfig::default()
    });
    assert!(matches!(result, Err(ConfigError::InvalidNeighborRadius)));
}

#[test]
fn descendants_inherit_founder_state_on_first_frame() {
    for seed in 0..20 {
        let mut system = ColonySystem::new(ColonyConfig {
            seed,
            ..ColonyConfig::default()
        })
        .unwrap();
        let output = system.update_frame(0, &founders_and_children());
        let state_of = |id: u64| {
            output
                .cells
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.state)
                .unwrap()
        };
        assert_eq!(state_of(3000), state_of(1500));
        assert_eq!(state_of(3001), state_of(1500));
        assert_eq!(output.summary.magenta_count + output.summary.cyan_count, 5);
        assert_eq!(system.magenta_count() + system.cyan_count(), 5);
        assert_eq!(output.summary.unresolved_count, 0);
    }
}

#[test]
fn neighbor_counts_include_self_and_earlier_cells() {
    let mut system = make_system(0.0, 0.0);
    let output = system.update_frame(0, &founders_and_children());
    let founder = &output.cells[1];
    assert_eq!(founder.id, 1500);
    // 1500, 3000 and 3001 lie within radius 9 of each other.
    assert_eq!(founder.neighbors.total, 3);
    // None of the three is resolved yet when 1500 is queried.
    assert_eq!(founder.neighbors.count_by_state, [0, 0]);
    let last = &output.cells[4];
    assert_eq!(last.neighbors.total, 3);
    assert_eq!(
        last.neighbors.count_by_state.iter().sum::<usize>(),
        2,
        "1500 and 3000 were resolved before 3001 was queried"
    );
}

#[test]
fn similarity_and_average_follow_neighbor_shares() {
    let mut system = make_system(0.0, 0.0);
    let output = system.update_frame(0, &founders_and_children());
    // 3001 sees 1500 and 3000 (same phenotype as itself) out of three neighbors.
    let last = &output.cells[4];
    assert!((last.similarity - 2.0 / 3.0).abs() < 1e-12);
    let expected = output.cells.iter().map(|c| c.similarity).sum::<f64>() / 5.0;
    assert!((system.average_similarity() - expected).abs() < 1e-12);
    assert_eq!(output.summary.average_similarity, system.average_similarity());
}

#[test]
fn frozen_rates_keep_states_across_frames() {
    let mut system = make_system(0.0, 0.0);
    let layer = founders_and_children();
    let first: Vec<CellState> = system
        .update_frame(0, &layer)
        .cells
        .iter()
        .map(|c| c.state)
        .collect();
    for step in 1..50 {
        let states: Vec<CellState> = system
            .update_frame(step, &layer)
            .cells
            .iter()
            .map(|c| c.state)
            .collect();
        assert_eq!(states, first);
    }
}

#[test]
fn full_alpha_flips_every_reobserved_cell() {
    let mut system = make_system(0.0, 100.0);
    let layer = founders_and_children();
    let first = system.update_frame(0, &layer);
    let second = system.update_frame(1, &layer);
    for (a, b) in first.cells.iter().zip(&second.cells) {
        let pa = a.state.phenotype().unwrap();
        assert_eq!(b.state, CellState::Resolved(pa.other()));
    }
}

#[test]
fn malformed_records_are_skipped_not_fatal() {
    let mut system = make_system(50.0, 0.1);
    let mut layer = founders_and_children();
    layer.push(RawRecord {
        x: None,
        ..raw(1200, 0.0, 0.0)
    });
    layer.push(RawRecord {
        length: Some(f64::INFINITY),
        ..raw(1201, 0.0, 0.0)
    });
    let output = system.update_frame(0, &layer);
    assert_eq!(output.summary.malformed_records, 2);
    assert_eq!(output.summary.population, 5);
    assert_eq!(output.cells.len(), 5);
}

#[test]
fn unresolvable_ids_render_neutral_and_count_once() {
    let mut system = make_system(50.0, 0.1);
    let layer = vec![raw(1500, 0.0, 0.0), raw(12, 1.0, 0.0)];
    let first = system.update_frame(0, &layer);
    assert_eq!(first.summary.anomalies, 1);
    assert_eq!(first.summary.unresolved_count, 1);
    assert_eq!(first.cells[1].color, palette::NEUTRAL);
    assert_eq!(first.cells[1].similarity, 0.0);
    let second = system.update_frame(1, &layer);
    assert_eq!(second.summary.anomalies, 0);
    assert_eq!(second.summary.unresolved_count, 1);
}

#[test]
fn empty_layer_produces_empty_summary() {
    let mut system = make_system(50.0, 0.1);
    let output = system.update_frame(0, &[]);
    assert!(output.cells.is_empty());
    assert_eq!(output.summary.population, 0);
    assert_eq!(output.summary.average_similarity, 0.0);
    assert_eq!(system.magenta_count(), 0);
}

#[test]
fn wrapping_timestep_clears_memo() {
    let mut system = make_system(0.0, 0.0);
    let layer = founders_and_children();
    system.update_frame(0, &layer);
    system.update_frame(1, &layer);
    assert_eq!(system.model().memo_len(), 5);
    system.update_frame(0, &[]);
    assert_eq!(system.loops(), 1);
    assert_eq!(system.model().memo_len(), 0);
}

#[test]
fn reset_forgets_previous_run() {
    let mut system = make_system(0.0, 0.0);
    system.update_frame(0, &founders_and_children());
    system.reset();
    assert_eq!(system.model().memo_len(), 0);
    assert_eq!(system.magenta_count() + system.cyan_count(), 0);
    assert_eq!(system.loops(), 0);
}

#[test]
fn focus_lineage_marks_descendants() {
    let mut system = make_system(0.0, 0.0);
    system.set_focus_lineage(1500, 3);
    assert_eq!(system.focus_root(), Some(1500));
    let output = system.update_frame(0, &founders_and_children());
    assert_eq!(output.summary.focus_alive, 3);
    let focused: Vec<u64> = output
        .cells
        .iter()
        .filter(|c| c.in_focus)
        .map(|c| c.id)
        .collect();
    assert_eq!(focused, vec![1500, 3000, 3001]);
    system.clear_focus_lineage();
    let output = system.update_frame(1, &founders_and_children());
    assert_eq!(output.summary.focus_alive, 0);
}

#[test]
fn similarity_color_mode_uses_gradient() {
    let mut system = ColonySystem::new(ColonyConfig {
        color_mode: ColorMode::Similarity,
        signal_percent: 0.0,
        alpha: 0.0,
        ..ColonyConfig::default()
    })
    .unwrap();
    let output = system.update_frame(0, &[raw(1000, 0.0, 0.0)]);
    // A lone founder is its own only neighbor but was unresolved when counted.
    assert_eq!(output.cells[0].color, palette::similarity_color(0.0));
}

#[test]
fn tunables_pass_through_with_clamping() {
    let mut system = make_system(50.0, 0.1);
    system.set_signal(1000.0);
    system.set_alpha(-1.0);
    assert_eq!(system.model().signal(), 1.0);
    assert_eq!(system.model().alpha(), 0.0);
    assert_eq!(system.model().feedback(), FeedbackMode::Positive);
}

fn three_step_dataset() -> Dataset {
    Dataset::from_layers([
        (0, founders_and_children()),
        (1, founders_and_children()),
        (
            2,
            vec![raw(1500, 50.0, 50.0), raw(6000, 50.0, 51.0), raw(6003, 50.0, 49.0)],
        ),
    ])
}

#[test]
fn playback_samples_and_loops() {
    let mut system = make_system(50.0, 0.05);
    let summary = system.run_playback(&three_step_dataset(), 7, 3).unwrap();
    assert_eq!(summary.frames, 7);
    assert_eq!(summary.loops, 2);
    assert_eq!(summary.population_history.len(), 7);
    let steps: Vec<usize> = summary.samples.iter().map(|s| s.timestep).collect();
    assert_eq!(steps, vec![2, 2, 0]);
    for (frame, counts) in summary.population_history.iter().enumerate() {
        let expected = if frame % 3 == 2 { 3 } else { 5 };
        assert_eq!(counts[0] + counts[1], expected);
    }
}

#[test]
fn playback_is_reproducible_for_a_seed() {
    let dataset = three_step_dataset();
    let run = || {
        let mut system = make_system(60.0, 0.2);
        system.run_playback(&dataset, 30, 1).unwrap().population_history
    };
    assert_eq!(run(), run());
}

#[test]
fn playback_single_layer_resets_every_frame() {
    let dataset = Dataset::from_layers([(0, founders_and_children())]);
    let mut system = make_system(0.0, 1.0);
    let summary = system.run_playback(&dataset, 4, 1).unwrap();
    assert_eq!(summary.loops, 3);
    assert_eq!(system.model().memo_len(), 5);
}

#[test]
fn playback_rejects_invalid_arguments() {
    let dataset = three_step_dataset();
    let mut system = make_system(50.0, 0.1);
    assert_eq!(
        system.run_playback(&dataset, 10, 0).unwrap_err(),
        PlaybackError::InvalidSampleEvery
    );
    assert!(matches!(
        system.run_playback(&dataset, ColonySystem::MAX_PLAYBACK_FRAMES + 1, 1),
        Err(PlaybackError::TooManyFrames { .. })
    ));
    assert!(matches!(
        system.run_playback(&dataset, ColonySystem::MAX_PLAYBACK_SAMPLES + 1, 1),
        Err(PlaybackError::TooManySamples { .. })
    ));
    assert_eq!(
        system.run_playback(&Dataset::default(), 1, 1).unwrap_err(),
        PlaybackError::EmptyDataset
    );
}

#[test]
fn playback_with_zero_frames_is_empty() {
    let mut system = make_system(50.0, 0.1);
    let summary = system.run_playback(&three_step_dataset(), 0, 1).unwrap();
    assert!(summary.samples.is_empty());
    assert_eq!(summary.loops, 0);
}

#[test]
fn wrong_typed_record_in_a_loaded_file_is_skipped() {
    let json = r#"{
        "0": [
            {"x": 0, "y": 0, "length": 1, "angle": 0, "ID": 1000},
            {"x": "bad", "y": 0, "length": 1, "angle": 0, "ID": 1001},
            {"x": 50, "y": 50, "length": 1, "angle": 0, "ID": 1500.0}
        ],
        "1": [
            {"x": 0, "y": 0, "length": 1, "angle": 0, "ID": 1000},
            {"x": 50, "y": 50, "length": 1, "angle": 0, "ID": 3000}
        ]
    }"#;
    let dataset = Dataset::from_json_str(json).unwrap();
    let mut system = make_system(50.0, 0.1);
    let summary = system.run_playback(&dataset, 2, 1).unwrap();
    assert_eq!(summary.samples[0].malformed_records, 1);
    assert_eq!(summary.samples[0].population, 2);
    assert_eq!(summary.samples[1].malformed_records, 0);
    assert_eq!(summary.samples[1].population, 2);
    assert_eq!(summary.total_malformed, 1);
    assert_eq!(summary.total_anomalies, 0);
}

#[test]
fn density_color_mode_ramps_on_neighbor_count() {
    let mut system = ColonySystem::new(ColonyConfig {
        color_mode: ColorMode::Density,
        max_neighbors: 3,
        ..ColonyConfig::default()
    })
    .unwrap();
    let output = system.update_frame(0, &founders_and_children());
    // 1000 is alone; 1500, 3000 and 3001 see each other and saturate the ramp.
    assert_eq!(output.cells[0].color, palette::density_color(1, 3));
    assert_eq!(output.cells[1].color, palette::CROWDED);
    assert_eq!(output.cells[4].color, palette::CROWDED);
}

#[test]
fn outline_is_a_darker_shade_of_the_fill() {
    let mut system = make_system(50.0, 0.1);
    let output = system.update_frame(0, &[raw(1500, 0.0, 0.0), raw(12, 1.0, 0.0)]);
    for cell in &output.cells {
        assert_eq!(cell.outline, cell.color.outline());
    }
    assert_eq!(output.cells[1].outline, palette::NEUTRAL.outline());
}
