criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        matching_a_single_rule_against_a_cell,
        full_scanning_a_grid_for_matches,
        incrementally_rescanning_after_one_change,
        stepping_a_compiled_flip_model,
}

use markov_junior::grid::{Grid, Wave};
use markov_junior::rule::Rule;

const SIDE: usize = 64;

fn flip_rule() -> Rule {
    Rule::new(1, 1, 1, vec![Wave::one_hot(0)], 1, 1, 1, vec![1], 1.0, 2).unwrap()
}

fn checkerboard() -> Grid {
    let mut grid = Grid::new(SIDE, SIDE, 1, vec!['B', 'W']).unwrap();
    for (i, cell) in grid.state.iter_mut().enumerate() {
        *cell = (i % 2) as u8;
    }
    grid
}

fn matching_a_single_rule_against_a_cell(c: &mut criterion::Criterion) {
    let grid = checkerboard();
    let rule = flip_rule();
    c.bench_function("match a single rule against one cell", |b| {
        b.iter(|| grid.matches(&rule, 0, 0, 0))
    });
}

fn full_scanning_a_grid_for_matches(c: &mut criterion::Criterion) {
    use markov_junior::node::matcher::Matcher;
    let grid = checkerboard();
    c.bench_function("full scan a 64x64 grid for a flip rule", |b| {
        b.iter(|| {
            let mut matcher = Matcher::new(vec![flip_rule()]);
            matcher.refresh(&grid, &markov_junior::changelog::ChangeLog::new(), 0)
        })
    });
}

fn incrementally_rescanning_after_one_change(c: &mut criterion::Criterion) {
    use markov_junior::changelog::ChangeLog;
    use markov_junior::node::matcher::Matcher;

    let mut grid = checkerboard();
    let mut log = ChangeLog::new();
    let mut matcher = Matcher::new(vec![flip_rule()]);
    matcher.refresh(&grid, &log, 0);

    c.bench_function("incrementally rescan a 64x64 grid after one write", |b| {
        b.iter(|| {
            log.begin_step();
            let idx = grid.index(1, 1, 0);
            grid.state[idx] = 1 - grid.state[idx];
            log.push(1, 1, 0);
            matcher.clear_matches();
            matcher.refresh(&grid, &log, 1)
        })
    });
}

fn stepping_a_compiled_flip_model(c: &mut criterion::Criterion) {
    use markov_junior::config::RunConfig;
    use markov_junior::model::ModelSpec;
    use markov_junior::Interpreter;

    let model: ModelSpec = serde_json::from_str(
        r#"{"grid":{"values":"BW"},"root":{"kind":"one","rules":[{"in":"B","out":"W","p":1.0}]}}"#,
    )
    .unwrap();

    c.bench_function("run a compiled flip model to completion", |b| {
        b.iter(|| {
            let mut interp = Interpreter::compile(model.clone(), SIDE, SIDE, 1, None).unwrap();
            interp.run(RunConfig::new(1).with_max_steps(SIDE * SIDE * 4)).count()
        })
    });
}
