use image::{Rgba, RgbaImage};

use sprite_forge::core_modules::transparency::{TransparencyConfig, knock_out_background};
use sprite_forge::parallel_pipeline::ParallelSeparationPipeline;
use sprite_forge::pipeline::{
    ClassifierPolicy, FramePlan, GridSpec, PipelineConfig, SeparationPipeline,
};

const CELL: u32 = 16;

/// Paints a sheet of key-colored cells, each with a dark subject blob in the
/// middle that stays clear of the border band.
fn keyed_sheet(keys: &[[u8; 4]], rows: u32, cols: u32) -> RgbaImage {
    assert_eq!(keys.len() as u32, rows * cols);
    RgbaImage::from_fn(cols * CELL, rows * CELL, |x, y| {
        let (cx, cy) = (x % CELL, y % CELL);
        let subject = (4..CELL - 4).contains(&cx) && (4..CELL - 4).contains(&cy);
        if subject {
            Rgba([40, 40, 40, 255])
        } else {
            let index = (y / CELL) * cols + (x / CELL);
            Rgba(keys[index as usize])
        }
    })
}

fn six_movement_sheet() -> RgbaImage {
    keyed_sheet(
        &[
            [0, 0, 255, 255],   // idle
            [255, 0, 0, 255],   // walking
            [255, 0, 255, 255], // jump
            [255, 165, 0, 255], // get_hit
            [0, 255, 0, 255],   // die
            [255, 255, 0, 255], // attack
        ],
        2,
        3,
    )
}

#[test]
fn six_keyed_movements_separate_into_six_groups() {
    let pipeline = SeparationPipeline::new(PipelineConfig::new(GridSpec::new(2, 3)))
        .expect("default policy is valid");
    let report = pipeline.run(&six_movement_sheet()).expect("run succeeds");

    let labels: Vec<&str> = report.groups.iter().map(|g| g.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["idle", "walking", "jump", "get_hit", "die", "attack"]
    );
    assert!(report.groups.iter().all(|g| g.members.len() == 1));
    assert_eq!(report.total_cells(), 6);

    // The subject blob never leaks into the background estimate.
    for trace in &report.traces {
        let background = trace.background.expect("color runs sample every cell");
        assert_ne!(background.channels(), [40, 40, 40]);
    }
}

#[tokio::test]
async fn parallel_and_sequential_runs_agree_on_a_noisy_sheet() {
    let keys: Vec<[u8; 4]> = (0..24)
        .map(|i| match i % 5 {
            0 => [0, 0, 255, 255],
            1 => [255, 0, 0, 255],
            2 => [0, 255, 0, 255],
            3 => [128, 128, 128, 255], // unknown
            _ => [255, 255, 0, 255],
        })
        .collect();
    let sheet = keyed_sheet(&keys, 4, 6);
    let config = PipelineConfig::new(GridSpec::new(4, 6));

    let sequential = SeparationPipeline::new(config.clone())
        .expect("valid config")
        .run(&sheet)
        .expect("sequential run");
    let parallel = ParallelSeparationPipeline::with_workers(config, 4)
        .expect("valid config")
        .run(&sheet)
        .await
        .expect("parallel run");

    assert_eq!(parallel, sequential);

    let unknown = sequential
        .label_counts()
        .into_iter()
        .find(|(label, _)| label.is_unknown())
        .expect("gray cells are reported");
    assert_eq!(unknown.1, 5);
}

#[test]
fn frames_survive_a_png_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sheet_path = dir.path().join("hero.png");
    six_movement_sheet().save(&sheet_path).expect("save sheet");

    let sheet = image::open(&sheet_path).expect("reopen sheet").to_rgba8();
    let pipeline = SeparationPipeline::new(PipelineConfig::new(GridSpec::new(2, 3)))
        .expect("valid config");
    let report = pipeline.run(&sheet).expect("run succeeds");

    let first = &report.groups[0].members[0];
    let frame_path = dir.path().join("frame.png");
    first.image.save(&frame_path).expect("save frame");

    let reloaded = image::open(&frame_path).expect("reopen frame").to_rgba8();
    assert_eq!(reloaded.as_raw(), first.image.as_raw());
}

#[test]
fn composite_strip_is_written_and_reopenable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = SeparationPipeline::new(PipelineConfig::new(GridSpec::new(1, 3)))
        .expect("valid config");

    // Three idle frames in a row become one 3-wide strip.
    let sheet = keyed_sheet(
        &[[0, 0, 255, 255], [0, 0, 255, 255], [0, 0, 255, 255]],
        1,
        3,
    );
    let report = pipeline.run(&sheet).expect("run succeeds");
    let composites = pipeline.build_composites(&report);
    assert_eq!(composites.len(), 1);

    let (label, strip) = &composites[0];
    assert_eq!(label.as_str(), "idle");
    assert_eq!((strip.width(), strip.height()), (3 * CELL, CELL));

    let strip_path = dir.path().join("idle_strip.png");
    strip.save(&strip_path).expect("save strip");
    let reloaded = image::open(&strip_path).expect("reopen strip").to_rgba8();
    assert_eq!(reloaded.as_raw(), strip.as_raw());
}

#[test]
fn plan_file_drives_grouping_without_sampling() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plan_path = dir.path().join("plan.json");
    std::fs::write(
        &plan_path,
        r#"{
  "entries": [
    { "label": "intro", "start": 0, "end": 2 },
    { "label": "loop", "start": 2, "end": 5 }
  ]
}"#,
    )
    .expect("write plan");

    let plan = FramePlan::from_json_file(&plan_path).expect("plan parses");
    // Keys are irrelevant under a plan; paint everything gray.
    let sheet = keyed_sheet(&[[128, 128, 128, 255]; 6], 1, 6);

    let pipeline = SeparationPipeline::new(PipelineConfig::new(GridSpec::new(1, 6)))
        .expect("valid config");
    let report = pipeline.run_plan(&sheet, &plan).expect("plan run");

    let sizes: Vec<(String, usize)> = report
        .groups
        .iter()
        .map(|g| (g.label.as_str().to_string(), g.members.len()))
        .collect();
    assert_eq!(
        sizes,
        vec![
            ("intro".to_string(), 2),
            ("loop".to_string(), 3),
            ("unknown".to_string(), 1),
        ]
    );
    assert!(report.traces.iter().all(|t| t.background.is_none()));
}

#[test]
fn custom_policy_file_overrides_the_default_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let policy_path = dir.path().join("policy.json");
    std::fs::write(
        &policy_path,
        r#"{
  "categories": [
    {
      "label": "crouch",
      "range": {
        "min": { "red": 0, "green": 0, "blue": 200 },
        "max": { "red": 50, "green": 50, "blue": 255 }
      }
    }
  ],
  "fallbacks": []
}"#,
    )
    .expect("write policy");

    let policy = ClassifierPolicy::from_json_file(&policy_path).expect("policy parses");
    let mut config = PipelineConfig::new(GridSpec::new(1, 2));
    config.policy = policy;

    // Blue now means crouch; red matches nothing.
    let sheet = keyed_sheet(&[[0, 0, 255, 255], [255, 0, 0, 255]], 1, 2);
    let report = SeparationPipeline::new(config)
        .expect("valid config")
        .run(&sheet)
        .expect("run succeeds");

    assert_eq!(report.groups[0].label.as_str(), "crouch");
    assert!(report.groups[1].label.is_unknown());
}

#[test]
fn knockout_after_separation_clears_only_the_backdrop() {
    let pipeline = SeparationPipeline::new(PipelineConfig::new(GridSpec::new(1, 1)))
        .expect("valid config");
    let sheet = keyed_sheet(&[[0, 0, 255, 255]], 1, 1);
    let report = pipeline.run(&sheet).expect("run succeeds");

    let mut frame = report.groups[0].members[0].image.clone();
    let cleared = knock_out_background(&mut frame, &TransparencyConfig::default());

    // 16x16 cell minus the 8x8 subject blob.
    assert_eq!(cleared, (CELL * CELL - 8 * 8) as u64);
    assert_eq!(frame.get_pixel(0, 0)[3], 0);
    assert_eq!(frame.get_pixel(8, 8), &Rgba([40, 40, 40, 255]));
}
