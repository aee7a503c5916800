use std::sync::atomic::Ordering;

use gazeclick_common::config::GazeConfig;
use gazeclick_common::error::GazeError;
use gazeclick_gaze_loop::backends::{
    CursorCommand, HeadlessDisplay, RecordingCursor, StubDetector, StubFrameSource,
};
use gazeclick_gaze_loop::replay::{ReplayOptions, TraceReplay};
use gazeclick_gaze_loop::writer::ActionWriter;
use gazeclick_gaze_loop::{GazeLoop, LoopSettings, StopReason};
use gazeclick_gaze_model::action::{parse_actions, ActionLogHeader};
use gazeclick_gaze_model::landmark::{FaceLandmarks, NormalizedPoint};
use gazeclick_gaze_model::trace::{serialize_trace, TraceHeader, TraceRecord};
use gazeclick_platform_core::{CursorPosition, ScreenSize};

const FRAME_NS: u64 = 33_000_000;

fn face(anchor: (f64, f64), gap: f64) -> FaceLandmarks {
    let fill = NormalizedPoint::new(0.5, 0.5);
    let mut face = FaceLandmarks::new(vec![fill; 478]);
    face.set(475, NormalizedPoint::new(anchor.0, anchor.1), fill);
    face.set(145, NormalizedPoint::new(0.3, 0.3), fill);
    face.set(159, NormalizedPoint::new(0.3, 0.3 - gap), fill);
    face
}

fn settings() -> LoopSettings {
    LoopSettings::from_config(&GazeConfig::default(), ScreenSize::new(1920, 1080))
}

#[test]
fn idle_frames_never_touch_the_cursor() {
    let cursor = RecordingCursor::default();
    let log = cursor.log();
    let source = StubFrameSource::uniform(5, 640, 480);
    let released = source.released_flag();

    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(source),
        Box::new(StubDetector::new(vec![vec![]; 5])),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    let summary = gaze.run().unwrap();
    assert_eq!(summary.reason, StopReason::SourceEnded);
    assert_eq!(summary.stats.frames, 5);
    assert_eq!(summary.stats.idle_frames, 5);
    assert!(log.commands().is_empty());
    assert_eq!(summary.final_position, CursorPosition::ORIGIN);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn blink_clicks_once_and_cursor_converges() {
    let cursor = RecordingCursor::default();
    let log = cursor.log();

    // Ten frames looking at the centre, eye closed on frames 3..6.
    let detections = (0..10)
        .map(|i| {
            let gap = if (3..6).contains(&i) { 0.002 } else { 0.02 };
            vec![face((0.5, 0.5), gap)]
        })
        .collect();

    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(StubFrameSource::uniform(10, 640, 480)),
        Box::new(StubDetector::new(detections)),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    let summary = gaze.run().unwrap();
    assert_eq!(summary.stats.clicks, 1);
    assert_eq!(log.clicks(), 1);

    let moves = log.moves();
    assert_eq!(moves.len(), 10);
    assert_eq!(moves[0], CursorPosition::new(720, 405));
    assert!(moves.windows(2).all(|w| w[1].x >= w[0].x && w[1].y >= w[0].y));
    assert!(moves[9].x <= 1440 && moves[9].x > 1400);

    // The click follows the move of the frame where the eye closed.
    let commands = log.commands();
    let click_at = commands
        .iter()
        .position(|c| *c == CursorCommand::Click)
        .unwrap();
    assert_eq!(
        commands[..click_at]
            .iter()
            .filter(|c| matches!(c, CursorCommand::Move(_)))
            .count(),
        4
    );
}

#[test]
fn acquisition_failure_stops_the_loop_and_releases_the_source() {
    let source = StubFrameSource::uniform(2, 640, 480).failing_after("camera unplugged");
    let released = source.released_flag();

    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(source),
        Box::new(StubDetector::default()),
        Box::new(RecordingCursor::default()),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    let err = gaze.run().unwrap_err();
    assert!(matches!(err, GazeError::Acquisition { .. }));
    assert_eq!(gaze.stats().frames, 2);
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn gaze_outside_the_frame_is_clamped_to_the_screen() {
    let cursor = RecordingCursor::default();
    let log = cursor.log();
    let mut settings = settings();
    settings.smooth_factor = 1.0;

    let mut gaze = GazeLoop::new(
        settings,
        Box::new(StubFrameSource::uniform(2, 640, 480)),
        Box::new(StubDetector::new(vec![
            vec![face((1.4, 1.2), 0.02)],
            vec![face((-0.3, -0.1), 0.02)],
        ])),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    gaze.run().unwrap();
    assert_eq!(
        log.moves(),
        vec![CursorPosition::new(1920, 1080), CursorPosition::new(0, 0)]
    );
}

#[test]
fn zero_sized_frame_is_skipped_and_loop_continues() {
    let cursor = RecordingCursor::default();
    let log = cursor.log();
    let frames = vec![
        gazeclick_gaze_model::frame::Frame::geometry_only(0, 0, 0, 0),
        gazeclick_gaze_model::frame::Frame::geometry_only(1, FRAME_NS, 640, 480),
    ];

    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(StubFrameSource::new(frames)),
        Box::new(StubDetector::new(vec![vec![face((0.5, 0.5), 0.02)]])),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    let summary = gaze.run().unwrap();
    assert_eq!(summary.stats.rejected_frames, 1);
    // The detector was only consulted for the valid frame.
    assert_eq!(log.moves(), vec![CursorPosition::new(720, 405)]);
}

#[test]
fn cursor_errors_do_not_stop_tracking() {
    let cursor = RecordingCursor::failing();
    let log = cursor.log();

    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(StubFrameSource::uniform(3, 640, 480)),
        Box::new(StubDetector::new(vec![vec![face((0.5, 0.5), 0.02)]; 3])),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    let summary = gaze.run().unwrap();
    assert_eq!(summary.stats.cursor_errors, 3);
    assert_eq!(log.moves().len(), 3);
    assert_eq!(summary.final_position, CursorPosition::new(1260, 708));
}

#[test]
fn stop_signal_and_frame_limit_end_the_run() {
    let display = HeadlessDisplay::default().stop_after(3);
    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(StubFrameSource::uniform(10, 640, 480)),
        Box::new(StubDetector::default()),
        Box::new(RecordingCursor::default()),
        Box::new(display),
    )
    .unwrap();
    let summary = gaze.run().unwrap();
    assert_eq!(summary.reason, StopReason::StopSignal);
    assert_eq!(summary.stats.frames, 3);

    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(StubFrameSource::uniform(10, 640, 480)),
        Box::new(StubDetector::default()),
        Box::new(RecordingCursor::default()),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap()
    .with_max_frames(4);
    let summary = gaze.run().unwrap();
    assert_eq!(summary.reason, StopReason::FrameLimit);
    assert_eq!(summary.stats.frames, 4);
}

#[test]
fn replayed_trace_drives_cursor_and_action_log() {
    let header = TraceHeader::new(640, 480);
    let records: Vec<TraceRecord> = (0..6u64)
        .map(|i| {
            let gap = if i == 2 { 0.001 } else { 0.02 };
            let faces = if i == 4 {
                vec![]
            } else {
                vec![face((0.5, 0.5), gap)]
            };
            TraceRecord::new(i, Some(i * FRAME_NS), faces)
        })
        .collect();
    let trace = serialize_trace(&header, &records).unwrap();

    let (source, detector) = TraceReplay::from_reader(
        std::io::Cursor::new(trace.into_bytes()),
        "generated",
        ReplayOptions {
            realtime: false,
            loop_mirrors: true,
        },
    )
    .unwrap();

    let dir = std::env::temp_dir().join(format!("gazeclick_replay_{}", std::process::id()));
    let actions_path = dir.join("actions.jsonl");
    let writer = ActionWriter::new(
        &actions_path,
        &ActionLogHeader {
            schema_version: "1.0".to_string(),
            screen_width: 1920,
            screen_height: 1080,
            epoch_wall: "2026-01-01T00:00:00Z".to_string(),
            dry_run: true,
        },
    )
    .unwrap();

    let cursor = RecordingCursor::default();
    let log = cursor.log();
    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(source),
        Box::new(detector),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap()
    .with_action_log(writer);

    let summary = gaze.run().unwrap();
    assert_eq!(summary.reason, StopReason::SourceEnded);
    assert_eq!(summary.stats.frames, 6);
    assert_eq!(summary.stats.idle_frames, 1);
    assert_eq!(log.moves().len(), 5);
    assert_eq!(log.clicks(), 1);
    drop(gaze);

    let actions = parse_actions(&std::fs::read_to_string(&actions_path).unwrap()).unwrap();
    assert_eq!(actions.len(), 6);
    let click = actions.iter().find(|a| a.is_click()).unwrap();
    assert_eq!(click.timestamp_ns, 2 * FRAME_NS);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn fixture_trace_replays_with_one_click() {
    let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-trace.jsonl");
    let (source, detector) = TraceReplay::open(
        &path,
        ReplayOptions {
            realtime: false,
            loop_mirrors: true,
        },
    )
    .expect("fixture trace should open");

    let cursor = RecordingCursor::default();
    let log = cursor.log();
    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(source),
        Box::new(detector),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    let summary = gaze.run().unwrap();
    assert_eq!(summary.stats.frames, 12);
    assert_eq!(summary.stats.idle_frames, 1);
    assert_eq!(summary.stats.clicks, 1);
    assert_eq!(log.moves()[0], CursorPosition::new(720, 405));
    assert_eq!(log.moves().len(), 11);
}

#[test]
fn detector_errors_skip_the_frame_only() {
    let cursor = RecordingCursor::default();
    let log = cursor.log();

    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(StubFrameSource::uniform(3, 640, 480)),
        Box::new(StubDetector::scripted(vec![
            Ok(vec![face((0.5, 0.5), 0.02)]),
            Err(GazeError::detection("model returned garbage")),
            Ok(vec![face((0.5, 0.5), 0.02)]),
        ])),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    let summary = gaze.run().unwrap();
    assert_eq!(summary.reason, StopReason::SourceEnded);
    assert_eq!(summary.stats.detector_errors, 1);
    assert_eq!(
        log.moves(),
        vec![CursorPosition::new(720, 405), CursorPosition::new(1080, 607)]
    );
}

#[test]
fn closed_eye_on_mesh_without_iris_still_clicks() {
    let fill = NormalizedPoint::new(0.5, 0.5);
    let mut mesh = FaceLandmarks::new(vec![fill; 468]);
    mesh.set(145, NormalizedPoint::new(0.3, 0.300), fill);
    mesh.set(159, NormalizedPoint::new(0.3, 0.296), fill);

    let cursor = RecordingCursor::default();
    let log = cursor.log();
    let mut gaze = GazeLoop::new(
        settings(),
        Box::new(StubFrameSource::uniform(1, 640, 480)),
        Box::new(StubDetector::new(vec![vec![mesh]])),
        Box::new(cursor),
        Box::new(HeadlessDisplay::default()),
    )
    .unwrap();

    let summary = gaze.run().unwrap();
    assert_eq!(log.clicks(), 1);
    assert!(log.moves().is_empty());
    assert_eq!(summary.stats.idle_frames, 0);
    assert_eq!(summary.stats.frames_with_face, 1);
    assert_eq!(summary.final_position, CursorPosition::ORIGIN);
}
