mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;
use twinkle_core::{
    LibraryError, Mode, PlaybackError, PlaybackOutcome, Settings, ShowConsole, ShowError,
    ShowManager,
};

use common::{two_channel_settings, write_show, FakeAudio, FakeClock, RecordingOutput, INTRO};

type Frames = Rc<RefCell<Vec<(f64, Vec<Mode>)>>>;

struct Rig {
    console: ShowConsole,
    frames: Frames,
    triggers: Rc<RefCell<Vec<f64>>>,
    loaded: Rc<RefCell<Vec<String>>>,
}

fn rig(root: &TempDir, settings: Settings, music_length: f64) -> Rig {
    let time = Rc::new(Cell::new(0.0));
    let frames: Frames = Rc::new(RefCell::new(Vec::new()));
    let triggers = Rc::new(RefCell::new(Vec::new()));
    let loaded = Rc::new(RefCell::new(Vec::new()));

    let library = ShowManager::open(root.path()).unwrap();
    let output = RecordingOutput {
        time: time.clone(),
        channels: settings.channel_count(),
        frames: frames.clone(),
    };
    let audio = FakeAudio {
        time: time.clone(),
        length: music_length,
        started: None,
        loaded: loaded.clone(),
    };
    let clock = FakeClock {
        time,
        triggers: triggers.clone(),
    };

    let console = ShowConsole::new(settings, library, Box::new(output), Box::new(audio))
        .with_clock(Box::new(clock));
    Rig {
        console,
        frames,
        triggers,
        loaded,
    }
}

fn applied(frames: &Frames) -> Vec<Vec<Mode>> {
    frames.borrow().iter().map(|(_, states)| states.clone()).collect()
}

#[test]
fn test_play_requires_compiled_show() {
    let root = TempDir::new().unwrap();
    write_show(root.path(), "intro", INTRO);
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);

    let err = rig.console.play("intro").unwrap_err();
    assert!(matches!(err, PlaybackError::NotCompiled(name) if name == "intro"));
    assert!(rig.frames.borrow().is_empty());

    let err = rig.console.play("nothing").unwrap_err();
    assert!(matches!(err, PlaybackError::Library(LibraryError::NotFound(_))));
}

#[test]
fn test_missing_lightmap_refuses_playback() {
    let root = TempDir::new().unwrap();
    write_show(root.path(), "intro", INTRO);
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);
    rig.console.compile("intro").unwrap();
    std::fs::remove_file(root.path().join("intro/intro.lm")).unwrap();

    let err = rig.console.play("intro").unwrap_err();
    assert!(matches!(err, PlaybackError::MissingInstructions(_)));
}

#[test]
fn test_compile_then_play() {
    let root = TempDir::new().unwrap();
    write_show(root.path(), "intro", INTRO);
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);

    let outcome = rig.console.test(Some("intro")).unwrap();
    assert_eq!(outcome, PlaybackOutcome::Finished);
    assert!(rig.console.library().find("intro").unwrap().is_compiled());
    assert_eq!(rig.loaded.borrow().as_slice(), ["music.mp3"]);

    let off = vec![Mode::Off, Mode::Off];
    assert_eq!(
        applied(&rig.frames),
        vec![
            off.clone(),
            vec![Mode::On, Mode::Random],
            vec![Mode::Off, Mode::Random],
            off.clone(),
            off.clone(),
            off,
        ]
    );

    // The first frame lands when the music starts, after a 1s warm-up.
    let frames = rig.frames.borrow();
    assert_eq!(frames[1].0, 1.0);
    assert_eq!(frames[2].0, 2.0);
    assert_eq!(frames[3].0, 3.0);
}

#[test]
fn test_cue_pulled_before_its_anchor_still_lights() {
    let root = TempDir::new().unwrap();
    // Starts two beats before its anchor, so it lands on the leading empty wait.
    write_show(root.path(), "early", "section: A\n[1,3,-2,1]\ntime: 2\n");
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);

    assert_eq!(rig.console.test(Some("early")).unwrap(), PlaybackOutcome::Finished);
    let lightmap = std::fs::read_to_string(root.path().join("early/early.lm")).unwrap();
    assert!(lightmap.starts_with("w0\n3,0\n"));

    let frames = rig.frames.borrow();
    assert_eq!(frames[1], (1.0, vec![Mode::On, Mode::Hold]));
    assert_eq!(frames[2], (2.0, vec![Mode::Off, Mode::Hold]));
}

#[test]
fn test_each_command_starts_uncancelled() {
    let root = TempDir::new().unwrap();
    write_show(root.path(), "intro", INTRO);
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);

    // A Ctrl+C left over from an earlier command does not stop the next one.
    let cancel = rig.console.cancel_token();
    cancel.cancel();
    assert_eq!(rig.console.test(Some("intro")).unwrap(), PlaybackOutcome::Finished);

    cancel.cancel();
    assert_eq!(rig.console.play("intro").unwrap(), PlaybackOutcome::Finished);
    assert_eq!(rig.loaded.borrow().len(), 2);
}

#[test]
fn test_default_test_show() {
    let root = TempDir::new().unwrap();
    write_show(root.path(), "test", INTRO);
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);

    assert_eq!(rig.console.test(None).unwrap(), PlaybackOutcome::Finished);
}

#[test]
fn test_compile_failure_is_reported_before_playing() {
    let root = TempDir::new().unwrap();
    write_show(root.path(), "bad", "section: A\n[1,9,0,1]\n");
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);

    let err = rig.console.test(Some("bad")).unwrap_err();
    assert!(matches!(err, ShowError::Compile(_)));
    assert!(rig.loaded.borrow().is_empty());
}

#[test]
fn test_lightmap_for_other_layout_is_rejected() {
    let root = TempDir::new().unwrap();
    write_show(root.path(), "intro", INTRO);

    // Compiled for 13 lights, played on 2.
    let mut wide = rig(&root, Settings::default(), 3.0);
    wide.console.compile("intro").unwrap();

    let mut narrow = rig(&root, two_channel_settings(root.path()), 3.0);
    let err = narrow.console.play("intro").unwrap_err();
    assert!(matches!(err, PlaybackError::Codec(_)));
}

#[test]
fn test_playlist_skips_test_show() {
    let root = TempDir::new().unwrap();
    for name in ["carol", "Test", "angels", "bells"] {
        write_show(root.path(), name, INTRO);
    }
    let rig = rig(&root, two_channel_settings(root.path()), 3.0);

    let ordered = rig.console.playlist::<StdRng>(None);
    assert_eq!(ordered, vec!["angels", "bells", "carol"]);

    let mut shuffled = rig
        .console
        .playlist(Some(&mut StdRng::seed_from_u64(9)));
    shuffled.sort();
    assert_eq!(shuffled, ordered);
}

#[test]
fn test_play_all_skips_aborted_show() {
    let root = TempDir::new().unwrap();
    for name in ["a", "b"] {
        write_show(root.path(), name, INTRO);
    }
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);
    rig.console.compile("a").unwrap();
    rig.console.compile("b").unwrap();

    // One Ctrl+C during the first show only.
    rig.triggers.borrow_mut().push(1.5);
    let report = rig.console.play_all(false);

    assert_eq!(report.skipped, vec!["a"]);
    assert_eq!(report.played, vec!["b"]);
    assert!(!report.stopped);
}

#[test]
fn test_second_interrupt_stops_play_all() {
    let root = TempDir::new().unwrap();
    for name in ["a", "b"] {
        write_show(root.path(), name, INTRO);
    }
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);
    rig.console.compile("a").unwrap();
    rig.console.compile("b").unwrap();

    // Abort the first show, then again while the skip notice is up.
    rig.triggers.borrow_mut().extend([1.5, 1.6]);
    let report = rig.console.play_all(false);

    assert_eq!(report.skipped, vec!["a"]);
    assert!(report.played.is_empty());
    assert!(report.stopped);
    assert_eq!(rig.loaded.borrow().len(), 1);
    assert!(report.to_string().starts_with("Playback aborted"));
}

#[test]
fn test_play_all_continues_past_failures() {
    let root = TempDir::new().unwrap();
    for name in ["a", "b"] {
        write_show(root.path(), name, INTRO);
    }
    let mut rig = rig(&root, two_channel_settings(root.path()), 3.0);
    // Only "b" is compiled; "a" fails and is skipped.
    rig.console.compile("b").unwrap();

    let report = rig.console.play_all(true);
    assert_eq!(report.skipped, vec!["a"]);
    assert_eq!(report.played, vec!["b"]);
    assert_eq!(
        report.to_string(),
        "All shows have been played (1 played, skipped: a)"
    );
}
