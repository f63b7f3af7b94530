mod support;

use support::fixtures::{three_row_master, write_master_csv};
use support::surveycoder_env::SurveycoderEnvGuard;

use surveycoder::app_dirs::APP_DIR_NAME;
use surveycoder::catalog::{CategoryCatalog, OTHER, UNCLASSIFIABLE};
use surveycoder::config::{self, AppSettings};
use surveycoder::dataset::StableKey;
use surveycoder::progress::{AnnotatorId, ProgressCounter, ProgressStore};
use surveycoder::session::{SessionController, SessionState};
use std::path::Path;

fn session(progress_dir: &Path) -> SessionController {
    SessionController::new(ProgressStore::new(progress_dir), CategoryCatalog::default())
}

fn presented_id(session: &SessionController) -> Option<String> {
    session.current_row().map(|row| row.response_id.clone())
}

#[test]
fn labels_every_row_in_master_order_then_completes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let master = three_row_master(temp.path());
    let mut session = session(&temp.path().join("progress"));
    session.set_coder("AB").expect("set coder");
    session.open_dataset(&master).expect("open dataset");

    let mut order = Vec::new();
    while let Some(id) = presented_id(&session) {
        order.push(id);
        session.submit(OTHER).expect("submit");
    }
    assert_eq!(order, ["R1", "R3", "R2"]);
    assert_eq!(session.state(), SessionState::Complete);
    assert_eq!(session.progress().expect("progress").done_keys().len(), 3);
}

#[test]
fn restart_resumes_at_first_unlabeled_key() {
    let temp = tempfile::tempdir().expect("tempdir");
    let master = three_row_master(temp.path());
    let progress_dir = temp.path().join("progress");

    let mut first = session(&progress_dir);
    first.set_coder("AB").expect("set coder");
    first.open_dataset(&master).expect("open dataset");
    first.submit(UNCLASSIFIABLE).expect("submit R1");
    let before = presented_id(&first);
    drop(first);

    let mut restarted = session(&progress_dir);
    restarted.open_dataset(&master).expect("open dataset");
    restarted.set_coder("AB").expect("set coder");
    assert_eq!(presented_id(&restarted), before);
    assert_eq!(presented_id(&restarted).as_deref(), Some("R3"));
    assert_eq!(restarted.counter(), Some(ProgressCounter { done: 1, total: 3 }));
}

#[test]
fn hand_written_progress_file_is_honored() {
    let temp = tempfile::tempdir().expect("tempdir");
    let master = three_row_master(temp.path());
    let progress_dir = temp.path().join("progress");
    std::fs::create_dir_all(&progress_dir).expect("progress dir");
    std::fs::write(
        progress_dir.join("classified_responses_AB.csv"),
        "ResponseId,type,item,category,coder\nR1,positive,1.0,Other,AB\n",
    )
    .expect("write progress");

    let mut session = session(&progress_dir);
    session.set_coder("AB").expect("set coder");
    session.open_dataset(&master).expect("open dataset");
    assert_eq!(presented_id(&session).as_deref(), Some("R3"));
}

#[test]
fn reupload_with_changed_rows_keeps_progress() {
    let temp = tempfile::tempdir().expect("tempdir");
    let master = three_row_master(temp.path());
    let progress_dir = temp.path().join("progress");
    let mut session = session(&progress_dir);
    session.set_coder("AB").expect("set coder");
    session.open_dataset(&master).expect("open dataset");
    while session.state() != SessionState::Complete {
        session.submit(OTHER).expect("submit");
    }

    // R2 removed, R4 added, rows shuffled and item written as a float.
    let updated = write_master_csv(
        temp.path(),
        "master_v2.csv",
        &[
            ("R4", "negative", "1", "Too many people"),
            ("R3", "positive", "2.0", "Food, music and friends"),
            ("R1", "positive", "1", "They fill skills gaps"),
        ],
    );
    assert_eq!(
        session.open_dataset(&updated).expect("reload"),
        SessionState::Presenting(2)
    );
    assert_eq!(presented_id(&session).as_deref(), Some("R4"));
    assert_eq!(session.counter(), Some(ProgressCounter { done: 2, total: 3 }));

    // The orphaned R2 label stays on disk.
    let stored = ProgressStore::new(&progress_dir)
        .load(&AnnotatorId::parse("AB").expect("coder"))
        .expect("load");
    assert!(stored.is_done(&StableKey::new("R2", "negative", "1")));
    assert_eq!(stored.len(), 3);
}

#[test]
fn exports_progress_and_merged_dataset() {
    let temp = tempfile::tempdir().expect("tempdir");
    let master = three_row_master(temp.path());
    let mut session = session(&temp.path().join("progress"));
    session.set_coder("AB").expect("set coder");
    session.open_dataset(&master).expect("open dataset");
    session.submit(OTHER).expect("submit R1");

    let progress_copy = temp.path().join("out").join("progress.csv");
    session.export_progress(&progress_copy).expect("export progress");
    assert_eq!(
        std::fs::read_to_string(&progress_copy).expect("read export"),
        "ResponseId,type,item,category,coder\nR1,positive,1,Other,AB\n"
    );

    let merged = temp.path().join("merged.csv");
    session.export_merged(&merged).expect("export merged");
    let text = std::fs::read_to_string(&merged).expect("read merged");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "ResponseId,type,item,value,category,coder");
    assert_eq!(lines[1], "R1,positive,1,They fill skills gaps,Other,AB");
    assert_eq!(lines[2], "R3,positive,2,\"Food, music and friends\",,");
    assert_eq!(lines.len(), 4);
}

#[test]
fn default_progress_dir_lives_under_config_home() {
    let temp = tempfile::tempdir().expect("tempdir");
    let _env = SurveycoderEnvGuard::set_config_home(temp.path().to_path_buf());
    let store = config::progress_store(&AppSettings::default()).expect("store");
    assert_eq!(store.dir(), temp.path().join(APP_DIR_NAME).join("progress"));

    let settings = AppSettings {
        last_coder: Some("AB".into()),
        ..AppSettings::default()
    };
    config::save(&settings).expect("save config");
    assert_eq!(config::load_or_default().expect("load config"), settings);
}
