use super::*;
use tempfile::TempDir;

#[test]
fn create_store_and_read_back() {
    let dir = TempDir::new().unwrap();
    let session = create_new_session(dir.path()).unwrap();

    store_message(dir.path(), &session, Role::User, "how many rows?").unwrap();
    store_message(dir.path(), &session, Role::Assistant, "1042 rows.").unwrap();

    let history = get_history(dir.path(), &session).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, "user");
    assert_eq!(history[0].content, "how many rows?");
    assert_eq!(history[1].role, "assistant");

    let messages = to_messages(&history);
    assert_eq!(messages[0], Message::user("how many rows?"));
    assert_eq!(messages[1], Message::assistant("1042 rows."));
}

#[test]
fn metadata_and_report_entries_are_skipped_in_history() {
    let dir = TempDir::new().unwrap();
    let session = create_new_session(dir.path()).unwrap();

    let report = ReportData {
        summary: "s".to_string(),
        kpis: vec!["k".to_string()],
        charts: vec![],
        external_context: None,
        next_steps: None,
        additional_details: None,
    };
    store_report(dir.path(), &session, &report).unwrap();
    store_message(dir.path(), &session, Role::User, "hi").unwrap();

    let history = get_history(dir.path(), &session).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "hi");
}

#[test]
fn latest_report_wins() {
    let dir = TempDir::new().unwrap();
    let session = create_new_session(dir.path()).unwrap();

    let mut report = ReportData {
        summary: "first".to_string(),
        kpis: vec![],
        charts: vec![],
        external_context: None,
        next_steps: None,
        additional_details: None,
    };
    store_report(dir.path(), &session, &report).unwrap();
    report.summary = "second".to_string();
    store_report(dir.path(), &session, &report).unwrap();

    let stored = get_report(dir.path(), &session).unwrap().unwrap();
    assert_eq!(stored.summary, "second");
}

#[test]
fn missing_session_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let history = get_history(dir.path(), "2024-01-01_00-00-00_deadbeef").unwrap();
    assert!(history.is_empty());
    assert!(get_report(dir.path(), "2024-01-01_00-00-00_deadbeef").unwrap().is_none());
}

#[test]
fn session_list_is_newest_first() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("2024-01-01_00-00-00_aaaa.json"), "[]").unwrap();
    std::fs::write(dir.path().join("2024-03-01_00-00-00_bbbb.json"), "[]").unwrap();
    std::fs::write(dir.path().join("2024-02-01_00-00-00_cccc.json"), "[]").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let sessions = get_session_list(dir.path()).unwrap();
    assert_eq!(
        sessions,
        vec![
            "2024-03-01_00-00-00_bbbb".to_string(),
            "2024-02-01_00-00-00_cccc".to_string(),
            "2024-01-01_00-00-00_aaaa".to_string(),
        ]
    );
}

#[test]
fn path_traversal_is_neutralized_or_rejected() {
    let dir = TempDir::new().unwrap();

    // Directory components are stripped down to the basename, so the write
    // stays inside the history dir.
    store_message(dir.path(), "../escape", Role::User, "x").unwrap();
    assert!(dir.path().join("escape.json").exists());
    assert!(!dir.path().parent().unwrap().join("escape.json").exists());

    // A bare dot-dot has no basename to fall back to.
    assert!(delete_session(dir.path(), "..").is_err());
    assert!(get_history(dir.path(), "..").is_err());
}

#[test]
fn delete_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let session = create_new_session(dir.path()).unwrap();
    assert_eq!(get_session_list(dir.path()).unwrap().len(), 1);

    delete_session(dir.path(), &session).unwrap();
    assert!(get_session_list(dir.path()).unwrap().is_empty());
}
