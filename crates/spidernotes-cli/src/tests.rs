use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use spidernotes_core::config::ServerConfig;
use spidernotes_core::events::WriteMode;
use spidernotes_core::models::User;
use spidernotes_core::services::NoteService;
use spidernotes_core::store::{NoteStore, SyncStateStore};
use spidernotes_core::Note;

use crate::cli::{Cli, Commands, CompletionShell, EncryptionCommands, SyncCommands};
use crate::commands::account::format_user;
use crate::commands::common::{
    default_editor, format_relative_time, format_sync_timestamp, list_notes, normalize_content,
    normalize_note_identifier, normalize_search_query, note_preview, resolve_note, search_notes,
    short_id,
};
use crate::commands::completions::completion_script;
use crate::commands::delete::run_delete;
use crate::commands::export::run_export;
use crate::commands::import::run_import;
use crate::commands::restore::run_restore;
use crate::commands::sync::sync_status;
use crate::config_file::CliConfig;
use crate::error::CliError;

fn note(id: &str, body: &str, url: &str, modified: i64) -> Note {
    Note {
        id: id.into(),
        body: body.to_string(),
        url: url.to_string(),
        created: modified,
        modified,
        is_deleted: false,
    }
}

async fn seed(db_path: &PathBuf, notes: &[Note]) {
    let service = NoteService::open_path(db_path).await.unwrap();
    for note in notes {
        service.create(note, WriteMode::Silent).await.unwrap();
    }
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn normalize_search_query_rejects_empty() {
    assert!(matches!(
        normalize_search_query(" \n\t "),
        Err(CliError::EmptySearchQuery)
    ));
    assert_eq!(
        normalize_search_query("  exact phrase  ").unwrap(),
        "exact phrase"
    );
}

#[test]
fn normalize_note_identifier_rejects_empty() {
    assert!(matches!(
        normalize_note_identifier(" \n "),
        Err(CliError::EmptyNoteId)
    ));
    assert_eq!(normalize_note_identifier("  abc123  ").unwrap(), "abc123");
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn format_sync_timestamp_labels_never_synced() {
    assert_eq!(format_sync_timestamp(0), "never");
    assert_eq!(format_sync_timestamp(1_000), "1970-01-01 00:00:01 UTC");
}

#[test]
fn note_preview_truncates_first_line_with_ellipsis() {
    let note = note(
        "a",
        "This is a very long sentence that should be shortened\nsecond line",
        "",
        1,
    );
    assert_eq!(note_preview(&note, 20), "This is a very lo...");
    assert_eq!(note_preview(&note, 80), "This is a very long sentence that should be shortened");
}

#[test]
fn short_id_keeps_thirteen_characters() {
    assert_eq!(short_id("0190a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5b"), "0190a1b2-c3d4");
    assert_eq!(short_id("abc"), "abc");
}

#[test]
fn format_user_describes_connection() {
    let mut user = User::default();
    assert_eq!(format_user(&user), "Not connected");

    user.is_connected = true;
    user.email = "ada@example.com".to_string();
    assert_eq!(format_user(&user), "Connected as ada@example.com");

    user.name = "Ada".to_string();
    user.provider = "google".to_string();
    assert_eq!(
        format_user(&user),
        "Connected as Ada <ada@example.com> via google"
    );
}

#[test]
fn cli_parses_quick_capture_and_subcommands() {
    let cli = Cli::try_parse_from(["spidernotes", "remember", "the", "milk"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.note, vec!["remember", "the", "milk"]);

    let cli = Cli::try_parse_from(["spidernotes", "add", "hello", "--url", "example.com"]).unwrap();
    match cli.command {
        Some(Commands::Add { body, url }) => {
            assert_eq!(body, vec!["hello"]);
            assert_eq!(url, "example.com");
        }
        _ => panic!("expected add command"),
    }

    let cli = Cli::try_parse_from(["spidernotes", "sync", "status", "--json"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sync {
            all: false,
            command: Some(SyncCommands::Status { json: true })
        })
    ));

    let cli =
        Cli::try_parse_from(["spidernotes", "encryption", "enable", "--password", "pw"]).unwrap();
    match cli.command {
        Some(Commands::Encryption {
            command: EncryptionCommands::Enable { password },
        }) => assert_eq!(password, "pw"),
        _ => panic!("expected encryption enable"),
    }
}

#[test]
fn completion_script_targets_binary_name() {
    let script = String::from_utf8(completion_script(CompletionShell::Bash)).unwrap();
    assert!(script.contains("_spidernotes()"));
    assert!(script.contains("complete -F _spidernotes"));
}

#[test]
fn cli_config_roundtrip_normalizes_values() {
    let path = unique_test_path("config", "json");

    let mut config = CliConfig::default();
    config
        .apply(
            Some(" https://notes.example.com/ ".to_string()),
            Some(" secret ".to_string()),
        )
        .unwrap();
    config.save_to_path(&path).unwrap();

    let loaded = CliConfig::load_from_path(&path).unwrap();
    assert_eq!(loaded.server_url.as_deref(), Some("https://notes.example.com"));
    assert_eq!(loaded.token.as_deref(), Some("secret"));
    assert!(!format!("{loaded:?}").contains("secret"));

    let _ = std::fs::remove_file(path);
}

#[test]
fn cli_config_rejects_non_http_server_url() {
    let mut config = CliConfig::default();
    let error = config
        .apply(Some("notes.example.com".to_string()), None)
        .unwrap_err();
    assert!(matches!(error, CliError::Config(_)));
    assert!(config.server_url.is_none());
}

#[test]
fn cli_config_missing_file_is_default() {
    let path = unique_test_path("missing-config", "json");
    assert_eq!(CliConfig::load_from_path(&path).unwrap(), CliConfig::default());
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn list_notes_respects_limit_and_deleted_flag() {
    let db_path = unique_test_db_path();
    let mut gone = note("gone", "Deleted", "", 400);
    gone.is_deleted = true;
    seed(
        &db_path,
        &[
            note("first", "First", "", 100),
            note("second", "Second", "", 200),
            note("third", "Third", "", 300),
            gone,
        ],
    )
    .await;

    let recent = list_notes(2, false, &db_path).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].body, "Third");
    assert_eq!(recent[1].body, "Second");

    let deleted = list_notes(10, true, &db_path).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].id.as_str(), "gone");

    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn search_notes_matches_body_and_url_words() {
    let db_path = unique_test_db_path();
    seed(
        &db_path,
        &[
            note("a", "Milk and eggs", "shop.example.com", 100),
            note("b", "Milkshake recipe", "", 200),
            note("c", "Unrelated note", "", 300),
        ],
    )
    .await;

    let matches = search_notes("milk", 10, &db_path).await.unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id.as_str(), "b");

    let by_url = search_notes("shop", 1, &db_path).await.unwrap();
    assert_eq!(by_url.len(), 1);
    assert_eq!(by_url[0].id.as_str(), "a");

    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn resolve_note_supports_exact_and_prefix_id() {
    let db_path = unique_test_db_path();
    seed(
        &db_path,
        &[
            note("11111111-aaaa", "Note A", "", 100),
            note("11111111-bbbb", "Note B", "", 200),
            note("11111111", "Short", "", 300),
        ],
    )
    .await;
    let service = NoteService::open_path(&db_path).await.unwrap();

    let exact = resolve_note("11111111", &service).await.unwrap();
    assert_eq!(exact.body, "Short");

    let by_prefix = resolve_note("11111111-b", &service).await.unwrap();
    assert_eq!(by_prefix.body, "Note B");

    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn resolve_note_rejects_ambiguous_and_missing_ids() {
    let db_path = unique_test_db_path();
    seed(
        &db_path,
        &[
            note("aaaa-left", "Left", "", 100),
            note("aaaa-right", "Right", "", 200),
        ],
    )
    .await;
    let service = NoteService::open_path(&db_path).await.unwrap();

    let error = resolve_note("aaaa-", &service).await.unwrap_err();
    assert!(matches!(error, CliError::AmbiguousNoteId(_)));

    let error = resolve_note("does-not-exist", &service).await.unwrap_err();
    assert!(matches!(error, CliError::NoteNotFound(_)));

    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn run_delete_tombstones_and_run_restore_revives() {
    let db_path = unique_test_db_path();
    seed(
        &db_path,
        &[
            note("keep-me", "Keep me", "", 100),
            note("drop-me", "Delete me", "", 200),
        ],
    )
    .await;

    run_delete("drop", &db_path).await.unwrap();

    let service = NoteService::open_path(&db_path).await.unwrap();
    let dropped = service.get(&"drop-me".into()).await.unwrap().unwrap();
    assert!(dropped.is_deleted);
    assert!(dropped.modified > 200);
    assert_eq!(service.first_modified().await.unwrap(), dropped.modified);
    assert!(!service.get(&"keep-me".into()).await.unwrap().unwrap().is_deleted);
    drop(service);

    run_restore("drop-me", &db_path).await.unwrap();

    let service = NoteService::open_path(&db_path).await.unwrap();
    let restored = service.get(&"drop-me".into()).await.unwrap().unwrap();
    assert!(!restored.is_deleted);
    assert!(restored.modified > dropped.modified);

    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn run_export_writes_readable_notes() {
    let db_path = unique_test_db_path();
    let mut gone = note("gone", "Deleted", "", 200);
    gone.is_deleted = true;
    seed(&db_path, &[note("kept", "Export me", "example.com", 100), gone]).await;

    let output_path = unique_test_path("export", "json");
    run_export(Some(&output_path), &db_path).await.unwrap();

    let exported = std::fs::read_to_string(&output_path).unwrap();
    assert!(exported.contains("\"body\": \"Export me\""));
    assert!(exported.contains("\"url\": \"example.com\""));
    assert!(!exported.contains("Deleted"));

    let _ = std::fs::remove_file(output_path);
    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn run_import_overwrites_local_notes_without_sync() {
    let db_path = unique_test_db_path();
    seed(&db_path, &[note("shared", "Local copy", "", 500)]).await;

    let backup_path = unique_test_path("backup", "json");
    std::fs::write(
        &backup_path,
        r#"[
            {"id": "shared", "body": "Backup copy", "modified": 100},
            {"id": "fresh", "body": "New from backup", "url": "example.com"}
        ]"#,
    )
    .unwrap();

    run_import(&backup_path, &db_path).await.unwrap();

    let service = NoteService::open_path(&db_path).await.unwrap();
    let shared = service.get(&"shared".into()).await.unwrap().unwrap();
    assert_eq!(shared.body, "Backup copy");
    assert_eq!(shared.modified, 100);
    let fresh = service.get(&"fresh".into()).await.unwrap().unwrap();
    assert_eq!(fresh.url, "example.com");

    let _ = std::fs::remove_file(backup_path);
    cleanup_db_files(&db_path);
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn sync_status_reports_local_state() {
    let db_path = unique_test_db_path();
    let service = NoteService::open_path(&db_path).await.unwrap();
    service.set_sync_enabled(true).await.unwrap();
    service.set_last_synchronized(1_000).await.unwrap();
    service.create_note("pending", "").await.unwrap();

    let server = ServerConfig::new("https://notes.example.com", None).unwrap();
    let status = sync_status(&service, &server).await.unwrap();

    assert!(status.enabled);
    assert!(!status.has_token);
    assert!(!status.encrypted);
    assert_eq!(status.server_url, "https://notes.example.com");
    assert_eq!(status.last_synchronized, 1_000);
    assert_eq!(status.last_synchronized_iso, "1970-01-01 00:00:01 UTC");
    assert_ne!(status.first_modified, 0);

    cleanup_db_files(&db_path);
}

fn unique_test_path(label: &str, extension: &str) -> PathBuf {
    static NEXT_TEST_FILE_ID: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let sequence = NEXT_TEST_FILE_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "spidernotes-cli-{label}-test-{timestamp}-{sequence}.{extension}"
    ))
}

fn unique_test_db_path() -> PathBuf {
    unique_test_path("db", "db")
}

fn cleanup_db_files(path: &PathBuf) {
    // On Windows, libsql can keep file handles alive briefly after drop.
    if cfg!(windows) {
        return;
    }

    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
}
