//! Integration tests for loading dump files from disk
//!
//! Each test writes dump-shaped XML files (declaration, root element, one row
//! per line) into a temporary directory and loads them into an on-disk
//! SQLite database.

use rusqlite::Connection;
use stackdump_ingest::timestamp;
use stackdump_ingest::{
    BatchRunner, BatchSummary, DirectorySource, ErrorPolicy, IngestError, LoadOptions,
    SchemaRegistry,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `<file>` with the usual dump envelope around `rows`
fn write_dump(dir: &Path, file: &str, root: &str, rows: &[&str]) {
    let mut text = String::from("\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    text.push_str(&format!("<{}>\n", root));
    for row in rows {
        text.push_str("  ");
        text.push_str(row);
        text.push_str("\r\n");
    }
    text.push_str(&format!("</{}>\n", root));
    fs::write(dir.join(file), text).unwrap();
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("stack.db")
}

fn load(dir: &TempDir, entities: &[&str], policy: ErrorPolicy) -> Result<BatchSummary, IngestError> {
    let mut conn = Connection::open(db_path(dir)).unwrap();
    let runner = BatchRunner::new(
        SchemaRegistry::stack_exchange(),
        DirectorySource::new(dir.path()),
        LoadOptions {
            error_policy: policy,
            ..Default::default()
        },
    );
    runner.run(&mut conn, entities)
}

fn table_names(dir: &TempDir) -> Vec<String> {
    let conn = Connection::open(db_path(dir)).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

fn row_count(dir: &TempDir, table: &str) -> i64 {
    let conn = Connection::open(db_path(dir)).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

// ============================================================================
// Happy Path
// ============================================================================

#[test]
fn test_badges_row_end_to_end() {
    let dir = TempDir::new().unwrap();
    write_dump(
        dir.path(),
        "Badges.xml",
        "badges",
        &[r#"<row Id="1" UserId="7" Name="Teacher" Date="2021-01-01T00:00:00.000000" Class="3" TagBased="false" />"#],
    );

    let summary = load(&dir, &["badges"], ErrorPolicy::FailFast).unwrap();
    assert_eq!(summary.rows_inserted, 1);
    assert_eq!(summary.entities[0].lines_read, 4);

    let conn = Connection::open(db_path(&dir)).unwrap();
    let (id, userid, name, date, class, class_type, tagbased): (i64, i64, String, i64, i64, String, String) =
        conn.query_row(
            "SELECT id, userid, name, date, class, typeof(class), tagbased FROM badges",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?)),
        )
        .unwrap();

    assert_eq!(id, 1);
    assert_eq!(userid, 7);
    assert_eq!(name, "Teacher");
    assert_eq!(date, timestamp::normalize("2021-01-01T00:00:00.000000").unwrap());
    assert_eq!(class, 3);
    assert_eq!(class_type, "integer");
    assert_eq!(tagbased, "false");
}

#[test]
fn test_post_body_markup_survives() {
    let dir = TempDir::new().unwrap();
    write_dump(
        dir.path(),
        "Posts.xml",
        "posts",
        &[
            r#"<row Id="1" PostTypeId="1" CreationDate="2008-07-31T21:42:52.667" Score="-2" Body="&lt;p&gt;How do I&#xA;parse XML?&lt;/p&gt;" Tags="&lt;xml&gt;&lt;rust&gt;" Title="Parsing" />"#,
            r#"<row Id="2" PostTypeId="2" ParentId="1" Score="5" Body="&lt;p&gt;Line by line.&lt;/p&gt;" />"#,
        ],
    );

    load(&dir, &["posts"], ErrorPolicy::FailFast).unwrap();

    let conn = Connection::open(db_path(&dir)).unwrap();
    let (body, tags, score, created): (String, String, i64, i64) = conn
        .query_row(
            "SELECT body, tags, score, creationdate FROM posts WHERE id = 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();

    assert_eq!(body, "<p>How do I\nparse XML?</p>");
    assert_eq!(tags, "<xml><rust>");
    // Bound as text; the column's integer affinity converts it
    assert_eq!(score, -2);
    assert_eq!(created, timestamp::normalize("2008-07-31T21:42:52.667").unwrap());

    let (parent, title): (i64, Option<String>) = conn
        .query_row("SELECT parentid, title FROM posts WHERE id = 2", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(parent, 1);
    assert_eq!(title, None);
}

#[test]
fn test_all_entities_in_default_order() {
    let dir = TempDir::new().unwrap();
    let files = [
        ("Badges.xml", "badges", r#"<row Id="1" UserId="1" Name="Autobiographer" />"#),
        ("Comments.xml", "comments", r#"<row Id="1" PostId="1" Score="0" Text="hi" />"#),
        ("Posts.xml", "posts", r#"<row Id="1" PostTypeId="1" />"#),
        ("PostHistory.xml", "posthistory", r#"<row Id="1" PostHistoryTypeId="2" PostId="1" />"#),
        ("PostLinks.xml", "postlinks", r#"<row Id="1" PostId="1" RelatedPostId="1" LinkTypeId="1" />"#),
        ("Tags.xml", "tags", r#"<row Id="1" TagName="rust" Count="1" />"#),
        ("Users.xml", "users", r#"<row Id="1" Reputation="101" DisplayName="ann" />"#),
        ("Votes.xml", "votes", r#"<row Id="1" PostId="1" VoteTypeId="2" />"#),
    ];
    for (file, root, row) in files {
        write_dump(dir.path(), file, root, &[row]);
    }

    let entities = SchemaRegistry::stack_exchange().entity_names();
    let summary = load(&dir, &entities, ErrorPolicy::FailFast).unwrap();

    assert_eq!(summary.rows_inserted, 8);
    assert_eq!(
        table_names(&dir),
        vec!["badges", "comments", "posthistory", "postlinks", "posts", "tags", "users", "votes"]
    );
}

// ============================================================================
// Failure and Atomicity
// ============================================================================

#[test]
fn test_rerun_conflicts_and_keeps_first_load() {
    let dir = TempDir::new().unwrap();
    write_dump(
        dir.path(),
        "Tags.xml",
        "tags",
        &[r#"<row Id="1" TagName="rust" />"#, r#"<row Id="2" TagName="sql" />"#],
    );

    load(&dir, &["tags"], ErrorPolicy::FailFast).unwrap();
    let err = load(&dir, &["tags"], ErrorPolicy::FailFast).unwrap_err();

    assert!(matches!(err, IngestError::StoreConstraintViolation { line: 3, .. }));
    assert_eq!(row_count(&dir, "tags"), 2);
}

#[test]
fn test_missing_file_leaves_database_empty() {
    let dir = TempDir::new().unwrap();
    write_dump(dir.path(), "Badges.xml", "badges", &[r#"<row Id="1" Name="Teacher" />"#]);

    let err = load(&dir, &["badges", "comments"], ErrorPolicy::FailFast).unwrap_err();

    match err {
        IngestError::Source { path, .. } => assert!(path.ends_with("Comments.xml")),
        other => panic!("expected source error, got {other:?}"),
    }
    assert!(table_names(&dir).is_empty());
}

#[test]
fn test_bad_record_rolls_back_earlier_entities() {
    let dir = TempDir::new().unwrap();
    write_dump(dir.path(), "Badges.xml", "badges", &[r#"<row Id="1" Name="Teacher" />"#]);
    write_dump(
        dir.path(),
        "Comments.xml",
        "comments",
        &[r#"<row Id="1" Text="ok" />"#, r#"<row Id="2" Text="broken />"#],
    );

    let err = load(&dir, &["badges", "comments"], ErrorPolicy::FailFast).unwrap_err();

    assert!(matches!(
        err,
        IngestError::UnparsableRecord { ref entity, line: 4, .. } if entity == "comments"
    ));
    assert!(table_names(&dir).is_empty());
}

#[test]
fn test_unknown_entity_creates_no_tables() {
    let dir = TempDir::new().unwrap();
    write_dump(dir.path(), "Badges.xml", "badges", &[r#"<row Id="1" />"#]);

    let err = load(&dir, &["badges", "answers"], ErrorPolicy::FailFast).unwrap_err();

    assert!(matches!(err, IngestError::Configuration(_)));
    assert!(table_names(&dir).is_empty());
}

#[test]
fn test_skip_policy_commits_good_records() {
    let dir = TempDir::new().unwrap();
    write_dump(
        dir.path(),
        "Votes.xml",
        "votes",
        &[
            r#"<row Id="1" PostId="1" VoteTypeId="2" CreationDate="2012-05-01T00:00:00.000" />"#,
            r#"<row Id="2" PostId="1" VoteTypeId="2" CreationDate="May 1st" />"#,
            r#"<row Id="1" PostId="9" VoteTypeId="3" />"#,
            r#"<row Id="3" PostId="1" VoteTypeId="5" UserId="4" />"#,
        ],
    );

    let summary = load(&dir, &["votes"], ErrorPolicy::Skip).unwrap();

    assert_eq!(summary.rows_inserted, 2);
    assert_eq!(summary.records_skipped, 2);
    assert_eq!(row_count(&dir, "votes"), 2);
}
