//! End-to-end interpretation against real project directories.
//!
//! These tests drive a [`Session`] through full model replies and check the
//! resulting tree on disk, the outcome report, and the context digest the
//! next request would carry.

use std::fs;

use coder::context::{assemble, session_digest};
use coder::interpret::{Outcome, RecordingReporter, ResponseStream, interpret_in_session};
use coder::project::Session;

fn session_with_project(name: &str) -> (tempfile::TempDir, Session) {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut session = Session::new(temp.path());
    session.open_project(name).expect("open project");
    (temp, session)
}

/// Reply mixing narration, files in nested directories, a directory and an
/// unsafe path. The unsafe directive is rejected and the rest still apply.
#[test]
fn reply_builds_project_tree_and_skips_escapes() {
    let (temp, mut session) = session_with_project("shop");
    let reply = "\
Here is a small Flask shop.
FILE: app.py
from flask import Flask
app = Flask(__name__)
FILE: templates/index.html
<h1>Shop</h1>
DIR: static/css
FILE: ../outside.txt
should never land
DIR: /etc/coder
Done.
";
    let mut reporter = RecordingReporter::default();
    let report = interpret_in_session(&mut session, reply, &mut reporter).expect("interpret");

    let root = temp.path().join("shop");
    assert_eq!(
        fs::read_to_string(root.join("app.py")).expect("app.py"),
        "from flask import Flask\napp = Flask(__name__)"
    );
    assert_eq!(
        fs::read_to_string(root.join("templates/index.html")).expect("index"),
        "<h1>Shop</h1>"
    );
    assert!(root.join("static/css").is_dir());
    assert!(!temp.path().join("outside.txt").exists());

    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.failures(), 2);
    assert!(matches!(
        &report.outcomes[3],
        Outcome::Rejected { directive: "file", target, .. } if target == "../outside.txt"
    ));
    assert!(matches!(&report.outcomes[4], Outcome::Rejected { directive: "dir", .. }));
    assert_eq!(
        reporter.narration,
        vec!["Here is a small Flask shop.".to_string(), "Done.".to_string()]
    );
}

#[test]
fn written_files_show_up_in_next_digest() {
    let (_temp, mut session) = session_with_project("notes");
    let mut reporter = RecordingReporter::default();
    interpret_in_session(
        &mut session,
        "FILE: README.md\n# Notes\nFILE: todo.txt\n- buy milk",
        &mut reporter,
    )
    .expect("interpret");

    let digest = session_digest(&mut session).expect("digest");
    assert!(digest.starts_with("Current project: notes\n\nProject files:\n- README.md\n- todo.txt\n"));
    assert!(digest.contains("Content of README.md:\n```\n# Notes\n```"));
    assert!(digest.contains("Content of todo.txt:\n```\n- buy milk\n```"));
}

#[test]
fn streamed_chunks_match_whole_reply() {
    let reply = "intro\nFILE: src/main.py\nprint('a')\nprint('b')\nDIR: docs\noutro";

    let (whole_temp, mut whole) = session_with_project("p");
    let mut whole_reporter = RecordingReporter::default();
    let whole_report =
        interpret_in_session(&mut whole, reply, &mut whole_reporter).expect("interpret");

    let (chunk_temp, mut chunked) = session_with_project("p");
    let mut chunk_reporter = RecordingReporter::default();
    let project = chunked.active().expect("active");
    let mut stream = ResponseStream::new(project, &mut chunk_reporter);
    for piece in reply.as_bytes().chunks(3) {
        stream.push(std::str::from_utf8(piece).expect("ascii"));
    }
    let chunk_report = stream.finish();

    assert_eq!(whole_report, chunk_report);
    assert_eq!(whole_reporter.narration, chunk_reporter.narration);
    for root in [whole_temp.path().join("p"), chunk_temp.path().join("p")] {
        assert_eq!(
            fs::read_to_string(root.join("src/main.py")).expect("main.py"),
            "print('a')\nprint('b')"
        );
        assert!(root.join("docs").is_dir());
    }
}

#[test]
fn digest_is_stable_and_bounded() {
    let (temp, mut session) = session_with_project("big");
    let root = temp.path().join("big");
    for i in 0..15 {
        fs::write(root.join(format!("note{i:02}.txt")), format!("note {i}")).expect("write");
    }
    fs::write(root.join("huge.md"), "x".repeat(10_000)).expect("write");
    fs::write(root.join("package.json"), format!("{{\"pad\": \"{}\"}}", "y".repeat(20_000)))
        .expect("write");

    let project = session.active().expect("active");
    let first = assemble(project).expect("assemble");
    let second = assemble(project).expect("assemble");
    assert_eq!(first.render(), second.render());

    // Every file is listed; only ten are shown, well-known names first.
    assert_eq!(first.listing.len(), 17);
    assert_eq!(first.entries.len(), 10);
    assert_eq!(first.entries[0].path, "package.json");
    assert!(first.entries.iter().all(|e| e.path != "huge.md"));
    assert_eq!(first.entries[9].path, "note08.txt");
}

#[cfg(unix)]
#[test]
fn command_directives_run_in_project_root() {
    let (temp, mut session) = session_with_project("cmds");
    let reply = "CMD: pwd > where.txt\nCMD:   echo broken >&2; exit 3   \n";
    let mut reporter = RecordingReporter::default();
    let report = interpret_in_session(&mut session, reply, &mut reporter).expect("interpret");

    let root = temp.path().join("cmds");
    let recorded = fs::read_to_string(root.join("where.txt")).expect("where.txt");
    assert_eq!(
        fs::canonicalize(recorded.trim()).expect("canonical"),
        fs::canonicalize(&root).expect("canonical root")
    );
    assert!(matches!(&report.outcomes[0], Outcome::CommandSucceeded { .. }));
    match &report.outcomes[1] {
        Outcome::CommandFailed {
            command,
            exit_code,
            stderr,
        } => {
            assert_eq!(command, "echo broken >&2; exit 3");
            assert_eq!(*exit_code, 3);
            assert_eq!(stderr, "broken\n");
        }
        other => panic!("expected command failure, got {other:?}"),
    }
}

#[test]
fn no_project_means_no_side_effects() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut session = Session::new(temp.path());
    let mut reporter = RecordingReporter::default();
    let err = interpret_in_session(&mut session, "FILE: a.txt\nhello", &mut reporter).unwrap_err();
    assert!(err.to_string().contains("no project selected"));
    assert_eq!(fs::read_dir(temp.path()).expect("read_dir").count(), 0);
    assert!(reporter.outcomes.is_empty());
}
