use rnup_core::diff::ChangeKind;
use rnup_core::plan::FileChange;
use rnup_core::preview::{is_binary, preview_change, Preview};

#[test]
fn missing_original_previews_as_new_file() {
    let preview = Preview::build("App.js", None, b"export default App;\n");
    assert_eq!(
        preview,
        Preview::New {
            path: "App.js".to_string(),
            content: "export default App;\n".to_string(),
        }
    );
    assert!(preview.to_string().starts_with("New file: App.js"));
}

#[test]
fn blank_proposal_previews_as_removal() {
    let preview = Preview::build(".flowconfig", Some(b"[ignore]\n"), b"  \n");
    assert_eq!(preview.to_string(), "File will be removed: .flowconfig");
}

#[test]
fn nul_within_sniff_window_is_binary() {
    let mut bytes = vec![b'a'; 100];
    bytes.push(0);
    assert!(is_binary(&bytes));

    let mut late = vec![b'a'; 2048];
    late.push(0);
    assert!(!is_binary(&late));

    let preview = Preview::build("icon.png", Some(&bytes), b"text");
    assert!(matches!(preview, Preview::Binary { .. }));
    assert!(preview.to_string().contains("Content cannot be displayed."));
}

#[test]
fn modified_files_render_a_line_diff() {
    let preview = Preview::build("a.txt", Some(b"one\ntwo\nthree\n"), b"one\n2\nthree\n");
    let Preview::Modified { diff, .. } = &preview else {
        panic!("expected a modified preview, got {preview:?}");
    };
    assert!(diff.contains("-two\n"));
    assert!(diff.contains("+2\n"));
    assert!(diff.contains(" one\n"));
}

#[test]
fn identical_content_is_unchanged() {
    let preview = Preview::build("a.txt", Some(b"same\n"), b"same\n");
    assert!(matches!(preview, Preview::Unchanged { .. }));
}

#[test]
fn change_preview_applies_hunks_in_memory() {
    let change = FileChange {
        file: "a.txt".to_string(),
        source: "a.txt".to_string(),
        kind: ChangeKind::Modified,
        hunk_lines: vec![" one".to_string(), "-two".to_string(), "+2".to_string()],
    };

    let preview = preview_change(&change, Some(b"one\ntwo\nthree\n"));
    assert!(matches!(preview, Preview::Modified { .. }));

    let unmatched = preview_change(&change, Some(b"alpha\nbeta\n"));
    assert!(matches!(unmatched, Preview::Unavailable { .. }));

    let created = preview_change(&change, None);
    assert_eq!(
        created,
        Preview::New {
            path: "a.txt".to_string(),
            content: "2\n".to_string(),
        }
    );
}
