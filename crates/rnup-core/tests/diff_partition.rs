use rnup_core::diff::{parse_file_header, partition, ChangeKind, UnifiedDiff};

const FIXTURE: &str = include_str!("../../../tests/fixtures/upgrade-0.71.0-0.72.0.diff");

#[test]
fn partition_yields_one_entry_per_header_in_order() {
    let files = partition(FIXTURE);
    let targets: Vec<&str> = files.iter().map(|file| file.target_path.as_str()).collect();
    assert_eq!(
        targets,
        vec![
            "RnDiffApp/package.json",
            "RnDiffApp/android/app/src/main/java/com/rndiffapp/MainApplication.java",
            "RnDiffApp/ios/RnDiffApp/AppDelegate.mm",
            "RnDiffApp/.flowconfig",
        ]
    );
}

#[test]
fn header_lines_are_not_hunk_lines() {
    let files = partition(FIXTURE);
    let package = &files[0];
    assert_eq!(package.hunk_lines.len(), 8);
    assert_eq!(package.hunk_lines[0], " {");
    assert_eq!(package.hunk_lines[4], "-    \"react-native\": \"0.71.0\"");
    assert_eq!(package.hunk_lines[5], "+    \"react-native\": \"0.72.0\"");
    assert!(files
        .iter()
        .flat_map(|file| file.hunk_lines.iter())
        .all(|line| !line.starts_with("--- ") && !line.starts_with("+++ ")));
}

#[test]
fn extended_headers_set_change_kind() {
    let kinds: Vec<ChangeKind> = partition(FIXTURE).iter().map(|file| file.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ChangeKind::Modified,
            ChangeKind::Modified,
            ChangeKind::Added,
            ChangeKind::Deleted,
        ]
    );
}

#[test]
fn differing_paths_mark_a_rename() {
    let text = "diff --git a/old/name.txt b/new/name.txt\nsimilarity index 90%\n--- a/old/name.txt\n+++ b/new/name.txt\n@@ -1 +1 @@\n-a\n+b\n";
    let files = partition(text);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].source_path, "old/name.txt");
    assert_eq!(files[0].target_path, "new/name.txt");
    assert_eq!(files[0].kind, ChangeKind::Renamed);
}

#[test]
fn text_without_headers_is_an_empty_diff() {
    let diff = UnifiedDiff::parse("nothing to see\n+ stray addition\n");
    assert!(diff.is_empty());
    assert!(diff.roots.is_empty());
    assert!(UnifiedDiff::parse("").is_empty());
}

#[test]
fn unrecognized_lines_are_skipped() {
    let text = "diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+new\ngarbage line\n";
    let files = partition(text);
    assert_eq!(files[0].hunk_lines, vec!["-old".to_string(), "+new".to_string()]);
}

#[test]
fn crlf_line_endings_are_normalized() {
    let text = "diff --git a/a.txt b/a.txt\r\n--- a/a.txt\r\n+++ b/a.txt\r\n@@ -1 +1 @@\r\n-old\r\n+new\r\n";
    let files = partition(text);
    assert_eq!(files[0].hunk_lines, vec!["-old".to_string(), "+new".to_string()]);
}

#[test]
fn root_set_holds_paths_without_separator() {
    let text = "diff --git a/package.json b/package.json\n+x\ndiff --git a/android/build.gradle b/android/build.gradle\n+y\ndiff --git a/.gitignore b/.gitignore\n+z\n";
    let diff = UnifiedDiff::parse(text);
    let roots: Vec<&str> = diff.roots.iter().collect();
    assert_eq!(roots, vec![".gitignore", "package.json"]);
    assert!(!diff.roots.contains("android/build.gradle"));
}

#[test]
fn file_header_parsing() {
    assert_eq!(
        parse_file_header("diff --git a/src/app.js b/src/app.js"),
        Some(("src/app.js".to_string(), "src/app.js".to_string()))
    );
    assert_eq!(parse_file_header("diff --git src/app.js src/app.js"), None);
    assert_eq!(parse_file_header("--- a/src/app.js"), None);
}

#[test]
fn quoted_paths_start_their_own_section() {
    let text = "diff --git a/one.txt b/one.txt\n@@ -1 +1 @@\n-a\n+b\ndiff --git \"a/two words.txt\" \"b/two words.txt\"\n@@ -1 +1 @@\n-x\n+y\n";
    let files = partition(text);
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].hunk_lines, vec!["-a".to_string(), "+b".to_string()]);
    assert_eq!(files[1].target_path, "two words.txt");
    assert_eq!(files[1].hunk_lines, vec!["-x".to_string(), "+y".to_string()]);
}

#[test]
fn unreadable_header_keeps_its_lines_apart() {
    let text = "diff --git a/one.txt b/one.txt\n-a\n+b\ndiff --git a/two.txt b/\n-x\n+y\n";
    let diff = UnifiedDiff::parse(text);
    assert_eq!(diff.files.len(), 2);
    assert_eq!(diff.files[0].hunk_lines.len(), 2);
    assert!(!diff.files[1].has_paths());
    assert_eq!(diff.files[1].hunk_lines, vec!["-x".to_string(), "+y".to_string()]);
    assert_eq!(diff.roots.len(), 1);
}

#[test]
fn quoted_header_parsing() {
    assert_eq!(
        parse_file_header(r#"diff --git "a/dir/tab\there.txt" "b/dir/tab\there.txt""#),
        Some(("dir/tab\there.txt".to_string(), "dir/tab\there.txt".to_string()))
    );
    assert_eq!(
        parse_file_header(r#"diff --git "a/say \"hi\".txt" b/plain.txt"#),
        Some(("say \"hi\".txt".to_string(), "plain.txt".to_string()))
    );
    assert_eq!(parse_file_header(r#"diff --git "a/unterminated b/x"#), None);
}
