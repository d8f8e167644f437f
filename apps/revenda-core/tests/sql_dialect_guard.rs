//! Static guard: every inline SQL literal in this crate must stay on the
//! Postgres dialect. A `?` placeholder compiles fine and then fails at
//! runtime against PgPool, so we catch it here.

use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
        } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

/// Extracts the first string literal after each `sqlx::query` call site.
/// Handles plain and raw (`r#"..."#`) strings; good enough for this crate,
/// where every query is a literal argument.
fn extract_sql_literals(content: &str) -> Vec<(usize, String)> {
    let bytes = content.as_bytes();
    let mut result = Vec::new();
    let mut pos = 0usize;
    while let Some(rel) = content[pos..].find("sqlx::query") {
        let call = pos + rel;
        pos = call + "sqlx::query".len();
        let Some(paren) = content[call..].find('(') else {
            continue;
        };
        let mut i = call + paren + 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let (start, terminator) = if bytes.get(i) == Some(&b'r') {
            let mut hashes = 0;
            let mut j = i + 1;
            while bytes.get(j) == Some(&b'#') {
                hashes += 1;
                j += 1;
            }
            if bytes.get(j) != Some(&b'"') {
                continue;
            }
            (j + 1, format!("\"{}", "#".repeat(hashes)))
        } else if bytes.get(i) == Some(&b'"') {
            (i + 1, "\"".to_string())
        } else {
            continue;
        };
        if let Some(end_rel) = content[start..].find(&terminator) {
            result.push((i, content[start..start + end_rel].to_string()));
        }
    }
    result
}

fn scan(root: &Path, check: impl Fn(&str) -> bool, label: &str) -> Vec<String> {
    let mut files = Vec::new();
    collect_rs_files(root, &mut files);

    let mut violations = Vec::new();
    for file in files {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        for (byte_idx, sql) in extract_sql_literals(&content) {
            if check(&sql) {
                let line = content[..byte_idx].bytes().filter(|b| *b == b'\n').count() + 1;
                violations.push(format!("{}:{} {}", file.display(), line, label));
            }
        }
    }
    violations
}

fn crate_roots() -> Vec<PathBuf> {
    let here = Path::new(env!("CARGO_MANIFEST_DIR"));
    vec![here.join("src"), here.join("../../libs/revenda-db/src")]
}

#[test]
fn sql_literals_use_postgres_placeholders() {
    let mut violations = Vec::new();
    for root in crate_roots() {
        violations.extend(scan(&root, |sql| sql.contains('?'), "uses '?' placeholder"));
    }
    assert!(
        violations.is_empty(),
        "Non-Postgres placeholders found:\n{}",
        violations.join("\n")
    );
}

#[test]
fn sql_literals_avoid_sqlite_syntax() {
    let mut violations = Vec::new();
    for root in crate_roots() {
        violations.extend(scan(
            &root,
            |sql| {
                let lower = sql.to_lowercase();
                lower.contains("insert or ignore")
                    || lower.contains("strftime(")
                    || lower.contains("datetime(")
            },
            "uses SQLite-only syntax",
        ));
    }
    assert!(
        violations.is_empty(),
        "SQLite-specific SQL found:\n{}",
        violations.join("\n")
    );
}
