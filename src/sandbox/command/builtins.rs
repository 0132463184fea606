//! In-process reimplementations of `ls`, `cat`, `pwd` and `du`.
//!
//! Flags are validated before any filesystem access, and every path
//! argument (including the implicit `.`) goes through `resolve_allowed`.

use std::fs::{self, Metadata};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::ToolError;
use crate::sandbox::{PathGuard, PathOp};

/// Maximum `du -d` depth.
const MAX_DU_DEPTH: u32 = 5;

/// Formats a byte count with base-1024 suffixes (`512`, `1.5K`, `20M`).
pub fn format_human(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["K", "M", "G", "T"];
    if bytes < 1024 {
        return bytes.to_string();
    }
    let mut value = bytes as f64;
    let mut unit = UNITS[0];
    for u in UNITS {
        value /= 1024.0;
        unit = u;
        if value < 1024.0 {
            break;
        }
    }
    if value < 10.0 {
        format!("{value:.1}{unit}")
    } else {
        format!("{value:.0}{unit}")
    }
}

fn is_flag(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}

// ── ls ───────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LsOptions {
    all: bool,
    almost_all: bool,
    long: bool,
    one_per_line: bool,
    recursive: bool,
    classify: bool,
    human: bool,
}

impl LsOptions {
    fn parse(flags: &[&String]) -> Result<Self, ToolError> {
        let mut opts = LsOptions::default();
        for flag in flags {
            for c in flag.chars().skip(1) {
                match c {
                    'a' => opts.all = true,
                    'A' => opts.almost_all = true,
                    'l' => opts.long = true,
                    '1' => opts.one_per_line = true,
                    'R' => opts.recursive = true,
                    'F' => opts.classify = true,
                    'h' => opts.human = true,
                    other => {
                        return Err(ToolError::invalid_argument(
                            "flags",
                            format!("ls: unsupported flag -{other} (supported: -a -A -l -1 -R -F -h)"),
                        ))
                    }
                }
            }
        }
        Ok(opts)
    }

    fn show_hidden(&self) -> bool {
        self.all || self.almost_all
    }
}

struct LsEntry {
    name: String,
    meta: Metadata,
}

impl LsEntry {
    fn is_dir(&self) -> bool {
        self.meta.file_type().is_dir()
    }
}

pub(super) fn ls(args: &[String], paths: &PathGuard) -> Result<String, ToolError> {
    let (flags, targets): (Vec<&String>, Vec<&String>) = args.iter().partition(|a| is_flag(a));
    let opts = LsOptions::parse(&flags)?;

    let default_target = ".".to_string();
    let targets = if targets.is_empty() {
        vec![&default_target]
    } else {
        targets
    };

    // Resolve everything before producing output
    let mut resolved = Vec::with_capacity(targets.len());
    for target in &targets {
        let path = paths.resolve_allowed(target, PathOp::List)?;
        let meta = fs::symlink_metadata(&path)
            .map_err(|_| ToolError::invalid_argument("path", format!("ls: cannot access '{target}': No such file or directory")))?;
        resolved.push((target.as_str(), path, meta));
    }

    let with_headers = resolved.len() > 1 || opts.recursive;
    let mut sections = Vec::new();
    let mut file_lines = Vec::new();

    for (name, path, meta) in resolved {
        if meta.is_dir() {
            list_directory(&path, name, &opts, paths, with_headers, &mut sections)?;
        } else {
            file_lines.push(render_entry(
                &LsEntry {
                    name: name.to_string(),
                    meta,
                },
                &opts,
            ));
        }
    }

    if !file_lines.is_empty() {
        sections.insert(0, join_entries(&file_lines, &opts));
    }
    Ok(sections.join("\n\n"))
}

fn list_directory(
    dir: &Path,
    display: &str,
    opts: &LsOptions,
    paths: &PathGuard,
    with_header: bool,
    sections: &mut Vec<String>,
) -> Result<(), ToolError> {
    let mut entries = Vec::new();
    for dirent in fs::read_dir(dir)? {
        let dirent = dirent?;
        let name = dirent.file_name().to_string_lossy().to_string();
        if name.starts_with('.') && !opts.show_hidden() {
            continue;
        }
        let meta = fs::symlink_metadata(dirent.path())?;
        entries.push(LsEntry { name, meta });
    }

    // Directories first, then files, each by name
    entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));

    let mut lines = Vec::new();
    if opts.all {
        for special in [".", ".."] {
            // `..` of the base directory lies outside the sandbox: show the
            // base directory's own metadata instead.
            let target = match (special, dir.parent()) {
                ("..", Some(parent)) if dir != paths.base_dir() => parent,
                _ => dir,
            };
            if let Ok(meta) = fs::metadata(target) {
                lines.push(render_entry(
                    &LsEntry {
                        name: special.to_string(),
                        meta,
                    },
                    opts,
                ));
            }
        }
    }
    lines.extend(entries.iter().map(|e| render_entry(e, opts)));

    let body = join_entries(&lines, opts);
    sections.push(if with_header {
        format!("{display}:\n{body}")
    } else {
        body
    });

    if opts.recursive {
        for entry in entries.iter().filter(|e| e.is_dir()) {
            let child = dir.join(&entry.name);
            if !paths.is_allowed(&child, PathOp::List) {
                continue;
            }
            let child_display = format!("{}/{}", display.trim_end_matches('/'), entry.name);
            list_directory(&child, &child_display, opts, paths, true, sections)?;
        }
    }

    Ok(())
}

fn join_entries(lines: &[String], opts: &LsOptions) -> String {
    if opts.long || opts.one_per_line {
        lines.join("\n")
    } else {
        lines.join("  ")
    }
}

fn render_entry(entry: &LsEntry, opts: &LsOptions) -> String {
    let mut name = entry.name.clone();
    if opts.classify {
        name.push_str(type_indicator(&entry.meta));
    }

    if !opts.long {
        return name;
    }

    let size = entry.meta.len();
    let size = if opts.human {
        format_human(size)
    } else {
        size.to_string()
    };
    let mtime = entry
        .meta
        .modified()
        .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| "????-??-?? ??:??".to_string());

    format!("{} {size:>8} {mtime} {name}", mode_string(&entry.meta))
}

fn type_indicator(meta: &Metadata) -> &'static str {
    let ft = meta.file_type();
    if ft.is_dir() {
        "/"
    } else if ft.is_symlink() {
        "@"
    } else if is_executable(meta) {
        "*"
    } else {
        ""
    }
}

#[cfg(unix)]
fn is_executable(meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &Metadata) -> bool {
    false
}

#[cfg(unix)]
fn mode_string(meta: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    let ft = meta.file_type();
    let kind = if ft.is_dir() {
        'd'
    } else if ft.is_symlink() {
        'l'
    } else {
        '-'
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn mode_string(meta: &Metadata) -> String {
    let kind = if meta.is_dir() { 'd' } else { '-' };
    let write = if meta.permissions().readonly() { '-' } else { 'w' };
    format!("{kind}r{write}-r{write}-r{write}-")
}

// ── cat / pwd ────────────────────────────────────────────

pub(super) fn cat(args: &[String], paths: &PathGuard) -> Result<String, ToolError> {
    if let Some(flag) = args.iter().find(|a| is_flag(a)) {
        return Err(ToolError::invalid_argument(
            "flags",
            format!("cat: flags are not supported (got '{flag}')"),
        ));
    }
    let target = match args {
        [] => return Err(ToolError::missing_argument("path")),
        [one] => one,
        _ => {
            return Err(ToolError::invalid_argument(
                "path",
                "cat: exactly one path argument is supported",
            ))
        }
    };

    let path = paths.resolve_allowed(target, PathOp::Read)?;
    if path.is_dir() {
        return Err(ToolError::invalid_argument(
            "path",
            format!("cat: {target}: Is a directory"),
        ));
    }
    let bytes = fs::read(&path)
        .map_err(|e| ToolError::exec(format!("cat: {target}: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub(super) fn pwd(args: &[String], paths: &PathGuard) -> Result<String, ToolError> {
    if !args.is_empty() {
        return Err(ToolError::invalid_argument(
            "args",
            "pwd: arguments are not supported",
        ));
    }
    Ok(paths.base_dir().display().to_string())
}

// ── du ───────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DuOptions {
    human: bool,
    summary: bool,
    max_depth: Option<u32>,
    threshold: u64,
}

impl DuOptions {
    fn depth(&self) -> u32 {
        if self.summary {
            0
        } else {
            self.max_depth.unwrap_or(MAX_DU_DEPTH)
        }
    }
}

/// Parses a `-t` threshold: digits with an optional `k`/`M`/`G`/`T`
/// suffix, base 1024.
fn parse_size(raw: &str) -> Result<u64, ToolError> {
    let invalid = || ToolError::invalid_argument("threshold", format!("du: invalid size '{raw}'"));
    let (digits, multiplier) = match raw.chars().last() {
        Some('k' | 'K') => (&raw[..raw.len() - 1], 1u64 << 10),
        Some('m' | 'M') => (&raw[..raw.len() - 1], 1u64 << 20),
        Some('g' | 'G') => (&raw[..raw.len() - 1], 1u64 << 30),
        Some('t' | 'T') => (&raw[..raw.len() - 1], 1u64 << 40),
        _ => (raw, 1),
    };
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    value.checked_mul(multiplier).ok_or_else(invalid)
}

fn parse_depth(raw: &str) -> Result<u32, ToolError> {
    let depth: u32 = raw.parse().map_err(|_| {
        ToolError::invalid_argument("depth", format!("du: invalid depth '{raw}'"))
    })?;
    if depth > MAX_DU_DEPTH {
        return Err(ToolError::invalid_argument(
            "depth",
            format!("du: depth {depth} out of range (0-{MAX_DU_DEPTH})"),
        ));
    }
    Ok(depth)
}

fn parse_du_args(args: &[String]) -> Result<(DuOptions, Vec<&String>), ToolError> {
    let mut opts = DuOptions::default();
    let mut targets = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if !is_flag(arg) {
            targets.push(arg);
            continue;
        }
        match arg.as_str() {
            "-d" => {
                let value = iter
                    .next()
                    .ok_or_else(|| ToolError::missing_argument("depth"))?;
                opts.max_depth = Some(parse_depth(value)?);
            }
            "-t" => {
                let value = iter
                    .next()
                    .ok_or_else(|| ToolError::missing_argument("threshold"))?;
                opts.threshold = parse_size(value)?;
            }
            a if a.starts_with("-d") => opts.max_depth = Some(parse_depth(&a[2..])?),
            a if a.starts_with("-t") => opts.threshold = parse_size(&a[2..])?,
            a => {
                for c in a.chars().skip(1) {
                    match c {
                        'h' => opts.human = true,
                        's' => opts.summary = true,
                        other => {
                            return Err(ToolError::invalid_argument(
                                "flags",
                                format!("du: unsupported flag -{other} (supported: -h -s -d N -t SIZE)"),
                            ))
                        }
                    }
                }
            }
        }
    }

    if opts.summary && opts.max_depth.is_some_and(|d| d != 0) {
        return Err(ToolError::invalid_argument(
            "depth",
            "du: -s conflicts with -d greater than 0",
        ));
    }

    Ok((opts, targets))
}

pub(super) fn du(args: &[String], paths: &PathGuard) -> Result<String, ToolError> {
    let (opts, targets) = parse_du_args(args)?;
    if targets.is_empty() {
        return Err(ToolError::missing_argument("path"));
    }

    let mut resolved = Vec::with_capacity(targets.len());
    for target in targets {
        resolved.push((target, paths.resolve_allowed(target, PathOp::List)?));
    }

    let mut rows: Vec<(u64, String)> = Vec::new();
    for (display, path) in resolved {
        let meta = fs::symlink_metadata(&path).map_err(|_| {
            ToolError::invalid_argument("path", format!("du: cannot access '{display}': No such file or directory"))
        })?;
        du_walk(&path, &meta, display, 0, &opts, paths, &mut rows)?;
    }

    let lines: Vec<String> = rows
        .into_iter()
        .map(|(bytes, name)| {
            let size = if opts.human {
                format_human(bytes)
            } else {
                bytes.div_ceil(1024).to_string()
            };
            format!("{size}\t{name}")
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Post-order size walk. Only file bytes are counted; directories and
/// subtrees the matcher denies are skipped. Symlinks are not followed.
fn du_walk(
    path: &Path,
    meta: &Metadata,
    display: &str,
    depth: u32,
    opts: &DuOptions,
    paths: &PathGuard,
    rows: &mut Vec<(u64, String)>,
) -> Result<u64, ToolError> {
    if !meta.is_dir() {
        let size = meta.len();
        if depth == 0 && size >= opts.threshold {
            rows.push((size, display.to_string()));
        }
        return Ok(size);
    }

    let mut children: Vec<_> = fs::read_dir(path)?.filter_map(|e| e.ok()).collect();
    children.sort_by_key(|e| e.file_name());

    let mut total = 0u64;
    for child in children {
        let child_path = child.path();
        if !paths.is_allowed(&child_path, PathOp::List) {
            continue;
        }
        let child_meta = match fs::symlink_metadata(&child_path) {
            Ok(m) => m,
            Err(_) => continue,
        };
        let child_display = format!(
            "{}/{}",
            display.trim_end_matches('/'),
            child.file_name().to_string_lossy()
        );
        total += du_walk(&child_path, &child_meta, &child_display, depth + 1, opts, paths, rows)?;
    }

    if depth <= opts.depth() && total >= opts.threshold {
        rows.push((total, display.to_string()));
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::sandbox::{Permissions, Sandbox, SandboxOptions};

    fn sandbox(dir: &Path, allow_paths: &[&str]) -> Sandbox {
        let permissions = Permissions {
            allow_paths: allow_paths.iter().map(|s| s.to_string()).collect(),
            allow_commands: vec!["ls".into(), "cat".into(), "pwd".into(), "du".into()],
            ..Default::default()
        };
        Sandbox::new(dir, permissions, SandboxOptions::default()).unwrap()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("b.txt"), "bbbb").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join(".hidden"), "h").unwrap();
        fs::write(dir.path().join("src/main.rs"), vec![b'x'; 2048]).unwrap();
        fs::write(dir.path().join("src/nested/mod.rs"), vec![b'y'; 1024]).unwrap();
        dir
    }

    // ── format_human ────────────────────────────────────

    #[test]
    fn test_format_human() {
        assert_eq!(format_human(0), "0");
        assert_eq!(format_human(512), "512");
        assert_eq!(format_human(1024), "1.0K");
        assert_eq!(format_human(1536), "1.5K");
        assert_eq!(format_human(20 * 1024), "20K");
        assert_eq!(format_human(1024 * 1024), "1.0M");
        assert_eq!(format_human(3 * 1024 * 1024 * 1024), "3.0G");
        assert_eq!(format_human(2 * (1u64 << 40)), "2.0T");
    }

    // ── ls ──────────────────────────────────────────────

    #[test]
    fn test_ls_dirs_before_files_and_hidden_skipped() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let out = ls(&args(&["-1"]), sb.paths()).unwrap();
        assert_eq!(out, "docs\nsrc\na.txt\nb.txt");
    }

    #[test]
    fn test_ls_default_join() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        assert_eq!(ls(&[], sb.paths()).unwrap(), "docs  src  a.txt  b.txt");
    }

    #[test]
    fn test_ls_all_and_almost_all() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let out = ls(&args(&["-A1"]), sb.paths()).unwrap();
        assert_eq!(out, "docs\nsrc\n.hidden\na.txt\nb.txt");
        let out = ls(&args(&["-a", "-1"]), sb.paths()).unwrap();
        assert!(out.starts_with(".\n..\ndocs"));
    }

    #[test]
    fn test_ls_classify() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let out = ls(&args(&["-F1"]), sb.paths()).unwrap();
        assert_eq!(out, "docs/\nsrc/\na.txt\nb.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_ls_classify_executable_and_symlink() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        fs::write(&script, "#!/bin/sh").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("run.sh", dir.path().join("link")).unwrap();
        let sb = sandbox(dir.path(), &["."]);
        let out = ls(&args(&["-1F"]), sb.paths()).unwrap();
        assert_eq!(out, "link@\nrun.sh*");
    }

    #[cfg(unix)]
    #[test]
    fn test_ls_long_format() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.bin");
        fs::write(&file, vec![0u8; 1536]).unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();
        filetime::set_file_mtime(&file, filetime::FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
        let sb = sandbox(dir.path(), &["."]);

        let out = ls(&args(&["-l"]), sb.paths()).unwrap();
        assert_eq!(out, "-rw-r--r--     1536 2023-11-14 22:13 data.bin");
        let out = ls(&args(&["-lh"]), sb.paths()).unwrap();
        assert_eq!(out, "-rw-r--r--     1.5K 2023-11-14 22:13 data.bin");
    }

    #[test]
    fn test_ls_all_parent_of_base_uses_base_metadata() {
        let outer = tempfile::tempdir().unwrap();
        let base = outer.path().join("ws");
        fs::create_dir_all(base.join("sub")).unwrap();
        filetime::set_file_mtime(&base, filetime::FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
        filetime::set_file_mtime(outer.path(), filetime::FileTime::from_unix_time(1_600_000_000, 0)).unwrap();
        let sb = sandbox(&base, &["."]);

        let out = ls(&args(&["-al"]), sb.paths()).unwrap();
        let parent_line = out.lines().find(|l| l.ends_with(" ..")).unwrap();
        assert!(parent_line.contains("2023-11-14 22:13"), "{parent_line}");
        assert!(!out.contains("2020-09-13"));
    }

    #[test]
    fn test_ls_recursive_with_headers() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let out = ls(&args(&["-R1", "src"]), sb.paths()).unwrap();
        assert_eq!(out, "src:\nnested\nmain.rs\n\nsrc/nested:\nmod.rs");
    }

    #[test]
    fn test_ls_recursive_skips_blocked_dirs() {
        let dir = tree();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        let sb = sandbox(dir.path(), &["."]);
        let out = ls(&args(&["-RA1"]), sb.paths()).unwrap();
        assert!(out.contains(".git"));
        assert!(!out.contains("HEAD"));
        assert!(!out.contains("./.git:"));
    }

    #[test]
    fn test_ls_file_argument() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        assert_eq!(ls(&args(&["a.txt"]), sb.paths()).unwrap(), "a.txt");
    }

    #[test]
    fn test_ls_invalid_flag() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let err = ls(&args(&["-z"]), sb.paths()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_ls_denied_paths() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["docs"]);
        // implicit "." is not allowlisted
        assert_eq!(ls(&[], sb.paths()).unwrap_err().code, ErrorCode::DeniedPathAllowlist);
        assert_eq!(
            ls(&args(&["../"]), sb.paths()).unwrap_err().code,
            ErrorCode::DeniedPathAllowlist
        );
        assert!(ls(&args(&["docs"]), sb.paths()).is_ok());
    }

    // ── cat / pwd ───────────────────────────────────────

    #[test]
    fn test_cat_reads_file() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        assert_eq!(cat(&args(&["b.txt"]), sb.paths()).unwrap(), "bbbb");
    }

    #[test]
    fn test_cat_argument_errors() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        assert_eq!(cat(&[], sb.paths()).unwrap_err().code, ErrorCode::MissingArgument);
        assert_eq!(
            cat(&args(&["-n", "a.txt"]), sb.paths()).unwrap_err().code,
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            cat(&args(&["a.txt", "b.txt"]), sb.paths()).unwrap_err().code,
            ErrorCode::InvalidArgument
        );
        assert_eq!(
            cat(&args(&["src"]), sb.paths()).unwrap_err().code,
            ErrorCode::InvalidArgument
        );
    }

    #[test]
    fn test_cat_blocked_even_when_allowlisted() {
        let dir = tree();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/config"), "secret").unwrap();
        let sb = sandbox(dir.path(), &[".", ".git"]);
        for p in [".git/config", ".GIT/config"] {
            assert_eq!(
                cat(&args(&[p]), sb.paths()).unwrap_err().code,
                ErrorCode::DeniedPathAllowlist
            );
        }
    }

    #[test]
    fn test_pwd() {
        let dir = tree();
        let sb = sandbox(dir.path(), &[]);
        assert_eq!(
            pwd(&[], sb.paths()).unwrap(),
            dir.path().canonicalize().unwrap().display().to_string()
        );
        assert_eq!(pwd(&args(&["-P"]), sb.paths()).unwrap_err().code, ErrorCode::InvalidArgument);
    }

    // ── du ──────────────────────────────────────────────

    #[test]
    fn test_du_requires_path() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        assert_eq!(du(&[], sb.paths()).unwrap_err().code, ErrorCode::MissingArgument);
        assert_eq!(du(&args(&["-h", "-s"]), sb.paths()).unwrap_err().code, ErrorCode::MissingArgument);
    }

    #[test]
    fn test_du_depth_bounds() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let err = du(&args(&["-d", "6", "src"]), sb.paths()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        let err = du(&args(&["-d", "x", "src"]), sb.paths()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        assert!(du(&args(&["-d", "5", "src"]), sb.paths()).is_ok());
        assert!(du(&args(&["-d0", "src"]), sb.paths()).is_ok());
    }

    #[test]
    fn test_du_post_order_blocks() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let out = du(&args(&["src"]), sb.paths()).unwrap();
        assert_eq!(out, "1\tsrc/nested\n3\tsrc");
    }

    #[test]
    fn test_du_summary_and_human() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        assert_eq!(du(&args(&["-s", "src"]), sb.paths()).unwrap(), "3\tsrc");
        assert_eq!(du(&args(&["-sh", "src"]), sb.paths()).unwrap(), "3.0K\tsrc");
    }

    #[test]
    fn test_du_threshold() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let out = du(&args(&["-t", "2k", "src"]), sb.paths()).unwrap();
        assert_eq!(out, "3\tsrc");
        let err = du(&args(&["-t", "2x", "src"]), sb.paths()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_du_single_file() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        assert_eq!(du(&args(&["b.txt"]), sb.paths()).unwrap(), "1\tb.txt");
    }

    #[test]
    fn test_du_summary_conflicts_with_depth() {
        let dir = tree();
        let sb = sandbox(dir.path(), &["."]);
        let err = du(&args(&["-s", "-d", "2", "src"]), sb.paths()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("10").unwrap(), 10);
        assert_eq!(parse_size("1k").unwrap(), 1024);
        assert_eq!(parse_size("2M").unwrap(), 2 << 20);
        assert_eq!(parse_size("1G").unwrap(), 1 << 30);
        assert_eq!(parse_size("1T").unwrap(), 1 << 40);
        assert!(parse_size("").is_err());
        assert!(parse_size("-5").is_err());
    }
}
