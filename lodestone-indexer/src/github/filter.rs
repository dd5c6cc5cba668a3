//! Declarative inclusion rules for repository files.
//!
//! The rules form an ordered table evaluated in one pass: the first matching
//! rule decides, and paths matching nothing are skipped. Deny rules come
//! first so a lock file inside `src/` or a source file inside `vendor/`
//! never reaches the fetcher.

/// Outcome of evaluating a path against the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Fetch and index this file
    Index,
    /// Do not fetch this file
    Skip,
}

/// A single pattern the rule table can match a path against.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// Any path segment equals this name (directories like `node_modules`)
    Segment(&'static str),
    /// The file name equals this name, case-insensitively
    FileName(&'static str),
    /// The file name ends with this suffix, case-insensitively
    NameSuffix(&'static str),
    /// The file extension equals this value, case-insensitively
    Extension(&'static str),
}

struct Rule {
    pattern: Pattern,
    decision: Decision,
}

const fn deny(pattern: Pattern) -> Rule {
    Rule {
        pattern,
        decision: Decision::Skip,
    }
}

const fn allow(pattern: Pattern) -> Rule {
    Rule {
        pattern,
        decision: Decision::Index,
    }
}

/// Ordered rule table. Deny rules first, then the allow-list; anything that
/// matches no rule is skipped.
static RULES: &[Rule] = &[
    // Dependency and build output directories
    deny(Pattern::Segment("node_modules")),
    deny(Pattern::Segment("vendor")),
    deny(Pattern::Segment("target")),
    deny(Pattern::Segment("dist")),
    deny(Pattern::Segment("build")),
    deny(Pattern::Segment("out")),
    deny(Pattern::Segment("coverage")),
    deny(Pattern::Segment("__pycache__")),
    deny(Pattern::Segment("venv")),
    deny(Pattern::Segment(".venv")),
    // VCS metadata and IDE folders
    deny(Pattern::Segment(".git")),
    deny(Pattern::Segment(".svn")),
    deny(Pattern::Segment(".hg")),
    deny(Pattern::Segment(".idea")),
    deny(Pattern::Segment(".vscode")),
    // Minified assets and lock files
    deny(Pattern::NameSuffix(".min.js")),
    deny(Pattern::NameSuffix(".min.css")),
    deny(Pattern::NameSuffix(".lock")),
    deny(Pattern::FileName("package-lock.json")),
    deny(Pattern::FileName("pnpm-lock.yaml")),
    deny(Pattern::FileName("go.sum")),
    // Code
    allow(Pattern::Extension("rs")),
    allow(Pattern::Extension("py")),
    allow(Pattern::Extension("js")),
    allow(Pattern::Extension("jsx")),
    allow(Pattern::Extension("ts")),
    allow(Pattern::Extension("tsx")),
    allow(Pattern::Extension("java")),
    allow(Pattern::Extension("go")),
    allow(Pattern::Extension("rb")),
    allow(Pattern::Extension("php")),
    allow(Pattern::Extension("c")),
    allow(Pattern::Extension("h")),
    allow(Pattern::Extension("cpp")),
    allow(Pattern::Extension("hpp")),
    allow(Pattern::Extension("cs")),
    allow(Pattern::Extension("swift")),
    allow(Pattern::Extension("kt")),
    allow(Pattern::Extension("scala")),
    allow(Pattern::Extension("sh")),
    allow(Pattern::Extension("sql")),
    // Markup and styles
    allow(Pattern::Extension("html")),
    allow(Pattern::Extension("css")),
    allow(Pattern::Extension("scss")),
    allow(Pattern::Extension("vue")),
    allow(Pattern::Extension("svelte")),
    // Docs
    allow(Pattern::Extension("md")),
    allow(Pattern::Extension("markdown")),
    allow(Pattern::Extension("rst")),
    allow(Pattern::Extension("txt")),
    // Config
    allow(Pattern::Extension("json")),
    allow(Pattern::Extension("yaml")),
    allow(Pattern::Extension("yml")),
    allow(Pattern::Extension("toml")),
    allow(Pattern::Extension("xml")),
    allow(Pattern::Extension("ini")),
    allow(Pattern::Extension("cfg")),
    // Well-known extensionless files
    allow(Pattern::FileName("dockerfile")),
    allow(Pattern::FileName("makefile")),
    allow(Pattern::FileName("rakefile")),
    allow(Pattern::FileName("gemfile")),
    allow(Pattern::FileName("procfile")),
    allow(Pattern::FileName("readme")),
    allow(Pattern::FileName("license")),
];

/// Evaluate a repository-relative path against the rule table.
pub fn evaluate(path: &str) -> Decision {
    let name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    let extension = name.rsplit_once('.').map(|(stem, ext)| {
        // ".gitignore"-style names have no extension, only a leading dot
        if stem.is_empty() { "" } else { ext }
    });

    for rule in RULES {
        let matched = match rule.pattern {
            Pattern::Segment(segment) => path
                .split('/')
                .any(|part| part.eq_ignore_ascii_case(segment)),
            Pattern::FileName(file_name) => name == file_name,
            Pattern::NameSuffix(suffix) => name.ends_with(suffix),
            Pattern::Extension(ext) => extension == Some(ext),
        };
        if matched {
            return rule.decision;
        }
    }
    Decision::Skip
}
