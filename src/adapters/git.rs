//! Git repository tools.
//!
//! Tools: git_status, git_diff_unstaged, git_diff_staged, git_diff, git_commit, git_add,
//!        git_reset, git_log, git_create_branch, git_checkout, git_show, git_init,
//!        git_read_file, git_list_files, git_file_history, git_search_code, git_get_diff,
//!        git_get_repo_structure, git_list_repos
//!
//! Every operation shells out to the `git` executable; nothing here understands
//! the object database.

use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::adapters::{Adapter, ToolDef};
use crate::args::{get_optional_string, get_optional_u64, get_string_arg, get_string_array_arg};
use crate::error::{McpError, Result};
use crate::schema;

const DEFAULT_LOG_COUNT: u64 = 10;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';
const ENTRY_FORMAT: &str = "--format=%H%x1f%an%x1f%ai%x1f%B%x1e";

/// A single commit as reported by `git log`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitEntry {
    /// Full commit hash
    pub hash: String,
    /// Author name
    pub author: String,
    /// Author date
    pub date: String,
    /// Full commit message
    pub message: String,
}

impl CommitEntry {
    /// Render the entry the way every log-like tool reports it.
    pub fn to_text(&self) -> String {
        format!(
            "Commit: {}\nAuthor: {}\nDate: {}\nMessage: {}\n",
            self.hash,
            self.author,
            self.date,
            self.message.trim_end()
        )
    }
}

/// Parse the output of `git log` run with [`ENTRY_FORMAT`].
pub fn parse_log(output: &str) -> Vec<CommitEntry> {
    output
        .split(RECORD_SEP)
        .map(|record| record.trim_start_matches('\n'))
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut fields = record.splitn(4, FIELD_SEP);
            Some(CommitEntry {
                hash: fields.next()?.to_string(),
                author: fields.next()?.to_string(),
                date: fields.next()?.to_string(),
                message: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Reject revisions that git would read as an option.
fn validate_ref(name: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.starts_with('-') {
        return Err(McpError::InvalidArg {
            name: name.to_string(),
            reason: format!("'{}' is not a valid revision", value),
        });
    }
    Ok(())
}

/// Handle to a working tree, driven through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Open an existing repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Self {
            path: path.as_ref().to_path_buf(),
        };
        if !repo.path.is_dir() || repo.run(&["rev-parse", "--git-dir"]).is_err() {
            return Err(McpError::Git(format!(
                "{} is not a valid Git repository",
                repo.path.display()
            )));
        }
        Ok(repo)
    }

    /// Create a repository, making any missing directories.
    pub fn init(path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let repo = Self {
            path: path.to_path_buf(),
        };
        repo.run(&["init", "--quiet"])?;
        let git_dir = repo.run(&["rev-parse", "--absolute-git-dir"])?;
        Ok(format!("Initialized empty Git repository in {}", git_dir.trim()))
    }

    /// Repository path as given.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        self.run_allowing(args, &[])
    }

    /// Run git, treating the listed non-zero exit codes as success.
    fn run_allowing(&self, args: &[&str], ok_codes: &[i32]) -> Result<String> {
        tracing::debug!(repo = %self.path.display(), ?args, "running git");
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.path)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| McpError::Git(format!("failed to run git: {}", e)))?;

        let code = output.status.code();
        if output.status.success() || code.map_or(false, |c| ok_codes.contains(&c)) {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        Err(McpError::Git(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            detail
        )))
    }

    /// `git status`.
    pub fn status(&self) -> Result<String> {
        Ok(self.run(&["status"])?.trim_end().to_string())
    }

    /// Working tree changes that are not staged.
    pub fn diff_unstaged(&self) -> Result<String> {
        Ok(self.run(&["diff"])?.trim_end().to_string())
    }

    /// Staged changes.
    pub fn diff_staged(&self) -> Result<String> {
        Ok(self.run(&["diff", "--cached"])?.trim_end().to_string())
    }

    /// Diff of the working tree against a branch or commit.
    pub fn diff(&self, target: &str) -> Result<String> {
        validate_ref("target", target)?;
        Ok(self.run(&["diff", target])?.trim_end().to_string())
    }

    /// Commit and return the new hash.
    ///
    /// With `files`, those paths are staged first; otherwise the index is committed as is.
    pub fn commit(&self, message: &str, files: Option<&[String]>) -> Result<String> {
        if let Some(files) = files.filter(|f| !f.is_empty()) {
            self.add(files)?;
        }
        self.run(&["commit", "--quiet", "-m", message])?;
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// Stage the given paths.
    pub fn add(&self, files: &[String]) -> Result<()> {
        let mut args = vec!["add", "--"];
        args.extend(files.iter().map(String::as_str));
        self.run(&args)?;
        Ok(())
    }

    /// Unstage everything.
    pub fn reset(&self) -> Result<()> {
        self.run(&["reset", "--quiet"])?;
        Ok(())
    }

    /// Most recent commits, newest first.
    pub fn log(&self, max_count: u64) -> Result<Vec<CommitEntry>> {
        let count = max_count.to_string();
        let output = self.run(&["log", "-n", &count, ENTRY_FORMAT])?;
        Ok(parse_log(&output))
    }

    /// Commits touching one file, newest first.
    pub fn file_history(&self, file_path: &str, max_entries: u64) -> Result<Vec<CommitEntry>> {
        let count = max_entries.to_string();
        let output = self.run(&["log", "-n", &count, ENTRY_FORMAT, "--", file_path])?;
        Ok(parse_log(&output))
    }

    /// Name of the checked-out branch.
    pub fn current_branch(&self) -> Result<String> {
        Ok(self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    /// Create a branch and return the name of the base it was created from.
    pub fn create_branch(&self, branch_name: &str, base_branch: Option<&str>) -> Result<String> {
        validate_ref("branch_name", branch_name)?;
        let base = match base_branch {
            Some(base) => {
                validate_ref("base_branch", base)?;
                self.run(&["rev-parse", "--verify", "--quiet", base])
                    .map_err(|_| McpError::Git(format!("base branch '{}' not found", base)))?;
                base.to_string()
            }
            None => self.current_branch()?,
        };
        self.run(&["branch", branch_name, &base])?;
        Ok(base)
    }

    /// Switch branches.
    pub fn checkout(&self, branch_name: &str) -> Result<()> {
        validate_ref("branch_name", branch_name)?;
        self.run(&["checkout", "--quiet", branch_name])?;
        Ok(())
    }

    /// Diff between two revisions, optionally limited to one path.
    pub fn diff_refs(&self, ref1: &str, ref2: &str, file_path: Option<&str>) -> Result<String> {
        validate_ref("ref1", ref1)?;
        validate_ref("ref2", ref2)?;
        let mut args = vec!["diff", ref1, ref2];
        if let Some(path) = file_path.filter(|p| !p.is_empty()) {
            args.push("--");
            args.push(path);
        }
        Ok(self.run(&args)?.trim_end().to_string())
    }

    /// Tree at a revision as nested objects: directories map to objects,
    /// everything else to its object type (`blob`, or `commit` for submodules).
    pub fn structure(&self, rev: &str) -> Result<JsonValue> {
        validate_ref("ref", rev)?;
        let listing = self.run(&["ls-tree", "-r", "-t", "-z", rev])?;
        let mut root = Map::new();
        for record in listing.split('\0').filter(|r| !r.is_empty()) {
            let (meta, path) = record.split_once('\t').ok_or_else(|| {
                McpError::Git(format!("unexpected ls-tree output: {}", record))
            })?;
            let kind = meta.split(' ').nth(1).unwrap_or("blob");
            insert_tree_entry(&mut root, path, kind);
        }
        Ok(JsonValue::Object(root))
    }

    /// Commit metadata followed by its patch against the first parent.
    pub fn show(&self, revision: &str) -> Result<String> {
        validate_ref("revision", revision)?;
        let header = self.run(&["log", "-n", "1", ENTRY_FORMAT, revision])?;
        let entry = parse_log(&header)
            .into_iter()
            .next()
            .ok_or_else(|| McpError::Git(format!("revision '{}' not found", revision)))?;
        let patch = self.run(&["show", "--format=", "--patch", revision])?;
        Ok(format!("{}\n{}", entry.to_text(), patch.trim_start_matches('\n')))
    }

    /// File contents at a revision.
    pub fn read_file(&self, file_path: &str, rev: &str) -> Result<String> {
        validate_ref("ref", rev)?;
        let spec = format!("{}:{}", rev, file_path.trim_start_matches('/'));
        self.run(&["show", &spec])
    }

    /// Recursive file listing at a revision, optionally below `path`.
    pub fn list_files(&self, path: &str, rev: &str) -> Result<Vec<String>> {
        validate_ref("ref", rev)?;
        let mut args = vec!["ls-tree", "-r", "--name-only", rev];
        let path = path.trim_matches('/');
        if !path.is_empty() {
            args.push("--");
            args.push(path);
        }
        let files: Vec<String> = self
            .run(&args)?
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect();
        if files.is_empty() && !path.is_empty() {
            return Err(McpError::Git(format!("path '{}' not found at {}", path, rev)));
        }
        Ok(files)
    }

    /// Fixed-string search across tracked files at a revision.
    ///
    /// Returns `path:line: text` for each matching line whose path matches `file_pattern`.
    pub fn search_code(&self, query: &str, file_pattern: &str, rev: &str) -> Result<Vec<String>> {
        validate_ref("ref", rev)?;
        let pattern = glob::Pattern::new(file_pattern).map_err(|e| McpError::InvalidArg {
            name: "file_pattern".to_string(),
            reason: e.to_string(),
        })?;

        // git grep exits 1 when nothing matches.
        let output = self.run_allowing(&["grep", "-n", "-I", "-F", "-e", query, rev], &[1])?;
        let prefix = format!("{}:", rev);

        Ok(output
            .lines()
            .filter_map(|line| {
                let rest = line.strip_prefix(&prefix)?;
                let mut parts = rest.splitn(3, ':');
                let path = parts.next()?;
                let lineno = parts.next()?;
                let text = parts.next().unwrap_or_default();
                pattern
                    .matches(path)
                    .then(|| format!("{}:{}: {}", path, lineno, text))
            })
            .collect())
    }
}

fn insert_tree_entry(root: &mut Map<String, JsonValue>, path: &str, kind: &str) {
    let mut node = root;
    let mut parts = path.split('/').peekable();
    while let Some(name) = parts.next() {
        if parts.peek().is_none() {
            let value = if kind == "tree" {
                JsonValue::Object(Map::new())
            } else {
                JsonValue::from(kind)
            };
            node.entry(name.to_string()).or_insert(value);
            return;
        }
        let child = node
            .entry(name.to_string())
            .or_insert_with(|| JsonValue::Object(Map::new()));
        node = match child {
            JsonValue::Object(map) => map,
            _ => return,
        };
    }
}

/// Git server state.
pub struct GitAdapter {
    repositories: Vec<PathBuf>,
}

impl GitAdapter {
    /// Create the adapter, validating the repository given on the command line.
    pub fn new(repository: Option<PathBuf>) -> Result<Self> {
        let mut repositories = Vec::new();
        if let Some(path) = repository {
            GitRepo::open(&path)?;
            tracing::info!("Using repository at {}", path.display());
            repositories.push(path);
        }
        Ok(Self { repositories })
    }

    /// Repositories configured at startup.
    pub fn repositories(&self) -> &[PathBuf] {
        &self.repositories
    }
}

fn repo_arg(args: &Map<String, JsonValue>) -> Result<GitRepo> {
    GitRepo::open(get_string_arg(args, "repo_path")?)
}

fn join_entries(entries: &[CommitEntry]) -> String {
    entries
        .iter()
        .map(CommitEntry::to_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Get all git tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "git_status",
            "Shows the working tree status",
            schema!(object { required: { "repo_path": string } }),
        ),
        ToolDef::new(
            "git_diff_unstaged",
            "Shows changes in the working directory that are not yet staged",
            schema!(object { required: { "repo_path": string } }),
        ),
        ToolDef::new(
            "git_diff_staged",
            "Shows changes that are staged for commit",
            schema!(object { required: { "repo_path": string } }),
        ),
        ToolDef::new(
            "git_diff",
            "Shows differences between branches or commits",
            schema!(object { required: { "repo_path": string, "target": string } }),
        ),
        ToolDef::new(
            "git_commit",
            "Records changes to the repository",
            schema!(object {
                required: { "repo_path": string, "message": string },
                optional: { "files": array_string => "Paths to stage before committing" }
            }),
        ),
        ToolDef::new(
            "git_add",
            "Adds file contents to the staging area",
            schema!(object { required: { "repo_path": string, "files": array_string } }),
        ),
        ToolDef::new(
            "git_reset",
            "Unstages all staged changes",
            schema!(object { required: { "repo_path": string } }),
        ),
        ToolDef::new(
            "git_log",
            "Shows the commit logs",
            schema!(object {
                required: { "repo_path": string },
                optional: { "max_count": integer => "Maximum number of commits (default 10)" }
            }),
        ),
        ToolDef::new(
            "git_create_branch",
            "Creates a new branch from an optional base branch",
            schema!(object {
                required: { "repo_path": string, "branch_name": string },
                optional: { "base_branch": string }
            }),
        ),
        ToolDef::new(
            "git_checkout",
            "Switches branches",
            schema!(object { required: { "repo_path": string, "branch_name": string } }),
        ),
        ToolDef::new(
            "git_show",
            "Shows the contents of a commit",
            schema!(object { required: { "repo_path": string, "revision": string } }),
        ),
        ToolDef::new(
            "git_init",
            "Initialize a new Git repository",
            schema!(object { required: { "repo_path": string } }),
        ),
        ToolDef::new(
            "git_read_file",
            "Retrieves the content of a file at a given reference (commit, branch, or tag)",
            schema!(object {
                required: { "repo_path": string, "file_path": string },
                optional: { "ref": string => "Revision to read from (default HEAD)" }
            }),
        ),
        ToolDef::new(
            "git_list_files",
            "Lists all files in the repository, or below a directory, at a given reference",
            schema!(object {
                required: { "repo_path": string },
                optional: {
                    "path": string => "Directory to list (default: repository root)",
                    "ref": string => "Revision to list (default HEAD)"
                }
            }),
        ),
        ToolDef::new(
            "git_file_history",
            "Shows the commits that changed a specific file",
            schema!(object {
                required: { "repo_path": string, "file_path": string },
                optional: { "max_entries": integer => "Maximum number of commits (default 10)" }
            }),
        ),
        ToolDef::new(
            "git_search_code",
            "Searches tracked files for a fixed string, optionally filtered by a glob pattern",
            schema!(object {
                required: { "repo_path": string, "query": string },
                optional: {
                    "file_pattern": string => "Glob matched against file paths (default *)",
                    "ref": string => "Revision to search (default HEAD)"
                }
            }),
        ),
        ToolDef::new(
            "git_get_diff",
            "Shows the diff between two revisions, optionally for a single file",
            schema!(object {
                required: { "repo_path": string, "ref1": string, "ref2": string },
                optional: { "file_path": string => "Limit the diff to this path" }
            }),
        ),
        ToolDef::new(
            "git_get_repo_structure",
            "Shows the directory tree of the repository at a given reference as JSON",
            schema!(object {
                required: { "repo_path": string },
                optional: { "ref": string => "Revision to inspect (default HEAD)" }
            }),
        ),
        ToolDef::new(
            "git_list_repos",
            "Lists the repositories this server was started with",
            schema!(object {}),
        ),
    ]
}

#[async_trait]
impl Adapter for GitAdapter {
    fn server_name(&self) -> &str {
        "mcp-git"
    }

    fn tools(&self) -> Vec<ToolDef> {
        tools()
    }

    async fn call_tool(&mut self, name: &str, args: Map<String, JsonValue>) -> Result<String> {
        match name {
            "git_init" => GitRepo::init(get_string_arg(&args, "repo_path")?),

            "git_list_repos" => {
                let repos: Vec<String> = self
                    .repositories
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                Ok(serde_json::to_string(&repos)?)
            }

            "git_status" => Ok(format!("Repository status:\n{}", repo_arg(&args)?.status()?)),

            "git_diff_unstaged" => Ok(format!(
                "Unstaged changes:\n{}",
                repo_arg(&args)?.diff_unstaged()?
            )),

            "git_diff_staged" => Ok(format!(
                "Staged changes:\n{}",
                repo_arg(&args)?.diff_staged()?
            )),

            "git_diff" => {
                let repo = repo_arg(&args)?;
                let target = get_string_arg(&args, "target")?;
                let diff = repo.diff(&target)?;
                Ok(format!("Diff with {}:\n{}", target, diff))
            }

            "git_commit" => {
                let repo = repo_arg(&args)?;
                let message = get_string_arg(&args, "message")?;
                let files = match args.get("files") {
                    Some(JsonValue::Null) | None => None,
                    Some(_) => Some(get_string_array_arg(&args, "files")?),
                };
                let hash = repo.commit(&message, files.as_deref())?;
                Ok(format!("Changes committed successfully with hash {}", hash))
            }

            "git_add" => {
                let repo = repo_arg(&args)?;
                let files = get_string_array_arg(&args, "files")?;
                repo.add(&files)?;
                Ok("Files staged successfully".to_string())
            }

            "git_reset" => {
                repo_arg(&args)?.reset()?;
                Ok("All staged changes reset".to_string())
            }

            "git_log" => {
                let repo = repo_arg(&args)?;
                let max_count = get_optional_u64(&args, "max_count")?.unwrap_or(DEFAULT_LOG_COUNT);
                let entries = repo.log(max_count)?;
                Ok(format!("Commit history:\n{}", join_entries(&entries)))
            }

            "git_create_branch" => {
                let repo = repo_arg(&args)?;
                let branch_name = get_string_arg(&args, "branch_name")?;
                let base_branch = get_optional_string(&args, "base_branch");
                let base = repo.create_branch(&branch_name, base_branch.as_deref())?;
                Ok(format!("Created branch '{}' from '{}'", branch_name, base))
            }

            "git_checkout" => {
                let repo = repo_arg(&args)?;
                let branch_name = get_string_arg(&args, "branch_name")?;
                repo.checkout(&branch_name)?;
                Ok(format!("Switched to branch '{}'", branch_name))
            }

            "git_show" => {
                let repo = repo_arg(&args)?;
                repo.show(&get_string_arg(&args, "revision")?)
            }

            "git_read_file" => {
                let repo = repo_arg(&args)?;
                let file_path = get_string_arg(&args, "file_path")?;
                let rev = get_optional_string(&args, "ref").unwrap_or_else(|| "HEAD".to_string());
                repo.read_file(&file_path, &rev)
            }

            "git_list_files" => {
                let repo = repo_arg(&args)?;
                let path = get_optional_string(&args, "path").unwrap_or_default();
                let rev = get_optional_string(&args, "ref").unwrap_or_else(|| "HEAD".to_string());
                Ok(repo.list_files(&path, &rev)?.join("\n"))
            }

            "git_file_history" => {
                let repo = repo_arg(&args)?;
                let file_path = get_string_arg(&args, "file_path")?;
                let max_entries =
                    get_optional_u64(&args, "max_entries")?.unwrap_or(DEFAULT_LOG_COUNT);
                let entries = repo.file_history(&file_path, max_entries)?;
                Ok(format!("History of {}:\n{}", file_path, join_entries(&entries)))
            }

            "git_search_code" => {
                let repo = repo_arg(&args)?;
                let query = get_string_arg(&args, "query")?;
                let file_pattern =
                    get_optional_string(&args, "file_pattern").unwrap_or_else(|| "*".to_string());
                let rev = get_optional_string(&args, "ref").unwrap_or_else(|| "HEAD".to_string());
                let matches = repo.search_code(&query, &file_pattern, &rev)?;
                if matches.is_empty() {
                    Ok(format!("No matches found for '{}'", query))
                } else {
                    Ok(matches.join("\n"))
                }
            }

            "git_get_diff" => {
                let repo = repo_arg(&args)?;
                let ref1 = get_string_arg(&args, "ref1")?;
                let ref2 = get_string_arg(&args, "ref2")?;
                let file_path = get_optional_string(&args, "file_path");
                let diff = repo.diff_refs(&ref1, &ref2, file_path.as_deref())?;
                Ok(format!("Diff between {} and {}:\n{}", ref1, ref2, diff))
            }

            "git_get_repo_structure" => {
                let repo = repo_arg(&args)?;
                let rev = get_optional_string(&args, "ref").unwrap_or_else(|| "HEAD".to_string());
                Ok(serde_json::to_string_pretty(&repo.structure(&rev)?)?)
            }

            _ => Err(McpError::UnknownTool(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_records() {
        let raw = format!(
            "abc123{f}Ada{f}2024-01-01 12:00:00 +0100{f}First line\n\nBody\n{r}\ndef456{f}Bob{f}2023-12-31 09:00:00 +0000{f}Initial\n{r}\n",
            f = FIELD_SEP,
            r = RECORD_SEP
        );
        let entries = parse_log(&raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].hash, "abc123");
        assert_eq!(entries[0].author, "Ada");
        assert_eq!(entries[1].hash, "def456");
        assert_eq!(entries[1].message.trim_end(), "Initial");
    }

    #[test]
    fn test_entry_text_layout() {
        let entry = CommitEntry {
            hash: "abc".to_string(),
            author: "Ada".to_string(),
            date: "2024-01-01 12:00:00 +0100".to_string(),
            message: "Fix parser\n".to_string(),
        };
        assert_eq!(
            entry.to_text(),
            "Commit: abc\nAuthor: Ada\nDate: 2024-01-01 12:00:00 +0100\nMessage: Fix parser\n"
        );
    }

    #[test]
    fn test_tree_entries_nest_by_path() {
        let mut root = Map::new();
        insert_tree_entry(&mut root, "src", "tree");
        insert_tree_entry(&mut root, "src/lib.rs", "blob");
        insert_tree_entry(&mut root, "vendor/dep", "commit");
        insert_tree_entry(&mut root, "README.md", "blob");
        assert_eq!(
            JsonValue::Object(root),
            serde_json::json!({
                "src": {"lib.rs": "blob"},
                "vendor": {"dep": "commit"},
                "README.md": "blob"
            })
        );
    }

    #[test]
    fn test_option_like_refs_are_rejected() {
        assert!(validate_ref("target", "--output=/tmp/x").is_err());
        assert!(validate_ref("target", "").is_err());
        assert!(validate_ref("target", "main").is_ok());
        assert!(validate_ref("target", "HEAD~1").is_ok());
    }
}
