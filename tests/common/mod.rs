//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures, helper functions, and macros
//! to reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config("[common]\nusername = alice\n");
//!     fixture.command().arg("master").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git, git_available, serve_once, GitRemote};
    pub use super::TestFixture;
}

/// Name of the configuration file written by [`TestFixture::with_config`].
pub const CONFIG_FILE: &str = "config.ini";

/// Returns `true` when a `git` executable can be run.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a fixed identity; panics on failure.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["-c", "user.name=Staging", "-c", "user.email=staging@example.com"])
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A bare git repository seeded with files on one or more branches.
#[allow(dead_code)]
pub struct GitRemote {
    pub path: PathBuf,
}

#[allow(dead_code)]
impl GitRemote {
    /// Create `<root>/<name>.git` with `files` committed on every branch.
    pub fn new(root: &Path, name: &str, branches: &[&str], files: &[(&str, &str)]) -> Self {
        let path = root.join(format!("{}.git", name));
        let seed = root.join(format!("{}-seed", name));
        fs::create_dir_all(root).expect("Failed to create remotes directory");
        fs::create_dir_all(&seed).expect("Failed to create seed directory");
        git(root, &["init", "--bare", path.to_str().unwrap()]);
        git(&seed, &["init"]);
        for (file, content) in files {
            let file = seed.join(file);
            fs::create_dir_all(file.parent().unwrap()).unwrap();
            fs::write(file, content).unwrap();
        }
        git(&seed, &["add", "-A"]);
        git(&seed, &["commit", "-m", "seed"]);
        for branch in branches {
            git(
                &seed,
                &[
                    "push",
                    path.to_str().unwrap(),
                    &format!("HEAD:refs/heads/{}", branch),
                ],
            );
        }
        fs::remove_dir_all(seed).unwrap();
        Self { path }
    }

    pub fn url(&self) -> String {
        self.path.display().to_string()
    }

    /// Content of `file` at the tip of `branch`.
    pub fn show(&self, branch: &str, file: &str) -> String {
        git(
            self.path.parent().unwrap(),
            &[
                "--git-dir",
                self.path.to_str().unwrap(),
                "show",
                &format!("{}:{}", branch, file),
            ],
        )
    }

    /// Number of commits on `branch`.
    pub fn commit_count(&self, branch: &str) -> usize {
        git(
            self.path.parent().unwrap(),
            &[
                "--git-dir",
                self.path.to_str().unwrap(),
                "rev-list",
                "--count",
                branch,
            ],
        )
        .trim()
        .parse()
        .unwrap()
    }
}

/// Serve a single HTTP request with `body`; returns the URL.
#[allow(dead_code)]
pub fn serve_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            let _ = write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
        }
    });
    format!("http://{}/production-masters.json.in", addr)
}

/// A test fixture that provides a temporary directory with optional config.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_config("[common]\nusername = alice\n")
///     .with_file("master.json.in", "{}");
///
/// fixture.command_with_config().arg("--action").arg("stop").assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `config.ini` with the given content.
    ///
    /// `{root}` in the content is replaced with the fixture directory.
    pub fn with_config(self, content: &str) -> Self {
        let content = content.replace("{root}", &self.path().display().to_string());
        self.temp_dir
            .child(CONFIG_FILE)
            .write_str(&content)
            .expect("Failed to write config file");
        self
    }

    /// Add a file with the given path and content.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add an executable shell script.
    #[allow(dead_code)]
    pub fn with_script(self, path: &str, body: &str) -> Self {
        let script = self.path().join(path);
        fs::write(&script, format!("#!/bin/sh\n{}", body)).expect("Failed to write script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        }
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(CONFIG_FILE)
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("staging-release");
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .env_remove("HTTP_PROXY")
            .env_remove("http_proxy")
            .env_remove("ALL_PROXY")
            .env_remove("all_proxy")
            .env("GIT_AUTHOR_NAME", "Staging")
            .env("GIT_AUTHOR_EMAIL", "staging@example.com")
            .env("GIT_COMMITTER_NAME", "Staging")
            .env("GIT_COMMITTER_EMAIL", "staging@example.com");
        cmd
    }

    /// Create a command for `subcommand` with the config file argument.
    #[allow(dead_code)]
    pub fn command_with_config(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg(subcommand).arg("--cfg").arg(self.config_path());
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_config_expands_root() {
        let fixture = TestFixture::new().with_config("[master]\nbasedir = {root}/master\n");
        let content = fs::read_to_string(fixture.config_path()).unwrap();
        assert!(content.contains(&format!("{}/master", fixture.path().display())));
    }

    #[test]
    fn test_fixture_with_file() {
        let fixture = TestFixture::new().with_file("test.txt", "hello");
        assert!(fixture.path().join("test.txt").exists());
    }
}
