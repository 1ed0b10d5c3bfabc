//! End-to-end tests for the `repos` command against local git remotes.

mod common;
use common::prelude::*;

const REPOS_CONFIG: &str = r#"
[common]
username = alice
vcs = git

[buildbot-configs]
user = {root}/remotes/buildbot-configs-%(tracking_bug)s.git

[tools]
user = {root}/remotes/tools-%(tracking_bug)s.git

[master]
http_port = 8010

[staging_files]
firefox = mozilla/release-firefox.py
common_files = mozilla/config.py
l10n = mozilla/l10n-changesets

[patch-buildbot-configs]
replace = buildbot-configs, tools
commit_message = staging release for bug %(tracking_bug)s
poll_attempts = 1
poll_interval = 0

[patch-tools]
commit_message = staging release for bug %(tracking_bug)s
poll_attempts = 1
poll_interval = 0
src_production_masters_json = {url}
dst_production_masters_json = buildfarm/maintenance/production-masters.json
"#;

const RELEASE_CONFIG: &str = "\
releaseConfig['build_tools_repo_path'] = 'build/tools'
releaseConfig['configs_url'] = 'https://hg.example.com/build/tools/raw-file/default/x'
";

const PM_JSON: &str = "buildfarm/maintenance/production-masters.json";

fn repos_fixture(url: &str) -> TestFixture {
    TestFixture::new().with_config(&REPOS_CONFIG.replace("{url}", url))
}

fn release_args() -> [&'static str; 6] {
    ["--bug", "12345", "--version", "33.0b1", "--release", "firefox"]
}

#[test]
fn test_repos_patches_user_forks() {
    if !git_available() {
        return;
    }
    let fixture = repos_fixture(&serve_once("[{\"http_port\": @HTTP_PORT@}]\n"));
    let remotes = fixture.path().join("remotes");
    let configs = GitRemote::new(
        &remotes,
        "buildbot-configs-12345",
        &["default", "production"],
        &[
            ("mozilla/release-firefox.py", RELEASE_CONFIG),
            ("mozilla/config.py", "CONFIGS = 'build/buildbot-configs'\n"),
        ],
    );
    let tools = GitRemote::new(&remotes, "tools-12345", &["default"], &[(PM_JSON, "[]\n")]);

    fixture
        .command_with_config("repos")
        .args(release_args())
        .assert()
        .code(0)
        .stderr(predicate::str::contains("unable to").not())
        .stderr(predicate::str::contains("patch-tools done"));

    for branch in ["default", "production"] {
        assert_eq!(configs.commit_count(branch), 2);
        assert_eq!(
            configs.show(branch, "mozilla/release-firefox.py"),
            "releaseConfig['build_tools_repo_path'] = 'users/alice_mozilla.com/tools-12345'\n\
             releaseConfig['configs_url'] = 'https://hg.example.com/build/tools/raw-file/default/x'\n"
        );
        assert_eq!(
            configs.show(branch, "mozilla/config.py"),
            "CONFIGS = 'users/alice_mozilla.com/buildbot-configs-12345'\n"
        );
    }
    assert_eq!(tools.commit_count("default"), 2);
    assert_eq!(tools.show("default", PM_JSON), "[{\"http_port\": 8010}]\n");
}

#[test]
fn test_repos_unavailable_remote_is_logged() {
    let fixture = repos_fixture("http://127.0.0.1:9/unused");

    fixture
        .command_with_config("repos")
        .args(release_args())
        .assert()
        .code(0)
        .stderr(predicate::str::contains("unable to patch user repositories"))
        .stderr(predicate::str::contains("still unavailable after 1 attempts"));
}

#[test]
fn test_repos_stops_at_first_failure() {
    if !git_available() {
        return;
    }
    // tools is patched only after buildbot-configs succeeded
    let fixture = repos_fixture("http://127.0.0.1:9/unused");
    let tools = GitRemote::new(
        &fixture.path().join("remotes"),
        "tools-12345",
        &["default"],
        &[(PM_JSON, "[]\n")],
    );

    fixture
        .command_with_config("repos")
        .args(release_args())
        .assert()
        .code(0)
        .stderr(predicate::str::contains("buildbot-configs-12345.git"));

    assert_eq!(tools.commit_count("default"), 1);
}
