//! Production to user repository path mapping.

use std::collections::BTreeMap;

/// Domain of the per-user repository namespace.
pub const USER_DOMAIN: &str = "mozilla.com";

/// Release branches whose staging copies live under `users/stage-ffxbld/`.
const STAGE_BRANCHES: [&str; 3] = ["mozilla-beta", "mozilla-aurora", "mozilla-esr31"];

/// A production repository path and the user path that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    pub production: String,
    pub user: String,
}

impl RepoPaths {
    fn new(production: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            production: production.into(),
            user: user.into(),
        }
    }
}

/// Build the substitution map for one patch run.
///
/// Every repository name maps `build/<name>` to
/// `users/<username>_mozilla.com/<name>-<tracking_bug>`. Fixed entries for the
/// staging user and the release branches are added afterwards and win over a
/// repository of the same name.
pub fn patch_map<S: AsRef<str>>(
    repository_names: &[S],
    username: &str,
    tracking_bug: &str,
) -> BTreeMap<String, RepoPaths> {
    let user_root = format!("users/{}_{}", username, USER_DOMAIN);
    let mut map = BTreeMap::new();
    for name in repository_names {
        let name = name.as_ref();
        map.insert(
            name.to_string(),
            RepoPaths::new(
                format!("build/{}", name),
                format!("{}/{}-{}", user_root, name, tracking_bug),
            ),
        );
    }

    map.insert(
        "stage-ffxbld".to_string(),
        RepoPaths::new("users/stage-ffxbld", user_root.as_str()),
    );
    for branch in STAGE_BRANCHES {
        map.insert(
            format!("{}-stage", branch),
            RepoPaths::new("users/stage-ffxbld/", format!("{}/{}", user_root, branch)),
        );
    }
    map.insert(
        "mozilla-beta".to_string(),
        RepoPaths::new("releases/mozilla-beta", format!("{}/mozilla-beta", user_root)),
    );
    map
}
