//! # Master Provisioner
//!
//! Stands up a buildbot master under `[master] basedir` by walking a fixed
//! sequence of transitions:
//!
//! ```text
//! unconfigured -> directories-created -> environment-ready
//!     -> dependencies-installed -> buildbot-installed -> configured
//! ```
//!
//! After each completed transition the reached state is written to
//! `<basedir>/.install-state`. [`Master::install`] is all-or-nothing: it
//! refuses to touch an existing base directory. [`Master::resume`] reads the
//! record and continues with the first transition that has not completed.

mod state;

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use log::{debug, error, info};

pub use state::InstallState;

use crate::config::{Config, COMMON_SECTION};
use crate::error::{ConfigError, MasterError, RepositoryError};
use crate::process;
use crate::repository::Repository;
use crate::settings::{MasterSettings, VirtualenvSettings, MASTER_SECTION};
use crate::template::generate_master_json;
use crate::vcs::VersionControl;
use crate::venv::Virtualenv;

/// Local directory name for a repository: the last path component with a
/// trailing `-<tracking_bug>` removed, e.g. `users/alice/tools-9999` -> `tools`.
pub fn canonical_name(repo_name: &str, tracking_bug: Option<&str>) -> String {
    let name = repo_name.rsplit('/').next().unwrap_or(repo_name);
    let canonical = tracking_bug
        .map(|bug| format!("-{}", bug))
        .and_then(|suffix| name.strip_suffix(suffix.as_str()))
        .unwrap_or(name);
    debug!("canonical name: {} => {}", repo_name, canonical);
    canonical.to_string()
}

/// Create `dst` as a symlink to `src`.
///
/// A symlink already pointing at `src` is accepted, anything else at `dst`
/// is an error.
fn link(src: &Path, dst: &Path) -> Result<(), MasterError> {
    debug!("creating symlink: {} => {}", src.display(), dst.display());
    if fs::read_link(dst).map(|target| target == src).unwrap_or(false) {
        return Ok(());
    }
    symlink(src, dst)?;
    Ok(())
}

#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Append `line` to the `.pth` file unless it is already listed.
fn append_pth_line(pth_file: &Path, line: &str) -> Result<(), MasterError> {
    let existing = match fs::read_to_string(pth_file) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err.into()),
    };
    if !existing.lines().any(|listed| listed == line) {
        let mut pth = OpenOptions::new().create(true).append(true).open(pth_file)?;
        writeln!(pth, "{}", line)?;
    }
    Ok(())
}

/// A buildbot master described by the `[master]` section.
pub struct Master<'a> {
    config: &'a Config,
    settings: MasterSettings,
    tracking_bug: Option<String>,
    venv: Virtualenv,
    vcs: Arc<dyn VersionControl>,
}

impl<'a> Master<'a> {
    pub fn new(config: &'a Config, vcs: Arc<dyn VersionControl>) -> Result<Self, MasterError> {
        let settings = MasterSettings::from_config(config)?;
        let venv = Virtualenv::new(VirtualenvSettings::from_config(config)?, &settings.basedir);
        Ok(Self {
            config,
            tracking_bug: config.get_opt(COMMON_SECTION, "tracking_bug")?,
            settings,
            venv,
            vcs,
        })
    }

    pub fn settings(&self) -> &MasterSettings {
        &self.settings
    }

    pub fn basedir(&self) -> &Path {
        &self.settings.basedir
    }

    /// The recorded install state; a missing base directory is `Unconfigured`.
    pub fn state(&self) -> Result<InstallState, MasterError> {
        if !self.basedir().exists() {
            return Ok(InstallState::Unconfigured);
        }
        state::read(self.basedir())?.ok_or_else(|| MasterError::State {
            path: state::record_path(self.basedir()),
            message: "no install state record".to_string(),
        })
    }

    /// Install the master into a base directory that must not exist yet.
    pub fn install(&self) -> Result<(), MasterError> {
        self.prepare_dirs()?;
        info!("installing buildbot master");
        self.advance_from(InstallState::DirectoriesCreated)
    }

    /// Continue an installation from its recorded state.
    ///
    /// A base directory without a record was not created by this tool and is
    /// rejected like in [`Master::install`].
    pub fn resume(&self) -> Result<(), MasterError> {
        if !self.basedir().exists() {
            return self.install();
        }
        match state::read(self.basedir())? {
            Some(InstallState::Configured) => {
                info!("buildbot master in {} is already configured", self.basedir().display());
                Ok(())
            }
            Some(recorded) => {
                info!("resuming buildbot master install after {}", recorded);
                self.advance_from(recorded)
            }
            None => Err(self.already_exists("no install state record to resume from")),
        }
    }

    fn already_exists(&self, message: &str) -> MasterError {
        MasterError::AlreadyExists {
            path: self.basedir().to_path_buf(),
            message: message.to_string(),
        }
    }

    fn advance_from(&self, mut current: InstallState) -> Result<(), MasterError> {
        while let Some(target) = current.next() {
            match target {
                InstallState::Unconfigured | InstallState::DirectoriesCreated => {}
                InstallState::EnvironmentReady => self.virtualenv()?,
                InstallState::DependenciesInstalled => self.deps()?,
                InstallState::BuildbotInstalled => self.install_buildbot()?,
                InstallState::Configured => {
                    self.master()?;
                    self.master_makefile()?;
                }
            }
            state::write(self.basedir(), target)?;
            debug!("buildbot master state: {}", target);
            current = target;
        }
        Ok(())
    }

    /// Create the base directory; an existing one means a previous run.
    pub fn prepare_dirs(&self) -> Result<(), MasterError> {
        let basedir = self.basedir();
        if basedir.exists() {
            let err = self.already_exists("File exists");
            debug!("{}", err);
            return Err(err);
        }
        fs::create_dir_all(basedir).map_err(|e| {
            let err = self.already_exists(&e.to_string());
            debug!("{}", err);
            err
        })?;
        state::write(basedir, InstallState::DirectoriesCreated)
    }

    /// Create the virtual environment in the base directory.
    pub fn virtualenv(&self) -> Result<(), MasterError> {
        self.venv.create(&self.settings.virtualenv_extra_args)?;
        Ok(())
    }

    /// Install `virtualenv_requirements` into the environment.
    pub fn deps(&self) -> Result<(), MasterError> {
        let requirements = &self.settings.virtualenv_requirements;
        match requirements.as_slice() {
            [single] => self.venv.install_dependencies(single.as_str())?,
            _ => self.venv.install_dependencies(requirements.as_slice())?,
        }
        Ok(())
    }

    fn clone_repositories(&self) -> Result<(), MasterError> {
        for name in &self.settings.repositories {
            let dst_dir = self
                .basedir()
                .join(canonical_name(name, self.tracking_bug.as_deref()));
            let repo = Repository::new(self.config, name, Arc::clone(&self.vcs));
            repo.clone_locally(&dst_dir, &self.settings.branch, &self.settings.clone_from)
                .map_err(|err: RepositoryError| {
                    error!("{}", err);
                    MasterError::from(err)
                })?;
        }
        Ok(())
    }

    /// Clone the repositories, generate the master JSON, run `setup.py` and
    /// put buildbotcustom and the tools library on the environment's path.
    pub fn install_buildbot(&self) -> Result<(), MasterError> {
        let settings = &self.settings;
        self.clone_repositories()?;
        generate_master_json(
            self.config,
            MASTER_SECTION,
            &settings.json_template,
            &settings.dst_json,
        )?;
        if let Some(setup_py) = &settings.setup_py {
            self.venv.setup_py(setup_py, &settings.buildbot_install)?;
        }

        link(
            &settings.buildbotcustom_dir,
            &settings.site_packages.join("buildbotcustom"),
        )?;

        append_pth_line(&settings.pth_file, &settings.tools_python)
    }

    /// Run the `create_master` command inside the configs checkout.
    pub fn master(&self) -> Result<(), MasterError> {
        let (program, args) = self
            .settings
            .create_master
            .split_first()
            .ok_or_else(|| ConfigError::Invalid {
                section: MASTER_SECTION.to_string(),
                option: "create_master".to_string(),
                message: "no command given".to_string(),
            })?;
        info!("creating buildbot master");
        process::run_streaming(
            Command::new(program)
                .args(args)
                .current_dir(&self.settings.buildbot_configs_dir),
        )?;
        Ok(())
    }

    /// Link `Makefile.master` from the configs checkout as `<basedir>/Makefile`.
    pub fn master_makefile(&self) -> Result<(), MasterError> {
        link(
            &self.settings.buildbot_configs_dir.join("Makefile.master"),
            &self.basedir().join("Makefile"),
        )
    }

    fn make(&self, target: &str) -> Result<(), MasterError> {
        info!("make {} in {}", target, self.basedir().display());
        process::status(
            Command::new(&self.settings.make)
                .arg(target)
                .current_dir(self.basedir()),
        )?;
        Ok(())
    }

    pub fn start(&self) -> Result<(), MasterError> {
        self.make("start")
    }

    pub fn stop(&self) -> Result<(), MasterError> {
        self.make("stop")
    }

    pub fn checkconfig(&self) -> Result<(), MasterError> {
        self.make("checkconfig")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::repository::testing::{Call, MockVcs};
    use crate::venv::testing::{broken_virtualenv, fake_virtualenv};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CONFIGS_URL: &str = "https://hg.example.com/build/buildbot-configs";
    const CUSTOM_URL: &str = "https://hg.example.com/build/buildbotcustom";

    struct Fixture {
        _temp_dir: TempDir,
        root: PathBuf,
        basedir: PathBuf,
        config: Config,
    }

    fn fixture(virtualenv: fn(&Path) -> PathBuf) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let basedir = root.join("master");
        let template = root.join("master.json.in");
        fs::write(
            &template,
            "[{\n  \"basedir\": \"@BASEDIR@\",\n  \"http_port\": @HTTP_PORT@\n}]\n",
        )
        .unwrap();
        let ini = format!(
            r#"
[common]
username = alice
tracking_bug = 12345

[virtualenv]
command = {virtualenv}

[buildbot-configs]
canonical = {configs}

[buildbotcustom-12345]
canonical = {custom}

[master]
basedir = {basedir}
repositories = buildbot-configs, buildbotcustom-12345
virtualenv_requirements = buildbot==0.8.2, simplejson
json_template = {template}
dst_json = %(basedir)s/master.json
http_port = 8010
create_master = sh, -c, echo created > master-created
site_packages = %(basedir)s/lib/python2.7/site-packages
buildbotcustom_dir = %(basedir)s/buildbotcustom
pth_file = %(site_packages)s/build-tools-lib.pth
tools_python = %(basedir)s/tools/lib/python
"#,
            virtualenv = virtualenv(&root).display(),
            configs = CONFIGS_URL,
            custom = CUSTOM_URL,
            basedir = basedir.display(),
            template = template.display(),
        );
        Fixture {
            _temp_dir: temp_dir,
            root,
            basedir,
            config: ini.parse().unwrap(),
        }
    }

    fn mock() -> Arc<MockVcs> {
        Arc::new(
            MockVcs::new()
                .seed(CONFIGS_URL, "Makefile.master", "start:\n\ttrue\n")
                .seed(CUSTOM_URL, "__init__.py", ""),
        )
    }

    #[test]
    fn test_append_pth_line_once() {
        let temp_dir = TempDir::new().unwrap();
        let pth = temp_dir.path().join("build-tools-lib.pth");

        append_pth_line(&pth, "/srv/tools/lib/python").unwrap();
        append_pth_line(&pth, "/srv/tools/lib/python").unwrap();
        append_pth_line(&pth, "/srv/other").unwrap();

        assert_eq!(
            fs::read_to_string(&pth).unwrap(),
            "/srv/tools/lib/python\n/srv/other\n"
        );
    }

    #[test]
    fn test_append_pth_line_unreadable_file() {
        let temp_dir = TempDir::new().unwrap();
        // a directory cannot be read as a .pth file
        let result = append_pth_line(temp_dir.path(), "/srv/tools/lib/python");
        assert!(matches!(result, Err(MasterError::Io(_))));
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("tools-9999", Some("9999")), "tools");
        assert_eq!(canonical_name("users/alice/tools-9999", Some("9999")), "tools");
        assert_eq!(canonical_name("tools-9999", Some("1234")), "tools-9999");
        assert_eq!(canonical_name("buildbot-configs", None), "buildbot-configs");
    }

    #[test]
    fn test_install_end_to_end() {
        let fixture = fixture(fake_virtualenv);
        let vcs = mock();
        let master = Master::new(&fixture.config, vcs.clone()).unwrap();

        master.install().unwrap();

        let basedir = &fixture.basedir;
        assert!(basedir.join("bin/activate").is_file());
        assert!(basedir.join("buildbot-configs/Makefile.master").is_file());
        assert!(basedir.join("buildbotcustom/__init__.py").is_file());
        assert_eq!(
            fs::read_to_string(basedir.join("master.json")).unwrap(),
            format!(
                "[{{\n  \"basedir\": \"{}\",\n  \"http_port\": 8010\n}}]\n",
                basedir.display()
            )
        );
        assert_eq!(
            fs::read_link(basedir.join("Makefile")).unwrap(),
            basedir.join("buildbot-configs/Makefile.master")
        );
        assert_eq!(
            fs::read_link(basedir.join("lib/python2.7/site-packages/buildbotcustom")).unwrap(),
            basedir.join("buildbotcustom")
        );
        assert_eq!(
            fs::read_to_string(basedir.join("lib/python2.7/site-packages/build-tools-lib.pth"))
                .unwrap(),
            format!("{}\n", basedir.join("tools/lib/python").display())
        );
        assert_eq!(
            fs::read_to_string(basedir.join("bin/pip.log")).unwrap(),
            "install buildbot==0.8.2 simplejson\n"
        );
        assert!(basedir.join("buildbot-configs/master-created").is_file());
        assert_eq!(master.state().unwrap(), InstallState::Configured);

        let clones: Vec<_> = vcs
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Clone { url, target, .. } => Some((url, target)),
                _ => None,
            })
            .collect();
        assert_eq!(
            clones,
            vec![
                (CONFIGS_URL.to_string(), basedir.join("buildbot-configs")),
                (CUSTOM_URL.to_string(), basedir.join("buildbotcustom")),
            ]
        );
    }

    #[test]
    fn test_install_refuses_existing_basedir() {
        let fixture = fixture(fake_virtualenv);
        fs::create_dir_all(&fixture.basedir).unwrap();
        let vcs = mock();
        let master = Master::new(&fixture.config, vcs.clone()).unwrap();

        let err = master.install().unwrap_err();

        assert!(matches!(err, MasterError::AlreadyExists { .. }));
        assert!(err.to_string().starts_with("Cannot create: "));
        assert!(vcs.calls().is_empty());
        assert!(!fixture.basedir.join("bin").exists());
    }

    #[test]
    fn test_resume_continues_after_failed_step() {
        let mut fixture = fixture(broken_virtualenv);
        let vcs = mock();
        {
            let master = Master::new(&fixture.config, vcs.clone()).unwrap();
            let err = master.install().unwrap_err();
            assert!(matches!(err, MasterError::Virtualenv(_)));
            assert_eq!(master.state().unwrap(), InstallState::DirectoriesCreated);
        }

        let working = fake_virtualenv(&fixture.root);
        fixture
            .config
            .set("virtualenv", "command", &working.to_string_lossy());
        let master = Master::new(&fixture.config, vcs.clone()).unwrap();

        // a plain install still refuses the half-built directory
        assert!(matches!(
            master.install(),
            Err(MasterError::AlreadyExists { .. })
        ));

        master.resume().unwrap();
        assert_eq!(master.state().unwrap(), InstallState::Configured);
        assert!(fixture.basedir.join("Makefile").exists());

        // nothing left to do
        master.resume().unwrap();
    }

    #[test]
    fn test_resume_rejects_foreign_basedir() {
        let fixture = fixture(fake_virtualenv);
        fs::create_dir_all(&fixture.basedir).unwrap();
        let master = Master::new(&fixture.config, mock()).unwrap();

        assert!(matches!(
            master.resume(),
            Err(MasterError::AlreadyExists { .. })
        ));
        assert!(matches!(master.state(), Err(MasterError::State { .. })));
    }

    #[test]
    fn test_failed_clone_is_a_master_error() {
        let fixture = fixture(fake_virtualenv);
        let vcs = Arc::new(MockVcs::new().failing(CONFIGS_URL));
        let master = Master::new(&fixture.config, vcs).unwrap();

        let err = master.install().unwrap_err();

        assert!(matches!(err, MasterError::Repository(_)));
        assert_eq!(master.state().unwrap(), InstallState::DependenciesInstalled);
        assert!(!fixture.basedir.join("Makefile").exists());
    }

    #[test]
    fn test_make_targets() {
        let fixture = fixture(fake_virtualenv);
        let mut config = fixture.config.clone();
        config.set("master", "make", "true");
        fs::create_dir_all(&fixture.basedir).unwrap();
        let master = Master::new(&config, mock()).unwrap();
        master.start().unwrap();
        master.checkconfig().unwrap();

        config.set("master", "make", "false");
        let master = Master::new(&config, mock()).unwrap();
        assert!(matches!(master.stop(), Err(MasterError::Command(_))));
    }
}
