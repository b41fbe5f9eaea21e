//! Headless Chrome, driven as a subprocess.
//!
//! Every [`ChromeSession`] owns a throwaway profile directory, so cookies and
//! history never carry over between lookups. Dropping the session kills any
//! browser process still running and deletes the profile.

use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rand::Rng;
use tempfile::TempDir;

use crate::config::AppConfig;
use crate::error::RenderError;

const BINARY_CANDIDATES: [&str; 4] = [
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.6367.91 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.6367.91 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.6312.122 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.6367.91 Safari/537.36",
];

/// Time the page's scripts get to run before the DOM is serialized.
const SCRIPT_BUDGET_MS: u64 = 10_000;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One open browser context. Implementations release everything on drop.
pub trait BrowserPage {
    /// Loads `url` and returns the DOM after scripts have run.
    fn dump_dom(&mut self, url: &str) -> Result<String, RenderError>;
    fn screenshot(&mut self, url: &str, dest: &Path) -> Result<(), RenderError>;
}

/// Opens fresh browser sessions.
pub trait PageRenderer: Send + Sync {
    type Session: BrowserPage;

    fn open(&self) -> Result<Self::Session, RenderError>;
}

pub struct HeadlessChrome {
    binary_override: Option<PathBuf>,
    timeout: Duration,
}

impl HeadlessChrome {
    pub fn new(config: &AppConfig) -> Self {
        HeadlessChrome {
            binary_override: config.chrome_binary.clone(),
            timeout: config.render_timeout,
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf, RenderError> {
        if let Some(path) = &self.binary_override {
            return Ok(path.clone());
        }
        let search_path = env::var_os("PATH").unwrap_or_default();
        env::split_paths(&search_path)
            .flat_map(|dir| BINARY_CANDIDATES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| RenderError::BrowserNotFound {
                tried: BINARY_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            })
    }
}

impl PageRenderer for HeadlessChrome {
    type Session = ChromeSession;

    fn open(&self) -> Result<ChromeSession, RenderError> {
        let binary = self.resolve_binary()?;
        let profile = tempfile::Builder::new()
            .prefix("carrier-scraper-profile-")
            .tempdir()
            .map_err(|source| RenderError::Io {
                operation: "create browser profile",
                source,
            })?;
        let user_agent = USER_AGENTS[rand::thread_rng().gen_range(0..USER_AGENTS.len())];
        debug!("Opened browser session with profile {:?}", profile.path());

        Ok(ChromeSession {
            binary,
            profile,
            user_agent,
            timeout: self.timeout,
            child: None,
        })
    }
}

pub struct ChromeSession {
    binary: PathBuf,
    profile: TempDir,
    user_agent: &'static str,
    timeout: Duration,
    child: Option<Child>,
}

impl ChromeSession {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--hide-scrollbars")
            .arg("--window-size=1280,2000")
            .arg(format!("--user-data-dir={}", self.profile.path().display()))
            .arg(format!("--user-agent={}", self.user_agent))
            .arg(format!("--virtual-time-budget={}", SCRIPT_BUDGET_MS));
        cmd
    }

    /// Runs `cmd` to completion or until the session timeout, whichever
    /// comes first. Stdout goes to `stdout_path`.
    fn run(&mut self, mut cmd: Command, stdout_path: &Path) -> Result<(), RenderError> {
        let stdout = File::create(stdout_path).map_err(|source| RenderError::Io {
            operation: "create browser output file",
            source,
        })?;
        let child = cmd
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| RenderError::Io {
                operation: "spawn browser",
                source,
            })?;
        self.child = Some(child);

        let deadline = Instant::now() + self.timeout;
        loop {
            let polled = match self.child.as_mut() {
                Some(child) => child.try_wait().map_err(|source| RenderError::Io {
                    operation: "wait for browser",
                    source,
                })?,
                None => return Ok(()),
            };
            if let Some(status) = polled {
                self.child = None;
                if status.success() {
                    return Ok(());
                }
                return Err(RenderError::BrowserExit {
                    status: status.to_string(),
                });
            }
            if Instant::now() >= deadline {
                self.kill_running();
                return Err(RenderError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill_running(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!("Failed to kill browser process {}: {}", child.id(), e);
            }
            let _ = child.wait();
        }
    }
}

impl BrowserPage for ChromeSession {
    fn dump_dom(&mut self, url: &str) -> Result<String, RenderError> {
        let out = self.profile.path().join("dom.html");
        let mut cmd = self.command();
        cmd.arg("--dump-dom").arg(url);
        self.run(cmd, &out)?;
        fs::read_to_string(&out).map_err(|source| RenderError::Io {
            operation: "read rendered dom",
            source,
        })
    }

    fn screenshot(&mut self, url: &str, dest: &Path) -> Result<(), RenderError> {
        let out = self.profile.path().join("screenshot.log");
        let mut cmd = self.command();
        cmd.arg(format!("--screenshot={}", dest.display())).arg(url);
        self.run(cmd, &out)
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.kill_running();
        debug!("Closed browser session {:?}", self.profile.path());
    }
}
