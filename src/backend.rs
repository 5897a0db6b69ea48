use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

/// Exit code reported for an upload request the user cancelled before
/// selecting any file. No process is launched in that case.
pub const UPLOAD_CANCELLED: i32 = 1;

const MAX_MSGS_PER_POLL: usize = 64;

fn new_hidden_command(program: impl AsRef<OsStr>) -> Command {
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new(program);
        cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
        cmd
    }
    #[cfg(not(target_os = "windows"))]
    {
        Command::new(program)
    }
}

// ── Start Parameters ───────────────────────────────────────────────

/// Numeric tuning knobs forwarded to the launched stack as environment
/// variables. Values are passed through string-encoded and unvalidated;
/// range checking is the stack's own business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StartParams {
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    #[serde(default = "default_num_queries")]
    pub num_queries: i64,
    #[serde(default = "default_per_page_chars")]
    pub per_page_chars: i64,
    #[serde(default = "default_total_chars")]
    pub total_chars: i64,
}

fn default_top_k() -> i64 {
    3
}

fn default_num_queries() -> i64 {
    3
}

fn default_per_page_chars() -> i64 {
    5000
}

fn default_total_chars() -> i64 {
    25000
}

impl Default for StartParams {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            num_queries: default_num_queries(),
            per_page_chars: default_per_page_chars(),
            total_chars: default_total_chars(),
        }
    }
}

fn start_env(params: &StartParams) -> [(&'static str, String); 4] {
    [
        ("TOP_K", params.top_k.to_string()),
        ("QUERIES", params.num_queries.to_string()),
        ("PER_PAGE_CHARS", params.per_page_chars.to_string()),
        ("TOTAL_CHARS", params.total_chars.to_string()),
    ]
}

// ── Stack Configuration ────────────────────────────────────────────

/// Where the stack lives and which commands drive it. Command lines are
/// injected so tests can substitute harmless stand-ins.
#[derive(Debug, Clone)]
pub struct StackConfig {
    pub root: PathBuf,
    pub start_command: Vec<String>,
    pub teardown_command: Vec<String>,
    pub ingest_command: Vec<String>,
}

impl StackConfig {
    pub fn for_platform(root: PathBuf) -> Self {
        let start_command = if cfg!(windows) {
            vec!["cmd".into(), "/C".into(), "start_servers.bat".into()]
        } else {
            vec!["sh".into(), "start_servers.sh".into()]
        };
        let python = if cfg!(windows) { "python" } else { "python3" };
        Self {
            root,
            start_command,
            teardown_command: vec!["docker-compose".into(), "down".into()],
            ingest_command: vec![python.into(), "orchestrator/ingest_files.py".into()],
        }
    }
}

/// Walk upwards from `from` until a directory that looks like the stack
/// checkout is found (compose file or start script present).
pub fn find_stack_root(from: &Path) -> Option<PathBuf> {
    let mut dir = from.to_path_buf();
    loop {
        if dir.join("docker-compose.yml").exists()
            || dir.join("start_servers.sh").exists()
            || dir.join("start_servers.bat").exists()
        {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

pub fn default_stack_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_stack_root(&cwd).unwrap_or(cwd)
}

// ── Control Events ─────────────────────────────────────────────────

/// One-way notifications from the controller to the view. Every failure
/// in the backend is normalized into one of these; nothing panics across
/// the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    Started,
    Stopped(i32),
    Error(String),
    UploadComplete(i32),
    UploadError(String),
}

#[derive(Debug)]
enum LifecycleMsg {
    StackExited { generation: u64, code: i32 },
    StackError { generation: u64, message: String },
    TeardownFinished { code: i32 },
    TeardownError { message: String },
    IngestFinished { code: i32 },
    IngestError { message: String },
}

// ── Process Handle ─────────────────────────────────────────────────

/// Handle to a spawned child. The pid is filled in by the worker thread
/// once the spawn succeeds; kill is best-effort and never waited on.
struct ProcessHandle {
    child_pid: Arc<Mutex<Option<u32>>>,
}

impl ProcessHandle {
    fn request_kill(&self) {
        if let Ok(guard) = self.child_pid.lock() {
            if let Some(pid) = *guard {
                #[cfg(unix)]
                {
                    unsafe {
                        libc::kill(pid as i32, libc::SIGTERM);
                    }
                }
                #[cfg(not(unix))]
                {
                    let mut cmd = new_hidden_command("taskkill");
                    let _ = cmd.args(["/PID", &pid.to_string(), "/F", "/T"]).output();
                }
            }
        }
    }
}

struct StackSlot {
    handle: ProcessHandle,
    generation: u64,
}

// ── Stack Controller ───────────────────────────────────────────────

/// Owns the single long-running stack process and the two kinds of
/// short-lived helpers (teardown, ingestion). All operations are called
/// from the UI thread; workers report back over an internal channel that
/// `poll` drains once per frame.
///
/// Each slot is tagged with a generation. Stop clears the slot without
/// waiting for the killed child to be reaped, so its exit message can
/// arrive after a new slot exists; the generation check drops such
/// stragglers instead of clearing the wrong slot.
pub struct StackController {
    config: StackConfig,
    slot: Option<StackSlot>,
    generation: u64,
    tx: mpsc::Sender<LifecycleMsg>,
    rx: mpsc::Receiver<LifecycleMsg>,
    pending: Vec<ControlEvent>,
}

impl StackController {
    pub fn new(config: StackConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            slot: None,
            generation: 0,
            tx,
            rx,
            pending: Vec::new(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.slot.is_some()
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Launch the stack. A second start while one is already running is
    /// ignored without any notification.
    pub fn start(&mut self, params: StartParams) {
        if self.slot.is_some() {
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let child_pid = Arc::new(Mutex::new(None));
        let handle = ProcessHandle {
            child_pid: child_pid.clone(),
        };

        let mut cmd = build_start_command(&self.config, &params);
        let program = self.config.start_command[0].clone();
        let tx = self.tx.clone();
        thread::spawn(move || match cmd.spawn() {
            Ok(mut child) => {
                if let Ok(mut guard) = child_pid.lock() {
                    *guard = Some(child.id());
                }
                match child.wait() {
                    Ok(status) => {
                        let _ = tx.send(LifecycleMsg::StackExited {
                            generation,
                            code: exit_code(status),
                        });
                    }
                    Err(e) => {
                        let _ = tx.send(LifecycleMsg::StackError {
                            generation,
                            message: format!("Process wait failed: {e}"),
                        });
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(LifecycleMsg::StackError {
                    generation,
                    message: format!("Failed to start {program}: {e}"),
                });
            }
        });

        self.slot = Some(StackSlot { handle, generation });
        self.pending.push(ControlEvent::Started);
    }

    /// Kill the running stack process, if any, and bring the compose
    /// stack down. The slot is cleared immediately; the `Stopped`
    /// notification carries the teardown command's exit code.
    pub fn stop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.handle.request_kill();
        }

        let mut cmd = build_command(&self.config.teardown_command, &self.config.root);
        let program = self.config.teardown_command[0].clone();
        let tx = self.tx.clone();
        thread::spawn(move || match cmd.spawn() {
            Ok(mut child) => match child.wait() {
                Ok(status) => {
                    let _ = tx.send(LifecycleMsg::TeardownFinished {
                        code: exit_code(status),
                    });
                }
                Err(e) => {
                    let _ = tx.send(LifecycleMsg::TeardownError {
                        message: format!("Teardown wait failed: {e}"),
                    });
                }
            },
            Err(e) => {
                let _ = tx.send(LifecycleMsg::TeardownError {
                    message: format!("Failed to run {program}: {e}"),
                });
            }
        });
    }

    /// Ask the user for files and feed them to the ingestion script.
    /// Runs independently of the stack slot.
    pub fn upload_files(&mut self) {
        let paths = rfd::FileDialog::new()
            .set_title("Select files to ingest")
            .pick_files()
            .unwrap_or_default();
        self.ingest(paths);
    }

    pub fn ingest(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            self.pending
                .push(ControlEvent::UploadComplete(UPLOAD_CANCELLED));
            return;
        }

        let mut cmd = build_command(&self.config.ingest_command, &self.config.root);
        for path in &paths {
            cmd.arg(path);
        }
        let program = self.config.ingest_command[0].clone();
        let tx = self.tx.clone();
        thread::spawn(move || match cmd.spawn() {
            Ok(mut child) => match child.wait() {
                Ok(status) => {
                    let _ = tx.send(LifecycleMsg::IngestFinished {
                        code: exit_code(status),
                    });
                }
                Err(e) => {
                    let _ = tx.send(LifecycleMsg::IngestError {
                        message: format!("Ingest wait failed: {e}"),
                    });
                }
            },
            Err(e) => {
                let _ = tx.send(LifecycleMsg::IngestError {
                    message: format!("Failed to run {program}: {e}"),
                });
            }
        });
    }

    /// Best-effort cleanup while the host application is closing. Nobody
    /// is listening anymore, so the teardown child is left detached and
    /// its result is never observed.
    pub fn shutdown(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.handle.request_kill();
        }
        let mut cmd = build_command(&self.config.teardown_command, &self.config.root);
        if let Err(e) = cmd.spawn() {
            eprintln!("teardown on shutdown failed to launch: {e}");
        }
    }

    /// Drain queued events plus worker messages into view notifications.
    pub fn poll(&mut self) -> Vec<ControlEvent> {
        let mut events = std::mem::take(&mut self.pending);
        for _ in 0..MAX_MSGS_PER_POLL {
            match self.rx.try_recv() {
                Ok(msg) => {
                    if let Some(ev) = self.translate(msg) {
                        events.push(ev);
                    }
                }
                Err(_) => break,
            }
        }
        events
    }

    fn translate(&mut self, msg: LifecycleMsg) -> Option<ControlEvent> {
        match msg {
            LifecycleMsg::StackExited { generation, code } => {
                if self.slot.as_ref().map(|s| s.generation) != Some(generation) {
                    return None;
                }
                self.slot = None;
                Some(ControlEvent::Stopped(code))
            }
            LifecycleMsg::StackError {
                generation,
                message,
            } => {
                if self.slot.as_ref().map(|s| s.generation) != Some(generation) {
                    return None;
                }
                self.slot = None;
                Some(ControlEvent::Error(message))
            }
            LifecycleMsg::TeardownFinished { code } => Some(ControlEvent::Stopped(code)),
            LifecycleMsg::TeardownError { message } => Some(ControlEvent::Error(message)),
            LifecycleMsg::IngestFinished { code } => Some(ControlEvent::UploadComplete(code)),
            LifecycleMsg::IngestError { message } => Some(ControlEvent::UploadError(message)),
        }
    }
}

// ── Command Construction ───────────────────────────────────────────

fn build_start_command(config: &StackConfig, params: &StartParams) -> Command {
    let mut cmd = build_command(&config.start_command, &config.root);
    for (key, value) in start_env(params) {
        cmd.env(key, value);
    }
    cmd
}

fn build_command(command_line: &[String], root: &Path) -> Command {
    let mut cmd = new_hidden_command(&command_line[0]);
    cmd.args(&command_line[1..]);
    cmd.current_dir(root);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    // None means the child was killed by a signal on unix.
    status.code().unwrap_or(-1)
}

// ── Tool Detection ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
    pub detail: Option<String>,
}

pub fn detect_stack_tools(config: &StackConfig) -> Vec<ToolStatus> {
    let script = config
        .start_command
        .last()
        .map(String::as_str)
        .unwrap_or("start_servers.sh");
    vec![
        probe_command(&config.teardown_command[0]),
        probe_command(&config.ingest_command[0]),
        probe_script(script, &config.root),
    ]
}

/// Look a program up on PATH and ask it for its version.
fn probe_command(program: &str) -> ToolStatus {
    let path = which::which(program).ok();
    let available = path.is_some();
    let detail = path.and_then(|p| {
        new_hidden_command(p)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .ok()
            .and_then(|o| {
                let stdout = String::from_utf8_lossy(&o.stdout).trim().to_string();
                let stderr = String::from_utf8_lossy(&o.stderr).trim().to_string();
                let ver = if stdout.is_empty() { stderr } else { stdout };
                ver.lines().next().map(|l| l.trim().to_string())
            })
    });
    ToolStatus {
        name: program.to_string(),
        available,
        detail,
    }
}

fn probe_script(script: &str, root: &Path) -> ToolStatus {
    let path = root.join(script);
    let available = path.is_file();
    ToolStatus {
        name: script.to_string(),
        available,
        detail: available.then(|| path.to_string_lossy().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn test_config(root: PathBuf) -> StackConfig {
        StackConfig {
            root,
            start_command: vec!["sh".into(), "-c".into(), "sleep 5".into()],
            teardown_command: vec!["true".into()],
            ingest_command: vec!["true".into()],
        }
    }

    fn poll_until(controller: &mut StackController, timeout: Duration) -> Vec<ControlEvent> {
        let start = Instant::now();
        loop {
            let events = controller.poll();
            if !events.is_empty() || start.elapsed() > timeout {
                return events;
            }
            thread::sleep(Duration::from_millis(30));
        }
    }

    fn env_value(cmd: &Command, key: &str) -> Option<String> {
        cmd.get_envs()
            .find(|(k, _)| *k == OsStr::new(key))
            .and_then(|(_, v)| v.map(|v| v.to_string_lossy().into_owned()))
    }

    #[test]
    fn start_command_carries_params_as_env_strings() {
        let params = StartParams {
            top_k: 5,
            num_queries: 3,
            per_page_chars: 2000,
            total_chars: 20000,
        };
        let config = StackConfig::for_platform(PathBuf::from("/srv/stack"));
        let cmd = build_start_command(&config, &params);

        assert_eq!(env_value(&cmd, "TOP_K").as_deref(), Some("5"));
        assert_eq!(env_value(&cmd, "QUERIES").as_deref(), Some("3"));
        assert_eq!(env_value(&cmd, "PER_PAGE_CHARS").as_deref(), Some("2000"));
        assert_eq!(env_value(&cmd, "TOTAL_CHARS").as_deref(), Some("20000"));
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/srv/stack")));
    }

    #[test]
    fn negative_params_pass_through_unvalidated() {
        let params = StartParams {
            top_k: -1,
            ..StartParams::default()
        };
        let config = StackConfig::for_platform(PathBuf::from("."));
        let cmd = build_start_command(&config, &params);
        assert_eq!(env_value(&cmd, "TOP_K").as_deref(), Some("-1"));
    }

    #[test]
    fn empty_selection_reports_sentinel_without_spawning() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut controller = StackController::new(test_config(tmp.path().to_path_buf()));

        controller.ingest(Vec::new());

        let events = controller.poll();
        assert_eq!(events, vec![ControlEvent::UploadComplete(UPLOAD_CANCELLED)]);
        assert!(!controller.is_busy());
        assert!(controller.poll().is_empty());
    }

    #[test]
    fn stale_generation_messages_are_dropped() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut controller = StackController::new(test_config(tmp.path().to_path_buf()));
        controller.generation = 3;
        controller.slot = Some(StackSlot {
            handle: ProcessHandle {
                child_pid: Arc::new(Mutex::new(None)),
            },
            generation: 3,
        });

        controller
            .tx
            .send(LifecycleMsg::StackExited {
                generation: 2,
                code: 0,
            })
            .expect("send stale exit");
        assert!(controller.poll().is_empty());
        assert!(controller.is_busy());

        controller
            .tx
            .send(LifecycleMsg::StackExited {
                generation: 3,
                code: 0,
            })
            .expect("send current exit");
        assert_eq!(controller.poll(), vec![ControlEvent::Stopped(0)]);
        assert!(!controller.is_busy());
    }

    #[test]
    #[cfg(unix)]
    fn second_start_while_busy_is_a_silent_noop() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut controller = StackController::new(test_config(tmp.path().to_path_buf()));

        controller.start(StartParams::default());
        assert_eq!(controller.poll(), vec![ControlEvent::Started]);
        assert!(controller.is_busy());

        controller.start(StartParams::default());
        assert!(controller.poll().is_empty());
        assert!(controller.is_busy());

        controller.stop();
        let events = poll_until(&mut controller, Duration::from_secs(5));
        assert_eq!(events, vec![ControlEvent::Stopped(0)]);

        // The killed child's own exit must not surface as a second stop.
        thread::sleep(Duration::from_millis(300));
        assert!(controller.poll().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn stop_while_idle_still_reports_teardown_exit_code() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(tmp.path().to_path_buf());
        config.teardown_command = vec!["sh".into(), "-c".into(), "exit 7".into()];
        let mut controller = StackController::new(config);

        controller.stop();
        let events = poll_until(&mut controller, Duration::from_secs(5));
        assert_eq!(events, vec![ControlEvent::Stopped(7)]);
    }

    #[test]
    #[cfg(unix)]
    fn natural_exit_clears_slot_and_reports_code() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(tmp.path().to_path_buf());
        config.start_command = vec!["sh".into(), "-c".into(), "exit 3".into()];
        let mut controller = StackController::new(config);

        controller.start(StartParams::default());
        assert_eq!(controller.poll(), vec![ControlEvent::Started]);

        let events = poll_until(&mut controller, Duration::from_secs(5));
        assert_eq!(events, vec![ControlEvent::Stopped(3)]);
        assert!(!controller.is_busy());
    }

    #[test]
    fn spawn_failure_surfaces_as_error_and_clears_slot() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(tmp.path().to_path_buf());
        config.start_command = vec!["searchdeck-no-such-binary".into()];
        let mut controller = StackController::new(config);

        controller.start(StartParams::default());
        assert_eq!(controller.poll(), vec![ControlEvent::Started]);

        let events = poll_until(&mut controller, Duration::from_secs(5));
        match events.as_slice() {
            [ControlEvent::Error(message)] => {
                assert!(message.contains("Failed to start"), "message: {message}");
            }
            other => panic!("expected a single error event, got {other:?}"),
        }
        assert!(!controller.is_busy());
    }

    #[test]
    #[cfg(unix)]
    fn ingest_reports_script_exit_code() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(tmp.path().to_path_buf());
        config.ingest_command = vec!["sh".into(), "-c".into(), "exit 2".into()];
        let mut controller = StackController::new(config);

        controller.ingest(vec![PathBuf::from("notes.txt")]);
        let events = poll_until(&mut controller, Duration::from_secs(5));
        assert_eq!(events, vec![ControlEvent::UploadComplete(2)]);
    }

    #[test]
    #[cfg(unix)]
    fn ingest_runs_independently_of_a_busy_slot() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(tmp.path().to_path_buf());
        config.ingest_command = vec!["true".into()];
        let mut controller = StackController::new(config);

        controller.start(StartParams::default());
        assert_eq!(controller.poll(), vec![ControlEvent::Started]);

        controller.ingest(vec![PathBuf::from("notes.txt")]);
        let events = poll_until(&mut controller, Duration::from_secs(5));
        assert_eq!(events, vec![ControlEvent::UploadComplete(0)]);
        assert!(controller.is_busy(), "upload must not touch the stack slot");

        controller.stop();
        let _ = poll_until(&mut controller, Duration::from_secs(5));
    }

    #[test]
    #[cfg(unix)]
    fn shutdown_fires_teardown_exactly_once() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let marker = tmp.path().join("marker");
        let mut config = test_config(tmp.path().to_path_buf());
        config.teardown_command = vec![
            "sh".into(),
            "-c".into(),
            format!("echo down >> {}", marker.display()),
        ];
        let mut controller = StackController::new(config);

        controller.start(StartParams::default());
        assert_eq!(controller.poll(), vec![ControlEvent::Started]);

        controller.shutdown();
        assert!(!controller.is_busy());

        let start = Instant::now();
        while !marker.exists() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(30));
        }
        thread::sleep(Duration::from_millis(200));
        let contents = std::fs::read_to_string(&marker).expect("marker written");
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn missing_program_probes_as_unavailable() {
        let status = probe_command("searchdeck-no-such-binary");
        assert!(!status.available);
        assert!(status.detail.is_none());
    }

    #[test]
    fn stack_root_is_found_by_compose_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("docker-compose.yml"), "services: {}\n")
            .expect("write compose file");
        let nested = tmp.path().join("gui").join("deep");
        std::fs::create_dir_all(&nested).expect("mkdir nested");

        let root = find_stack_root(&nested).expect("root found");
        assert_eq!(root, tmp.path());
    }
}
