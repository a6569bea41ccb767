use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// Receives progress updates as `(current, total, message)`.
///
/// `current == -1` signals failure. A `total` of 0 means the percentage is
/// not computable, in which case only the terminal 0 and 100 events are sent.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, current: i64, total: i64, message: &str);
}

/// Receives human-readable log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

/// A sink that drops everything.
/// Useful for background work or tests.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&self, _current: i64, _total: i64, _message: &str) {}
}

impl LogSink for NullSink {
    fn log(&self, _line: &str) {}
}

/// Events carried by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Progress {
        current: i64,
        total: i64,
        message: String,
    },
    Log(String),
}

/// Forwards progress and log output into one outbound channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn progress(&self, current: i64, total: i64, message: &str) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.tx.send(PipelineEvent::Progress {
            current,
            total,
            message: message.to_string(),
        });
    }
}

impl LogSink for ChannelSink {
    fn log(&self, line: &str) {
        let _ = self.tx.send(PipelineEvent::Log(line.to_string()));
    }
}

/// Maps a child operation's 0-100 progress onto a band of a parent bar.
pub struct ScaledProgress<'a> {
    inner: &'a dyn ProgressSink,
    start: i64,
    end: i64,
}

impl<'a> ScaledProgress<'a> {
    pub fn new(inner: &'a dyn ProgressSink, start: i64, end: i64) -> Self {
        Self { inner, start, end }
    }
}

impl ProgressSink for ScaledProgress<'_> {
    fn progress(&self, current: i64, total: i64, message: &str) {
        if current < 0 {
            self.inner.progress(-1, 100, message);
            return;
        }
        let fraction = if total > 0 {
            current.min(total) as f64 / total as f64
        } else if current > 0 {
            1.0
        } else {
            0.0
        };
        let mapped = self.start + ((self.end - self.start) as f64 * fraction).round() as i64;
        self.inner.progress(mapped, 100, message);
    }
}

/// Directory layout of the shared data root.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id)
    }

    pub fn version_json(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id).join(format!("{}.json", version_id))
    }

    pub fn version_jar(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id).join(format!("{}.jar", version_id))
    }

    pub fn natives_dir(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id).join("natives")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_index(&self, index_id: &str) -> PathBuf {
        self.assets_dir()
            .join("indexes")
            .join(format!("{}.json", index_id))
    }

    pub fn asset_object(&self, hash: &str) -> PathBuf {
        let prefix = hash.get(..2).unwrap_or(hash);
        self.assets_dir().join("objects").join(prefix).join(hash)
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.root.join("instances")
    }

    /// `name` must already be sanitized.
    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.instances_dir().join(name)
    }

    pub fn game_dir(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join(".minecraft")
    }

    pub fn installers_dir(&self) -> PathBuf {
        self.root.join("installers")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn launcher_profiles(&self) -> PathBuf {
        self.root.join("launcher_profiles.json")
    }
}

/// Operating system families as named by version metadata rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Windows,
    MacOS,
    Linux,
}

impl OsType {
    /// Detect the current OS
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsType::Windows
        } else if cfg!(target_os = "macos") {
            OsType::MacOS
        } else {
            OsType::Linux
        }
    }

    /// Get the OS name as a string (for rule matching)
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Windows => "windows",
            OsType::Linux => "linux",
            OsType::MacOS => "osx",
        }
    }

    /// Rule documents use both `osx` and `macos` for the same family.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            OsType::MacOS => name == "osx" || name == "macos",
            other => name == other.as_str(),
        }
    }

    pub fn classpath_separator(&self) -> &'static str {
        match self {
            OsType::Windows => ";",
            _ => ":",
        }
    }
}

/// Architecture types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86,
    X64,
    Arm64,
    Arm32,
}

impl Arch {
    pub fn current() -> Self {
        if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "aarch64") {
            Arch::Arm64
        } else if cfg!(target_arch = "arm") {
            Arch::Arm32
        } else {
            Arch::X64
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X64 => "x86_64",
            Arch::Arm64 => "arm64",
            Arch::Arm32 => "arm32",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(i64, i64)>>);

    impl ProgressSink for Recorder {
        fn progress(&self, current: i64, total: i64, _message: &str) {
            self.0.lock().unwrap().push((current, total));
        }
    }

    #[test]
    fn scaled_progress_maps_into_band() {
        let recorder = Recorder::default();
        let scaled = ScaledProgress::new(&recorder, 30, 55);
        scaled.progress(0, 4, "start");
        scaled.progress(2, 4, "half");
        scaled.progress(4, 4, "done");
        scaled.progress(-1, 100, "boom");
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![(30, 100), (43, 100), (55, 100), (-1, 100)]
        );
    }

    #[test]
    fn unknown_total_only_reports_terminal_points() {
        let recorder = Recorder::default();
        let scaled = ScaledProgress::new(&recorder, 10, 30);
        scaled.progress(0, 0, "begin");
        scaled.progress(1, 0, "end");
        assert_eq!(*recorder.0.lock().unwrap(), vec![(10, 100), (30, 100)]);
    }

    #[test]
    fn layout_paths() {
        let layout = DataLayout::new("/data");
        assert_eq!(
            layout.version_json("1.20.1"),
            PathBuf::from("/data/versions/1.20.1/1.20.1.json")
        );
        assert_eq!(
            layout.asset_object("ab12cd"),
            PathBuf::from("/data/assets/objects/ab/ab12cd")
        );
        assert_eq!(
            layout.game_dir("Demo"),
            PathBuf::from("/data/instances/Demo/.minecraft")
        );
    }

    #[test]
    fn macos_accepts_both_rule_names() {
        assert!(OsType::MacOS.matches("osx"));
        assert!(OsType::MacOS.matches("macos"));
        assert!(!OsType::Linux.matches("osx"));
    }

    #[tokio::test]
    async fn channel_sink_emits_tagged_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        sink.progress(5, 100, "dirs");
        sink.log("hello");
        assert_eq!(
            rx.recv().await,
            Some(PipelineEvent::Progress {
                current: 5,
                total: 100,
                message: "dirs".into()
            })
        );
        assert_eq!(rx.recv().await, Some(PipelineEvent::Log("hello".into())));
    }
}
