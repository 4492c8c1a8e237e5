//! Testing utilities for users of the gridrun library.
//!
//! - [`FakeGrid`]: a scripted stand-in for the scheduler CLI. It writes
//!   stub `qsub`/`qstat`/`qdel` shell scripts over an on-disk spool
//!   directory so the real client and supervisor code paths can be
//!   exercised without a cluster.
//! - [`RecordingHandler`]: an [`EventHandler`] that records every event.
//! - [`InstrumentedTask`]: a command task that counts hook invocations.
//!
//! The fake scheduler honors the real CLI contract: submit prints a job
//! id and runs the launch script in the background, query prints
//! `key = value` lines while the job lives (and a final snapshot with an
//! `exit_status` once it finished), delete kills the job. Call
//! [`FakeGrid::hold_first_delete`] to make the first delete of each job a
//! silent no-op, which is how the abort-escalation path is tested.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::environment::Environment;
use crate::core::resource::ResourceAllocation;
use crate::core::task::{Task, TaskError};
use crate::events::{Event, EventHandler};
use crate::execution::CommandTask;
use crate::grid::GridConfig;

const QSUB_SCRIPT: &str = r#"#!/bin/sh
# Scripted stand-in for the scheduler's submit program. Runs the launch
# file in the background and prints a job id on stdout.
SPOOL="@SPOOL@"
OUT="@OUT@"
echo "qsub $*" >> "$SPOOL/invocations.log"
SCRIPT="$1"
ID=$(( $(cat "$SPOOL/seq" 2>/dev/null || echo 4100) + 1 ))
echo "$ID" > "$SPOOL/seq"
NAME=$(sed -n '1s/.* -N \([^ ]*\).*/\1/p' "$SCRIPT")
WORKDIR=$(sed -n '1s/.* -d \([^ ]*\).*/\1/p' "$SCRIPT")
JOB="$SPOOL/$ID"
mkdir -p "$JOB"
echo "$NAME" > "$JOB/name"
(
    cd "${WORKDIR:-.}" 2>/dev/null
    sh "$SCRIPT" > "$OUT/$NAME.o$ID" 2> "$OUT/$NAME.e$ID" < /dev/null
    echo $? > "$JOB/exit"
) > /dev/null 2>&1 &
echo $! > "$JOB/pid"
echo "$ID.fakegrid"
"#;

const QSTAT_SCRIPT: &str = r#"#!/bin/sh
# Scripted stand-in for the scheduler's detailed-status program.
SPOOL="@SPOOL@"
echo "qstat $*" >> "$SPOOL/invocations.log"
for ID do :; done
JOB="$SPOOL/$ID"
[ -d "$JOB" ] || exit 153
NAME=$(cat "$JOB/name")
if [ -f "$JOB/exit" ]; then
    echo "Job Id: $ID.fakegrid"
    echo "    Job_Name = $NAME"
    echo "    job_state = C"
    echo "    exit_status = $(cat "$JOB/exit")"
    exit 0
fi
PID=$(cat "$JOB/pid")
if kill -0 "$PID" 2>/dev/null; then
    echo "Job Id: $ID.fakegrid"
    echo "    Job_Name = $NAME"
    echo "    job_state = R"
    echo "    resources_used.walltime = 00:00:01"
    exit 0
fi
# Killed before recording an exit status: the job simply vanishes.
exit 153
"#;

const QDEL_SCRIPT: &str = r#"#!/bin/sh
# Scripted stand-in for the scheduler's delete program.
SPOOL="@SPOOL@"
echo "qdel $*" >> "$SPOOL/invocations.log"
for ID do :; done
JOB="$SPOOL/$ID"
[ -d "$JOB" ] || exit 1
if [ -f "$SPOOL/hold_delete" ] && [ ! -f "$JOB/delete_held" ]; then
    touch "$JOB/delete_held"
    exit 0
fi
PID=$(cat "$JOB/pid" 2>/dev/null)
[ -n "$PID" ] && kill "$PID" 2>/dev/null
exit 0
"#;

/// A scripted fake of the scheduler CLI rooted in a private temp
/// directory, removed on drop.
pub struct FakeGrid {
    root: PathBuf,
    bin_dir: PathBuf,
    spool_dir: PathBuf,
    out_dir: PathBuf,
    work_dir: PathBuf,
}

impl FakeGrid {
    /// Create the directory layout and the three stub programs.
    pub fn new() -> io::Result<Self> {
        let root = std::env::temp_dir().join(format!("gridrun-fake-{}", Uuid::new_v4()));
        let bin_dir = root.join("bin");
        let spool_dir = root.join("spool");
        let out_dir = root.join("out");
        let work_dir = root.join("work");
        for dir in [&bin_dir, &spool_dir, &out_dir, &work_dir] {
            std::fs::create_dir_all(dir)?;
        }

        let fake = Self {
            root,
            bin_dir,
            spool_dir,
            out_dir,
            work_dir,
        };
        fake.write_script("qsub", QSUB_SCRIPT)?;
        fake.write_script("qstat", QSTAT_SCRIPT)?;
        fake.write_script("qdel", QDEL_SCRIPT)?;
        Ok(fake)
    }

    fn write_script(&self, name: &str, template: &str) -> io::Result<()> {
        let contents = template
            .replace("@SPOOL@", &self.spool_dir.display().to_string())
            .replace("@OUT@", &self.out_dir.display().to_string());
        let path = self.bin_dir.join(name);
        std::fs::write(&path, contents)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }

    /// A grid configuration pointing at the stub programs, with short
    /// poll and grace intervals suitable for tests.
    pub fn grid_config(&self) -> GridConfig {
        let mut config = GridConfig::new("1:ppn=1", &self.out_dir, &self.out_dir);
        config.submit_program = self.bin_dir.join("qsub").display().to_string();
        config.query_program = self.bin_dir.join("qstat").display().to_string();
        config.delete_program = self.bin_dir.join("qdel").display().to_string();
        config.poll_interval_ms = 50;
        config.abort_grace_ms = 300;
        config
    }

    /// Directory for job working files and launch descriptors.
    pub fn workdir(&self) -> &Path {
        &self.work_dir
    }

    /// Directory the fake scheduler writes `.o`/`.e` artifact files into.
    pub fn output_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Make the first delete of each job a silent no-op so the
    /// supervisor's grace timer has to escalate.
    pub fn hold_first_delete(&self) -> io::Result<()> {
        std::fs::write(self.spool_dir.join("hold_delete"), b"")
    }

    /// How many times a stub program has been invoked.
    pub fn invocations(&self, program: &str) -> usize {
        let log = match std::fs::read_to_string(self.spool_dir.join("invocations.log")) {
            Ok(log) => log,
            Err(_) => return 0,
        };
        log.lines()
            .filter(|line| line.starts_with(&format!("{} ", program)))
            .count()
    }
}

impl Drop for FakeGrid {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Event handler that records every event it sees.
pub struct RecordingHandler {
    events: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    /// Create a handler ready to register on an event bus.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    /// All recorded events, in emission order.
    pub async fn recorded(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }
}

/// A command task that counts its hook invocations.
pub struct InstrumentedTask {
    inner: CommandTask,
    before_run_calls: AtomicU32,
    after_run_calls: AtomicU32,
    after_runtime_error_calls: AtomicU32,
}

impl InstrumentedTask {
    /// Wrap a command task.
    pub fn new(inner: CommandTask) -> Self {
        Self {
            inner,
            before_run_calls: AtomicU32::new(0),
            after_run_calls: AtomicU32::new(0),
            after_runtime_error_calls: AtomicU32::new(0),
        }
    }

    /// How many times `before_run` fired.
    pub fn before_run_calls(&self) -> u32 {
        self.before_run_calls.load(Ordering::SeqCst)
    }

    /// How many times `after_run` fired.
    pub fn after_run_calls(&self) -> u32 {
        self.after_run_calls.load(Ordering::SeqCst)
    }

    /// How many times `after_runtime_error` fired.
    pub fn after_runtime_error_calls(&self) -> u32 {
        self.after_runtime_error_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Task for InstrumentedTask {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn job_dir(&self) -> &Path {
        self.inner.job_dir()
    }

    fn task_arguments(
        &self,
        resources: &ResourceAllocation,
        env: &Environment,
    ) -> Option<Vec<String>> {
        self.inner.task_arguments(resources, env)
    }

    fn environment(&self) -> Environment {
        self.inner.environment()
    }

    async fn before_run(&self) -> Result<(), TaskError> {
        self.before_run_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn after_run(&self) {
        self.after_run_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn after_runtime_error(&self) {
        self.after_runtime_error_calls.fetch_add(1, Ordering::SeqCst);
    }
}
