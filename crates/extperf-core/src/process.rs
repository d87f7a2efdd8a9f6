//! Child process plumbing shared by the build and measurement runners

use camino::Utf8Path;
use std::collections::HashMap;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};

/// Command with piped output that is killed if its handle is dropped
pub(crate) fn piped_command(dir: &Utf8Path, program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

pub(crate) fn spawn(cmd: &mut Command, shown: &str) -> Result<ChildTree> {
    let child = cmd.spawn().map_err(|source| Error::CommandSpawn {
        command: shown.to_string(),
        source,
    })?;
    Ok(ChildTree::new(child))
}

/// A child process together with everything it spawns.
///
/// Stopping or dropping it before it exits kills the whole process tree, so
/// servers forked by a wrapper script go down with the wrapper.
pub(crate) struct ChildTree {
    child: Child,
    pid: Option<u32>,
    exited: bool,
}

impl ChildTree {
    fn new(child: Child) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            exited: false,
        }
    }

    pub(crate) async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.exited = true;
        Ok(status)
    }

    /// Kill the process and all of its descendants, then reap it
    pub(crate) async fn kill(&mut self) {
        if self.exited {
            return;
        }
        kill_process_tree(self.pid);
        if let Err(e) = self.child.kill().await {
            debug!("Process {:?} already stopped: {}", self.pid, e);
        }
        self.exited = true;
    }
}

impl Drop for ChildTree {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        match self.child.try_wait() {
            Ok(None) => kill_process_tree(self.pid),
            Ok(Some(_)) | Err(_) => {}
        }
    }
}

/// Kill `pid` and its descendants, children first
pub(crate) fn kill_process_tree(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let root = sysinfo::Pid::from_u32(pid);

    let mut sys = sysinfo::System::new();
    sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

    let mut children_map: HashMap<sysinfo::Pid, Vec<sysinfo::Pid>> = HashMap::new();
    for (p, process) in sys.processes() {
        if let Some(parent) = process.parent() {
            children_map.entry(parent).or_default().push(*p);
        }
    }

    let mut to_kill = Vec::new();
    collect_process_tree(root, &children_map, &mut to_kill);

    for pid in to_kill.into_iter().rev() {
        if let Some(process) = sys.process(pid) {
            if process.kill_with(sysinfo::Signal::Kill) != Some(true) {
                process.kill();
            }
        }
    }
}

fn collect_process_tree(
    pid: sysinfo::Pid,
    children_map: &HashMap<sysinfo::Pid, Vec<sysinfo::Pid>>,
    out: &mut Vec<sysinfo::Pid>,
) {
    out.push(pid);
    if let Some(children) = children_map.get(&pid) {
        for child in children {
            collect_process_tree(*child, children_map, out);
        }
    }
}

/// Hand each line of a child stream to `sink` until the stream closes.
///
/// Lines are decoded lossily so a stray non-UTF-8 byte never stops the drain.
pub(crate) fn forward_lines<R, F>(reader: R, mut sink: F) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnMut(String) + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    sink(line.trim_end_matches(['\r', '\n']).to_string());
                }
                Err(e) => {
                    debug!("Stopped reading child output: {}", e);
                    break;
                }
            }
        }
    })
}

/// Forward both output streams of `child`
pub(crate) fn forward_output<F>(child: &mut ChildTree, sink: F) -> Vec<JoinHandle<()>>
where
    F: FnMut(String) + Clone + Send + 'static,
{
    let mut handles = Vec::with_capacity(2);
    if let Some(stdout) = child.child.stdout.take() {
        handles.push(forward_lines(stdout, sink.clone()));
    }
    if let Some(stderr) = child.child.stderr.take() {
        handles.push(forward_lines(stderr, sink));
    }
    handles
}
