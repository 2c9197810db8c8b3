//! Process discovery.
//!
//! The recorder needs the pids of the target application's processes so it
//! can ask the accessibility host for their root nodes. Several processes
//! often match (helpers, renderers); every match is returned and the
//! resolver tries each root in turn.

use std::fs;
use std::path::{Path, PathBuf};

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// What the matcher needs to know about one running process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub exe: Option<PathBuf>,
    pub cmdline: Vec<String>,
}

/// Source of candidate process ids for an application.
pub trait ProcessLister {
    /// Pids whose executable equals one of `command_paths`, or whose name or
    /// command line contains one of `app_names` (case-insensitive). Sorted,
    /// without duplicates.
    fn list_candidate_pids(&self, command_paths: &[String], app_names: &[String]) -> Vec<u32>;
}

impl<F> ProcessLister for F
where
    F: Fn(&[String], &[String]) -> Vec<u32>,
{
    fn list_candidate_pids(&self, command_paths: &[String], app_names: &[String]) -> Vec<u32> {
        self(command_paths, app_names)
    }
}

/// Lists processes through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProcessLister;

impl SysinfoProcessLister {
    pub fn new() -> Self {
        Self
    }

    /// Snapshot every process this user can see. Processes whose details
    /// can't be read are reported with whatever is available.
    pub fn snapshot(&self) -> Vec<ProcessInfo> {
        let mut system = System::new();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, ProcessRefreshKind::everything());

        system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().to_string(),
                exe: process.exe().map(Path::to_path_buf),
                cmdline: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().to_string())
                    .collect(),
            })
            .collect()
    }
}

impl ProcessLister for SysinfoProcessLister {
    fn list_candidate_pids(&self, command_paths: &[String], app_names: &[String]) -> Vec<u32> {
        let processes = self.snapshot();
        let pids = filter_candidates(&processes, command_paths, app_names);
        log::debug!(
            "[AX-PROCESS] {} of {} process(es) matched {:?} / {:?}",
            pids.len(),
            processes.len(),
            command_paths,
            app_names
        );
        pids
    }
}

/// Apply the matching rules to a process snapshot.
pub fn filter_candidates(
    processes: &[ProcessInfo],
    command_paths: &[String],
    app_names: &[String],
) -> Vec<u32> {
    let resolved: Vec<PathBuf> = command_paths.iter().map(|p| resolve_path(Path::new(p))).collect();
    let names: Vec<String> = app_names
        .iter()
        .filter(|n| !n.is_empty())
        .map(|n| n.to_lowercase())
        .collect();

    let mut pids: Vec<u32> = processes
        .iter()
        .filter(|p| matches_process(p, &resolved, &names))
        .map(|p| p.pid)
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Match one process against resolved command paths and lowercase app names.
pub fn matches_process(process: &ProcessInfo, resolved_paths: &[PathBuf], lowercase_names: &[String]) -> bool {
    if let Some(exe) = &process.exe {
        let exe = resolve_path(exe);
        if resolved_paths.iter().any(|p| *p == exe) {
            return true;
        }
    }

    if lowercase_names.is_empty() {
        return false;
    }
    let name = process.name.to_lowercase();
    let cmdline = process.cmdline.join(" ").to_lowercase();
    lowercase_names
        .iter()
        .any(|n| name.contains(n.as_str()) || cmdline.contains(n.as_str()))
}

fn resolve_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(pid: u32, name: &str, exe: Option<&str>, cmdline: &[&str]) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: name.to_string(),
            exe: exe.map(PathBuf::from),
            cmdline: cmdline.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Vec<ProcessInfo> {
        vec![
            process(300, "zoom.us", Some("/Applications/zoom.us.app/Contents/MacOS/zoom.us"), &[]),
            process(120, "CptHost", None, &["/Applications/zoom.us.app/Contents/Frameworks/CptHost"]),
            process(77, "Slack Helper", Some("/Applications/Slack.app/Contents/Frameworks/Slack Helper"), &[]),
            process(5, "launchd", Some("/sbin/launchd"), &[]),
        ]
    }

    #[test]
    fn test_matches_by_exact_executable_path() {
        let pids = filter_candidates(
            &sample(),
            &strings(&["/Applications/zoom.us.app/Contents/MacOS/zoom.us"]),
            &[],
        );
        assert_eq!(pids, vec![300]);
    }

    #[test]
    fn test_matches_name_or_cmdline_case_insensitively() {
        let pids = filter_candidates(&sample(), &[], &strings(&["ZOOM.US"]));
        assert_eq!(pids, vec![120, 300]);

        let pids = filter_candidates(&sample(), &[], &strings(&["slack"]));
        assert_eq!(pids, vec![77]);
    }

    #[test]
    fn test_results_are_sorted_and_deduplicated() {
        let mut processes = sample();
        processes.push(process(120, "CptHost", None, &[]));
        let pids = filter_candidates(
            &processes,
            &strings(&["/sbin/launchd"]),
            &strings(&["zoom", "cpthost"]),
        );
        assert_eq!(pids, vec![5, 120, 300]);
    }

    #[test]
    fn test_no_hints_match_nothing() {
        assert!(filter_candidates(&sample(), &[], &[]).is_empty());
        assert!(filter_candidates(&sample(), &[], &strings(&[""])).is_empty());
    }

    #[test]
    fn test_closure_lister() {
        let lister = |paths: &[String], names: &[String]| -> Vec<u32> {
            if paths.is_empty() && names.is_empty() {
                vec![]
            } else {
                vec![42]
            }
        };
        assert_eq!(lister.list_candidate_pids(&[], &strings(&["zoom"])), vec![42]);
        assert!(lister.list_candidate_pids(&[], &[]).is_empty());
    }

    #[test]
    fn test_sysinfo_finds_current_process() {
        let me = std::process::id();
        let snapshot = SysinfoProcessLister::new().snapshot();
        assert!(snapshot.iter().any(|p| p.pid == me));
    }
}
