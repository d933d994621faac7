//! Parallel build scheduler
//!
//! Runs a build action on a set of projects with a bounded pool of worker
//! threads. A project is handed to a worker only once every project it
//! build-depends on (within the set) has been built.
//!
//! On the first failure no further job is started. Jobs already running are
//! left to finish: external build tools killed mid-write can leave corrupt
//! build trees behind.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::core::graph::Project;
use crate::core::sort::{topological_sort, Adjacency};
use crate::error::{BuildError, ResolverError};

/// Lifecycle of one build job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting for dependencies
    Pending,
    /// Queued for a worker
    Ready,
    /// A worker is executing it
    Running,
    /// Built successfully
    Done,
    /// The build action failed
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

struct BuildJob<'g> {
    project: &'g Project,
    deps: Vec<usize>,
    dependents: Vec<usize>,
}

/// Projects built by a successful run, in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub built: Vec<String>,
}

/// Schedules build jobs over worker threads
pub struct ParallelBuilder<'g> {
    jobs: Vec<BuildJob<'g>>,
}

impl<'g> ParallelBuilder<'g> {
    /// Create one job per project and wire build edges between them
    ///
    /// Build dependencies outside `projects` are considered already built.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::CycleDetected`] if the build edges inside the
    /// set form a cycle.
    pub fn prepare(projects: &[&'g Project]) -> Result<Self, ResolverError> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, project) in projects.iter().enumerate() {
            index.entry(project.name.as_str()).or_insert(i);
        }

        let mut jobs: Vec<BuildJob<'g>> = Vec::new();
        for (i, project) in projects.iter().enumerate() {
            if index.get(project.name.as_str()) != Some(&i) {
                warn!("Project '{}' scheduled twice, building it once", project.name);
                continue;
            }
            jobs.push(BuildJob {
                project: *project,
                deps: Vec::new(),
                dependents: Vec::new(),
            });
        }

        // Re-index after dropping duplicates.
        let index: HashMap<&str, usize> = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| (job.project.name.as_str(), i))
            .collect();

        let mut adjacency = Adjacency::new();
        for i in 0..jobs.len() {
            let project = jobs[i].project;
            let deps: Vec<usize> = project
                .build_depends()
                .iter()
                .filter_map(|dep| index.get(dep.as_str()).copied())
                .collect();
            adjacency.insert(
                project.name.clone(),
                deps.iter().map(|&d| jobs[d].project.name.clone()).collect(),
            );
            for &dep in &deps {
                jobs[dep].dependents.push(i);
            }
            jobs[i].deps = deps;
        }

        let names: Vec<&str> = jobs.iter().map(|job| job.project.name.as_str()).collect();
        topological_sort(&adjacency, &names)?;

        Ok(Self { jobs })
    }

    /// Number of jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether there is nothing to build
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// State of a job before the run starts
    pub fn initial_state(&self, name: &str) -> Option<JobState> {
        self.jobs
            .iter()
            .find(|job| job.project.name == name)
            .map(|job| {
                if job.deps.is_empty() {
                    JobState::Ready
                } else {
                    JobState::Pending
                }
            })
    }

    /// Run `action` on every job using `num_workers` threads
    ///
    /// `action` is called at most once per project, never before the build
    /// dependencies of that project succeeded. A panicking action counts as
    /// a failure.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::BuildFailed`] naming the first job whose action
    /// failed, once every job still running has settled.
    pub fn run<F>(&self, num_workers: usize, action: F) -> Result<BuildReport, BuildError>
    where
        F: Fn(&Project) -> anyhow::Result<()> + Sync,
    {
        let total = self.jobs.len();
        let (sender, receiver) = crossbeam_channel::unbounded();

        let mut state = SchedulerState {
            states: vec![JobState::Pending; total],
            unmet: self.jobs.iter().map(|job| job.deps.len()).collect(),
            running: 0,
            started: 0,
            built: Vec::new(),
            failure: None,
            sender: Some(sender),
        };
        for i in 0..total {
            if state.unmet[i] == 0 {
                state.enqueue(i);
            }
        }
        if total == 0 {
            state.sender = None;
        }

        let shared = Mutex::new(state);
        let workers = num_workers.clamp(1, total.max(1));
        debug!("Scheduling {} jobs on {} workers", total, workers);

        thread::scope(|scope| {
            for worker in 0..workers {
                let receiver = receiver.clone();
                let shared = &shared;
                let action = &action;
                scope.spawn(move || self.work(worker, &receiver, shared, action));
            }
        });

        let state = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
        match state.failure {
            Some((project, error)) => {
                let skipped = state
                    .states
                    .iter()
                    .filter(|s| matches!(s, JobState::Pending | JobState::Ready))
                    .count();
                if skipped > 0 {
                    info!("{} jobs not started after failure of {}", skipped, project);
                }
                Err(BuildError::BuildFailed { project, error })
            }
            None => Ok(BuildReport { built: state.built }),
        }
    }

    fn work<F>(
        &self,
        worker: usize,
        receiver: &Receiver<usize>,
        shared: &Mutex<SchedulerState>,
        action: &F,
    ) where
        F: Fn(&Project) -> anyhow::Result<()> + Sync,
    {
        let total = self.jobs.len();
        for index in receiver.iter() {
            let job = &self.jobs[index];
            {
                let mut state = lock(shared);
                if state.failure.is_some() {
                    continue;
                }
                state.states[index] = JobState::Running;
                state.running += 1;
                state.started += 1;
                info!(
                    "[{}/{}] Building {} (worker {})",
                    state.started, total, job.project.name, worker
                );
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| action(job.project)))
                .unwrap_or_else(|payload| {
                    Err(anyhow::anyhow!(
                        "build action panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                });

            let mut state = lock(shared);
            state.running -= 1;
            match outcome {
                Ok(()) => {
                    state.states[index] = JobState::Done;
                    state.built.push(job.project.name.clone());
                    for &dependent in &job.dependents {
                        state.unmet[dependent] -= 1;
                        if state.unmet[dependent] == 0 && state.failure.is_none() {
                            state.enqueue(dependent);
                        }
                    }
                }
                Err(error) => {
                    state.states[index] = JobState::Failed;
                    warn!("Build of {} failed: {:#}", job.project.name, error);
                    if state.failure.is_none() {
                        state.failure = Some((job.project.name.clone(), format!("{error:#}")));
                    }
                }
            }

            let settled = state.failure.is_some() && state.running == 0;
            if settled || state.built.len() == total {
                state.sender = None;
            }
        }
    }
}

/// Everything workers share, behind one mutex
struct SchedulerState {
    states: Vec<JobState>,
    unmet: Vec<usize>,
    running: usize,
    started: usize,
    built: Vec<String>,
    failure: Option<(String, String)>,
    // Dropped once no job can become ready anymore, which ends the workers.
    sender: Option<Sender<usize>>,
}

impl SchedulerState {
    fn enqueue(&mut self, index: usize) {
        if let Some(sender) = &self.sender {
            if sender.send(index).is_ok() {
                self.states[index] = JobState::Ready;
            }
        }
    }
}

fn lock(shared: &Mutex<SchedulerState>) -> MutexGuard<'_, SchedulerState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
