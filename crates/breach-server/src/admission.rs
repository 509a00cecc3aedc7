//! Pre-flight admission control
//!
//! Two independent gates are checked before any source is queried. A failing
//! gate rejects the whole request with a busy signal; nothing is queued or
//! degraded.

use std::fmt;

use breach_core::AdmissionConfig;
use parking_lot::Mutex;
use sysinfo::{Pid, System};

use crate::metrics;

/// Host and process load at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    /// 1-minute load average
    pub load_average: f64,
    /// Processing units available to this process
    pub cpus: usize,
    /// Memory held by this process, in bytes
    pub process_memory: u64,
    /// Total system memory, in bytes
    pub total_memory: u64,
}

/// Source of load samples
pub trait LoadProbe: Send + Sync {
    fn sample(&self) -> LoadSample;
}

/// Probe backed by `sysinfo`
pub struct SystemLoadProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SystemLoadProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = e, "Cannot resolve own pid; memory gate uses 0");
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for SystemLoadProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadProbe for SystemLoadProbe {
    fn sample(&self) -> LoadSample {
        let mut system = self.system.lock();
        system.refresh_memory();

        let process_memory = match self.pid {
            Some(pid) if system.refresh_process(pid) => {
                system.process(pid).map(|p| p.memory()).unwrap_or(0)
            }
            _ => 0,
        };

        LoadSample {
            load_average: System::load_average().one,
            cpus: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            process_memory,
            total_memory: system.total_memory(),
        }
    }
}

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BusyReason {
    Cpu { load_average: f64, limit: f64 },
    Memory { used: u64, limit: f64 },
}

impl BusyReason {
    /// Gate name, used as a metric label and in the busy response
    pub fn gate(&self) -> &'static str {
        match self {
            BusyReason::Cpu { .. } => "cpu",
            BusyReason::Memory { .. } => "memory",
        }
    }
}

impl fmt::Display for BusyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusyReason::Cpu {
                load_average,
                limit,
            } => write!(f, "cpu load {:.2} >= {:.2}", load_average, limit),
            BusyReason::Memory { used, limit } => {
                write!(f, "memory {} bytes >= {:.0} bytes", used, limit)
            }
        }
    }
}

/// Load-based request gate
pub struct AdmissionController {
    probe: Box<dyn LoadProbe>,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig, probe: Box<dyn LoadProbe>) -> Self {
        Self { probe, config }
    }

    /// Controller reading the live host
    pub fn system(config: AdmissionConfig) -> Self {
        Self::new(config, Box::new(SystemLoadProbe::new()))
    }

    /// Evaluate both gates against a fresh sample
    pub fn check(&self) -> Result<(), BusyReason> {
        if !self.config.enabled {
            return Ok(());
        }

        let result = evaluate(&self.config, &self.probe.sample());
        if let Err(reason) = &result {
            tracing::warn!(gate = reason.gate(), %reason, "Admission rejected");
            metrics::record_admission_rejection(reason.gate());
        }
        result
    }
}

/// Pure gate evaluation; the CPU gate is checked first
pub fn evaluate(config: &AdmissionConfig, sample: &LoadSample) -> Result<(), BusyReason> {
    let cpu_limit = sample.cpus as f64 * config.cpu_load_factor;
    if sample.load_average >= cpu_limit {
        return Err(BusyReason::Cpu {
            load_average: sample.load_average,
            limit: cpu_limit,
        });
    }

    let memory_limit = sample.total_memory as f64 * config.memory_usage_factor;
    if sample.process_memory as f64 >= memory_limit {
        return Err(BusyReason::Memory {
            used: sample.process_memory,
            limit: memory_limit,
        });
    }

    Ok(())
}
