use std::{fs::File, os::raw::c_int, path::Path};

use criterion::profiler::Profiler;
use pprof::ProfilerGuard;

/// Writes a flamegraph per benchmark when run with `--profile-time`.
pub struct FlamegraphProfiler<'a> {
    frequency: c_int,
    active_profiler: Option<ProfilerGuard<'a>>,
}

impl FlamegraphProfiler<'_> {
    pub fn new(frequency: c_int) -> Self {
        FlamegraphProfiler {
            frequency,
            active_profiler: None,
        }
    }
}

impl Profiler for FlamegraphProfiler<'_> {
    fn start_profiling(&mut self, _benchmark_id: &str, _benchmark_dir: &Path) {
        self.active_profiler = ProfilerGuard::new(self.frequency).ok();
    }

    fn stop_profiling(&mut self, _benchmark_id: &str, benchmark_dir: &Path) {
        let Some(profiler) = self.active_profiler.take() else {
            return;
        };
        if std::fs::create_dir_all(benchmark_dir).is_err() {
            return;
        }
        let path = benchmark_dir.join("flamegraph.svg");
        if let (Ok(report), Ok(file)) = (profiler.report().build(), File::create(&path)) {
            let _ = report.flamegraph(file);
        }
    }
}
