/// History-Derived (Commit Guru) Metrics
///
/// Per-commit change metrics computed from commit metadata and numstat:
/// size (la, ld, lt), diffusion (ns, nd, nf, entropy), history (ndev, age,
/// nuc), experience (exp, rexp, sexp) and purpose (fix).
pub mod calculator;
pub mod domain;

pub use calculator::GuruMetricsCalculator;
pub use domain::CommitGuruMetrics;
