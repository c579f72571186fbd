// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns shared by training, export and
// inference:
//
//   checkpoint.rs  — per-epoch model + optimizer state via
//                    Burn's CompactRecorder, a JSON sidecar
//                    (vocabulary, model config, losses) and
//                    the run's TrainConfig
//
//   metrics.rs     — epoch losses appended to a CSV file
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
