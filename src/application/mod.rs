// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal each:
//
//   train_use_case      corpus → vocabulary → samples → training
//   export_use_case     checkpoint → frozen inference artifact
//   summarize_use_case  artifact + vocabulary → text summaries
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Checkpoint → portable artifact
pub mod export_use_case;

// The inference context behind every summary request
pub mod summarize_use_case;
