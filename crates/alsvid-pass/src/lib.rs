//! Alsvid pass management.
//!
//! A compilation strategy is a tree of passes: leaves transform or analyze
//! the shared program, groups run their sub-passes in order. The
//! [`Factory`] maps dotted type names to pass constructors (with
//! do-not-use gating and architecture aliasing); the [`Manager`] owns the
//! configured factory and the root group, loads strategies from JSON, and
//! drives construction and compilation.
//!
//! Options flow from the root down: each pass declares typed options with
//! hardcoded defaults, `pass-options`/`group-options` records propagate at
//! construction time, and dotted option paths (with `?`/`*` wildcards and
//! `**.<option>` recursion) address them afterwards — until construction
//! freezes each pass's set.
//!
//! # Example
//!
//! ```rust
//! use alsvid_ir::{Gate, Kernel, Program};
//! use alsvid_pass::{CancellationToken, Factory, GlobalOptions, Manager};
//! use alsvid_plat::Platform;
//!
//! let strategy = serde_json::json!({
//!     "passes": [
//!         {"type": "sch.Schedule", "name": "sched",
//!          "options": {"scheduler_target": "asap"}},
//!         {"type": "ana.ConsistencyCheck", "name": "check"},
//!     ],
//! });
//! let factory = Factory::default_registry();
//! let mut manager =
//!     Manager::from_json(&strategy, &factory, &GlobalOptions::default()).unwrap();
//!
//! let mut kernel = Kernel::new("bell", 2, 0, 0);
//! kernel.push(Gate::quantum("h", [0], 1));
//! kernel.push(Gate::quantum("cnot", [0, 1], 1));
//! let mut program = Program::new("demo", 2, 0, 0);
//! program.add_kernel(kernel).unwrap();
//!
//! let platform = Platform::simple("sim", 2).unwrap();
//! manager
//!     .compile(&mut program, &platform, &CancellationToken::new())
//!     .unwrap();
//! assert!(program.kernels[0].cycles_valid);
//! ```

pub mod context;
pub mod error;
pub mod factory;
pub mod manager;
pub mod options;
pub mod pass;
pub mod passes;

pub use context::{CancellationToken, PassContext};
pub use error::{PassError, PassResult, exit_code};
pub use factory::{Factory, PassConstructor};
pub use manager::{GlobalOptions, Manager};
pub use options::{OptionValue, Options};
pub use pass::{GroupFlag, PassImpl, PassNode};
