//! # Supervised process instances.
//!
//! - [`RunningProcess`] a started instance: its pid and its completion as a future
//! - [`Spawner`] starts OS children with relayed output and kill-on-drop
//! - [`Launch`] how the original program is started; [`CommandSpec`] runs a shell command line
//!
//! ## Lifetime
//! ```text
//! Spawner::spawn(cmd)
//!   ├─► relay task (stdout) ──► Bus: ProcessOutput{stream=stdout}
//!   ├─► relay task (stderr) ──► Bus: ProcessOutput{stream=stderr}
//!   └─► waiter task: select { child.wait(), kill token }
//!                       ▲
//! RunningProcess ───────┘ drop ──► DropGuard cancels kill token ──► child killed
//! ```

mod handle;
mod launch;
mod spawner;

pub use handle::RunningProcess;
pub use launch::{CommandSpec, Launch};
pub use spawner::Spawner;
