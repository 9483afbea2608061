//! CLI command implementations.
//!
//! | Module  | Commands handled                                         |
//! |---------|----------------------------------------------------------|
//! | `serve` | `Serve`                                                  |
//! | `tasks` | `Board`, `Add`, `Edit`, `Move`, `Forward`, `Back`, `Delete` |

pub mod serve;
pub mod tasks;

pub use serve::cmd_serve;
pub use tasks::{Direction, cmd_add, cmd_board, cmd_delete, cmd_edit, cmd_move, cmd_step};
