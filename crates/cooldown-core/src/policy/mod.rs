//! Pure policy predicates: version age and allowlist/override handling.

mod age;
mod allow;

pub use age::is_old_enough;
pub use allow::{strip_override, Allowlist, OVERRIDE_MARKER};
