//! Security gates: keyword screening of commands, protected-project checks on actions

pub mod policy;

pub use policy::SecurityPolicy;
