//! A trivial tracing facility: each pipeline stage reports what
//! it consumed and produced on standard error.

use bitmask_enum::bitmask;

#[bitmask]
pub enum Trace {
    All,
    Parse,
    Ground,
    Break,
    Complete,
    Encode,
}

#[macro_export]
macro_rules! trace {
    ($trace:expr, $level:ident, $fmt:literal $(,)? $($arg:expr),* $(,)?) => {
        if $trace.intersects($crate::Trace::$level | $crate::Trace::All) {
            eprintln!($fmt, $($arg),*);
        }
    }
}
