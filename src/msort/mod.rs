pub mod error;
pub mod merge;
pub mod sched;
pub mod split;
pub mod trace;

mod worker;


pub use self::error::*;
pub use self::merge::*;
pub use self::sched::*;
pub use self::split::*;
pub use self::trace::*;
