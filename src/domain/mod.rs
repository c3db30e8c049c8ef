// Domain layer - pure types and rules, no I/O
pub mod breakpoint;
pub mod dashboard;
pub mod layout;
pub mod record;
pub mod session;
pub mod widget;
