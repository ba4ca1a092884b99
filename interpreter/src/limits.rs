pub(crate) const MAX_CALL_DEPTH: usize = 256;
pub(crate) const STACK_TRACE_LIMIT: usize = 20;

// Each call checks for this much free stack and grows it by a segment when short.
pub(crate) const STACK_RED_ZONE: usize = 256 * 1024;
pub(crate) const STACK_SEGMENT_SIZE: usize = 4 * 1024 * 1024;

pub(crate) const MAX_STRING_LEN: usize = 1 << 30;
