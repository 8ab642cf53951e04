// Delegation constants (No magic values)

/// Delegation attempts per request: the first try plus one retry after a
/// gone rule has been detached
pub const MAX_DELEGATION_ATTEMPTS: u8 = 2;
