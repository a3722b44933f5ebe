//! Catch cooldown arithmetic.
//!
//! The minter enforces a minimum interval between an actor's catch
//! initiations. The on-chain check is authoritative; this mirrors it so
//! the client can skip a doomed submission.

/// Seconds until `actor` may initiate again.
///
/// `last_catch + cooldown - now`, saturating. A value `<= 0` means a
/// catch may start now.
pub fn seconds_until_available(last_catch: u64, cooldown: u64, now: i64) -> i64 {
    let available_at = i64::try_from(last_catch.saturating_add(cooldown)).unwrap_or(i64::MAX);
    available_at.saturating_sub(now)
}

/// Whether a catch may start now.
pub fn is_available(seconds_until: i64) -> bool {
    seconds_until <= 0
}
