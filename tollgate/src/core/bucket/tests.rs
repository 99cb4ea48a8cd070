use super::{RefillPolicy, TokenBucket};
use std::time::{Duration, Instant};

fn bucket(capacity: u64, interval_secs: u64, amount: u64, now: Instant) -> TokenBucket {
    TokenBucket::new(
        RefillPolicy::new(capacity, Duration::from_secs(interval_secs), amount),
        now,
    )
}

#[test]
fn test_new_bucket_is_full() {
    let now = Instant::now();
    let b = bucket(5, 1, 1, now);
    assert_eq!(b.tokens(), 5);
    assert_eq!(b.capacity(), 5);
    assert_eq!(b.last_refill(), now);
    assert_eq!(b.last_seen(), now);
}

#[test]
fn test_consume_until_empty() {
    let now = Instant::now();
    let mut b = bucket(3, 30, 1, now);

    assert!(b.try_consume());
    assert!(b.try_consume());
    assert!(b.try_consume());
    assert!(!b.try_consume());
    assert_eq!(b.tokens(), 0);

    // Denials never push the count below zero
    assert!(!b.try_consume());
    assert_eq!(b.tokens(), 0);
}

#[test]
fn test_no_refill_before_interval() {
    let start = Instant::now();
    let mut b = bucket(3, 30, 1, start);
    while b.try_consume() {}

    b.refill(start + Duration::from_secs(29));
    assert_eq!(b.tokens(), 0);
    assert_eq!(b.last_refill(), start);
}

#[test]
fn test_refill_after_exact_interval() {
    let start = Instant::now();
    let mut b = bucket(10, 5, 3, start);
    while b.try_consume() {}

    b.refill(start + Duration::from_secs(5));
    assert_eq!(b.tokens(), 3);
    assert_eq!(b.last_refill(), start + Duration::from_secs(5));
}

#[test]
fn test_refill_multiple_periods() {
    let start = Instant::now();
    let mut b = bucket(10, 5, 2, start);
    while b.try_consume() {}

    // Three whole periods elapsed
    b.refill(start + Duration::from_secs(17));
    assert_eq!(b.tokens(), 6);
}

#[test]
fn test_refill_capped_at_capacity() {
    let start = Instant::now();
    let mut b = bucket(4, 1, 3, start);
    assert!(b.try_consume());

    b.refill(start + Duration::from_secs(3600));
    assert_eq!(b.tokens(), 4);
}

#[test]
fn test_refill_keeps_fractional_progress() {
    let start = Instant::now();
    let mut b = bucket(3, 30, 1, start);
    while b.try_consume() {}

    // 31s: one period, clock lands on 30s, not 31s
    b.refill(start + Duration::from_secs(31));
    assert_eq!(b.tokens(), 1);
    assert_eq!(b.last_refill(), start + Duration::from_secs(30));
    assert!(b.try_consume());

    // 60s is one interval after the advanced clock even though only 29s
    // passed since the previous refill call
    b.refill(start + Duration::from_secs(60));
    assert_eq!(b.tokens(), 1);
}

#[test]
fn test_refill_same_instant_is_noop() {
    let start = Instant::now();
    let mut b = bucket(5, 10, 2, start);
    while b.try_consume() {}

    let later = start + Duration::from_secs(25);
    b.refill(later);
    let tokens = b.tokens();
    let last_refill = b.last_refill();

    b.refill(later);
    assert_eq!(b.tokens(), tokens);
    assert_eq!(b.last_refill(), last_refill);
}

#[test]
fn test_refill_ignores_earlier_instant() {
    let start = Instant::now();
    let later = start + Duration::from_secs(100);
    let mut b = bucket(2, 10, 1, later);
    while b.try_consume() {}

    b.refill(start);
    assert_eq!(b.tokens(), 0);
    assert_eq!(b.last_refill(), later);
}

#[test]
fn test_refill_saturates_on_huge_amount() {
    let start = Instant::now();
    let mut b = TokenBucket::new(
        RefillPolicy::new(u64::MAX, Duration::from_nanos(1), u64::MAX),
        start,
    );
    assert!(b.try_consume());

    b.refill(start + Duration::from_secs(10));
    assert_eq!(b.tokens(), u64::MAX);
}

#[test]
fn test_touch_and_idle() {
    let start = Instant::now();
    let mut b = bucket(1, 1, 1, start);
    let ttl = Duration::from_secs(90);

    assert!(!b.is_idle(start + Duration::from_secs(90), ttl));
    assert!(b.is_idle(start + Duration::from_secs(91), ttl));

    b.touch(start + Duration::from_secs(50));
    assert!(!b.is_idle(start + Duration::from_secs(91), ttl));

    // Touching with an older instant keeps the newer one
    b.touch(start);
    assert_eq!(b.last_seen(), start + Duration::from_secs(50));
}
