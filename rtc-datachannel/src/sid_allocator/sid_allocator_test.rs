use super::*;

#[test]
fn test_allocate_respects_role_parity() -> Result<()> {
    let mut allocator = SctpSidAllocator::new();

    assert_eq!(allocator.allocate(DTLSRole::Client)?, 0);
    assert_eq!(allocator.allocate(DTLSRole::Server)?, 1);
    assert_eq!(allocator.allocate(DTLSRole::Client)?, 2);
    assert_eq!(allocator.allocate(DTLSRole::Server)?, 3);

    Ok(())
}

#[test]
fn test_allocate_skips_reserved() -> Result<()> {
    let mut allocator = SctpSidAllocator::new();

    assert!(allocator.reserve(0));
    assert!(allocator.reserve(2));
    assert!(allocator.reserve(5));

    assert_eq!(allocator.allocate(DTLSRole::Client)?, 4);
    assert_eq!(allocator.allocate(DTLSRole::Server)?, 1);
    assert_eq!(allocator.allocate(DTLSRole::Server)?, 3);
    assert_eq!(allocator.allocate(DTLSRole::Server)?, 7);

    Ok(())
}

#[test]
fn test_reserve_rejects_used_and_out_of_range() {
    let mut allocator = SctpSidAllocator::new();

    assert!(allocator.reserve(MAX_SCTP_SID));
    assert!(!allocator.reserve(MAX_SCTP_SID));
    assert!(!allocator.reserve(MAX_SCTP_SID + 1));
    assert!(!allocator.is_sid_available(MAX_SCTP_SID));
}

#[test]
fn test_release_makes_sid_reusable() -> Result<()> {
    let mut allocator = SctpSidAllocator::new();

    let a = allocator.allocate(DTLSRole::Server)?;
    let b = allocator.allocate(DTLSRole::Server)?;
    assert_ne!(a, b);

    allocator.release(a);
    // releasing twice is harmless
    allocator.release(a);
    allocator.release(100);

    assert!(allocator.is_sid_available(a));
    assert_eq!(allocator.allocate(DTLSRole::Server)?, a);

    Ok(())
}

#[test]
fn test_allocate_exhaustion() -> Result<()> {
    let mut allocator = SctpSidAllocator::new();

    let mut issued = HashSet::new();
    for _ in 0..512 {
        let sid = allocator.allocate(DTLSRole::Client)?;
        assert_eq!(sid % 2, 0);
        assert!(issued.insert(sid), "sid {sid} issued twice");
    }

    assert_eq!(
        allocator.allocate(DTLSRole::Client),
        Err(Error::ErrMaxDataChannelID)
    );

    // odd half is untouched
    assert_eq!(allocator.allocate(DTLSRole::Server)?, 1);

    Ok(())
}
