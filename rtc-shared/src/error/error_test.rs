use super::*;

#[test]
fn test_close_reason_classification() {
    let network = Error::ErrNetworkError("transport channel closed".to_owned());
    assert!(network.is_network_error());
    assert!(!network.is_data_channel_failure());

    let failure = Error::ErrDataChannelFailure("queue overflow".to_owned());
    assert!(failure.is_data_channel_failure());
    assert!(!failure.is_network_error());

    for err in [
        Error::Other("dtls closed".to_owned()),
        Error::ErrDataChannelNotOpen,
        Error::ErrOutboundQueueFull,
        Error::ErrDataChannelActorGone,
        Error::ErrStreamBlocked,
    ] {
        assert!(!err.is_network_error(), "{err}");
        assert!(!err.is_data_channel_failure(), "{err}");
    }
}

#[test]
fn test_unclassified_errors_keep_their_message() {
    let err = Error::Other("association aborted".to_owned());
    assert_eq!(err.to_string(), "association aborted");
    assert_eq!(
        Error::ErrNetworkError(err.to_string()).to_string(),
        "network error: association aborted"
    );
}
